//! Faculty commitments made by other classes' persisted schedules.

use crate::collaborators::{Directory, ScheduleStore};
use crate::data::{Day, Entry, FacultyId, Period, PersistedSchedule, ScheduleParameters};
use log::{debug, trace};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A faculty member already teaching elsewhere at a slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusySlot {
    pub day: Day,
    pub period: Period,
    pub faculty_id: FacultyId,
}

/// Read-only snapshot of `(day, period) -> busy faculty` across every other
/// schedule. Built once per generation call.
#[derive(Debug, Clone, Default)]
pub struct CommitmentMatrix {
    busy: HashMap<(Day, Period), HashSet<FacultyId>>,
}

impl CommitmentMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every schedule but `exclude_id` from the store.
    pub fn load<S, D>(store: &S, exclude_id: &str, params: &ScheduleParameters, directory: &D) -> Self
    where
        S: ScheduleStore + ?Sized,
        D: Directory + ?Sized,
    {
        let others = store.load_other_schedules(exclude_id);
        Self::from_schedules(&others, exclude_id, params, directory)
    }

    pub fn from_schedules<D>(
        others: &[PersistedSchedule],
        exclude_id: &str,
        params: &ScheduleParameters,
        directory: &D,
    ) -> Self
    where
        D: Directory + ?Sized,
    {
        let mut matrix = Self::new();
        for persisted in others.iter().filter(|p| p.id != exclude_id) {
            for (day, entries) in &persisted.schedule.days {
                matrix.mark_day(*day, entries, params, directory);
            }
        }
        debug!(
            "Commitment matrix built from {} other schedule(s): {} busy faculty slot(s)",
            others.len(),
            matrix.len()
        );
        matrix
    }

    fn mark_day<D>(&mut self, day: Day, entries: &[Entry], params: &ScheduleParameters, directory: &D)
    where
        D: Directory + ?Sized,
    {
        let mut sorted: Vec<&Entry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.period);

        let mut i = 0;
        while i < sorted.len() {
            let first = sorted[i];
            if !first.is_lab {
                self.mark_busy_checked(day, first.period, &first.faculty_id, params);
                i += 1;
                continue;
            }

            if !params.contains_period(first.period) {
                trace!("Lab {} on {} p{} is off the grid, ignored", first.subject_id, day, first.period);
                i += 1;
                continue;
            }

            // a lab block is either one entry per period or a single compact entry
            let mut j = i + 1;
            while j < sorted.len()
                && sorted[j].is_lab
                && sorted[j].subject_id == first.subject_id
                && sorted[j].faculty_id == first.faculty_id
                && first.period.checked_add((j - i) as Period) == Some(sorted[j].period)
            {
                j += 1;
            }
            let run_len = (j - i) as u32;
            let duration = directory
                .resolve_subject(&first.subject_id)
                .map(|s| s.block_len())
                .unwrap_or(1);
            let span = run_len.max(duration);
            let end = first
                .period
                .saturating_add(span)
                .min(params.periods_per_day.saturating_add(1));
            trace!(
                "Lab {} by {} on {} blocks p{}..p{}",
                first.subject_id,
                first.faculty_id,
                day,
                first.period,
                end - 1
            );
            for period in first.period..end {
                self.mark_busy_checked(day, period, &first.faculty_id, params);
            }
            i = j;
        }
    }

    fn mark_busy_checked(&mut self, day: Day, period: Period, faculty: &str, params: &ScheduleParameters) {
        if params.contains_period(period) {
            self.mark_busy(day, period, faculty);
        }
    }

    pub fn mark_busy(&mut self, day: Day, period: Period, faculty: impl Into<FacultyId>) {
        self.busy.entry((day, period)).or_default().insert(faculty.into());
    }

    pub fn is_busy(&self, day: Day, period: Period, faculty: &str) -> bool {
        self.busy
            .get(&(day, period))
            .is_some_and(|set| set.contains(faculty))
    }

    pub fn busy_at(&self, day: Day, period: Period) -> Option<&HashSet<FacultyId>> {
        self.busy.get(&(day, period))
    }

    /// Every busy (day, period, faculty) triple, sorted.
    pub fn busy_slots(&self) -> Vec<BusySlot> {
        let mut slots: Vec<BusySlot> = self
            .busy
            .iter()
            .flat_map(|((day, period), faculty)| {
                faculty.iter().map(move |f| BusySlot {
                    day: *day,
                    period: *period,
                    faculty_id: f.clone(),
                })
            })
            .collect();
        slots.sort();
        slots
    }

    /// Number of busy (slot, faculty) pairs.
    pub fn len(&self) -> usize {
        self.busy.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{InMemoryDirectory, InMemoryStore};
    use crate::data::{Schedule, SubjectRecord};
    use crate::collaborators::ScheduleStore;

    fn entry(period: Period, subject: &str, faculty: &str, is_lab: bool) -> Entry {
        Entry {
            period,
            subject_id: subject.into(),
            faculty_id: faculty.into(),
            is_lab,
        }
    }

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_subject("MATH", SubjectRecord::theory("Mathematics"))
            .with_subject("CHEM", SubjectRecord::lab("Chemistry Lab", 3))
    }

    fn params() -> ScheduleParameters {
        ScheduleParameters::new(6, vec![Day::Monday, Day::Tuesday])
    }

    #[test]
    fn test_marks_theory_entries_and_skips_excluded() {
        let mut store = InMemoryStore::new();
        let mut a = Schedule::default();
        a.days.insert(Day::Monday, vec![entry(3, "MATH", "F1", false)]);
        let mut b = Schedule::default();
        b.days.insert(Day::Monday, vec![entry(1, "MATH", "F2", false)]);
        store.persist_schedule("A", a);
        store.persist_schedule("B", b);

        let matrix = CommitmentMatrix::load(&store, "B", &params(), &directory());
        assert!(matrix.is_busy(Day::Monday, 3, "F1"));
        assert!(!matrix.is_busy(Day::Monday, 1, "F2"));
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn test_compact_lab_entry_expands_to_block() {
        let mut schedule = Schedule::default();
        schedule.days.insert(Day::Tuesday, vec![entry(4, "CHEM", "F9", true)]);
        let others = vec![PersistedSchedule { id: "X".into(), schedule }];

        let matrix = CommitmentMatrix::from_schedules(&others, "Y", &params(), &directory());
        for period in 4..=6 {
            assert!(matrix.is_busy(Day::Tuesday, period, "F9"));
        }
        assert!(!matrix.is_busy(Day::Tuesday, 3, "F9"));
    }

    #[test]
    fn test_expanded_lab_entries_do_not_overrun() {
        let mut schedule = Schedule::default();
        schedule.days.insert(
            Day::Monday,
            vec![
                entry(1, "CHEM", "F9", true),
                entry(2, "CHEM", "F9", true),
                entry(3, "CHEM", "F9", true),
                entry(4, "MATH", "F1", false),
            ],
        );
        let others = vec![PersistedSchedule { id: "X".into(), schedule }];

        let matrix = CommitmentMatrix::from_schedules(&others, "Y", &params(), &directory());
        assert!(matrix.is_busy(Day::Monday, 3, "F9"));
        assert!(!matrix.is_busy(Day::Monday, 4, "F9"));
        assert!(matrix.is_busy(Day::Monday, 4, "F1"));
    }

    #[test]
    fn test_block_beyond_periods_per_day_is_ignored() {
        let mut schedule = Schedule::default();
        schedule.days.insert(
            Day::Monday,
            vec![entry(5, "CHEM", "F9", true), entry(9, "MATH", "F1", false)],
        );
        let others = vec![PersistedSchedule { id: "X".into(), schedule }];

        let matrix = CommitmentMatrix::from_schedules(&others, "Y", &params(), &directory());
        assert!(matrix.is_busy(Day::Monday, 6, "F9"));
        assert!(matrix.busy_at(Day::Monday, 7).is_none());
        assert!(matrix.busy_at(Day::Monday, 9).is_none());
        assert_eq!(matrix.busy_slots().len(), 2);
    }

    #[test]
    fn test_lab_entry_at_extreme_period_is_ignored() {
        let directory = directory().with_subject("LONG", SubjectRecord::lab("Project Lab", u32::MAX));
        let mut schedule = Schedule::default();
        schedule.days.insert(
            Day::Monday,
            vec![
                entry(2, "LONG", "F7", true),
                entry(u32::MAX - 1, "CHEM", "F9", true),
                entry(u32::MAX, "CHEM", "F9", true),
            ],
        );
        let others = vec![PersistedSchedule { id: "X".into(), schedule }];

        let matrix = CommitmentMatrix::from_schedules(&others, "Y", &params(), &directory);
        assert!(!matrix.is_busy(Day::Monday, u32::MAX, "F9"));
        for period in 2..=6 {
            assert!(matrix.is_busy(Day::Monday, period, "F7"));
        }
        assert_eq!(matrix.len(), 5);
    }
}
