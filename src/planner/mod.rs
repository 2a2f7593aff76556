//! Local greedy planners: labs first, then theory fills the remaining grid.
//!
//! Both planners work on a shared [`PlannerState`] that tracks the grid under
//! construction and which faculty are still free at every slot. Availability
//! starts as every catalog faculty minus those committed elsewhere and shrinks
//! as entries are placed.

pub mod lab;
pub mod theory;

use crate::catalog::AssignmentCatalog;
use crate::commitments::CommitmentMatrix;
use crate::data::{Day, Entry, FacultyId, Period, Schedule, ScheduleParameters, SubjectId};
use crate::error::GenerationError;
use log::info;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub use lab::place_labs;
pub use theory::fill_theory;

/// Read-only inputs shared by every stage of one generation call.
#[derive(Debug, Clone, Copy)]
pub struct PlanningContext<'a> {
    pub params: &'a ScheduleParameters,
    pub catalog: &'a AssignmentCatalog,
    pub commitments: &'a CommitmentMatrix,
}

/// Runs the lab planner then the theory planner.
pub fn plan_local<R: Rng + ?Sized>(ctx: PlanningContext<'_>, rng: &mut R) -> Result<Schedule, GenerationError> {
    let mut state = PlannerState::new(ctx);
    let lab_periods = place_labs(&mut state, rng)?;
    info!("Placed lab blocks covering {} period(s)", lab_periods);
    fill_theory(&mut state, rng)?;
    Ok(state.into_schedule())
}

/// The schedule under construction.
#[derive(Debug)]
pub struct PlannerState<'a> {
    ctx: PlanningContext<'a>,
    grid: BTreeMap<Day, BTreeMap<Period, Entry>>,
    available: HashMap<(Day, Period), BTreeSet<FacultyId>>,
    used: HashMap<Day, HashSet<SubjectId>>,
    weekly: HashMap<SubjectId, u32>,
}

impl<'a> PlannerState<'a> {
    pub fn new(ctx: PlanningContext<'a>) -> Self {
        let mut available = HashMap::new();
        for &day in &ctx.params.working_days {
            for period in ctx.params.periods() {
                let free: BTreeSet<FacultyId> = ctx
                    .catalog
                    .faculty_ids()
                    .filter(|f| !ctx.commitments.is_busy(day, period, f))
                    .cloned()
                    .collect();
                available.insert((day, period), free);
            }
        }
        Self {
            ctx,
            grid: BTreeMap::new(),
            available,
            used: HashMap::new(),
            weekly: HashMap::new(),
        }
    }

    pub fn params(&self) -> &'a ScheduleParameters {
        self.ctx.params
    }

    pub fn catalog(&self) -> &'a AssignmentCatalog {
        self.ctx.catalog
    }

    pub fn is_free(&self, day: Day, period: Period) -> bool {
        self.ctx.params.contains_period(period)
            && self.grid.get(&day).is_none_or(|periods| !periods.contains_key(&period))
    }

    pub fn is_available(&self, day: Day, period: Period, faculty: &str) -> bool {
        self.available
            .get(&(day, period))
            .is_some_and(|set| set.contains(faculty))
    }

    /// Eligible faculty for `subject` still free at the slot, in catalog order.
    pub fn available_faculty(&self, day: Day, period: Period, subject: &str) -> Vec<FacultyId> {
        self.ctx
            .catalog
            .eligible_faculty(subject)
            .into_iter()
            .filter(|f| self.is_available(day, period, f))
            .cloned()
            .collect()
    }

    pub fn entry_at(&self, day: Day, period: Period) -> Option<&Entry> {
        self.grid.get(&day).and_then(|periods| periods.get(&period))
    }

    pub fn used_on(&self, day: Day, subject: &str) -> bool {
        self.used.get(&day).is_some_and(|set| set.contains(subject))
    }

    pub fn weekly_count(&self, subject: &str) -> u32 {
        self.weekly.get(subject).copied().unwrap_or(0)
    }

    /// Number of distinct lab subjects placed on `day`.
    pub fn labs_on(&self, day: Day) -> usize {
        self.grid
            .get(&day)
            .map(|periods| {
                periods
                    .values()
                    .filter(|e| e.is_lab)
                    .map(|e| e.subject_id.as_str())
                    .collect::<HashSet<_>>()
                    .len()
            })
            .unwrap_or(0)
    }

    pub fn occupied(&self) -> u32 {
        self.grid.values().map(|periods| periods.len() as u32).sum()
    }

    pub fn place(&mut self, day: Day, period: Period, subject: &str, faculty: &str, is_lab: bool) {
        self.grid.entry(day).or_default().insert(
            period,
            Entry {
                period,
                subject_id: subject.to_string(),
                faculty_id: faculty.to_string(),
                is_lab,
            },
        );
        if let Some(set) = self.available.get_mut(&(day, period)) {
            set.remove(faculty);
        }
        self.used.entry(day).or_default().insert(subject.to_string());
        *self.weekly.entry(subject.to_string()).or_insert(0) += 1;
    }

    /// Working-day slots that still hold no entry, in day then period order.
    pub fn empty_slots(&self) -> Vec<(Day, Period)> {
        let params = self.ctx.params;
        let mut days = params.working_days.clone();
        days.sort();
        days.into_iter()
            .flat_map(|day| params.periods().map(move |p| (day, p)))
            .filter(|(day, period)| self.is_free(*day, *period))
            .collect()
    }

    pub fn into_schedule(self) -> Schedule {
        let mut schedule = Schedule::default();
        for &day in &self.ctx.params.working_days {
            schedule.days.entry(day).or_default();
        }
        for (day, periods) in self.grid {
            schedule.days.insert(day, periods.into_values().collect());
        }
        schedule
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collaborators::InMemoryDirectory;
    use crate::data::{Assignment, FacultyRecord, SubjectRecord};

    /// Directory with faculty F1..F9 and subjects MATH, PHYS, CHEM, BIO,
    /// ENG, HIST (theory), LAB2 (2 periods) and LAB3 (3 periods).
    pub(crate) fn sample_directory() -> InMemoryDirectory {
        let mut dir = InMemoryDirectory::new();
        for i in 1..=9 {
            dir = dir.with_faculty(format!("F{i}"), FacultyRecord::new(format!("Teacher {i}"), format!("C{i:02}")));
        }
        dir.with_subject("MATH", SubjectRecord::theory("Mathematics"))
            .with_subject("PHYS", SubjectRecord::theory("Physics"))
            .with_subject("CHEM", SubjectRecord::theory("Chemistry"))
            .with_subject("BIO", SubjectRecord::theory("Biology"))
            .with_subject("ENG", SubjectRecord::theory("English"))
            .with_subject("HIST", SubjectRecord::theory("History"))
            .with_subject("LAB2", SubjectRecord::lab("Physics Lab", 2))
            .with_subject("LAB3", SubjectRecord::lab("Chemistry Lab", 3))
    }

    pub(crate) fn catalog(pairs: &[(&str, &str)]) -> AssignmentCatalog {
        let assignments: Vec<Assignment> = pairs.iter().map(|(f, s)| Assignment::new(*f, *s)).collect();
        AssignmentCatalog::resolve(&assignments, &sample_directory()).unwrap()
    }

    #[test]
    fn test_availability_excludes_commitments() {
        let params = ScheduleParameters::new(4, vec![Day::Monday]);
        let catalog = catalog(&[("F1", "MATH"), ("F2", "MATH")]);
        let mut commitments = CommitmentMatrix::new();
        commitments.mark_busy(Day::Monday, 2, "F1");
        let ctx = PlanningContext { params: &params, catalog: &catalog, commitments: &commitments };

        let mut state = PlannerState::new(ctx);
        assert_eq!(state.available_faculty(Day::Monday, 1, "MATH"), vec!["F1", "F2"]);
        assert_eq!(state.available_faculty(Day::Monday, 2, "MATH"), vec!["F2"]);

        state.place(Day::Monday, 1, "MATH", "F1", false);
        assert!(!state.is_free(Day::Monday, 1));
        assert!(!state.is_available(Day::Monday, 1, "F1"));
        assert!(state.used_on(Day::Monday, "MATH"));
        assert_eq!(state.weekly_count("MATH"), 1);
        assert_eq!(state.empty_slots().len(), 3);
    }

    #[test]
    fn test_into_schedule_keeps_every_working_day() {
        let params = ScheduleParameters::new(2, vec![Day::Tuesday, Day::Monday]);
        let catalog = catalog(&[("F1", "MATH")]);
        let commitments = CommitmentMatrix::new();
        let ctx = PlanningContext { params: &params, catalog: &catalog, commitments: &commitments };

        let mut state = PlannerState::new(ctx);
        state.place(Day::Tuesday, 2, "MATH", "F1", false);
        let schedule = state.into_schedule();
        assert!(schedule.day(Day::Monday).is_empty());
        assert_eq!(schedule.day(Day::Tuesday).len(), 1);
    }
}
