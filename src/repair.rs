//! Validation and minimal repair of a candidate schedule.
//!
//! Runs on every candidate regardless of where it came from. It fixes what it
//! can with the smallest substitution available and reports the rest as
//! [`ValidationWarning`]s instead of failing:
//! - days outside the working set are dropped, missing working days added
//! - entries with unknown subject/faculty, out-of-range or duplicate periods are dropped
//! - faculty that are ineligible or committed elsewhere are swapped for a free eligible one
//! - a theory subject repeated within a day is replaced by one unused that day
//!
//! Applying the pass to its own output changes nothing.

use crate::catalog::AssignmentCatalog;
use crate::data::{Day, Entry, Period, Schedule, SubjectId, ValidationWarning, WarningKind};
use crate::planner::PlanningContext;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};

/// Output of [`validate_and_repair`].
#[derive(Debug, Clone)]
pub struct Repaired {
    pub schedule: Schedule,
    pub warnings: Vec<ValidationWarning>,
    /// Entries whose subject or faculty was changed.
    pub substitutions: usize,
}

pub fn validate_and_repair(candidate: Schedule, ctx: PlanningContext<'_>) -> Repaired {
    let mut repair = Repair {
        ctx,
        warnings: Vec::new(),
        substitutions: 0,
    };
    let mut days = candidate.days;

    let mut repaired = BTreeMap::new();
    for &day in &ctx.params.working_days {
        let entries = days.remove(&day).unwrap_or_default();
        let mut entries = repair.clean_entries(day, entries);
        repair.fix_faculty(day, &mut entries);
        repair.fix_repeats(day, &mut entries);
        repaired.insert(day, entries);
    }
    for (day, entries) in days {
        repair.warn(
            WarningKind::InvalidSlot,
            day,
            None,
            format!("{} entr(ies) on a non-working day dropped", entries.len()),
        );
    }

    info!(
        "Repair pass: {} substitution(s), {} warning(s)",
        repair.substitutions,
        repair.warnings.len()
    );
    Repaired {
        schedule: Schedule { days: repaired },
        warnings: repair.warnings,
        substitutions: repair.substitutions,
    }
}

/// Lab subjects that do not appear as exactly one contiguous block of their
/// full duration, on a single day, taught by a single faculty member.
///
/// Repair never rebuilds lab blocks, so a candidate with any of these is
/// unusable as is.
pub fn broken_lab_blocks(schedule: &Schedule, catalog: &AssignmentCatalog) -> Vec<SubjectId> {
    catalog
        .lab_subjects()
        .into_iter()
        .filter(|id| {
            let block_len = catalog.subject(id).map_or(1, |s| s.block_len()) as usize;
            let mut days = schedule
                .days
                .values()
                .map(|entries| entries.iter().filter(|e| &e.subject_id == *id).collect::<Vec<_>>())
                .filter(|block| !block.is_empty());
            let (Some(mut block), None) = (days.next(), days.next()) else {
                return true;
            };
            block.sort_by_key(|e| e.period);
            let contiguous = block.windows(2).all(|pair| {
                pair[0].period.checked_add(1) == Some(pair[1].period) && pair[0].faculty_id == pair[1].faculty_id
            });
            !(contiguous && block.len() == block_len)
        })
        .cloned()
        .collect()
}

struct Repair<'a> {
    ctx: PlanningContext<'a>,
    warnings: Vec<ValidationWarning>,
    substitutions: usize,
}

impl Repair<'_> {
    fn warn(&mut self, kind: WarningKind, day: Day, period: Option<Period>, message: String) {
        warn!("{} {:?}: {}", day, period, message);
        self.warnings.push(ValidationWarning {
            kind,
            day,
            period,
            message,
        });
    }

    fn clean_entries(&mut self, day: Day, mut entries: Vec<Entry>) -> Vec<Entry> {
        let catalog = self.ctx.catalog;
        let periods_per_day = self.ctx.params.periods_per_day;
        entries.sort_by_key(|e| e.period);
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(entries.len());
        for mut entry in entries {
            if !self.ctx.params.contains_period(entry.period) {
                self.warn(
                    WarningKind::InvalidSlot,
                    day,
                    Some(entry.period),
                    format!("period outside 1..={periods_per_day}"),
                );
                continue;
            }
            let Some(subject) = catalog.subject(&entry.subject_id) else {
                self.warn(
                    WarningKind::UnknownReference,
                    day,
                    Some(entry.period),
                    format!("unknown subject {}", entry.subject_id),
                );
                continue;
            };
            if catalog.faculty(&entry.faculty_id).is_none() {
                self.warn(
                    WarningKind::UnknownReference,
                    day,
                    Some(entry.period),
                    format!("unknown faculty {}", entry.faculty_id),
                );
                continue;
            }
            if !seen.insert(entry.period) {
                self.warn(
                    WarningKind::InvalidSlot,
                    day,
                    Some(entry.period),
                    format!("duplicate entry for {} dropped", entry.subject_id),
                );
                continue;
            }
            entry.is_lab = subject.is_lab;
            kept.push(entry);
        }
        kept
    }

    fn fix_faculty(&mut self, day: Day, entries: &mut [Entry]) {
        let catalog = self.ctx.catalog;
        let commitments = self.ctx.commitments;
        for entry in entries.iter_mut() {
            let eligible = catalog.is_eligible(&entry.faculty_id, &entry.subject_id);
            if eligible && !commitments.is_busy(day, entry.period, &entry.faculty_id) {
                continue;
            }
            let replacement = catalog
                .eligible_faculty(&entry.subject_id)
                .into_iter()
                .find(|f| !commitments.is_busy(day, entry.period, f));
            match replacement {
                Some(faculty) => {
                    debug!(
                        "{} p{}: {} replaced by {} for {}",
                        day, entry.period, entry.faculty_id, faculty, entry.subject_id
                    );
                    entry.faculty_id = faculty.clone();
                    self.substitutions += 1;
                }
                None => {
                    let reason = if eligible { "is committed elsewhere" } else { "is not assigned to this subject" };
                    let message = format!("faculty {} {} for {}", entry.faculty_id, reason, entry.subject_id);
                    self.warn(WarningKind::FacultyConflict, day, Some(entry.period), message);
                }
            }
        }
    }

    fn fix_repeats(&mut self, day: Day, entries: &mut [Entry]) {
        let catalog = self.ctx.catalog;
        let commitments = self.ctx.commitments;
        let mut in_day: HashSet<String> = entries.iter().map(|e| e.subject_id.clone()).collect();
        let mut seen = HashSet::new();

        for entry in entries.iter_mut() {
            if entry.is_lab {
                continue;
            }
            if seen.insert(entry.subject_id.clone()) {
                continue;
            }
            let replacement = catalog
                .theory_subjects()
                .into_iter()
                .filter(|s| !in_day.contains(s.as_str()))
                .find_map(|s| {
                    catalog
                        .eligible_faculty(s)
                        .into_iter()
                        .find(|f| !commitments.is_busy(day, entry.period, f))
                        .map(|f| (s.clone(), f.clone()))
                });
            match replacement {
                Some((subject, faculty)) => {
                    debug!(
                        "{} p{}: repeated {} replaced by {} ({})",
                        day, entry.period, entry.subject_id, subject, faculty
                    );
                    in_day.insert(subject.clone());
                    seen.insert(subject.clone());
                    entry.subject_id = subject;
                    entry.faculty_id = faculty;
                    self.substitutions += 1;
                }
                None => {
                    let message = format!("{} repeats and no unused subject can replace it", entry.subject_id);
                    self.warn(WarningKind::SameDayRepeat, day, Some(entry.period), message);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitments::CommitmentMatrix;
    use crate::data::ScheduleParameters;
    use crate::planner::tests::catalog;

    fn entry(period: Period, subject: &str, faculty: &str) -> Entry {
        Entry {
            period,
            subject_id: subject.into(),
            faculty_id: faculty.into(),
            is_lab: false,
        }
    }

    fn repair(schedule: Schedule, params: &ScheduleParameters, catalog: &AssignmentCatalog, commitments: &CommitmentMatrix) -> Repaired {
        validate_and_repair(schedule, PlanningContext { params, catalog, commitments })
    }

    fn theory_catalog() -> AssignmentCatalog {
        catalog(&[("F1", "MATH"), ("F2", "PHYS"), ("F3", "CHEM"), ("F4", "LAB2")])
    }

    #[test]
    fn test_missing_days_are_added_and_unknown_entries_dropped() {
        let params = ScheduleParameters::new(3, vec![Day::Monday, Day::Tuesday]);
        let catalog = theory_catalog();
        let mut schedule = Schedule::default();
        schedule.days.insert(
            Day::Monday,
            vec![entry(1, "MATH", "F1"), entry(2, "GEOG", "F1"), entry(3, "PHYS", "F9"), entry(7, "CHEM", "F3")],
        );

        let out = repair(schedule, &params, &catalog, &CommitmentMatrix::new());
        assert_eq!(out.schedule.day(Day::Monday), &[entry(1, "MATH", "F1")]);
        assert!(out.schedule.days.contains_key(&Day::Tuesday));
        assert_eq!(out.warnings.len(), 3);
        assert_eq!(out.substitutions, 0);
    }

    #[test]
    fn test_repeat_replaced_with_unused_subject() {
        let params = ScheduleParameters::new(3, vec![Day::Monday]);
        let catalog = theory_catalog();
        let mut schedule = Schedule::default();
        schedule.days.insert(
            Day::Monday,
            vec![entry(1, "MATH", "F1"), entry(2, "PHYS", "F2"), entry(3, "MATH", "F1")],
        );

        let out = repair(schedule, &params, &catalog, &CommitmentMatrix::new());
        assert_eq!(out.schedule.day(Day::Monday)[2], entry(3, "CHEM", "F3"));
        assert_eq!(out.substitutions, 1);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_unrepairable_repeat_is_a_warning() {
        let params = ScheduleParameters::new(4, vec![Day::Monday]);
        let catalog = catalog(&[("F1", "MATH"), ("F2", "PHYS")]);
        let mut schedule = Schedule::default();
        schedule.days.insert(
            Day::Monday,
            vec![entry(1, "MATH", "F1"), entry(2, "PHYS", "F2"), entry(3, "MATH", "F1"), entry(4, "PHYS", "F2")],
        );

        let out = repair(schedule, &params, &catalog, &CommitmentMatrix::new());
        assert_eq!(out.schedule.day(Day::Monday).len(), 4);
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings.iter().all(|w| w.kind == WarningKind::SameDayRepeat));
    }

    #[test]
    fn test_committed_faculty_is_swapped() {
        let params = ScheduleParameters::new(2, vec![Day::Monday]);
        let catalog = catalog(&[("F1", "MATH"), ("F2", "MATH"), ("F3", "PHYS")]);
        let mut commitments = CommitmentMatrix::new();
        commitments.mark_busy(Day::Monday, 1, "F1");
        let mut schedule = Schedule::default();
        schedule.days.insert(Day::Monday, vec![entry(1, "MATH", "F1"), entry(2, "PHYS", "F1")]);

        let out = repair(schedule, &params, &catalog, &commitments);
        let day = out.schedule.day(Day::Monday);
        assert_eq!(day[0].faculty_id, "F2");
        // F1 is not assigned to PHYS
        assert_eq!(day[1].faculty_id, "F3");
        assert_eq!(out.substitutions, 2);
    }

    #[test]
    fn test_non_working_days_dropped_and_lab_flag_normalised() {
        let params = ScheduleParameters::new(2, vec![Day::Monday]);
        let catalog = theory_catalog();
        let mut schedule = Schedule::default();
        schedule.days.insert(Day::Monday, vec![entry(1, "LAB2", "F4"), entry(2, "LAB2", "F4")]);
        schedule.days.insert(Day::Sunday, vec![entry(1, "MATH", "F1")]);

        let out = repair(schedule, &params, &catalog, &CommitmentMatrix::new());
        assert!(!out.schedule.days.contains_key(&Day::Sunday));
        assert!(out.schedule.day(Day::Monday).iter().all(|e| e.is_lab));
        assert_eq!(out.warnings.len(), 1);
    }

    fn lab(period: Period, faculty: &str) -> Entry {
        Entry {
            is_lab: true,
            ..entry(period, "LAB2", faculty)
        }
    }

    #[test]
    fn test_lab_block_shape() {
        let catalog = theory_catalog();
        let mut whole = Schedule::default();
        whole.days.insert(Day::Monday, vec![entry(1, "MATH", "F1"), lab(2, "F4"), lab(3, "F4")]);
        assert!(broken_lab_blocks(&whole, &catalog).is_empty());

        let mut split = Schedule::default();
        split.days.insert(Day::Monday, vec![lab(2, "F4")]);
        split.days.insert(Day::Tuesday, vec![lab(1, "F4")]);
        assert_eq!(broken_lab_blocks(&split, &catalog), vec!["LAB2".to_string()]);

        let mut gapped = Schedule::default();
        gapped.days.insert(Day::Monday, vec![lab(1, "F4"), entry(2, "MATH", "F1"), lab(3, "F4")]);
        assert_eq!(broken_lab_blocks(&gapped, &catalog), vec!["LAB2".to_string()]);

        let mut short = Schedule::default();
        short.days.insert(Day::Monday, vec![lab(1, "F4"), entry(2, "MATH", "F1")]);
        assert_eq!(broken_lab_blocks(&short, &catalog), vec!["LAB2".to_string()]);

        let mut absent = Schedule::default();
        absent.days.insert(Day::Monday, vec![entry(1, "MATH", "F1")]);
        assert_eq!(broken_lab_blocks(&absent, &catalog), vec!["LAB2".to_string()]);
    }

    #[test]
    fn test_lab_block_with_mixed_faculty_is_broken() {
        let catalog = catalog(&[("F4", "LAB2"), ("F5", "LAB2")]);
        let mut schedule = Schedule::default();
        schedule.days.insert(Day::Monday, vec![lab(1, "F4"), lab(2, "F5")]);
        assert_eq!(broken_lab_blocks(&schedule, &catalog), vec!["LAB2".to_string()]);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let params = ScheduleParameters::new(4, vec![Day::Monday, Day::Tuesday]);
        let catalog = theory_catalog();
        let mut commitments = CommitmentMatrix::new();
        commitments.mark_busy(Day::Tuesday, 2, "F3");
        let mut schedule = Schedule::default();
        schedule.days.insert(
            Day::Monday,
            vec![entry(1, "MATH", "F1"), entry(2, "MATH", "F1"), entry(3, "MATH", "F1"), entry(4, "MATH", "F1")],
        );
        schedule.days.insert(Day::Tuesday, vec![entry(2, "CHEM", "F3"), entry(1, "PHYS", "F2")]);

        let first = repair(schedule, &params, &catalog, &commitments);
        let second = repair(first.schedule.clone(), &params, &catalog, &commitments);
        assert_eq!(second.schedule, first.schedule);
        assert_eq!(second.substitutions, 0);
    }
}
