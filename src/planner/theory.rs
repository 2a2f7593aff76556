use super::PlannerState;
use crate::data::{Day, FacultyId, Period, SubjectId};
use crate::error::GenerationError;
use log::{debug, info, trace, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Reverse;
use std::collections::HashMap;

/// A theory subject that can take the slot, with its free faculty.
struct SlotOption<'s> {
    subject: &'s SubjectId,
    faculty: Vec<FacultyId>,
}

/// Fills every slot the labs left empty with theory subjects, balancing weekly
/// load. Fails with `IncompleteCoverage` rather than return a gapped grid.
pub fn fill_theory<R: Rng + ?Sized>(state: &mut PlannerState<'_>, rng: &mut R) -> Result<(), GenerationError> {
    let catalog = state.catalog();
    let params = state.params();
    let guidelines = &params.guidelines;

    let mut subjects = catalog.theory_subjects();
    subjects.shuffle(rng);

    let theory_slots = params.total_slots().saturating_sub(state.occupied());
    let target = weekly_target(theory_slots, subjects.len());
    let mut remaining: HashMap<&SubjectId, u32> = subjects.iter().map(|s| (*s, target)).collect();
    info!(
        "Distributing {} theory slot(s) over {} subject(s), weekly target {}",
        theory_slots,
        subjects.len(),
        target
    );

    if let Some(pinned) = &guidelines.pinned_slot {
        let last = params.periods_per_day;
        let keyword = pinned.keyword.to_lowercase();
        let subject = catalog.theory_subjects().into_iter().find(|id| {
            !keyword.is_empty()
                && catalog
                    .subject(id)
                    .is_some_and(|s| s.name.to_lowercase().contains(&keyword))
        });
        match subject {
            Some(subject) if params.working_days.contains(&pinned.day) && state.is_free(pinned.day, last) => {
                match state.available_faculty(pinned.day, last, subject).first() {
                    Some(faculty) => {
                        state.place(pinned.day, last, subject, faculty, false);
                        if let Some(left) = remaining.get_mut(subject) {
                            *left = left.saturating_sub(1);
                        }
                        debug!("Pinned {} to {} p{} with {}", subject, pinned.day, last, faculty);
                    }
                    None => info!("Pinned slot skipped: no free faculty for {} on {} p{}", subject, pinned.day, last),
                }
            }
            Some(subject) => info!("Pinned slot skipped: {} p{} unavailable for {}", pinned.day, last, subject),
            None => info!("Pinned slot skipped: no theory subject matches '{}'", pinned.keyword),
        }
    }

    let mut days = params.working_days.clone();
    days.shuffle(rng);
    for day in days {
        for period in params.periods() {
            if !state.is_free(day, period) {
                continue;
            }
            let options: Vec<SlotOption<'_>> = subjects
                .iter()
                .map(|s| SlotOption {
                    subject: *s,
                    faculty: state.available_faculty(day, period, s),
                })
                .filter(|o| !o.faculty.is_empty())
                .collect();
            let choice = choose_subject(state, day, period, &options, &remaining, guidelines.allow_same_day_repeat);

            let Some(option) = choice else {
                trace!("No theory subject can take {} p{}", day, period);
                continue;
            };
            let faculty = pick_faculty(state, day, period, &option.faculty, guidelines.minimize_consecutive_faculty);
            let subject = option.subject;
            state.place(day, period, subject, &faculty, false);
            if let Some(left) = remaining.get_mut(subject) {
                *left = left.saturating_sub(1);
            }
            trace!("{} p{} -> {} ({})", day, period, subject, faculty);
        }
    }

    let missing = state.empty_slots();
    if !missing.is_empty() {
        warn!("{} slot(s) left unfilled", missing.len());
        return Err(GenerationError::IncompleteCoverage { missing });
    }
    Ok(())
}

/// Per-subject weekly target: an even share of the theory slots, never below 3.
fn weekly_target(theory_slots: u32, subject_count: usize) -> u32 {
    if subject_count == 0 {
        return 0;
    }
    (theory_slots / subject_count as u32).max(3)
}

/// Picks the subject for one slot from those with a free faculty member.
///
/// A subject is fresh when it is not yet used that day and did not take the
/// previous period. Fresh subjects with target left come first, highest
/// remaining target winning; then any fresh subject, fewest weekly placements
/// winning. Only then, if allowed, a same-day repeat.
fn choose_subject<'o, 's>(
    state: &PlannerState<'_>,
    day: Day,
    period: Period,
    options: &'o [SlotOption<'s>],
    remaining: &HashMap<&SubjectId, u32>,
    allow_repeat: bool,
) -> Option<&'o SlotOption<'s>> {
    let previous = state.entry_at(day, period.saturating_sub(1)).map(|e| e.subject_id.as_str());
    let left = |o: &SlotOption<'_>| remaining.get(o.subject).copied().unwrap_or(0);
    let fresh = |o: &&SlotOption<'_>| !state.used_on(day, o.subject) && previous != Some(o.subject.as_str());

    options
        .iter()
        .filter(fresh)
        .filter(|o| left(*o) > 0)
        .min_by_key(|o| Reverse(left(*o)))
        .or_else(|| options.iter().filter(fresh).min_by_key(|o| state.weekly_count(o.subject)))
        .or_else(|| {
            if !allow_repeat {
                return None;
            }
            let pick = options
                .iter()
                .min_by_key(|o| (previous == Some(o.subject.as_str()), state.weekly_count(o.subject)));
            if let Some(o) = pick {
                warn!("Repeating {} on {} p{} to avoid an empty slot", o.subject, day, period);
            }
            pick
        })
}

/// First free faculty, preferring one who did not teach the previous period
/// when asked to.
fn pick_faculty(
    state: &PlannerState<'_>,
    day: Day,
    period: Period,
    faculty: &[FacultyId],
    avoid_consecutive: bool,
) -> FacultyId {
    if avoid_consecutive {
        let previous = state.entry_at(day, period.saturating_sub(1)).map(|e| e.faculty_id.as_str());
        if let Some(f) = faculty.iter().find(|f| Some(f.as_str()) != previous) {
            return f.clone();
        }
    }
    faculty[0].clone()
}
