use super::PlannerState;
use crate::data::{Day, FacultyId, Period, SubjectId};
use crate::error::GenerationError;
use log::{debug, trace, warn};
use rand::Rng;
use rand::seq::SliceRandom;

/// A contiguous block a lab subject could occupy.
#[derive(Debug, Clone)]
struct LabBlock {
    day: Day,
    start: Period,
    faculty: Vec<FacultyId>,
    rank: (u8, Period, usize, usize),
}

/// Places every lab subject exactly once as a contiguous block, shortest
/// first. Returns the number of periods the labs consumed.
pub fn place_labs<R: Rng + ?Sized>(state: &mut PlannerState<'_>, rng: &mut R) -> Result<u32, GenerationError> {
    let catalog = state.catalog();
    let params = state.params();

    let mut labs: Vec<(&SubjectId, u32)> = catalog
        .lab_subjects()
        .into_iter()
        .map(|id| (id, catalog.subject(id).map(|s| s.block_len()).unwrap_or(1)))
        .collect();
    // shuffle then stable-sort so equal durations come out in random order
    labs.shuffle(rng);
    labs.sort_by_key(|(_, duration)| *duration);

    let mut days = params.working_days.clone();
    let mut consumed = 0;
    for (subject, duration) in labs {
        days.shuffle(rng);
        let Some(block) = best_block(state, subject, duration, &days) else {
            warn!("No feasible {}-period block for lab {}", duration, subject);
            return Err(GenerationError::InfeasibleLabPlacement {
                subject: subject.clone(),
            });
        };

        let faculty = match block.faculty.choose(rng) {
            Some(f) => f.clone(),
            None => {
                return Err(GenerationError::InfeasibleLabPlacement {
                    subject: subject.clone(),
                });
            }
        };
        for period in block.start..block.start + duration {
            state.place(block.day, period, subject, &faculty, true);
        }
        consumed += duration;
        debug!(
            "Lab {} placed on {} p{}..p{} with {}",
            subject,
            block.day,
            block.start,
            block.start + duration - 1,
            faculty
        );
    }
    Ok(consumed)
}

/// Highest-ranked block for `subject`: afternoon starts first, then the
/// earliest start, then days carrying fewer labs, then the given day order.
fn best_block(state: &PlannerState<'_>, subject: &str, duration: u32, days: &[Day]) -> Option<LabBlock> {
    let params = state.params();
    if duration == 0 || duration > params.periods_per_day {
        return None;
    }
    let threshold = params.afternoon_threshold();
    let eligible = state.catalog().eligible_faculty(subject);

    let mut candidates = Vec::new();
    for (day_rank, &day) in days.iter().enumerate() {
        if state.used_on(day, subject) {
            continue;
        }
        let labs_today = state.labs_on(day);
        for start in 1..=params.periods_per_day - duration + 1 {
            let block = start..start + duration;
            if !block.clone().all(|p| state.is_free(day, p)) {
                continue;
            }
            let faculty: Vec<FacultyId> = eligible
                .iter()
                .filter(|f| block.clone().all(|p| state.is_available(day, p, f)))
                .map(|f| (*f).clone())
                .collect();
            if faculty.is_empty() {
                trace!("Lab {} has no free faculty on {} from p{}", subject, day, start);
                continue;
            }
            let tier = if start >= threshold { 0 } else { 1 };
            candidates.push(LabBlock {
                day,
                start,
                faculty,
                rank: (tier, start, labs_today, day_rank),
            });
        }
    }
    trace!("Lab {} has {} candidate block(s)", subject, candidates.len());
    candidates.into_iter().min_by_key(|c| c.rank)
}
