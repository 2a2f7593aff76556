//! Candidate strategies: an external generative collaborator, and the local
//! planners it falls back to.

use crate::collaborators::ExternalGenerator;
use crate::commitments::BusySlot;
use crate::data::{Day, FacultyId, Guidelines, Schedule, SubjectId};
use crate::error::{ExternalCollaboratorError, GenerationError};
use crate::planner::{PlanningContext, plan_local};
use log::{info, warn};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// One assignment with the details the collaborator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetail {
    pub faculty_id: FacultyId,
    pub faculty_name: String,
    pub faculty_code: String,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub is_lab: bool,
    pub duration: u32,
}

/// What the external collaborator is asked to schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRequest {
    pub working_days: Vec<Day>,
    pub periods_per_day: u32,
    pub guidelines: Guidelines,
    pub assignments: Vec<AssignmentDetail>,
    pub busy_faculty: Vec<BusySlot>,
}

impl CandidateRequest {
    pub fn from_context(ctx: PlanningContext<'_>) -> Self {
        let catalog = ctx.catalog;
        let mut assignments = Vec::new();
        for (subject_id, subject) in catalog.subjects() {
            for faculty_id in catalog.eligible_faculty(subject_id) {
                let (faculty_name, faculty_code) = catalog
                    .faculty(faculty_id)
                    .map(|f| (f.name.clone(), f.code.clone()))
                    .unwrap_or_default();
                assignments.push(AssignmentDetail {
                    faculty_id: faculty_id.clone(),
                    faculty_name,
                    faculty_code,
                    subject_id: subject_id.clone(),
                    subject_name: subject.name.clone(),
                    is_lab: subject.is_lab,
                    duration: subject.block_len(),
                });
            }
        }
        Self {
            working_days: ctx.params.working_days.clone(),
            periods_per_day: ctx.params.periods_per_day,
            guidelines: ctx.params.guidelines.clone(),
            assignments,
            busy_faculty: ctx.commitments.busy_slots(),
        }
    }
}

/// A way of producing a candidate schedule. `Ok(None)` means "no candidate,
/// try the next strategy"; errors abort the generation call.
pub trait CandidateStrategy {
    fn label(&self) -> &'static str;

    fn produce_candidate(
        &self,
        ctx: PlanningContext<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<Schedule>, GenerationError>;
}

/// The greedy lab and theory planners.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPlanners;

impl CandidateStrategy for LocalPlanners {
    fn label(&self) -> &'static str {
        "local"
    }

    fn produce_candidate(
        &self,
        ctx: PlanningContext<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<Schedule>, GenerationError> {
        plan_local(ctx, rng).map(Some)
    }
}

/// Wraps an [`ExternalGenerator`]. Every failure becomes `Ok(None)`.
pub struct ExternalCandidate<'g, G: ExternalGenerator + ?Sized> {
    generator: &'g G,
}

impl<'g, G: ExternalGenerator + ?Sized> ExternalCandidate<'g, G> {
    pub fn new(generator: &'g G) -> Self {
        Self { generator }
    }

    fn request(&self, ctx: PlanningContext<'_>) -> Result<Schedule, ExternalCollaboratorError> {
        let request = CandidateRequest::from_context(ctx);
        let reply = self.generator.generate(&request)?;
        parse_candidate(&reply)
    }
}

impl<G: ExternalGenerator + ?Sized> CandidateStrategy for ExternalCandidate<'_, G> {
    fn label(&self) -> &'static str {
        "external"
    }

    fn produce_candidate(
        &self,
        ctx: PlanningContext<'_>,
        _rng: &mut ChaCha8Rng,
    ) -> Result<Option<Schedule>, GenerationError> {
        match self.request(ctx) {
            Ok(schedule) => {
                info!("External generator proposed {} entries", schedule.len());
                Ok(Some(schedule))
            }
            Err(e) => {
                warn!("External generator failed, falling back to local planners: {}", e);
                Ok(None)
            }
        }
    }
}

/// Parses `day -> [{period, subjectId, facultyId, isLab}]`, tolerating a
/// surrounding Markdown code fence.
pub fn parse_candidate(reply: &str) -> Result<Schedule, ExternalCollaboratorError> {
    let body = strip_code_fence(reply);
    if body.is_empty() {
        return Err(ExternalCollaboratorError::Schema("empty reply".to_string()));
    }
    let schedule: Schedule = serde_json::from_str(body)?;
    if schedule.is_empty() {
        return Err(ExternalCollaboratorError::Schema("reply contains no entries".to_string()));
    }
    Ok(schedule)
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag line, e.g. ```json
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitments::CommitmentMatrix;
    use crate::data::ScheduleParameters;
    use crate::planner::tests::catalog;
    use rand::SeedableRng;
    use std::cell::RefCell;

    struct Canned {
        reply: Result<String, String>,
        seen: RefCell<Option<CandidateRequest>>,
    }

    impl ExternalGenerator for Canned {
        fn generate(&self, request: &CandidateRequest) -> Result<String, ExternalCollaboratorError> {
            *self.seen.borrow_mut() = Some(request.clone());
            self.reply.clone().map_err(ExternalCollaboratorError::Unavailable)
        }
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"monday\": [{\"period\": 1, \"subjectId\": \"MATH\", \"facultyId\": \"F1\", \"isLab\": false}]}\n```";
        let schedule = parse_candidate(reply).unwrap();
        assert_eq!(schedule.day(Day::Monday)[0].subject_id, "MATH");
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(matches!(
            parse_candidate("{\"monday\": \"MATH\"}"),
            Err(ExternalCollaboratorError::Parse(_))
        ));
        assert!(matches!(parse_candidate("  "), Err(ExternalCollaboratorError::Schema(_))));
        assert!(matches!(parse_candidate("{}"), Err(ExternalCollaboratorError::Schema(_))));
    }

    #[test]
    fn test_failure_yields_no_candidate() {
        let params = ScheduleParameters::new(2, vec![Day::Monday]);
        let catalog = catalog(&[("F1", "MATH")]);
        let commitments = CommitmentMatrix::new();
        let ctx = PlanningContext { params: &params, catalog: &catalog, commitments: &commitments };
        let generator = Canned {
            reply: Err("connection refused".into()),
            seen: RefCell::new(None),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let candidate = ExternalCandidate::new(&generator).produce_candidate(ctx, &mut rng).unwrap();
        assert!(candidate.is_none());
    }

    #[test]
    fn test_request_carries_details_and_commitments() {
        let params = ScheduleParameters::new(6, vec![Day::Monday, Day::Friday]);
        let catalog = catalog(&[("F1", "MATH"), ("F2", "LAB2")]);
        let mut commitments = CommitmentMatrix::new();
        commitments.mark_busy(Day::Friday, 2, "F1");
        let ctx = PlanningContext { params: &params, catalog: &catalog, commitments: &commitments };
        let generator = Canned {
            reply: Ok("{\"monday\": []}".into()),
            seen: RefCell::new(None),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        // an empty day map is a schema mismatch
        let candidate = ExternalCandidate::new(&generator).produce_candidate(ctx, &mut rng).unwrap();
        assert!(candidate.is_none());

        let request = generator.seen.borrow().clone().unwrap();
        assert_eq!(request.periods_per_day, 6);
        assert_eq!(request.assignments.len(), 2);
        let lab = request.assignments.iter().find(|a| a.subject_id == "LAB2").unwrap();
        assert!(lab.is_lab);
        assert_eq!(lab.duration, 2);
        assert_eq!(lab.faculty_code, "C02");
        assert_eq!(request.busy_faculty.len(), 1);
    }
}
