use crate::data::{ClassId, Day, Period, SubjectId};
use itertools::Itertools;
use std::fmt;
use thiserror::Error;

/// What kind of identifier failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Faculty,
    Subject,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Faculty => f.write_str("faculty"),
            ReferenceKind::Subject => f.write_str("subject"),
        }
    }
}

/// Errors that abort a generation call. Nothing is persisted when one occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("unknown {kind} reference: {id}")]
    UnknownReference { kind: ReferenceKind, id: String },
    #[error("invalid schedule parameters: {0}")]
    InvalidParameters(String),
    #[error("no feasible block found for lab subject {subject}")]
    InfeasibleLabPlacement { subject: SubjectId },
    #[error("schedule is incomplete, unfilled slots: {}", format_slots(.missing))]
    IncompleteCoverage { missing: Vec<(Day, Period)> },
}

impl GenerationError {
    /// True when the caller supplied bad input rather than an unsatisfiable setup.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            GenerationError::UnknownReference { .. } | GenerationError::InvalidParameters(_)
        )
    }
}

fn format_slots(slots: &[(Day, Period)]) -> String {
    slots
        .iter()
        .map(|(day, period)| format!("{day} p{period}"))
        .join(", ")
}

/// A batch regeneration stopped at the first class that failed.
///
/// Every class in the batch is cleared before the first one is generated, so
/// the failing class and every class after it are left with no stored
/// schedule. Their previous schedules are not restored: the classes already
/// regenerated were planned without them and could clash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("generation failed for class {class_id}: {source}")]
pub struct BatchError {
    pub class_id: ClassId,
    /// Classes persisted before the failure.
    pub completed: Vec<ClassId>,
    /// Classes whose schedule was cleared and not regenerated, the failing
    /// class included.
    pub unscheduled: Vec<ClassId>,
    #[source]
    pub source: GenerationError,
}

/// Failures of the external generative collaborator. Never fatal.
#[derive(Error, Debug)]
pub enum ExternalCollaboratorError {
    #[error("external generator unavailable: {0}")]
    Unavailable(String),
    #[error("external generator returned an unparseable reply: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("external generator reply does not match the schedule shape: {0}")]
    Schema(String),
}
