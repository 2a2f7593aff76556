//! Weekly timetable generation for school and college classes.
//!
//! A generation call resolves the caller's (faculty, subject) assignments,
//! snapshots which faculty other classes already occupy, and then either
//! accepts a repaired candidate from an external generator or builds one
//! locally: labs first as contiguous blocks, then theory subjects across the
//! remaining slots. Every candidate goes through the same repair pass.

pub mod catalog;
pub mod collaborators;
pub mod commitments;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod external;
pub mod planner;
pub mod repair;
pub mod server;

pub use catalog::AssignmentCatalog;
pub use commitments::CommitmentMatrix;
pub use engine::{TimetableService, generate};
pub use error::GenerationError;
