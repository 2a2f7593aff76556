//! Narrow interfaces to the systems the engine does not own: schedule
//! persistence, the faculty/subject directory and the external generator.
//!
//! The in-memory implementations back the HTTP surface and the tests.

use crate::data::{ClassId, FacultyId, FacultyRecord, PersistedSchedule, Schedule, SubjectId, SubjectRecord};
use crate::error::ExternalCollaboratorError;
use crate::external::CandidateRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted schedules of every class in the institution.
pub trait ScheduleStore {
    /// Every stored schedule except the one identified by `exclude_id`.
    fn load_other_schedules(&self, exclude_id: &str) -> Vec<PersistedSchedule>;

    fn schedule(&self, class_id: &str) -> Option<Schedule>;

    fn persist_schedule(&mut self, class_id: &str, schedule: Schedule);

    /// Removes the stored schedule, returning whether one existed.
    fn clear_schedule(&mut self, class_id: &str) -> bool;
}

/// Resolves opaque identifiers to records.
pub trait Directory {
    fn resolve_faculty(&self, id: &str) -> Option<FacultyRecord>;

    fn resolve_subject(&self, id: &str) -> Option<SubjectRecord>;
}

/// A generative service that proposes whole schedules as JSON text.
pub trait ExternalGenerator {
    fn generate(&self, request: &CandidateRequest) -> Result<String, ExternalCollaboratorError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    schedules: BTreeMap<ClassId, Schedule>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

impl ScheduleStore for InMemoryStore {
    fn load_other_schedules(&self, exclude_id: &str) -> Vec<PersistedSchedule> {
        self.schedules
            .iter()
            .filter(|(id, _)| id.as_str() != exclude_id)
            .map(|(id, schedule)| PersistedSchedule {
                id: id.clone(),
                schedule: schedule.clone(),
            })
            .collect()
    }

    fn schedule(&self, class_id: &str) -> Option<Schedule> {
        self.schedules.get(class_id).cloned()
    }

    fn persist_schedule(&mut self, class_id: &str, schedule: Schedule) {
        self.schedules.insert(class_id.to_string(), schedule);
    }

    fn clear_schedule(&mut self, class_id: &str) -> bool {
        self.schedules.remove(class_id).is_some()
    }
}

/// Faculty and subject records, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InMemoryDirectory {
    pub faculty: BTreeMap<FacultyId, FacultyRecord>,
    pub subjects: BTreeMap<SubjectId, SubjectRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faculty(mut self, id: impl Into<FacultyId>, record: FacultyRecord) -> Self {
        self.faculty.insert(id.into(), record);
        self
    }

    pub fn with_subject(mut self, id: impl Into<SubjectId>, record: SubjectRecord) -> Self {
        self.subjects.insert(id.into(), record);
        self
    }
}

impl Directory for InMemoryDirectory {
    fn resolve_faculty(&self, id: &str) -> Option<FacultyRecord> {
        self.faculty.get(id).cloned()
    }

    fn resolve_subject(&self, id: &str) -> Option<SubjectRecord> {
        self.subjects.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_excludes_requested_schedule() {
        let mut store = InMemoryStore::new();
        store.persist_schedule("A", Schedule::default());
        store.persist_schedule("B", Schedule::default());

        let others = store.load_other_schedules("A");
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, "B");

        assert!(store.clear_schedule("B"));
        assert!(!store.clear_schedule("B"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_directory_from_json() {
        let json = r#"{
            "faculty": { "F1": { "name": "Ada", "code": "CS01" } },
            "subjects": {
                "S1": { "name": "Algebra" },
                "L1": { "name": "Physics Lab", "isLab": true, "duration": 3 }
            }
        }"#;
        let dir: InMemoryDirectory = serde_json::from_str(json).unwrap();
        assert_eq!(dir.resolve_faculty("F1").unwrap().code, "CS01");
        assert_eq!(dir.resolve_subject("S1").unwrap().block_len(), 1);
        assert_eq!(dir.resolve_subject("L1").unwrap().block_len(), 3);
        assert!(dir.resolve_subject("missing").is_none());
    }
}
