//! Resolves caller assignments into subject and faculty records and indexes
//! them both ways.

use crate::collaborators::Directory;
use crate::data::{Assignment, FacultyId, FacultyRecord, SubjectId, SubjectRecord};
use crate::error::{GenerationError, ReferenceKind};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct AssignmentCatalog {
    subjects: BTreeMap<SubjectId, SubjectRecord>,
    faculty: BTreeMap<FacultyId, FacultyRecord>,
    subjects_by_faculty: BTreeMap<FacultyId, BTreeSet<SubjectId>>,
    faculty_by_subject: BTreeMap<SubjectId, BTreeSet<FacultyId>>,
}

impl AssignmentCatalog {
    /// Fails with `UnknownReference` on the first identifier the directory
    /// cannot resolve.
    pub fn resolve<D>(assignments: &[Assignment], directory: &D) -> Result<Self, GenerationError>
    where
        D: Directory + ?Sized,
    {
        let mut catalog = Self::default();
        for assignment in assignments {
            if !catalog.faculty.contains_key(&assignment.faculty_id) {
                let record = directory.resolve_faculty(&assignment.faculty_id).ok_or_else(|| {
                    GenerationError::UnknownReference {
                        kind: ReferenceKind::Faculty,
                        id: assignment.faculty_id.clone(),
                    }
                })?;
                catalog.faculty.insert(assignment.faculty_id.clone(), record);
            }
            if !catalog.subjects.contains_key(&assignment.subject_id) {
                let record = directory.resolve_subject(&assignment.subject_id).ok_or_else(|| {
                    GenerationError::UnknownReference {
                        kind: ReferenceKind::Subject,
                        id: assignment.subject_id.clone(),
                    }
                })?;
                catalog.subjects.insert(assignment.subject_id.clone(), record);
            }
            catalog
                .subjects_by_faculty
                .entry(assignment.faculty_id.clone())
                .or_default()
                .insert(assignment.subject_id.clone());
            catalog
                .faculty_by_subject
                .entry(assignment.subject_id.clone())
                .or_default()
                .insert(assignment.faculty_id.clone());
        }
        debug!(
            "Catalog resolved {} assignment(s): {} subject(s), {} faculty",
            assignments.len(),
            catalog.subjects.len(),
            catalog.faculty.len()
        );
        Ok(catalog)
    }

    pub fn subject(&self, id: &str) -> Option<&SubjectRecord> {
        self.subjects.get(id)
    }

    pub fn faculty(&self, id: &str) -> Option<&FacultyRecord> {
        self.faculty.get(id)
    }

    pub fn faculty_ids(&self) -> impl Iterator<Item = &FacultyId> {
        self.faculty.keys()
    }

    pub fn subjects(&self) -> impl Iterator<Item = (&SubjectId, &SubjectRecord)> {
        self.subjects.iter()
    }

    pub fn subjects_of(&self, faculty: &str) -> impl Iterator<Item = &SubjectId> {
        self.subjects_by_faculty.get(faculty).into_iter().flatten()
    }

    pub fn is_eligible(&self, faculty: &str, subject: &str) -> bool {
        self.faculty_by_subject
            .get(subject)
            .is_some_and(|set| set.contains(faculty))
    }

    /// Faculty eligible for `subject`, ordered by faculty code then id.
    pub fn eligible_faculty(&self, subject: &str) -> Vec<&FacultyId> {
        let mut eligible: Vec<&FacultyId> = self
            .faculty_by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .collect();
        eligible.sort_by(|a, b| {
            let code_a = self.faculty.get(*a).map(|f| f.code.as_str()).unwrap_or_default();
            let code_b = self.faculty.get(*b).map(|f| f.code.as_str()).unwrap_or_default();
            code_a.cmp(code_b).then_with(|| a.cmp(b))
        });
        eligible
    }

    /// Lab subject ids in id order.
    pub fn lab_subjects(&self) -> Vec<&SubjectId> {
        self.subjects
            .iter()
            .filter(|(_, s)| s.is_lab)
            .map(|(id, _)| id)
            .collect()
    }

    /// Theory subject ids in id order.
    pub fn theory_subjects(&self) -> Vec<&SubjectId> {
        self.subjects
            .iter()
            .filter(|(_, s)| !s.is_lab)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}
