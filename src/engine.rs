use crate::catalog::AssignmentCatalog;
use crate::collaborators::{Directory, ExternalGenerator, ScheduleStore};
use crate::commitments::CommitmentMatrix;
use crate::data::{
    Assignment, CandidateOrigin, ClassId, Day, GenerationOutcome, Period, Schedule, ScheduleParameters,
};
use crate::error::{BatchError, GenerationError};
use crate::external::{CandidateStrategy, ExternalCandidate, LocalPlanners};
use crate::planner::PlanningContext;
use crate::repair::{broken_lab_blocks, validate_and_repair};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Instant;

/// Generates one class's weekly schedule against an explicit commitment
/// snapshot. The snapshot must reflect every schedule persisted so far;
/// callers generating several classes persist each result before building
/// the next snapshot.
pub fn generate(
    params: &ScheduleParameters,
    catalog: &AssignmentCatalog,
    commitments: &CommitmentMatrix,
    external: Option<&dyn ExternalGenerator>,
) -> Result<GenerationOutcome, GenerationError> {
    let start_time = Instant::now();
    validate_parameters(params)?;

    let seed = params.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ctx = PlanningContext {
        params,
        catalog,
        commitments,
    };
    info!(
        "Generating {} day(s) x {} period(s) with seed {}",
        params.working_days.len(),
        params.periods_per_day,
        seed
    );

    let external = external.map(ExternalCandidate::new);
    let mut strategies: Vec<(&dyn CandidateStrategy, CandidateOrigin)> = Vec::new();
    if let Some(external) = external.as_ref() {
        strategies.push((external as &dyn CandidateStrategy, CandidateOrigin::External));
    }
    strategies.push((&LocalPlanners as &dyn CandidateStrategy, CandidateOrigin::Local));

    let mut failure = GenerationError::IncompleteCoverage {
        missing: missing_slots(&Schedule::default(), params),
    };
    for (strategy, source) in strategies {
        debug!("Trying {} strategy", strategy.label());
        let Some(candidate) = strategy.produce_candidate(ctx, &mut rng)? else {
            continue;
        };
        let repaired = validate_and_repair(candidate, ctx);
        let missing = missing_slots(&repaired.schedule, params);
        if !missing.is_empty() {
            warn!(
                "{} candidate leaves {} slot(s) empty after repair, discarding it",
                strategy.label(),
                missing.len()
            );
            failure = GenerationError::IncompleteCoverage { missing };
            continue;
        }
        if let Some(subject) = broken_lab_blocks(&repaired.schedule, catalog).into_iter().next() {
            warn!(
                "{} candidate does not hold {} as one whole block, discarding it",
                strategy.label(),
                subject
            );
            failure = GenerationError::InfeasibleLabPlacement { subject };
            continue;
        }
        info!("Schedule generated by {} strategy in {:.2?}", strategy.label(), start_time.elapsed());
        return Ok(GenerationOutcome {
            schedule: repaired.schedule,
            warnings: repaired.warnings,
            source,
            seed,
        });
    }
    Err(failure)
}

/// Rejects parameters no schedule can satisfy.
pub fn validate_parameters(params: &ScheduleParameters) -> Result<(), GenerationError> {
    if params.periods_per_day == 0 {
        return Err(GenerationError::InvalidParameters(
            "periods per day must be at least 1".to_string(),
        ));
    }
    if params.working_days.is_empty() {
        return Err(GenerationError::InvalidParameters(
            "at least one working day is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    if let Some(day) = params.working_days.iter().find(|d| !seen.insert(**d)) {
        return Err(GenerationError::InvalidParameters(format!(
            "working day {day} listed twice"
        )));
    }
    Ok(())
}

/// Grid slots with no entry, in day then period order.
pub fn missing_slots(schedule: &Schedule, params: &ScheduleParameters) -> Vec<(Day, Period)> {
    let mut days = params.working_days.clone();
    days.sort();
    days.into_iter()
        .flat_map(|day| params.periods().map(move |p| (day, p)))
        .filter(|(day, period)| schedule.entry_at(*day, *period).is_none())
        .collect()
}

/// One class in a batch regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassJob {
    pub class_id: ClassId,
    pub parameters: ScheduleParameters,
    pub assignments: Vec<Assignment>,
}

/// Binds the engine to a store, a directory and an optional external
/// generator.
pub struct TimetableService<S, D> {
    store: S,
    directory: D,
    external: Option<Box<dyn ExternalGenerator + Send + Sync>>,
}

impl<S: ScheduleStore, D: Directory> TimetableService<S, D> {
    pub fn new(store: S, directory: D) -> Self {
        Self {
            store,
            directory,
            external: None,
        }
    }

    pub fn with_external(mut self, generator: Box<dyn ExternalGenerator + Send + Sync>) -> Self {
        self.external = Some(generator);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn set_directory(&mut self, directory: D) {
        self.directory = directory;
    }

    /// Generates without persisting. Other classes' stored schedules are
    /// read fresh on every call.
    pub fn generate_for_class(
        &self,
        class_id: &str,
        params: &ScheduleParameters,
        assignments: &[Assignment],
    ) -> Result<GenerationOutcome, GenerationError> {
        validate_parameters(params)?;
        let catalog = AssignmentCatalog::resolve(assignments, &self.directory)?;
        let commitments = CommitmentMatrix::load(&self.store, class_id, params, &self.directory);
        let external = self.external.as_deref().map(|g| g as &dyn ExternalGenerator);
        generate(params, &catalog, &commitments, external)
    }

    /// Generates and, on success only, persists the schedule.
    pub fn generate_and_persist(
        &mut self,
        class_id: &str,
        params: &ScheduleParameters,
        assignments: &[Assignment],
    ) -> Result<GenerationOutcome, GenerationError> {
        let outcome = self.generate_for_class(class_id, params, assignments)?;
        self.store.persist_schedule(class_id, outcome.schedule.clone());
        info!("Persisted schedule for class {}", class_id);
        Ok(outcome)
    }

    /// Clears every listed class, then regenerates and persists them one at a
    /// time so each sees the schedules persisted before it. On failure the
    /// remaining classes stay cleared; [`BatchError::unscheduled`] lists them.
    pub fn regenerate_all(&mut self, jobs: &[ClassJob]) -> Result<Vec<(ClassId, GenerationOutcome)>, BatchError> {
        for job in jobs {
            self.store.clear_schedule(&job.class_id);
        }
        let mut results = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            match self.generate_and_persist(&job.class_id, &job.parameters, &job.assignments) {
                Ok(outcome) => results.push((job.class_id.clone(), outcome)),
                Err(source) => {
                    let unscheduled: Vec<ClassId> = jobs[index..].iter().map(|j| j.class_id.clone()).collect();
                    warn!(
                        "Batch regeneration stopped at class {}: {}; {} class(es) left without a schedule",
                        job.class_id,
                        source,
                        unscheduled.len()
                    );
                    return Err(BatchError {
                        class_id: job.class_id.clone(),
                        completed: results.into_iter().map(|(id, _)| id).collect(),
                        unscheduled,
                        source,
                    });
                }
            }
        }
        info!("Regenerated {} class schedule(s)", results.len());
        Ok(results)
    }
}
