use crate::collaborators::{InMemoryDirectory, InMemoryStore, ScheduleStore};
use crate::config::Config;
use crate::data::{Assignment, ClassId, GenerationOutcome, Schedule, ScheduleParameters};
use crate::engine::{ClassJob, TimetableService};
use crate::error::GenerationError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One lock around store and engine: generations never overlap, so each sees
/// every schedule persisted before it.
pub type SharedService = Arc<Mutex<TimetableService<InMemoryStore, InMemoryDirectory>>>;

type ApiError = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    parameters: ScheduleParameters,
    assignments: Vec<Assignment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassOutcome {
    class_id: ClassId,
    #[serde(flatten)]
    outcome: GenerationOutcome,
}

fn generation_error(e: &GenerationError) -> ApiError {
    let status = if e.is_caller_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(json!({ "error": e.to_string() })))
}

async fn put_directory(
    State(service): State<SharedService>,
    Json(directory): Json<InMemoryDirectory>,
) -> Json<Value> {
    let summary = json!({
        "faculty": directory.faculty.len(),
        "subjects": directory.subjects.len(),
    });
    service.lock().await.set_directory(directory);
    info!("Directory replaced: {}", summary);
    Json(summary)
}

async fn generate_handler(
    State(service): State<SharedService>,
    Path(class_id): Path<ClassId>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerationOutcome>, ApiError> {
    let mut service = service.lock().await;
    match service.generate_and_persist(&class_id, &request.parameters, &request.assignments) {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            warn!("Generation for class {} failed: {}", class_id, e);
            Err(generation_error(&e))
        }
    }
}

async fn get_handler(
    State(service): State<SharedService>,
    Path(class_id): Path<ClassId>,
) -> Result<Json<Schedule>, ApiError> {
    let service = service.lock().await;
    service.store().schedule(&class_id).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no timetable for class {class_id}") })),
        )
    })
}

async fn delete_handler(State(service): State<SharedService>, Path(class_id): Path<ClassId>) -> StatusCode {
    if service.lock().await.store_mut().clear_schedule(&class_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn regenerate_handler(
    State(service): State<SharedService>,
    Json(jobs): Json<Vec<ClassJob>>,
) -> Result<Json<Vec<ClassOutcome>>, ApiError> {
    let mut service = service.lock().await;
    match service.regenerate_all(&jobs) {
        Ok(results) => Ok(Json(
            results
                .into_iter()
                .map(|(class_id, outcome)| ClassOutcome { class_id, outcome })
                .collect(),
        )),
        Err(e) => {
            let (status, _) = generation_error(&e.source);
            Err((
                status,
                Json(json!({
                    "error": e.to_string(),
                    "classId": e.class_id,
                    "completed": e.completed,
                    "unscheduled": e.unscheduled,
                })),
            ))
        }
    }
}

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/v1/directory", put(put_directory))
        .route(
            "/v1/classes/:class_id/timetable",
            post(generate_handler).get(get_handler).delete(delete_handler),
        )
        .route("/v1/timetable/regenerate", post(regenerate_handler))
        .with_state(service)
}

pub async fn run_server(config: &Config, directory: InMemoryDirectory) -> std::io::Result<()> {
    let service = TimetableService::new(InMemoryStore::new(), directory);
    let app = router(Arc::new(Mutex::new(service)));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
