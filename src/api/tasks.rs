//! Task board API endpoints.
//!
//! - List visible tasks (optionally under an explicit filter)
//! - Create, edit, delete, complete
//! - Stream visible rows as they change

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post, put},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;

use crate::board::{BoardError, TaskRow};
use crate::filter::FilterSelector;
use crate::task::{Deadline, TaskId, TaskPatch};

use super::routes::AppState;

/// Create task routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/stream", get(stream_tasks))
        .route("/:id", put(update_task).delete(delete_task))
        .route("/:id/complete", post(complete_task))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
}

/// Body for create and update. Deadline text is kept as sent.
#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

impl From<TaskRequest> for TaskPatch {
    fn from(req: TaskRequest) -> Self {
        TaskPatch::new(
            req.subject,
            req.name,
            req.deadline.as_deref().and_then(Deadline::parse),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub filter: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

type ApiError = (StatusCode, String);

fn board_error(e: BoardError) -> ApiError {
    let status = match &e {
        BoardError::NotFound(_) => StatusCode::NOT_FOUND,
        BoardError::RemoteUnavailable(_) => StatusCode::BAD_GATEWAY,
        BoardError::Conflict(_) => StatusCode::CONFLICT,
    };
    (status, e.to_string())
}

fn parse_filter(raw: &str) -> Result<FilterSelector, ApiError> {
    raw.parse()
        .map_err(|e: crate::filter::UnknownFilter| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// GET /api/tasks - Visible tasks.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TaskRow>>, ApiError> {
    let rows = match query.filter.as_deref() {
        Some(raw) => state.board.visible_with(parse_filter(raw)?).await,
        None => state.board.visible().await,
    };
    Ok(Json(rows))
}

/// PUT /api/filter - Change the board's filter.
pub async fn set_filter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FilterRequest>,
) -> Result<Json<Vec<TaskRow>>, ApiError> {
    let selector = parse_filter(&req.filter)?;
    Ok(Json(state.board.select_filter(selector).await))
}

/// POST /api/tasks - Create a task.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TaskRequest>,
) -> Result<(StatusCode, Json<TaskRow>), ApiError> {
    let row = state
        .board
        .add_task(req.into())
        .await
        .map_err(board_error)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/tasks/:id - Edit subject, name and deadline.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<TaskRow>, ApiError> {
    let row = state
        .board
        .edit_task(&TaskId::new(id), req.into())
        .await
        .map_err(board_error)?;
    Ok(Json(row))
}

/// DELETE /api/tasks/:id
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .board
        .delete_task(&TaskId::new(id))
        .await
        .map_err(board_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/:id/complete
async fn complete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskRow>, ApiError> {
    let row = state
        .board
        .complete_task(&TaskId::new(id))
        .await
        .map_err(board_error)?;
    Ok(Json(row))
}

/// GET /api/tasks/stream - Visible rows whenever they change.
///
/// Wakes on every tick and every board mutation, but only emits when the
/// store revision or the filter moved since the last event.
async fn stream_tasks(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let board = Arc::clone(&state.board);
    let mut ticks = state.ticks.clone();
    let mut changes = board.subscribe_changes();

    let stream = async_stream::stream! {
        let mut last_sent: Option<(u64, FilterSelector)> = None;

        loop {
            let current = (board.revision().await, board.selector().await);
            if last_sent != Some(current) {
                let rows = board.visible().await;
                match Event::default().event("tasks").json_data(&rows) {
                    Ok(event) => yield Ok(event),
                    Err(e) => tracing::warn!("Failed to encode task event: {}", e),
                }
                last_sent = Some(current);
            }

            tokio::select! {
                res = ticks.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
                res = changes.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
