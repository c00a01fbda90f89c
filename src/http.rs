//! JSON API over [`TodoService`].
//!
//! Mutations run on the blocking pool. A dropped request does not abort the
//! spawned task, so a mutation that already holds the lock always finishes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{Draft, Item, Store, TodoError, TodoService};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared application dependencies.
pub struct AppState<S> {
    pub service: Arc<TodoService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

pub fn router<S: Store + 'static>(service: Arc<TodoService<S>>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/todos", get(list_todos::<S>).post(create_todo::<S>))
        .route("/todos/{id}", put(update_todo::<S>).delete(delete_todo::<S>))
        .with_state(AppState { service })
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    message: &'static str,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn list_todos<S: Store + 'static>(
    State(state): State<AppState<S>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let Query(params) = params?;
    let items = blocking(move || state.service.list(params.completed)).await?;
    Ok(Json(items))
}

async fn create_todo<S: Store + 'static>(
    State(state): State<AppState<S>>,
    draft: Result<Json<Draft>, JsonRejection>,
) -> Result<Json<Item>, ApiError> {
    let Json(draft) = draft?;
    draft.validate()?;
    let item = blocking(move || state.service.create(draft)).await?;
    Ok(Json(item))
}

async fn update_todo<S: Store + 'static>(
    State(state): State<AppState<S>>,
    id: Result<Path<u64>, PathRejection>,
    draft: Result<Json<Draft>, JsonRejection>,
) -> Result<Json<Item>, ApiError> {
    let (Path(id), Json(draft)) = (id?, draft?);
    draft.validate()?;
    let item = blocking(move || state.service.update(id, draft)).await?;
    Ok(Json(item))
}

async fn delete_todo<S: Store + 'static>(
    State(state): State<AppState<S>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Message>, ApiError> {
    let Path(id) = id?;
    blocking(move || state.service.delete(id)).await?;
    Ok(Json(Message {
        message: "To-Do item deleted",
    }))
}

async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(res) => res.map_err(ApiError::from),
        Err(join) => {
            error!(error = %join, "store task did not complete");
            Err(ApiError::internal())
        }
    }
}

// --- Error responses ---

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: "Internal server error".into(),
        }
    }
}

impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                detail: "To-Do item not found".into(),
            },
            TodoError::Invalid(msg) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                detail: msg,
            },
            server @ (TodoError::StorageCorrupt { .. }
            | TodoError::StorageUnavailable { .. }
            | TodoError::IdsExhausted(_)) => {
                error!(code = server.code(), error = %server, "request failed on the server side");
                Self::internal()
            }
        }
    }
}

// axum's own rejections carry a status and a plain-text reason; re-wrap
// them so every error body has the same `{"detail": ...}` shape.
macro_rules! from_rejection {
    ($($rejection:ty),+) => {$(
        impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                Self {
                    status: rejection.status(),
                    detail: rejection.body_text(),
                }
            }
        }
    )+};
}

from_rejection!(JsonRejection, QueryRejection, PathRejection);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}
