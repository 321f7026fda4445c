//! In-memory stand-in for the task backend.
//!
//! Serves the user-scoped task routes, a health probe and the session
//! library's auth routes. Error bodies follow the real services: task routes
//! answer `{"detail": ...}` and auth routes answer `{"message", "code"}`.

pub mod auth;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MAX_TITLE_LENGTH: usize = 200;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub total: usize,
}

#[derive(Deserialize)]
pub struct TaskCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Task>>>;

#[derive(Clone, Default)]
pub struct AppState {
    pub tasks: Db,
    pub auth: auth::AuthStore,
}

/// Failure of a task route, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    detail: Value,
}

impl ApiFailure {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: Value::from("Task not found"),
        }
    }

    fn invalid_title(kind: &str, msg: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: json!([{ "type": kind, "loc": ["body", "title"], "msg": msg }]),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/{user_id}/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/{user_id}/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/{user_id}/tasks/{task_id}/complete", patch(toggle_complete))
        .merge(auth::routes())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn check_title(title: &str) -> Result<(), ApiFailure> {
    if title.trim().is_empty() {
        return Err(ApiFailure::invalid_title(
            "string_too_short",
            "String should have at least 1 character",
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiFailure::invalid_title(
            "string_too_long",
            "String should have at most 200 characters",
        ));
    }
    Ok(())
}

async fn list_tasks(State(state): State<AppState>, Path(user_id): Path<Uuid>) -> Json<TaskList> {
    let db = state.tasks.read().await;
    let mut tasks: Vec<Task> = db.values().filter(|t| t.user_id == user_id).cloned().collect();
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    let total = tasks.len();
    Json(TaskList { tasks, total })
}

async fn create_task(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<TaskCreate>,
) -> Result<(StatusCode, Json<Task>), ApiFailure> {
    check_title(&input.title)?;
    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        user_id,
        title: input.title,
        description: input.description,
        completed: false,
        created_at: now,
        updated_at: now,
    };
    state.tasks.write().await.insert(task.id, task.clone());
    log::info!("created task {} for user {user_id}", task.id);
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<AppState>,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Task>, ApiFailure> {
    let db = state.tasks.read().await;
    db.get(&task_id)
        .filter(|t| t.user_id == user_id)
        .cloned()
        .map(Json)
        .ok_or_else(ApiFailure::not_found)
}

async fn update_task(
    State(state): State<AppState>,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<TaskUpdate>,
) -> Result<Json<Task>, ApiFailure> {
    if let Some(title) = &input.title {
        check_title(title)?;
    }
    let mut db = state.tasks.write().await;
    let task = db
        .get_mut(&task_id)
        .filter(|t| t.user_id == user_id)
        .ok_or_else(ApiFailure::not_found)?;
    if let Some(title) = input.title {
        task.title = title;
    }
    if let Some(description) = input.description {
        task.description = Some(description);
    }
    if let Some(completed) = input.completed {
        task.completed = completed;
    }
    task.updated_at = Utc::now();
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(state): State<AppState>,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiFailure> {
    let mut db = state.tasks.write().await;
    match db.get(&task_id) {
        Some(task) if task.user_id == user_id => {
            db.remove(&task_id);
            log::info!("deleted task {task_id}");
            Ok(StatusCode::NO_CONTENT)
        }
        _ => Err(ApiFailure::not_found()),
    }
}

async fn toggle_complete(
    State(state): State<AppState>,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Task>, ApiFailure> {
    let mut db = state.tasks.write().await;
    let task = db
        .get_mut(&task_id)
        .filter(|t| t.user_id == user_id)
        .ok_or_else(ApiFailure::not_found)?;
    task.completed = !task.completed;
    task.updated_at = Utc::now();
    Ok(Json(task.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serializes_to_json() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let task = Task {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: "Test".to_string(),
            description: None,
            completed: false,
            created_at: at,
            updated_at: at,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["title"], "Test");
        assert_eq!(json["description"], Value::Null);
        assert_eq!(json["completed"], false);
        assert_eq!(json["created_at"], "2024-05-01T10:00:00Z");
    }

    #[test]
    fn task_create_rejects_missing_title() {
        let result: Result<TaskCreate, _> = serde_json::from_str(r#"{"description":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn task_update_all_fields_optional() {
        let input: TaskUpdate = serde_json::from_str("{}").unwrap();
        assert!(input.title.is_none());
        assert!(input.description.is_none());
        assert!(input.completed.is_none());
    }

    #[test]
    fn blank_and_overlong_titles_are_rejected() {
        assert!(check_title("ok").is_ok());
        let err = check_title("   ").unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.detail[0]["loc"], json!(["body", "title"]));
        assert!(check_title(&"x".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }
}
