//! Stateless HTTP client for the task API.
//!
//! # Design
//! `TaskClient` holds a base URL and a transport and nothing else; no state
//! survives between calls. Every operation is split in two: a `build_*`
//! method produces the `HttpRequest` as plain data, and the matching call
//! method sends it through the transport exactly once and decodes the
//! response. The generic entry point is `request`, which the named task
//! operations wrap with fixed endpoint templates.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{ApiError, NormalizedError};
use crate::http::{merge_headers, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Task, TaskCreate, TaskList, TaskUpdate};

/// Method, extra headers and JSON body of one call.
///
/// Mirrors what a caller can pass to the generic dispatch. The default is a
/// bodiless GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(HttpMethod::Get)
    }
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a caller header. It overrides a default header of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize `body` to JSON and attach it.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }
}

/// Client for the task API.
///
/// Construct one at startup and share it by reference (or `Arc`) with every
/// consumer. It is `Send + Sync` whenever the transport is, and concurrent
/// calls do not interact.
#[derive(Debug, Clone)]
pub struct TaskClient<T = UreqTransport> {
    base_url: String,
    transport: T,
}

impl TaskClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }

    /// Resolve `TASK_API_URL` and build a client over the default transport.
    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::new(ClientConfig::from_env()?))
    }
}

impl<T: Transport> TaskClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            base_url: config.base_url,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve `endpoint` against the base URL and merge headers.
    ///
    /// `Content-Type: application/json` is always present unless the caller
    /// supplies its own value for it.
    pub fn build_request(&self, endpoint: &str, options: RequestOptions) -> HttpRequest {
        let defaults = [("content-type".to_string(), "application/json".to_string())];
        HttpRequest {
            method: options.method,
            url: format!("{}{endpoint}", self.base_url),
            headers: merge_headers(&defaults, &options.headers),
            body: options.body,
        }
    }

    /// Send one request and decode a 2xx JSON body into `R`.
    ///
    /// Use `serde_json::Value` as `R` to get the body back untouched.
    pub fn request<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        self.execute(self.build_request(endpoint, options))
    }

    /// Send a pre-built request through the transport exactly once.
    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        log::debug!("{} {}", request.method, request.url);
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.execute(request)?;
        if !response.is_ok() {
            log::warn!("{method} {url} returned {}", response.status);
        }
        Ok(response)
    }

    fn execute<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        parse_json(self.send(request)?)
    }

    pub fn build_list_tasks(&self, user_id: impl Display) -> HttpRequest {
        self.build_request(&tasks_path(user_id), RequestOptions::new(HttpMethod::Get))
    }

    pub fn build_get_task(&self, user_id: impl Display, task_id: impl Display) -> HttpRequest {
        self.build_request(
            &task_path(user_id, task_id),
            RequestOptions::new(HttpMethod::Get),
        )
    }

    pub fn build_create_task(
        &self,
        user_id: impl Display,
        input: &TaskCreate,
    ) -> Result<HttpRequest, ApiError> {
        let options = RequestOptions::new(HttpMethod::Post).json(input)?;
        Ok(self.build_request(&tasks_path(user_id), options))
    }

    pub fn build_update_task(
        &self,
        user_id: impl Display,
        task_id: impl Display,
        input: &TaskUpdate,
    ) -> Result<HttpRequest, ApiError> {
        let options = RequestOptions::new(HttpMethod::Put).json(input)?;
        Ok(self.build_request(&task_path(user_id, task_id), options))
    }

    pub fn build_delete_task(&self, user_id: impl Display, task_id: impl Display) -> HttpRequest {
        self.build_request(
            &task_path(user_id, task_id),
            RequestOptions::new(HttpMethod::Delete),
        )
    }

    pub fn build_toggle_complete(
        &self,
        user_id: impl Display,
        task_id: impl Display,
    ) -> HttpRequest {
        self.build_request(
            &format!("{}/complete", task_path(user_id, task_id)),
            RequestOptions::new(HttpMethod::Patch),
        )
    }

    pub fn list_tasks(&self, user_id: impl Display) -> Result<TaskList, ApiError> {
        self.execute(self.build_list_tasks(user_id))
    }

    pub fn get_task(&self, user_id: impl Display, task_id: impl Display) -> Result<Task, ApiError> {
        self.execute(self.build_get_task(user_id, task_id))
    }

    pub fn create_task(&self, user_id: impl Display, input: &TaskCreate) -> Result<Task, ApiError> {
        self.execute(self.build_create_task(user_id, input)?)
    }

    pub fn update_task(
        &self,
        user_id: impl Display,
        task_id: impl Display,
        input: &TaskUpdate,
    ) -> Result<Task, ApiError> {
        self.execute(self.build_update_task(user_id, task_id, input)?)
    }

    /// Delete a task. The success body (usually empty on 204) is ignored.
    pub fn delete_task(&self, user_id: impl Display, task_id: impl Display) -> Result<(), ApiError> {
        let response = self.send(self.build_delete_task(user_id, task_id))?;
        check_status(&response)
    }

    pub fn toggle_complete(
        &self,
        user_id: impl Display,
        task_id: impl Display,
    ) -> Result<Task, ApiError> {
        self.execute(self.build_toggle_complete(user_id, task_id))
    }
}

fn tasks_path(user_id: impl Display) -> String {
    format!("/api/{user_id}/tasks")
}

fn task_path(user_id: impl Display, task_id: impl Display) -> String {
    format!("/api/{user_id}/tasks/{task_id}")
}

/// Map a non-2xx response to `ApiError::Status` with a normalized message.
pub fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_ok() {
        return Ok(());
    }
    Err(ApiError::Status(NormalizedError::from_body(
        response.status,
        &response.body,
    )))
}

/// Decode a 2xx response body as JSON, or normalize the error of any other.
pub fn parse_json<R: DeserializeOwned>(response: HttpResponse) -> Result<R, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;

    /// Records every request and answers with a canned response.
    struct FakeTransport {
        response: HttpResponse,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: HttpResponse::new(status, body),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("http://localhost:8000").unwrap()
    }

    fn client(status: u16, body: &str) -> TaskClient<FakeTransport> {
        TaskClient::with_transport(config(), FakeTransport::new(status, body))
    }

    const TASK_JSON: &str = r#"{
        "id": "00000000-0000-0000-0000-000000000001",
        "user_id": "00000000-0000-0000-0000-0000000000aa",
        "title": "Write report",
        "description": null,
        "completed": true,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-02T08:30:00Z"
    }"#;

    #[test]
    fn build_request_sets_default_content_type() {
        let req = client(200, "{}").build_request("/api/u1/tasks", RequestOptions::default());
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/api/u1/tasks");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.body.is_none());
    }

    #[test]
    fn caller_headers_win_over_defaults() {
        let options = RequestOptions::new(HttpMethod::Post)
            .header("Content-Type", "application/merge-patch+json")
            .header("x-trace", "abc");
        let req = client(200, "{}").build_request("/x", options);
        assert_eq!(
            req.headers,
            vec![
                ("Content-Type".to_string(), "application/merge-patch+json".to_string()),
                ("x-trace".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn success_body_is_returned_unmodified() {
        let body = r#"{"anything":[1,2,{"deep":true}],"n":null}"#;
        let c = client(200, body);
        let value: Value = c.request("/custom", RequestOptions::default()).unwrap();
        assert_eq!(value, serde_json::from_str::<Value>(body).unwrap());
    }

    #[test]
    fn list_tasks_issues_one_get() {
        let c = client(200, r#"{"tasks":[],"total":0}"#);
        let list = c.list_tasks("u1").unwrap();
        assert_eq!(list.total, 0);

        let seen = c.transport().requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].url, "http://localhost:8000/api/u1/tasks");
        assert!(seen[0].body.is_none());
    }

    #[test]
    fn get_task_uses_task_path() {
        let c = client(200, TASK_JSON);
        let task = c.get_task("u1", "t1").unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(c.transport().requests()[0].url, "http://localhost:8000/api/u1/tasks/t1");
    }

    #[test]
    fn create_task_posts_json_body() {
        let c = client(201, TASK_JSON);
        c.create_task("u1", &TaskCreate::new("Write report")).unwrap();

        let seen = c.transport().requests();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].url, "http://localhost:8000/api/u1/tasks");
        let body: Value = serde_json::from_str(seen[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Write report"}));
    }

    #[test]
    fn update_task_puts_partial_body() {
        let c = client(200, TASK_JSON);
        let update = TaskUpdate {
            title: Some("Renamed".to_string()),
            ..TaskUpdate::default()
        };
        c.update_task("u1", "t1", &update).unwrap();

        let seen = c.transport().requests();
        assert_eq!(seen[0].method, HttpMethod::Put);
        assert_eq!(seen[0].url, "http://localhost:8000/api/u1/tasks/t1");
        let body: Value = serde_json::from_str(seen[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Renamed"}));
    }

    #[test]
    fn delete_task_accepts_empty_204() {
        let c = client(204, "");
        c.delete_task("u1", "t1").unwrap();

        let seen = c.transport().requests();
        assert_eq!(seen[0].method, HttpMethod::Delete);
        assert_eq!(seen[0].url, "http://localhost:8000/api/u1/tasks/t1");
    }

    #[test]
    fn toggle_complete_issues_one_bodiless_patch() {
        let c = client(200, TASK_JSON);
        let task = c.toggle_complete("u1", "t1").unwrap();
        assert!(task.completed);

        let seen = c.transport().requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Patch);
        assert_eq!(seen[0].url, "http://localhost:8000/api/u1/tasks/t1/complete");
        assert!(seen[0].body.is_none());
    }

    #[test]
    fn string_detail_becomes_error_message() {
        let err = client(404, r#"{"detail":"Task not found"}"#)
            .get_task("u1", "t1")
            .unwrap_err();
        assert_eq!(err.to_string(), "Task not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn nested_detail_is_stringified() {
        let err = client(400, r#"{"detail":{"nested":1}}"#).list_tasks("u1").unwrap_err();
        assert_eq!(err.to_string(), r#"{"nested":1}"#);
    }

    #[test]
    fn unparseable_error_body_uses_default_message() {
        let err = client(500, "Internal Server Error").list_tasks("u1").unwrap_err();
        assert_eq!(err.to_string(), "An unexpected error occurred");
    }

    #[test]
    fn delete_failure_is_normalized() {
        let err = client(404, r#"{"detail":"Task not found"}"#)
            .delete_task("u1", "t1")
            .unwrap_err();
        assert_eq!(err.to_string(), "Task not found");
    }

    #[test]
    fn unparseable_success_body_is_a_deserialization_error() {
        let err = client(200, "not json").list_tasks("u1").unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn uuid_identifiers_render_in_paths() {
        let c = client(200, TASK_JSON);
        let user = uuid::Uuid::nil();
        let req = c.build_toggle_complete(user, "t1");
        assert_eq!(
            req.url,
            "http://localhost:8000/api/00000000-0000-0000-0000-000000000000/tasks/t1/complete"
        );
    }
}
