//! HTTP server implementation for the web interface.
//!
//! This module provides the axum-based HTTP server that serves the task pages
//! and exposes the JSON endpoints.

use axum::{
    Router,
    extract::{Form, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use super::templates;
use crate::error::{ApiError, ErrorCode, ValidationError};
use crate::repository::TaskRepository;
use crate::types::{Priority, Task, TaskUpdate};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    repo: Arc<dyn TaskRepository>,
}

impl AppState {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    /// Get the task repository.
    pub fn repo(&self) -> &dyn TaskRepository {
        self.repo.as_ref()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Result of a toggle or delete action, read by the page scripts.
#[derive(Debug, Serialize)]
struct ActionResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
    message: String,
}

impl ActionResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            completed: None,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            completed: None,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.code {
            ErrorCode::TaskNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Today's local date as `YYYY-MM-DD`, for overdue highlighting.
fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

// =============================================================================
// Page rendering
// =============================================================================

fn render_page(page_title: &str, error_message: Option<&str>, content: &str) -> String {
    let message = error_message
        .map(|m| format!(r#"<div class="message message-error">{}</div>"#, html_escape(m)))
        .unwrap_or_default();
    let page_title = html_escape(page_title);

    templates::render(
        templates::BASE_TEMPLATE,
        &[
            ("page_title", page_title.as_str()),
            ("message", message.as_str()),
            ("content", content),
        ],
    )
}

fn render_task_row(task: &Task, today: &str) -> String {
    let id = task.id.unwrap_or_default();

    let mut classes = vec!["task-row"];
    if task.completed {
        classes.push("completed");
    }
    if task.is_overdue(today) {
        classes.push("overdue");
    }

    let description = if task.description.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="task-description">{}</div>"#,
            html_escape(&task.description)
        )
    };

    let title = html_escape(&task.title);

    format!(
        r#"<tr class="{classes}" data-task-id="{id}">
                <td><input type="checkbox" title="Toggle completion" onclick="toggleTask({id})"{checked}></td>
                <td><div class="task-title">{title}</div>{description}</td>
                <td><span class="priority priority-{priority}">{label}</span></td>
                <td class="due">{due}</td>
                <td>
                    <a class="button button-muted" href="/task/edit/{id}">Edit</a>
                    <button class="button button-danger" data-title="{title}" onclick="deleteTask({id}, this.dataset.title)">Delete</button>
                </td>
            </tr>"#,
        classes = classes.join(" "),
        checked = if task.completed { " checked" } else { "" },
        priority = task.priority,
        label = task.priority.label(),
        due = task.due_date.as_deref().map(html_escape).unwrap_or_default(),
    )
}

/// Render the task list page. An error banner is shown above the list when
/// `error_message` is set.
fn render_index(tasks: &[Task], error_message: Option<&str>) -> String {
    let today = today();

    let rows = if tasks.is_empty() {
        r#"<tr><td colspan="5" class="empty-state">No tasks yet. <a href="/task/create">Create one</a>.</td></tr>"#
            .to_string()
    } else {
        tasks
            .iter()
            .map(|task| render_task_row(task, &today))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let task_count = tasks.len().to_string();
    let content = templates::render(
        templates::INDEX_TEMPLATE,
        &[("task_count", task_count.as_str()), ("task_rows", rows.as_str())],
    );

    render_page("Tasks", error_message, &content)
}

/// Raw form input, echoed back when the form is re-rendered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskForm {
    title: String,
    description: String,
    priority: String,
    due_date: String,
}

/// Form input after validation.
struct ValidTask {
    title: String,
    description: String,
    priority: Priority,
    due_date: Option<String>,
}

impl TaskForm {
    fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority.to_string(),
            due_date: task.due_date.clone().unwrap_or_default(),
        }
    }

    /// Title is required after trimming; priority must be a whole number and
    /// is clamped into range; an empty due date means none.
    fn validate(&self) -> Result<ValidTask, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::missing_field("title"));
        }

        let priority = match self.priority.trim() {
            "" => Priority::default(),
            raw => raw.parse::<i64>().map(Priority::new).map_err(|_| {
                ValidationError::invalid_value("priority", "Priority must be a whole number")
            })?,
        };

        let due_date = Some(self.due_date.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(ValidTask {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            priority,
            due_date,
        })
    }
}

/// Which form is being rendered.
enum FormMode {
    Create,
    Edit(i64),
}

fn render_form(mode: &FormMode, values: &TaskForm, error_message: Option<&str>) -> String {
    let (heading, action, submit_label) = match mode {
        FormMode::Create => ("New task", "/task/create".to_string(), "Create task"),
        FormMode::Edit(id) => ("Edit task", format!("/task/edit/{id}"), "Save changes"),
    };

    let selected = values
        .priority
        .trim()
        .parse::<i64>()
        .map(Priority::new)
        .unwrap_or_default();

    let priority_options = Priority::all()
        .map(|p| {
            format!(
                r#"<option value="{p}"{sel}>{p} - {label}</option>"#,
                sel = if p == selected { " selected" } else { "" },
                label = p.label(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n            ");

    let title = html_escape(&values.title);
    let description = html_escape(&values.description);
    let due_date = html_escape(&values.due_date);

    let content = templates::render(
        templates::TASK_FORM_TEMPLATE,
        &[
            ("form_heading", heading),
            ("form_action", action.as_str()),
            ("title", title.as_str()),
            ("description", description.as_str()),
            ("priority_options", priority_options.as_str()),
            ("due_date", due_date.as_str()),
            ("submit_label", submit_label),
        ],
    );

    render_page(heading, error_message, &content)
}

// =============================================================================
// Page handlers
// =============================================================================

/// Task list page.
async fn index(State(state): State<AppState>) -> Response {
    match state.repo().get_all() {
        Ok(tasks) => Html(render_index(&tasks, None)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to load tasks");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_index(&[], Some("Could not load tasks. Please try again."))),
            )
                .into_response()
        }
    }
}

/// Parse a task id from the URL.
///
/// Only plain decimal digits name a task; anything else means the route does
/// not exist.
fn parse_task_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Unknown paths render the task list with a notice.
async fn not_found(State(state): State<AppState>) -> Response {
    not_found_page(&state)
}

fn not_found_page(state: &AppState) -> Response {
    let tasks = state.repo().get_all().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load tasks for not-found page");
        Vec::new()
    });
    (
        StatusCode::NOT_FOUND,
        Html(render_index(&tasks, Some("Page not found"))),
    )
        .into_response()
}

async fn create_form() -> Html<String> {
    Html(render_form(&FormMode::Create, &TaskForm::default(), None))
}

async fn create_submit(State(state): State<AppState>, Form(form): Form<TaskForm>) -> Response {
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => {
            debug!(field = e.field(), "Rejected task form");
            return (
                StatusCode::BAD_REQUEST,
                Html(render_form(&FormMode::Create, &form, Some(&e.to_string()))),
            )
                .into_response();
        }
    };

    let task = Task::new(valid.title)
        .with_description(valid.description)
        .with_priority(valid.priority.value())
        .with_due_date(valid.due_date);

    match state.repo().create(task) {
        Ok(task) => {
            info!(task_id = ?task.id, "Task created");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create task");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_form(
                    &FormMode::Create,
                    &form,
                    Some("Could not save the task. Please try again."),
                )),
            )
                .into_response()
        }
    }
}

async fn edit_form(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let Some(id) = parse_task_id(&raw_id) else {
        return not_found_page(&state);
    };
    match state.repo().get_by_id(id) {
        Ok(Some(task)) => {
            Html(render_form(&FormMode::Edit(id), &TaskForm::from_task(&task), None))
                .into_response()
        }
        Ok(None) => Redirect::to("/").into_response(),
        Err(e) => {
            error!(task_id = id, error = %e, "Failed to load task");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_index(&[], Some("Could not load the task. Please try again."))),
            )
                .into_response()
        }
    }
}

async fn edit_submit(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(form): Form<TaskForm>,
) -> Response {
    let Some(id) = parse_task_id(&raw_id) else {
        return not_found_page(&state);
    };
    let mode = FormMode::Edit(id);
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => {
            debug!(task_id = id, field = e.field(), "Rejected task form");
            return (
                StatusCode::BAD_REQUEST,
                Html(render_form(&mode, &form, Some(&e.to_string()))),
            )
                .into_response();
        }
    };

    let update = TaskUpdate {
        title: Some(valid.title),
        description: Some(valid.description),
        priority: Some(valid.priority),
        due_date: Some(valid.due_date),
        completed: None,
    };

    match state.repo().update(id, &update) {
        Ok(Some(_)) => {
            info!(task_id = id, "Task updated");
            Redirect::to("/").into_response()
        }
        Ok(None) => {
            warn!(task_id = id, "Edited task no longer exists");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            error!(task_id = id, error = %e, "Failed to update task");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_form(
                    &mode,
                    &form,
                    Some("Could not save the task. Please try again."),
                )),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Action handlers (JSON, called from the page scripts)
// =============================================================================

async fn delete_task(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let Some(id) = parse_task_id(&raw_id) else {
        return not_found_page(&state);
    };
    match state.repo().delete(id) {
        Ok(true) => {
            info!(task_id = id, "Task deleted");
            Json(ActionResponse::ok("Task deleted")).into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ActionResponse::failed("Task not found")),
        )
            .into_response(),
        Err(e) => {
            error!(task_id = id, error = %e, "Failed to delete task");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::failed("Could not delete the task")),
            )
                .into_response()
        }
    }
}

async fn toggle_task(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let Some(id) = parse_task_id(&raw_id) else {
        return not_found_page(&state);
    };
    let result = state.repo().get_by_id(id).and_then(|task| match task {
        Some(task) => state.repo().mark_completed(id, !task.completed),
        None => Ok(None),
    });

    match result {
        Ok(Some(task)) => {
            info!(task_id = id, completed = task.completed, "Task toggled");
            let message = if task.completed {
                "Task marked as completed"
            } else {
                "Task marked as pending"
            };
            Json(ActionResponse {
                success: true,
                completed: Some(task.completed),
                message: message.to_string(),
            })
            .into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ActionResponse::failed("Task not found")),
        )
            .into_response(),
        Err(e) => {
            error!(task_id = id, error = %e, "Failed to toggle task");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::failed("Could not update the task")),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Read-only JSON API
// =============================================================================

async fn api_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    state.repo().get_all().map(Json).map_err(|e| {
        error!(error = %e, "Failed to list tasks");
        ApiError::from(e)
    })
}

async fn api_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let Some(id) = parse_task_id(&raw_id) else {
        return Err(ApiError::task_not_found(&raw_id));
    };
    match state.repo().get_by_id(id) {
        Ok(Some(task)) => Ok(Json(task)),
        Ok(None) => Err(ApiError::task_not_found(id)),
        Err(e) => {
            error!(task_id = id, error = %e, "Failed to load task");
            Err(ApiError::from(e))
        }
    }
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Pages
        .route("/", get(index))
        .route("/task/create", get(create_form).post(create_submit))
        .route("/task/edit/{id}", get(edit_form).post(edit_submit))
        // Actions
        .route("/task/delete/{id}", post(delete_task))
        .route("/task/toggle/{id}", post(toggle_task))
        // API
        .route("/api/tasks", get(api_tasks))
        .route("/api/tasks/{id}", get(api_task))
        .route("/api/health", get(health))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle for a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("Web server task failed: {}", e);
        }
    }
}

/// Bind `host:port` and serve in a background task.
///
/// Port 0 picks a free port; the handle reports the bound address.
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<ServerHandle> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;

    info!("Web server listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Web server shutting down");
            })
            .await
        {
            error!("Web server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, priority: &str, due_date: &str) -> TaskForm {
        TaskForm {
            title: title.to_string(),
            description: "  notes  ".to_string(),
            priority: priority.to_string(),
            due_date: due_date.to_string(),
        }
    }

    #[test]
    fn validate_trims_and_defaults() {
        let valid = form("  Buy milk ", "", " ").validate().unwrap();
        assert_eq!(valid.title, "Buy milk");
        assert_eq!(valid.description, "notes");
        assert_eq!(valid.priority, Priority::default());
        assert_eq!(valid.due_date, None);
    }

    #[test]
    fn validate_clamps_priority() {
        assert_eq!(form("a", "0", "").validate().unwrap().priority.value(), 1);
        assert_eq!(form("a", "99", "").validate().unwrap().priority.value(), 5);
    }

    #[test]
    fn validate_rejects_blank_title_and_bad_priority() {
        let err = form("   ", "2", "").validate().err().unwrap();
        assert_eq!(err.to_string(), "Title is required");

        let err = form("a", "high", "").validate().err().unwrap();
        assert_eq!(err.field(), "priority");
    }

    #[test]
    fn task_ids_are_plain_digits() {
        assert_eq!(parse_task_id("42"), Some(42));
        assert_eq!(parse_task_id("007"), Some(7));
        assert_eq!(parse_task_id("abc"), None);
        assert_eq!(parse_task_id("+5"), None);
        assert_eq!(parse_task_id("-1"), None);
        assert_eq!(parse_task_id(""), None);
        assert_eq!(parse_task_id("99999999999999999999"), None);
    }

    #[test]
    fn escapes_html() {
        assert_eq!(
            html_escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn row_marks_overdue_and_completed() {
        let overdue = Task::new("late")
            .with_id(1)
            .with_due_date(Some("2000-01-01".into()));
        let row = render_task_row(&overdue, "2026-10-19");
        assert!(row.contains(r#"class="task-row overdue""#));

        let done = overdue.clone().with_completed(true);
        let row = render_task_row(&done, "2026-10-19");
        assert!(row.contains(r#"class="task-row completed""#));
        assert!(row.contains(" checked"));
    }

    #[test]
    fn form_selects_current_priority() {
        let html = render_form(&FormMode::Edit(4), &form("a", "2", ""), None);
        assert!(html.contains(r#"<option value="2" selected>2 - High</option>"#));
        assert!(html.contains(r#"action="/task/edit/4""#));
    }
}
