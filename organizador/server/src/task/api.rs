use crate::task::{
    ParseTaskStatusError, Task, TaskInput, TaskService, TaskServiceError, TaskStatus, TaskStore,
};
use crate::web::api::ErrorResponse;
use axum::{
    Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

pub const TASK_NOT_FOUND: &str = "Tarefa não encontrada.";
pub const NO_TASKS_WITH_TITLE: &str = "Nenhuma tarefa encontrada com o título especificado.";
pub const NO_TASKS_ON_DATE: &str = "Nenhuma tarefa encontrada para a data especificada.";
pub const NO_TASKS_WITH_STATUS: &str = "Nenhuma tarefa encontrada com o status especificado.";
pub const EMPTY_DATE: &str = "A data da tarefa não pode ser vazia.";
pub const INVALID_DATE: &str = "A data informada é inválida.";
pub const INVALID_STATUS: &str = "O status informado é inválido.";
pub const MISSING_TITLE: &str = "O título deve ser informado.";
pub const INVALID_BODY: &str = "O corpo da requisição é inválido.";
pub const UNEXPECTED_ERROR: &str = "Ocorreu um erro inesperado ao processar a requisição.";

pub struct TaskState {
    pub store: Arc<dyn TaskStore>,
}

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskJson {
    /// Identifier assigned by the store
    id: i32,
    #[serde(rename = "titulo")]
    title: String,
    #[serde(rename = "descricao")]
    description: Option<String>,
    #[serde(rename = "data")]
    date: NaiveDateTime,
    status: TaskStatus,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            date: task.date,
            status: task.status,
        }
    }
}

/// Request body for creating or replacing a task. Any `id` sent by the client is ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskRequest {
    #[serde(rename = "titulo")]
    title: String,
    #[serde(rename = "descricao", default)]
    description: Option<String>,
    /// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` or RFC 3339
    #[serde(rename = "data", default)]
    date: Option<String>,
    /// Status name or ordinal, `Pendente` when omitted
    #[serde(default)]
    status: TaskStatus,
}

impl TaskRequest {
    fn into_input(self) -> Result<TaskInput, TaskApiError> {
        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_date_time(raw).ok_or_else(|| TaskApiError::InvalidDate(raw.to_string()))?,
            ),
        };
        Ok(TaskInput {
            title: self.title,
            description: self.description,
            date,
            status: self.status,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleQuery {
    /// Text the title must contain
    titulo: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// Day to look up, with or without a time
    data: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Status name or ordinal
    status: Option<String>,
}

/// Parses the date formats clients send: a bare date (midnight), a local date-time,
/// or an RFC 3339 timestamp whose offset is dropped.
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    value
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|date_time| date_time.naive_local())
        })
        .or_else(|| {
            value
                .parse::<NaiveDate>()
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Error type for task handlers.
#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    #[error(transparent)]
    Service(#[from] TaskServiceError),
    #[error("Invalid date '{0}'")]
    InvalidDate(String),
    #[error(transparent)]
    InvalidStatus(#[from] ParseTaskStatusError),
    #[error("Missing title query parameter")]
    MissingTitle,
    /// The body is not JSON or lacks a required field.
    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let (status_code, message) = match &self {
            TaskApiError::Service(TaskServiceError::TaskNotFound(_)) => {
                (StatusCode::NOT_FOUND, TASK_NOT_FOUND)
            }
            TaskApiError::Service(TaskServiceError::NoTasksWithTitle(_)) => {
                (StatusCode::NOT_FOUND, NO_TASKS_WITH_TITLE)
            }
            TaskApiError::Service(TaskServiceError::NoTasksOnDate(_)) => {
                (StatusCode::NOT_FOUND, NO_TASKS_ON_DATE)
            }
            TaskApiError::Service(TaskServiceError::NoTasksWithStatus(_)) => {
                (StatusCode::NOT_FOUND, NO_TASKS_WITH_STATUS)
            }
            TaskApiError::Service(TaskServiceError::EmptyDate) => {
                (StatusCode::BAD_REQUEST, EMPTY_DATE)
            }
            TaskApiError::InvalidDate(_) => (StatusCode::BAD_REQUEST, INVALID_DATE),
            TaskApiError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, INVALID_STATUS),
            TaskApiError::MissingTitle => (StatusCode::BAD_REQUEST, MISSING_TITLE),
            TaskApiError::InvalidBody(rejection) => {
                tracing::debug!("Rejected task body: {}", rejection.body_text());
                (StatusCode::BAD_REQUEST, INVALID_BODY)
            }
            TaskApiError::Service(TaskServiceError::Database(err)) => {
                tracing::error!("Task store failure: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR)
            }
        };
        (status_code, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Handler for GET /Tarefa/{id}
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 404, description = "No task with this ID", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let task = TaskService::new(state.store.as_ref())
        .get_task_by_id(id)
        .await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for GET /Tarefa/ObterTodos
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterTodos",
    responses(
        (status = 200, description = "Every stored task", body = Vec<TaskJson>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn get_all_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = TaskService::new(state.store.as_ref())
        .get_all_tasks()
        .await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorTitulo",
    params(TitleQuery),
    responses(
        (status = 200, description = "Matching tasks", body = Vec<TaskJson>),
        (status = 400, description = "Missing title", body = ErrorResponse),
        (status = 404, description = "No title matches", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_title_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let fragment = query.titulo.ok_or(TaskApiError::MissingTitle)?;
    let tasks = TaskService::new(state.store.as_ref())
        .get_tasks_by_title(&fragment)
        .await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Only the calendar day of `data` is compared.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorData",
    params(DateQuery),
    responses(
        (status = 200, description = "Tasks dated on that day", body = Vec<TaskJson>),
        (status = 400, description = "Missing or unparseable date", body = ErrorResponse),
        (status = 404, description = "No task on that day", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_date_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let raw = query.data.unwrap_or_default();
    let date = parse_date_time(&raw)
        .ok_or(TaskApiError::InvalidDate(raw))?
        .date();
    let tasks = TaskService::new(state.store.as_ref())
        .get_tasks_by_date(date)
        .await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorStatus",
    params(StatusQuery),
    responses(
        (status = 200, description = "Tasks with that status", body = Vec<TaskJson>),
        (status = 400, description = "Missing or unknown status", body = ErrorResponse),
        (status = 404, description = "No task with that status", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_status_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let status: TaskStatus = query.status.as_deref().unwrap_or_default().parse()?;
    let tasks = TaskService::new(state.store.as_ref())
        .get_tasks_by_status(status)
        .await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for POST /Tarefa - responds with the stored task and its location.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/Tarefa",
    request_body = TaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Malformed body, missing or invalid date", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TaskApiError> {
    let Json(request) = payload?;
    let input = request.into_input()?;
    let task = TaskService::new(state.store.as_ref())
        .create_task(input)
        .await?;
    let location = format!("/Tarefa/{}", task.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TaskJson::from(task)),
    ))
}

#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    request_body = TaskRequest,
    responses(
        (status = 200, description = "Task replaced", body = TaskJson),
        (status = 400, description = "Malformed body, missing or invalid date", body = ErrorResponse),
        (status = 404, description = "No task with this ID", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskJson>, TaskApiError> {
    // Decoded lazily so an unknown ID wins over a bad body.
    let input = payload
        .map_err(TaskApiError::from)
        .and_then(|Json(request)| request.into_input());
    let task = TaskService::new(state.store.as_ref())
        .update_task_from(id, input)
        .await?;
    Ok(Json(TaskJson::from(task)))
}

#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No task with this ID", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, TaskApiError> {
    TaskService::new(state.store.as_ref())
        .delete_task(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and returns the task router mounted at `/Tarefa`.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/Tarefa", post(create_task_handler))
        .route("/Tarefa/ObterTodos", get(get_all_tasks_handler))
        .route("/Tarefa/ObterPorTitulo", get(get_tasks_by_title_handler))
        .route("/Tarefa/ObterPorData", get(get_tasks_by_date_handler))
        .route("/Tarefa/ObterPorStatus", get(get_tasks_by_status_handler))
        .route(
            "/Tarefa/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_supported_date_formats() {
        let midnight = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let morning = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();

        assert_eq!(parse_date_time("2024-05-01"), Some(midnight));
        assert_eq!(parse_date_time("2024-05-01T08:15:00"), Some(morning));
        assert_eq!(parse_date_time("2024-05-01T08:15:00-03:00"), Some(morning));
        assert_eq!(parse_date_time(" 2024-05-01 "), Some(midnight));
        assert_eq!(parse_date_time("01/05/2024"), None);
    }

    #[test]
    fn can_treat_blank_request_date_as_missing() {
        let request: TaskRequest =
            serde_json::from_str(r#"{"titulo": "Buy milk", "data": "  "}"#).unwrap();

        let input = request.into_input().unwrap();

        assert_eq!(input.date, None);
        assert_eq!(input.status, TaskStatus::Pending);
    }

    #[test]
    fn can_reject_unparseable_request_date() {
        let request: TaskRequest =
            serde_json::from_str(r#"{"titulo": "Buy milk", "data": "tomorrow"}"#).unwrap();

        let result = request.into_input();

        assert!(matches!(result, Err(TaskApiError::InvalidDate(raw)) if raw == "tomorrow"));
    }

    #[tokio::test]
    async fn can_hide_store_failures_behind_generic_message() {
        let error = TaskApiError::Service(TaskServiceError::Database(sea_orm::DbErr::Custom(
            "connection reset".to_string(),
        )));

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "erro": UNEXPECTED_ERROR }));
    }
}
