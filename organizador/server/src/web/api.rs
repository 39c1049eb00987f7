use crate::task::TaskStatus;
use crate::task::api::{TaskJson, TaskRequest};
use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// JSON body returned with every task API error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable message, in Portuguese
    pub erro: String,
}

impl ErrorResponse {
    pub fn new(erro: impl Into<String>) -> Self {
        Self { erro: erro.into() }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task::api::get_task_handler,
        crate::task::api::get_all_tasks_handler,
        crate::task::api::get_tasks_by_title_handler,
        crate::task::api::get_tasks_by_date_handler,
        crate::task::api::get_tasks_by_status_handler,
        crate::task::api::create_task_handler,
        crate::task::api::update_task_handler,
        crate::task::api::delete_task_handler,
    ),
    components(schemas(TaskJson, TaskRequest, TaskStatus, ErrorResponse)),
    tags((name = "Tarefa", description = "Task management"))
)]
pub struct ApiDoc;

/// Serves the OpenAPI document and Swagger UI.
pub fn create_docs_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
