use crate::entities::tarefa;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::{ActiveEnum, DeriveActiveEnum, EnumIter, Iterable};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

pub mod api;
pub mod store;

pub use api::{TaskState, create_task_router};
pub use store::{SeaOrmTaskStore, TaskStore};

/// State of a task. Persisted and compared by ordinal.
///
/// On the wire this departs from the ordinal-only JSON older clients may expect: responses
/// carry the name (`"Pendente"`, `"Finalizado"`), while requests and the `status` query
/// accept either the name or the ordinal. Clients that send `0`/`1` keep working; clients
/// that read `status` as a number must switch to the names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, ToSchema,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum TaskStatus {
    #[default]
    #[sea_orm(num_value = 0)]
    #[serde(rename = "Pendente")]
    Pending,
    #[sea_orm(num_value = 1)]
    #[serde(rename = "Finalizado")]
    Done,
}

impl TaskStatus {
    /// Returns the name clients use for this status.
    pub fn name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pendente",
            TaskStatus::Done => "Finalizado",
        }
    }

    /// Looks a status up by its ordinal.
    pub fn from_ordinal(ordinal: i64) -> Result<Self, ParseTaskStatusError> {
        i32::try_from(ordinal)
            .ok()
            .and_then(|value| Self::try_from_value(&value).ok())
            .ok_or_else(|| ParseTaskStatusError(ordinal.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown task status '{0}'")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    /// Accepts either the status name (any ASCII case) or its ordinal.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Ok(ordinal) = value.parse::<i64>() {
            return Self::from_ordinal(ordinal);
        }
        Self::iter()
            .find(|status| status.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| ParseTaskStatusError(value.to_string()))
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StatusVisitor;

        impl Visitor<'_> for StatusVisitor {
            type Value = TaskStatus;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a task status name or ordinal")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TaskStatus, E> {
                value.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<TaskStatus, E> {
                TaskStatus::from_ordinal(value).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<TaskStatus, E> {
                let ordinal = i64::try_from(value).map_err(E::custom)?;
                TaskStatus::from_ordinal(ordinal).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

/// Returns `true` for the `0001-01-01T00:00:00` marker that clients send when no date was set.
pub fn is_unset_date(date: &NaiveDateTime) -> bool {
    date.year() == 1 && date.ordinal() == 1 && date.time() == NaiveTime::MIN
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDateTime,
    pub status: TaskStatus,
}

impl From<tarefa::Model> for Task {
    fn from(model: tarefa::Model) -> Self {
        Task {
            id: model.id,
            title: model.titulo,
            description: model.descricao,
            date: model.data,
            status: model.status,
        }
    }
}

/// A validated task that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDateTime,
    pub status: TaskStatus,
}

/// Fields supplied by a client when creating or replacing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub status: TaskStatus,
}

impl TaskInput {
    /// Rejects a missing or unset date.
    pub fn validate(self) -> Result<NewTask, TaskServiceError> {
        let date = self
            .date
            .filter(|date| !is_unset_date(date))
            .ok_or(TaskServiceError::EmptyDate)?;
        Ok(NewTask {
            title: self.title,
            description: self.description,
            date,
            status: self.status,
        })
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    #[error("Task with ID {0} not found")]
    TaskNotFound(i32),
    #[error("No task title contains '{0}'")]
    NoTasksWithTitle(String),
    #[error("No task is dated {0}")]
    NoTasksOnDate(NaiveDate),
    #[error("No task has status {}", .0.name())]
    NoTasksWithStatus(TaskStatus),
    /// The task date is missing or set to the unset marker.
    #[error("Task date must not be empty")]
    EmptyDate,
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct TaskService<'a> {
    store: &'a dyn TaskStore,
}

impl TaskService<'_> {
    pub fn new(store: &dyn TaskStore) -> TaskService<'_> {
        TaskService { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: i32) -> Result<Task, TaskServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.store.find_all().await?)
    }

    /// Retrieves the tasks whose title contains `fragment`.
    ///
    /// # Returns
    ///
    /// The matching tasks, or `NoTasksWithTitle` when nothing matches.
    #[tracing::instrument(skip(self))]
    pub async fn get_tasks_by_title(&self, fragment: &str) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = self.store.find_by_title_containing(fragment).await?;
        if tasks.is_empty() {
            return Err(TaskServiceError::NoTasksWithTitle(fragment.to_string()));
        }
        Ok(tasks)
    }

    /// Retrieves the tasks dated on `date`, whatever their time of day.
    #[tracing::instrument(skip(self))]
    pub async fn get_tasks_by_date(&self, date: NaiveDate) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = self.store.find_by_date(date).await?;
        if tasks.is_empty() {
            return Err(TaskServiceError::NoTasksOnDate(date));
        }
        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_tasks_by_status(
        &self,
        status: TaskStatus,
    ) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = self.store.find_by_status(status).await?;
        if tasks.is_empty() {
            return Err(TaskServiceError::NoTasksWithStatus(status));
        }
        Ok(tasks)
    }

    /// Creates a new task.
    ///
    /// # Returns
    ///
    /// The stored task including its assigned ID, or `EmptyDate` if the input has no usable date.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, input: TaskInput) -> Result<Task, TaskServiceError> {
        let new_task = input.validate()?;
        Ok(self.store.insert(new_task).await?)
    }

    /// Replaces title, description, date and status of an existing task.
    ///
    /// A missing ID is reported before the input is validated.
    pub async fn update_task(&self, id: i32, input: TaskInput) -> Result<Task, TaskServiceError> {
        self.update_task_from(id, Ok(input)).await
    }

    /// Like [`TaskService::update_task`], for callers whose input may have failed to decode.
    ///
    /// The ID is looked up once, before `input` is inspected, so an unknown ID wins over any
    /// input error. A row that disappears between the lookup and the write is also `TaskNotFound`.
    #[tracing::instrument(skip(self, input))]
    pub async fn update_task_from<E>(
        &self,
        id: i32,
        input: Result<TaskInput, E>,
    ) -> Result<Task, E>
    where
        E: From<TaskServiceError>,
    {
        let existing = self.get_task_by_id(id).await?;
        let replacement = input?.validate()?;

        let updated = Task {
            id: existing.id,
            title: replacement.title,
            description: replacement.description,
            date: replacement.date,
            status: replacement.status,
        };
        match self.store.update(updated).await {
            Ok(task) => Ok(task),
            Err(sea_orm::DbErr::RecordNotUpdated) => Err(TaskServiceError::TaskNotFound(id).into()),
            Err(e) => Err(TaskServiceError::from(e).into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: i32) -> Result<(), TaskServiceError> {
        let existing = self.get_task_by_id(id).await?;
        self.store.delete(existing.id).await?;
        Ok(())
    }
}
