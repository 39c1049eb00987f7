use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::*;

use super::{NewTask, Task, TaskStatus};
use crate::entities::tarefa;

/// Persistence operations the task service relies on.
///
/// Implementations own every record; callers never cache tasks between requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Task>, DbErr>;

    async fn find_all(&self) -> Result<Vec<Task>, DbErr>;

    /// Loads the tasks whose title contains `fragment`, using the store's collation.
    async fn find_by_title_containing(&self, fragment: &str) -> Result<Vec<Task>, DbErr>;

    /// Loads the tasks whose date falls on `date`, at any time of day.
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Task>, DbErr>;

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, DbErr>;

    /// Stores a new task and returns it with its assigned ID.
    async fn insert(&self, task: NewTask) -> Result<Task, DbErr>;

    /// Overwrites every field of the stored task with the same ID.
    async fn update(&self, task: Task) -> Result<Task, DbErr>;

    async fn delete(&self, id: i32) -> Result<(), DbErr>;
}

/// Escapes `LIKE` wildcards so `fragment` only matches itself.
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `TaskStore` backed by the `tarefas` table.
#[derive(Clone)]
pub struct SeaOrmTaskStore {
    db: DatabaseConnection,
}

impl SeaOrmTaskStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_where(&self, condition: Condition) -> Result<Vec<Task>, DbErr> {
        let tasks = tarefa::Entity::find()
            .filter(condition)
            .order_by_asc(tarefa::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }
}

#[async_trait]
impl TaskStore for SeaOrmTaskStore {
    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<Task>, DbErr> {
        let model = tarefa::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Task::from))
    }

    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Task>, DbErr> {
        let tasks = tarefa::Entity::find()
            .order_by_asc(tarefa::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_title_containing(&self, fragment: &str) -> Result<Vec<Task>, DbErr> {
        let pattern = format!("%{}%", escape_like(fragment));
        let matches_title = Expr::col(tarefa::Column::Titulo).like(LikeExpr::new(pattern).escape('\\'));
        self.find_where(Condition::all().add(matches_title)).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Task>, DbErr> {
        let start_of_day = date.and_time(NaiveTime::MIN);
        let mut condition = Condition::all().add(tarefa::Column::Data.gte(start_of_day));
        // The last representable day has no successor, so it stays open-ended.
        if let Some(next_day) = date.succ_opt() {
            condition = condition.add(tarefa::Column::Data.lt(next_day.and_time(NaiveTime::MIN)));
        }
        self.find_where(condition).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, DbErr> {
        self.find_where(Condition::all().add(tarefa::Column::Status.eq(status)))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn insert(&self, task: NewTask) -> Result<Task, DbErr> {
        let active_model = tarefa::ActiveModel {
            titulo: ActiveValue::Set(task.title),
            descricao: ActiveValue::Set(task.description),
            data: ActiveValue::Set(task.date),
            status: ActiveValue::Set(task.status),
            ..Default::default()
        };
        let created_model = active_model.insert(&self.db).await?;
        Ok(Task::from(created_model))
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, task: Task) -> Result<Task, DbErr> {
        let active_model = tarefa::ActiveModel {
            id: ActiveValue::Unchanged(task.id),
            titulo: ActiveValue::Set(task.title),
            descricao: ActiveValue::Set(task.description),
            data: ActiveValue::Set(task.date),
            status: ActiveValue::Set(task.status),
        };
        let updated_model = active_model.update(&self.db).await?;
        Ok(Task::from(updated_model))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), DbErr> {
        tarefa::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_escape_like_wildcards() {
        assert_eq!(escape_like("100% done"), "100\\% done");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("C:\\temp"), "C:\\\\temp");
        assert_eq!(escape_like("Buy milk"), "Buy milk");
    }
}
