use std::path::Path;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{error, info};

use crate::error::AppError;
use crate::models::{CreateTask, QueryTask, Task, TaskLookup, UpdateTask};

const TASK_COLUMNS: &str = "id, title, description, status, created_at, updated_at";

/// Sole mediator between request shapes and the task table. Owns the store
/// handle for its whole lifetime; the owner calls [`TaskService::close`]
/// exactly once during shutdown.
pub struct TaskService {
    db: SqlitePool,
}

impl TaskService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Applies the schema script before any other operation is accepted.
    /// A missing script is a no-op: the schema is assumed to pre-exist.
    /// Runs in autocommit, never inside a caller transaction.
    pub async fn bootstrap(db: SqlitePool, schema_path: &Path) -> Result<Self, AppError> {
        if schema_path.exists() {
            let script = std::fs::read_to_string(schema_path).map_err(|e| {
                error!("failed to read schema script {}: {}", schema_path.display(), e);
                AppError::Internal
            })?;
            sqlx::raw_sql(&script).execute(&db).await?;
            info!("schema bootstrap applied from {}", schema_path.display());
        }
        Ok(Self::new(db))
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }

    pub async fn create(&self, payload: CreateTask) -> Result<Task, AppError> {
        if payload.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }

        let now = Utc::now();
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (title, description, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             RETURNING id, title, description, status, created_at, updated_at",
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.status)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        Ok(task)
    }

    pub async fn list(&self, filter: &QueryTask) -> Result<Vec<Task>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        push_predicates(&mut query, filter);
        query.push(" ORDER BY id");

        let tasks = query.build_query_as::<Task>().fetch_all(&self.db).await?;
        Ok(tasks)
    }

    /// At most one task; absence is a normal `None`, never an error.
    pub async fn read_one(&self, lookup: TaskLookup) -> Result<Option<Task>, AppError> {
        match lookup {
            TaskLookup::ById(id) => {
                let task = sqlx::query_as::<_, Task>(
                    "SELECT id, title, description, status, created_at, updated_at \
                     FROM tasks WHERE id = ?1",
                )
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
                Ok(task)
            }
            TaskLookup::ByFilter(filter) => {
                let mut query =
                    QueryBuilder::<Sqlite>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
                push_predicates(&mut query, &filter);
                query.push(" ORDER BY id LIMIT 1");

                let task = query.build_query_as::<Task>().fetch_optional(&self.db).await?;
                Ok(task)
            }
        }
    }

    /// Applies only the fields present in the payload. An empty payload
    /// degrades to a plain fetch so `updated_at` stays untouched; both
    /// paths report a missing id as `None`.
    pub async fn update(&self, id: i64, payload: UpdateTask) -> Result<Option<Task>, AppError> {
        if payload.is_empty() {
            return self.read_one(TaskLookup::ById(id)).await;
        }

        let now = Utc::now();
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE tasks SET ");
        let mut sets = query.separated(", ");
        if let Some(title) = &payload.title {
            sets.push("title = ").push_bind_unseparated(title.as_str());
        }
        if let Some(description) = &payload.description {
            sets.push("description = ")
                .push_bind_unseparated(description.as_deref());
        }
        if let Some(status) = payload.status {
            sets.push("status = ").push_bind_unseparated(status);
        }
        sets.push("updated_at = ").push_bind_unseparated(now);

        query.push(" WHERE id = ").push_bind(id);
        query.push(format!(" RETURNING {TASK_COLUMNS}"));

        let task = query.build_query_as::<Task>().fetch_optional(&self.db).await?;
        Ok(task)
    }

    /// True iff exactly one row was removed. A missing id is `false`,
    /// not an error; the adapter decides how to surface it.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM tasks WHERE id = ?1 RETURNING id")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(deleted.is_some())
    }
}

// One clause per present field, each bound positionally; the WHERE keyword
// is only emitted when at least one predicate exists.
fn push_predicates<'a>(query: &mut QueryBuilder<'a, Sqlite>, filter: &'a QueryTask) {
    let mut sep = " WHERE ";

    if let Some(id) = filter.id {
        query.push(sep).push("id = ").push_bind(id);
        sep = " AND ";
    }
    if let Some(title) = &filter.title {
        query
            .push(sep)
            .push("title LIKE '%' || ")
            .push_bind(title.as_str())
            .push(" || '%'");
        sep = " AND ";
    }
    if let Some(description) = &filter.description {
        query
            .push(sep)
            .push("description LIKE '%' || ")
            .push_bind(description.as_str())
            .push(" || '%'");
        sep = " AND ";
    }
    if let Some(status) = filter.status {
        query.push(sep).push("status = ").push_bind(status);
        sep = " AND ";
    }
    if let Some(created_at) = filter.created_at {
        query.push(sep).push("created_at >= ").push_bind(created_at);
        sep = " AND ";
    }
    if let Some(updated_at) = filter.updated_at {
        query.push(sep).push("updated_at >= ").push_bind(updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_service() -> TaskService {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::raw_sql(include_str!("../../schema.sql"))
            .execute(&pool)
            .await
            .expect("Failed to apply schema");

        TaskService::new(pool)
    }

    fn create_payload(title: &str) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            description: None,
            status: TaskStatus::default(),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_pending() {
        let service = setup_service().await;

        let task = service
            .create(CreateTask {
                title: "Write docs".to_string(),
                description: Some("draft".to_string()),
                status: TaskStatus::default(),
            })
            .await
            .expect("Failed to create task");

        assert_eq!(task.id, 1);
        assert_eq!(task.title, "Write docs");
        assert_eq!(task.description.as_deref(), Some("draft"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let service = setup_service().await;

        let err = service
            .create(create_payload("   "))
            .await
            .expect_err("Empty title must be rejected");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_round_trip_by_id() {
        let service = setup_service().await;

        let created = service
            .create(create_payload("Round trip"))
            .await
            .expect("Failed to create task");
        let fetched = service
            .read_one(TaskLookup::ById(created.id))
            .await
            .expect("Failed to fetch task")
            .expect("Task not found");

        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_read_one_missing_id_is_none() {
        let service = setup_service().await;

        let found = service
            .read_one(TaskLookup::ById(999))
            .await
            .expect("Lookup must not fail");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_list_without_filter_returns_all_ordered() {
        let service = setup_service().await;

        for title in ["first", "second", "third"] {
            service
                .create(create_payload(title))
                .await
                .expect("Failed to create task");
        }

        let tasks = service
            .list(&QueryTask::default())
            .await
            .expect("Failed to list tasks");
        assert_eq!(tasks.len(), 3);
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_list_filters_combine_with_and() {
        let service = setup_service().await;

        service
            .create(CreateTask {
                title: "Write docs".to_string(),
                description: Some("draft".to_string()),
                status: TaskStatus::Pending,
            })
            .await
            .expect("Failed to create task");
        service
            .create(CreateTask {
                title: "Write tests".to_string(),
                description: None,
                status: TaskStatus::Done,
            })
            .await
            .expect("Failed to create task");

        let filter = QueryTask {
            title: Some("write".to_string()),
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        let tasks = service.list(&filter).await.expect("Failed to list tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Write tests");
    }

    #[tokio::test]
    async fn test_list_title_match_is_case_insensitive_substring() {
        let service = setup_service().await;

        service
            .create(create_payload("Ship the Release"))
            .await
            .expect("Failed to create task");

        let filter = QueryTask {
            title: Some("release".to_string()),
            ..Default::default()
        };
        let tasks = service.list(&filter).await.expect("Failed to list tasks");
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_update_applies_only_present_fields() {
        let service = setup_service().await;

        let created = service
            .create(CreateTask {
                title: "Write docs".to_string(),
                description: Some("draft".to_string()),
                status: TaskStatus::Pending,
            })
            .await
            .expect("Failed to create task");

        let updated = service
            .update(
                created.id,
                UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update task")
            .expect("Task not found");

        assert_eq!(updated.title, "Write docs");
        assert_eq!(updated.description.as_deref(), Some("draft"));
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_update_clears_description_on_explicit_null() {
        let service = setup_service().await;

        let created = service
            .create(CreateTask {
                title: "Write docs".to_string(),
                description: Some("draft".to_string()),
                status: TaskStatus::Pending,
            })
            .await
            .expect("Failed to create task");

        // Omitted description leaves the stored value alone.
        let untouched = service
            .update(
                created.id,
                UpdateTask {
                    title: Some("Write more docs".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update task")
            .expect("Task not found");
        assert_eq!(untouched.description.as_deref(), Some("draft"));

        // An explicit null clears it.
        let cleared = service
            .update(
                created.id,
                UpdateTask {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update task")
            .expect("Task not found");
        assert_eq!(cleared.description, None);
    }

    #[tokio::test]
    async fn test_empty_update_leaves_updated_at_untouched() {
        let service = setup_service().await;

        let created = service
            .create(create_payload("Idle"))
            .await
            .expect("Failed to create task");

        let unchanged = service
            .update(created.id, UpdateTask::default())
            .await
            .expect("Failed to update task")
            .expect("Task not found");

        assert_eq!(unchanged.updated_at, created.updated_at);
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn test_update_missing_id_is_none_on_both_paths() {
        let service = setup_service().await;

        let via_set = service
            .update(
                999,
                UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .expect("Update must not fail");
        assert!(via_set.is_none());

        let via_fetch_fallback = service
            .update(999, UpdateTask::default())
            .await
            .expect("Update must not fail");
        assert!(via_fetch_fallback.is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let service = setup_service().await;

        let created = service
            .create(create_payload("Ephemeral"))
            .await
            .expect("Failed to create task");

        assert!(service.delete(created.id).await.expect("Delete failed"));
        assert!(!service.delete(created.id).await.expect("Second delete must not fail"));

        let found = service
            .read_one(TaskLookup::ById(created.id))
            .await
            .expect("Lookup must not fail");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_read_one_by_filter_takes_first_by_id() {
        let service = setup_service().await;

        service
            .create(CreateTask {
                title: "done one".to_string(),
                description: None,
                status: TaskStatus::Done,
            })
            .await
            .expect("Failed to create task");
        service
            .create(CreateTask {
                title: "done two".to_string(),
                description: None,
                status: TaskStatus::Done,
            })
            .await
            .expect("Failed to create task");

        let found = service
            .read_one(TaskLookup::ByFilter(QueryTask {
                status: Some(TaskStatus::Done),
                ..Default::default()
            }))
            .await
            .expect("Lookup must not fail")
            .expect("Expected a match");
        assert_eq!(found.id, 1);
    }

    #[tokio::test]
    async fn test_scenario_chain() {
        let service = setup_service().await;

        let created = service
            .create(CreateTask {
                title: "Write docs".to_string(),
                description: Some("draft".to_string()),
                status: TaskStatus::Pending,
            })
            .await
            .expect("Failed to create task");
        assert_eq!(created.id, 1);
        assert_eq!(created.status, TaskStatus::Pending);

        let updated = service
            .update(
                1,
                UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update task")
            .expect("Task not found");
        assert_eq!(updated.status, TaskStatus::Done);
        assert!(updated.updated_at > created.updated_at);

        let missing = service
            .update(
                999,
                UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .expect("Update must not fail");
        assert!(missing.is_none());

        let done = service
            .list(&QueryTask {
                status: Some(TaskStatus::Done),
                ..Default::default()
            })
            .await
            .expect("Failed to list tasks");
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, 1);

        assert!(service.delete(1).await.expect("Delete failed"));
        let gone = service
            .read_one(TaskLookup::ById(1))
            .await
            .expect("Lookup must not fail");
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_without_script_is_noop() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        let service = TaskService::bootstrap(pool, Path::new("does-not-exist.sql"))
            .await
            .expect("Missing script must be a no-op");
        service.ping().await.expect("Connection must stay usable");
    }
}
