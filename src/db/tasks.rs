//! Task storage on SQLite.

use super::Database;
use crate::error::StorageResult;
use crate::repository::TaskRepository;
use crate::types::{Priority, Task, TaskUpdate, now_timestamp};
use rusqlite::{Connection, OptionalExtension, Row, params};

const TASK_COLUMNS: &str =
    "id, title, description, priority, due_date, completed, created_at, updated_at";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id: i64 = row.get("id")?;
    let title: String = row.get("title")?;
    let description: Option<String> = row.get("description")?;
    let priority: i64 = row.get("priority")?;
    let due_date: Option<String> = row.get("due_date")?;
    let completed: bool = row.get("completed")?;
    let created_at: Option<String> = row.get("created_at")?;
    let updated_at: Option<String> = row.get("updated_at")?;

    Ok(Task {
        id: Some(id),
        title,
        description: description.unwrap_or_default(),
        priority: Priority::new(priority),
        due_date,
        completed,
        created_at: created_at.unwrap_or_default(),
        updated_at: updated_at.unwrap_or_default(),
    })
}

fn get_task_internal(conn: &Connection, id: i64) -> StorageResult<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    let task = conn
        .query_row(&sql, params![id], parse_task_row)
        .optional()?;
    Ok(task)
}

impl TaskRepository for Database {
    fn get_all(&self) -> StorageResult<Vec<Task>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 ORDER BY completed ASC, priority ASC, due_date IS NULL, due_date ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    fn get_by_id(&self, id: i64) -> StorageResult<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, id))
    }

    fn create(&self, task: Task) -> StorageResult<Task> {
        let now = now_timestamp();

        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO tasks (title, description, priority, due_date, completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    task.title,
                    task.description,
                    task.priority.value(),
                    task.due_date,
                    task.completed,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();

            Ok(Task {
                id: Some(id),
                created_at: now.clone(),
                updated_at: now.clone(),
                ..task
            })
        })
    }

    fn update(&self, id: i64, update: &TaskUpdate) -> StorageResult<Option<Task>> {
        if update.is_empty() {
            return Ok(None);
        }

        let now = now_timestamp();

        self.with_tx(|conn| {
            let mut set_clauses: Vec<&str> = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(title) = &update.title {
                set_clauses.push("title = ?");
                params_vec.push(Box::new(title.clone()));
            }
            if let Some(description) = &update.description {
                set_clauses.push("description = ?");
                params_vec.push(Box::new(description.clone()));
            }
            if let Some(priority) = update.priority {
                set_clauses.push("priority = ?");
                params_vec.push(Box::new(priority.value()));
            }
            if let Some(due_date) = &update.due_date {
                set_clauses.push("due_date = ?");
                params_vec.push(Box::new(due_date.clone()));
            }
            if let Some(completed) = update.completed {
                set_clauses.push("completed = ?");
                params_vec.push(Box::new(completed));
            }

            // Never move updated_at backwards, even if the clock does.
            set_clauses.push("updated_at = MAX(?, COALESCE(updated_at, ''))");
            params_vec.push(Box::new(now));
            params_vec.push(Box::new(id));

            let sql = format!("UPDATE tasks SET {} WHERE id = ?", set_clauses.join(", "));
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|p| p.as_ref()).collect();
            let changed = conn.execute(&sql, params_refs.as_slice())?;

            if changed == 0 {
                return Ok(None);
            }
            get_task_internal(conn, id)
        })
    }

    fn delete(&self, id: i64) -> StorageResult<bool> {
        self.with_tx(|conn| {
            let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
    }

    fn mark_completed(&self, id: i64, completed: bool) -> StorageResult<Option<Task>> {
        self.update(id, &TaskUpdate::new().completed(completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_columns_read_as_defaults() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (title, description, created_at, updated_at)
                 VALUES ('legacy', NULL, NULL, NULL)",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let task = db.get_by_id(1).unwrap().unwrap();
        assert_eq!(task.description, "");
        assert_eq!(task.priority.value(), 3);
        assert!(!task.completed);
        assert_eq!(task.created_at, "");
    }

    #[test]
    fn due_date_column_has_text_affinity() {
        let db = Database::open_in_memory().unwrap();
        let task = db
            .create(Task::new("year only").with_due_date(Some("2027".into())))
            .unwrap();
        let stored: String = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT typeof(due_date) FROM tasks WHERE id = ?1",
                    params![task.id],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(stored, "text");
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let result: StorageResult<()> = db.with_tx(|conn| {
            conn.execute("INSERT INTO tasks (title) VALUES ('doomed')", [])?;
            conn.execute("INSERT INTO no_such_table (x) VALUES (1)", [])?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(db.get_all().unwrap().is_empty());

        // The connection is usable again afterwards
        let task = db.create(Task::new("after")).unwrap();
        assert_eq!(task.title, "after");
    }
}
