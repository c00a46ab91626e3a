//! Local SQLite persistence: students, classes and submitted responses.
//!
//! Responses are append-only; "last response" means the most recent by
//! submission date. Connections are opened per call inside
//! `spawn_blocking`, with a busy timeout and a single reconnect-and-retry
//! on a locked database before the failure is surfaced.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::task;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("failed to serialize response payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown student: {0}")]
    UnknownStudent(String),
    #[error("unknown class code: {0}")]
    UnknownClassCode(String),
}

/// Identity of a registered student; never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub full_name: String,
    pub class_name: String,
}

/// A student joined with their most recent submission, if any.
#[derive(Debug, Clone)]
pub struct StudentRow {
    pub student_id: String,
    pub full_name: String,
    pub class_name: String,
    pub class_code: Option<String>,
    pub last_response: Option<Value>,
    pub submission_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassRow {
    pub class_name: String,
    pub class_code: String,
    pub student_count: i64,
}

/// The persistence interface the pipeline consumes. Implementations own
/// their connection liveness; every call may block and may fail.
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Cheap liveness probe for health checks.
    async fn probe(&self) -> Result<(), StoreError>;
    async fn get_student_info(&self, student_id: &str) -> Result<Option<StudentRecord>, StoreError>;
    /// Appends a response record; never updates or deletes existing ones.
    async fn save_response(&self, student_id: &str, payload: Value) -> Result<(), StoreError>;
    async fn last_response(&self, student_id: &str) -> Result<Option<Value>, StoreError>;
    async fn students_with_last_response(&self) -> Result<Vec<StudentRow>, StoreError>;
    async fn students_in_class(&self, class_name: &str) -> Result<Vec<StudentRow>, StoreError>;
    async fn classes_with_counts(&self) -> Result<Vec<ClassRow>, StoreError>;
}

#[derive(Clone)]
pub struct SqliteStudentStore {
    db_path: PathBuf,
}

fn open(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(10))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::DatabaseBusy
                || err.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

impl SqliteStudentStore {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = db_path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let path_clone = path.clone();

        task::spawn_blocking(move || {
            let conn = open(&path_clone)?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS students (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    student_id TEXT UNIQUE NOT NULL,
                    full_name TEXT NOT NULL,
                    class_name TEXT NOT NULL,
                    registration_date TEXT DEFAULT CURRENT_TIMESTAMP
                );
                CREATE TABLE IF NOT EXISTS student_responses (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    student_id TEXT NOT NULL,
                    response_data TEXT NOT NULL,
                    submission_date TEXT NOT NULL,
                    FOREIGN KEY (student_id) REFERENCES students(student_id) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS classes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    class_name TEXT UNIQUE NOT NULL,
                    class_code TEXT UNIQUE NOT NULL,
                    creation_date TEXT DEFAULT CURRENT_TIMESTAMP
                );
                CREATE INDEX IF NOT EXISTS idx_student_id ON students(student_id);
                CREATE INDEX IF NOT EXISTS idx_student_class ON students(class_name);
                CREATE INDEX IF NOT EXISTS idx_response_student ON student_responses(student_id);
                CREATE INDEX IF NOT EXISTS idx_class_name ON classes(class_name);
                CREATE INDEX IF NOT EXISTS idx_class_code ON classes(class_code);
                "#,
            )?;
            Ok::<_, StoreError>(())
        })
        .await??;

        Ok(Self { db_path: path })
    }

    /// Registers a class; the code is what students enroll with.
    pub async fn create_class(&self, class_name: &str, class_code: &str) -> Result<(), StoreError> {
        let path = self.db_path.clone();
        let name = class_name.trim().to_string();
        let code = class_code.trim().to_string();

        task::spawn_blocking(move || {
            let conn = open(&path)?;
            conn.execute(
                "INSERT INTO classes (class_name, class_code) VALUES (?1, ?2)",
                params![&name, &code],
            )?;
            Ok::<_, StoreError>(())
        })
        .await?
    }

    pub async fn class_name_for_code(&self, class_code: &str) -> Result<Option<String>, StoreError> {
        let path = self.db_path.clone();
        let code = class_code.trim().to_string();

        task::spawn_blocking(move || {
            let name: Option<String> = open(&path)?
                .query_row(
                    "SELECT class_name FROM classes WHERE class_code = ?1",
                    params![&code],
                    |row| row.get(0),
                )
                .optional()?;
            Ok::<_, StoreError>(name)
        })
        .await?
    }

    /// Finds or creates a student by name within the class the code points
    /// to, returning the student id either way. New ids are `etu_` plus a
    /// short random suffix.
    pub async fn register_student(
        &self,
        full_name: &str,
        class_code: &str,
    ) -> Result<String, StoreError> {
        let path = self.db_path.clone();
        let name = full_name.trim().to_string();
        let code = class_code.trim().to_string();

        task::spawn_blocking(move || {
            let conn = open(&path)?;
            let class_name: Option<String> = conn
                .query_row(
                    "SELECT class_name FROM classes WHERE class_code = ?1",
                    params![&code],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(class_name) = class_name else {
                return Err(StoreError::UnknownClassCode(code));
            };

            let existing: Option<String> = conn
                .query_row(
                    "SELECT student_id FROM students WHERE full_name = ?1 AND class_name = ?2",
                    params![&name, &class_name],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(student_id) = existing {
                return Ok(student_id);
            }

            let student_id = format!("etu_{}", &Uuid::new_v4().simple().to_string()[..6]);
            conn.execute(
                "INSERT INTO students (student_id, full_name, class_name) VALUES (?1, ?2, ?3)",
                params![&student_id, &name, &class_name],
            )?;
            Ok(student_id)
        })
        .await?
    }

    /// Number of stored responses for one student; responses are
    /// append-only so this only ever grows.
    pub async fn response_count(&self, student_id: &str) -> Result<i64, StoreError> {
        let path = self.db_path.clone();
        let id = student_id.to_string();

        task::spawn_blocking(move || {
            let count: i64 = open(&path)?.query_row(
                "SELECT COUNT(*) FROM student_responses WHERE student_id = ?1",
                params![&id],
                |row| row.get(0),
            )?;
            Ok::<_, StoreError>(count)
        })
        .await?
    }
}

fn insert_response(
    conn: &Connection,
    student_id: &str,
    payload_json: &str,
    submitted_at: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO student_responses (student_id, response_data, submission_date) VALUES (?1, ?2, ?3)",
        params![student_id, payload_json, submitted_at],
    )?;
    Ok(())
}

fn parse_response(student_id: &str, raw: &str) -> Option<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("invalid stored response for student {student_id}: {e}");
            None
        }
    }
}

#[async_trait]
impl StudentStore for SqliteStudentStore {
    async fn probe(&self) -> Result<(), StoreError> {
        let path = self.db_path.clone();
        task::spawn_blocking(move || {
            open(&path)?.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok::<_, StoreError>(())
        })
        .await?
    }

    async fn get_student_info(&self, student_id: &str) -> Result<Option<StudentRecord>, StoreError> {
        let path = self.db_path.clone();
        let id = student_id.to_string();

        task::spawn_blocking(move || {
            let record = open(&path)?
                .query_row(
                    "SELECT student_id, full_name, class_name FROM students WHERE student_id = ?1",
                    params![&id],
                    |row| {
                        Ok(StudentRecord {
                            student_id: row.get(0)?,
                            full_name: row.get(1)?,
                            class_name: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok::<_, StoreError>(record)
        })
        .await?
    }

    async fn save_response(&self, student_id: &str, payload: Value) -> Result<(), StoreError> {
        let path = self.db_path.clone();
        let id = student_id.to_string();
        let payload_json = serde_json::to_string(&payload)?;

        task::spawn_blocking(move || {
            let conn = open(&path)?;
            let exists: Option<String> = conn
                .query_row(
                    "SELECT student_id FROM students WHERE student_id = ?1",
                    params![&id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::UnknownStudent(id));
            }

            let now = Utc::now().to_rfc3339();
            match insert_response(&conn, &id, &payload_json, &now) {
                Ok(()) => Ok(()),
                Err(e) if is_busy(&e) => {
                    warn!("database busy saving response for {id}; reconnecting and retrying once");
                    drop(conn);
                    let conn = open(&path)?;
                    insert_response(&conn, &id, &payload_json, &now)?;
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    async fn last_response(&self, student_id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.db_path.clone();
        let id = student_id.to_string();

        task::spawn_blocking(move || {
            let raw: Option<String> = open(&path)?
                .query_row(
                    "SELECT response_data FROM student_responses
                     WHERE student_id = ?1
                     ORDER BY submission_date DESC, id DESC
                     LIMIT 1",
                    params![&id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok::<_, StoreError>(raw.and_then(|r| parse_response(&id, &r)))
        })
        .await?
    }

    async fn students_with_last_response(&self) -> Result<Vec<StudentRow>, StoreError> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open(&path)?;
            let mut stmt = conn.prepare(
                "SELECT s.student_id, s.full_name, s.class_name, c.class_code,
                        r.response_data, r.submission_date
                 FROM students s
                 LEFT JOIN classes c ON s.class_name = c.class_name
                 LEFT JOIN (
                     SELECT student_id, response_data, MAX(submission_date) AS submission_date
                     FROM student_responses
                     GROUP BY student_id
                 ) r ON s.student_id = r.student_id
                 ORDER BY s.class_name, s.full_name",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok::<_, StoreError>(
                rows.into_iter()
                    .map(|(student_id, full_name, class_name, class_code, raw, submission_date)| {
                        let last_response = raw.and_then(|r| parse_response(&student_id, &r));
                        StudentRow {
                            student_id,
                            full_name,
                            class_name,
                            class_code,
                            last_response,
                            submission_date,
                        }
                    })
                    .collect(),
            )
        })
        .await?
    }

    async fn students_in_class(&self, class_name: &str) -> Result<Vec<StudentRow>, StoreError> {
        let path = self.db_path.clone();
        let class = class_name.to_string();

        task::spawn_blocking(move || {
            let conn = open(&path)?;
            let mut stmt = conn.prepare(
                "SELECT s.student_id, s.full_name, s.class_name,
                        r.response_data, r.submission_date
                 FROM students s
                 LEFT JOIN (
                     SELECT student_id, response_data, MAX(submission_date) AS submission_date
                     FROM student_responses
                     GROUP BY student_id
                 ) r ON s.student_id = r.student_id
                 WHERE s.class_name = ?1
                 ORDER BY s.full_name",
            )?;
            let rows = stmt
                .query_map(params![&class], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok::<_, StoreError>(
                rows.into_iter()
                    .map(|(student_id, full_name, class_name, raw, submission_date)| {
                        let last_response = raw.and_then(|r| parse_response(&student_id, &r));
                        StudentRow {
                            student_id,
                            full_name,
                            class_name,
                            class_code: None,
                            last_response,
                            submission_date,
                        }
                    })
                    .collect(),
            )
        })
        .await?
    }

    async fn classes_with_counts(&self) -> Result<Vec<ClassRow>, StoreError> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open(&path)?;
            let mut stmt = conn.prepare(
                "SELECT c.class_name, c.class_code, COUNT(s.student_id)
                 FROM classes c
                 LEFT JOIN students s ON c.class_name = s.class_name
                 GROUP BY c.class_name, c.class_code
                 ORDER BY c.class_name",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ClassRow {
                        class_name: row.get(0)?,
                        class_code: row.get(1)?,
                        student_count: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, StoreError>(rows)
        })
        .await?
    }
}
