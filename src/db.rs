//! SQLite collaborator for [`DbLogger`].
//!
//! [`Sqlite::check`] and [`Sqlite::insert`] build the callbacks a database
//! logger needs, so an application gets persistent log lines without writing
//! its own glue.

use std::{fmt::Debug, fs, path::Path, str::FromStr, time::Duration};

use chrono::{DateTime, SubsecRound, Utc};
use eyre::{Context, OptionExt};
use futures_util::FutureExt;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Row, SqlitePool,
};
use uuid::Uuid;

use crate::logging::{CheckFn, DbLogger, InsertFn, LogRecord, INTERNAL_TARGET};

/// One stored emission.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct LogEntry {
    id: String,
    pub level: String,
    pub message: String,
    pub rendered: String,
    pub error_name: String,
    pub error_message: String,
    pub file: String,
    pub function: String,
    pub source_line: String,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(rendered: impl Into<String>, record: &LogRecord) -> Self {
        Self {
            id: Uuid::new_v4().as_simple().to_string(),
            level: record.kind.clone(),
            message: record.message.clone(),
            rendered: rendered.into(),
            error_name: record.error_name.clone(),
            error_message: record.error_message.clone(),
            file: record.file.clone(),
            function: record.function.clone(),
            source_line: record.line.clone(),
            created_at: Utc::now().trunc_subsecs(3),
        }
    }

    pub fn id(&self) -> String {
        self.id.clone()
    }
}

pub trait Database: Sized + Clone + Send + Sync + 'static {
    type Settings: Debug + Clone + Send + Sync + 'static;
    async fn new(settings: &Self::Settings) -> eyre::Result<Self>;
    async fn ping(&self) -> eyre::Result<bool>;
    async fn save(&self, entry: &LogEntry) -> eyre::Result<()>;
    /// Entries created at or after `since`, newest first.
    async fn recent(&self, since: DateTime<Utc>, limit: i64) -> eyre::Result<Vec<LogEntry>>;
    async fn version(&self) -> eyre::Result<String>;
    fn engine(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct Sqlite {
    pool: SqlitePool,
}

impl Sqlite {
    async fn setup_db(pool: &SqlitePool) -> eyre::Result<()> {
        sqlx::query(
            "create table if not exists log_entries(
                id              text primary key,
                level           text not null,
                message         text not null,
                rendered        text not null,
                error_name      text not null,
                error_message   text not null,
                file            text not null,
                function        text not null,
                source_line     text not null,
                created_at      integer not null
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "create index if not exists idx_log_entries_created_at on log_entries(created_at)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Connection check for [`DbLogger::connect`], backed by [`Database::ping`].
    pub fn check() -> CheckFn<Sqlite> {
        std::sync::Arc::new(|db: &Sqlite, _: &DbLogger<Sqlite>| {
            let db = db.clone();
            async move { db.ping().await }.boxed()
        })
    }

    /// Insert callback storing every line as a [`LogEntry`].
    pub fn insert() -> InsertFn<Sqlite> {
        std::sync::Arc::new(
            |line: &str, db: &Sqlite, record: &LogRecord, _: &DbLogger<Sqlite>| {
                let db = db.clone();
                let entry = LogEntry::new(line, record);
                async move { db.save(&entry).await }.boxed()
            },
        )
    }
}

impl Database for Sqlite {
    type Settings = String;

    async fn new(path: &Self::Settings) -> eyre::Result<Self> {
        let path = Path::new(path);
        log::debug!(target: INTERNAL_TARGET, "opening sqlite database at {}", path.display());

        let create = !path.exists();
        if create {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
        }

        let url = path
            .as_os_str()
            .to_str()
            .ok_or_eyre("Database path is not valid UTF-8")?;

        let opts = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .optimize_on_close(true, None)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(opts)
            .await
            .wrap_err_with(|| format!("Failed opening {}", path.display()))?;

        Self::setup_db(&pool).await?;

        Ok(Self { pool })
    }

    async fn ping(&self) -> eyre::Result<bool> {
        let one: i64 = sqlx::query_scalar("select 1").fetch_one(&self.pool).await?;
        Ok(one == 1)
    }

    async fn save(&self, entry: &LogEntry) -> eyre::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "insert or ignore into log_entries(
                id, level, message, rendered, error_name, error_message,
                file, function, source_line, created_at
            )
            values(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(entry.id.as_str())
        .bind(entry.level.as_str())
        .bind(entry.message.as_str())
        .bind(entry.rendered.as_str())
        .bind(entry.error_name.as_str())
        .bind(entry.error_message.as_str())
        .bind(entry.file.as_str())
        .bind(entry.function.as_str())
        .bind(entry.source_line.as_str())
        .bind(entry.created_at.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn recent(&self, since: DateTime<Utc>, limit: i64) -> eyre::Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            "select id, level, message, rendered, error_name, error_message,
                    file, function, source_line, created_at
                from log_entries
                where created_at >= ?1
                order by created_at desc, rowid desc
                limit ?2",
        )
        .bind(since.timestamp_millis())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> eyre::Result<LogEntry> {
                let created_ms: i64 = row.try_get("created_at")?;
                Ok(LogEntry {
                    id: row.try_get("id")?,
                    level: row.try_get("level")?,
                    message: row.try_get("message")?,
                    rendered: row.try_get("rendered")?,
                    error_name: row.try_get("error_name")?,
                    error_message: row.try_get("error_message")?,
                    file: row.try_get("file")?,
                    function: row.try_get("function")?,
                    source_line: row.try_get("source_line")?,
                    created_at: DateTime::from_timestamp_millis(created_ms)
                        .ok_or_eyre("Stored timestamp out of range")?,
                })
            })
            .collect()
    }

    async fn version(&self) -> eyre::Result<String> {
        let result: String = sqlx::query_scalar("select sqlite_version()")
            .fetch_one(&self.pool)
            .await
            .context("Failed reading sqlite version")?;

        Ok(result)
    }

    fn engine(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open(dir: &tempfile::TempDir) -> Sqlite {
        let path = dir.path().join("nested").join("logs.sqlite3");
        Sqlite::new(&path.to_string_lossy().to_string()).await.unwrap()
    }

    fn record(kind: &str, message: &str) -> LogRecord {
        LogRecord {
            kind: kind.to_string(),
            message: message.to_string(),
            line: "12".to_string(),
            file: "src/main.rs".to_string(),
            function: "main".to_string(),
            ..LogRecord::default()
        }
    }

    #[tokio::test]
    async fn creates_schema_and_pings() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        assert!(db.ping().await.unwrap());
        assert_eq!(db.engine(), "sqlite");
        assert!(!db.version().await.unwrap().is_empty());
        assert!(dir.path().join("nested").join("logs.sqlite3").exists());
    }

    #[tokio::test]
    async fn saves_and_lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        let mut first = LogEntry::new("INFO one", &record("INFO", "one"));
        first.created_at = DateTime::from_timestamp_millis(1_000).unwrap();
        let second = LogEntry::new("WARN two", &record("WARN", "two"));
        db.save(&first).await.unwrap();
        db.save(&second).await.unwrap();

        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        let all = db.recent(epoch, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], second);
        assert_eq!(all[1].rendered, "INFO one");

        let newer = db.recent(DateTime::from_timestamp_millis(2_000).unwrap(), 10).await.unwrap();
        assert_eq!(newer, vec![second.clone()]);

        let limited = db.recent(epoch, 1).await.unwrap();
        assert_eq!(limited[0].id(), second.id());
    }
}
