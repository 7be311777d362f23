//! Database sink.
//!
//! The library doesn't talk to any database itself: the application injects
//! a connection check and an insert callback, both returning boxed futures.
//! The check is awaited whenever a connection config is set. Inserts are
//! fire-and-forget: the future returned by the callback is spawned on the
//! current tokio runtime and its outcome only reaches the optional failure
//! observer.

use std::{fmt::Display, sync::Arc};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::runtime::Handle;

use super::{
    merge::{LogConfig, SinkKind},
    palette::ColorPalette,
    pipeline::{LogRecord, Request},
    sinks::{ConsoleSink, FileSink},
    trace::{CallSite, CapturedError},
    Level, Logger, LoggerError, INTERNAL_TARGET,
};

/// `check(connection, logger)`: `Ok(false)` and `Err` both count as a failed
/// connection.
pub type CheckFn<T> =
    Arc<dyn Fn(&T, &DbLogger<T>) -> BoxFuture<'static, eyre::Result<bool>> + Send + Sync>;

/// `insert(line, connection, record, logger)`.
pub type InsertFn<T> = Arc<
    dyn Fn(&str, &T, &LogRecord, &DbLogger<T>) -> BoxFuture<'static, eyre::Result<()>>
        + Send
        + Sync,
>;

pub type FailureObserver = Arc<dyn Fn(&eyre::Report) + Send + Sync>;

/// A check that always succeeds.
pub fn accept_any<T: 'static>() -> CheckFn<T> {
    Arc::new(|_: &T, _: &DbLogger<T>| async { Ok::<bool, eyre::Report>(true) }.boxed())
}

/// An insert that discards the line.
pub fn discard<T: 'static>() -> InsertFn<T> {
    Arc::new(|_: &str, _: &T, _: &LogRecord, _: &DbLogger<T>| {
        async { Ok::<(), eyre::Report>(()) }.boxed()
    })
}

/// A [`Logger`] extended with a database connection.
///
/// Console and file output keep working through [`DbLogger::console`] and
/// [`DbLogger::file_sink`].
pub struct DbLogger<T> {
    logger: Logger,
    connection: T,
    check: CheckFn<T>,
    insert: InsertFn<T>,
    observer: Option<FailureObserver>,
}

impl<T> DbLogger<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Builds the logger once `check` accepts `connection`.
    pub async fn connect(
        logger: Logger,
        connection: T,
        insert: InsertFn<T>,
        check: CheckFn<T>,
    ) -> Result<Self, LoggerError> {
        let db = Self {
            logger,
            connection,
            check,
            insert,
            observer: None,
        };
        db.check_connection(&db.connection, None).await?;
        Ok(db)
    }

    async fn check_connection(
        &self,
        connection: &T,
        check: Option<&CheckFn<T>>,
    ) -> Result<(), LoggerError> {
        let check = check.unwrap_or(&self.check);
        match check(connection, self).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(LoggerError::ConnectionFailed { source: None }),
            Err(err) => {
                log::debug!(target: INTERNAL_TARGET, "connection check failed: {}", err);
                Err(LoggerError::ConnectionFailed {
                    source: Some(err.into()),
                })
            }
        }
    }

    pub fn connection(&self) -> &T {
        &self.connection
    }

    /// Switches to `connection` after it passes the check. On failure the
    /// previous connection stays in place.
    pub async fn set_connection(&mut self, connection: T) -> Result<(), LoggerError> {
        self.check_connection(&connection, None).await?;
        self.connection = connection;
        Ok(())
    }

    pub fn check(&self) -> &CheckFn<T> {
        &self.check
    }

    pub fn set_check(&mut self, check: CheckFn<T>) {
        self.check = check;
    }

    pub fn insert(&self) -> &InsertFn<T> {
        &self.insert
    }

    pub fn set_insert(&mut self, insert: InsertFn<T>) {
        self.insert = insert;
    }

    /// Called with the error of every insert that fails.
    pub fn on_insert_failure(&mut self, observer: impl Fn(&eyre::Report) + Send + Sync + 'static) {
        self.observer = Some(Arc::new(observer));
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    pub fn console(&self) -> ConsoleSink<'_> {
        self.logger.console()
    }

    pub fn file_sink(&self) -> FileSink<'_> {
        self.logger.file_sink()
    }

    pub fn database(&self) -> DbSink<'_, T> {
        DbSink {
            db: self,
            config: DbConfig::default(),
            error: None,
            function: None,
        }
    }
}

/// Per-call overrides for the database sink.
pub struct DbConfig<T> {
    pub format: Option<String>,
    pub connection: Option<T>,
    pub check: Option<CheckFn<T>>,
    pub insert: Option<InsertFn<T>>,
}

impl<T> Default for DbConfig<T> {
    fn default() -> Self {
        Self {
            format: None,
            connection: None,
            check: None,
            insert: None,
        }
    }
}

impl<T> DbConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            ..self
        }
    }

    /// A connection for this call only, checked before use.
    pub fn connection(self, connection: T) -> Self {
        Self {
            connection: Some(connection),
            ..self
        }
    }

    pub fn check(self, check: CheckFn<T>) -> Self {
        Self {
            check: Some(check),
            ..self
        }
    }

    pub fn insert(self, insert: InsertFn<T>) -> Self {
        Self {
            insert: Some(insert),
            ..self
        }
    }
}

/// Per-call database settings after merging.
pub struct DbEffectiveConfig<T> {
    pub connection: T,
    pub insert: InsertFn<T>,
}

macro_rules! async_level_methods {
    ($($name:ident => $level:expr),+ $(,)?) => {
        $(
            /// Resolves once the insert has been handed to the runtime.
            #[track_caller]
            pub fn $name(&self, message: impl Display) -> BoxFuture<'_, Result<(), LoggerError>> {
                self.emit($level, message.to_string(), CallSite::caller()).boxed()
            }
        )+
    };
}

pub struct DbSink<'a, T> {
    db: &'a DbLogger<T>,
    config: DbConfig<T>,
    error: Option<CapturedError>,
    function: Option<String>,
}

impl<'a, T> DbSink<'a, T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn with_config(self, config: DbConfig<T>) -> Self {
        Self { config, ..self }
    }

    pub fn with_error(self, error: CapturedError) -> Self {
        Self {
            error: Some(error),
            ..self
        }
    }

    pub fn in_function(self, function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            ..self
        }
    }

    async_level_methods! {
        log => Level::Log,
        info => Level::Info,
        warn => Level::Warn,
        error => Level::Error,
        fatal => Level::Fatal,
    }

    /// Connection and insert callback for this call. A per-call connection
    /// goes through the per-call check, or the logger's.
    pub async fn merge(&self) -> Result<DbEffectiveConfig<T>, LoggerError> {
        let connection = match &self.config.connection {
            Some(connection) => {
                self.db
                    .check_connection(connection, self.config.check.as_ref())
                    .await?;
                connection.clone()
            }
            None => self.db.connection.clone(),
        };

        let insert = self
            .config
            .insert
            .clone()
            .unwrap_or_else(|| self.db.insert.clone());

        Ok(DbEffectiveConfig { connection, insert })
    }

    pub async fn emit(
        &self,
        level: Level,
        message: String,
        site: CallSite,
    ) -> Result<(), LoggerError> {
        let site = match &self.function {
            Some(function) => site.in_function(function.as_str()),
            None => site,
        };

        let overrides = LogConfig {
            format: self.config.format.clone(),
            ..LogConfig::default()
        };

        let request = Request {
            owner: "LoggerDb",
            sink: SinkKind::Database,
            level,
            message,
            overrides: &overrides,
            error: self.error.clone(),
            site,
        };

        let Some(prepared) = self.db.logger.prepare(request, &ColorPalette::plain())? else {
            return Ok(());
        };

        let DbEffectiveConfig { connection, insert } = self.merge().await?;
        let runtime = Handle::try_current().map_err(|_| LoggerError::NoRuntime)?;

        let pending = insert(&prepared.line, &connection, &prepared.record, self.db);
        let observer = self.db.observer.clone();

        runtime.spawn(async move {
            if let Err(err) = pending.await {
                log::warn!(target: INTERNAL_TARGET, "log insert failed: {}", err);
                if let Some(observer) = observer {
                    observer(&err);
                }
            }
        });

        Ok(())
    }
}
