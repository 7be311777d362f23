use std::fmt::Display;

use clap::{Args, ValueEnum};
use eyre::{Context, OptionExt};
use futures_util::FutureExt;
use sitelog::{
    db::{Database, LogEntry, Sqlite},
    logging::{CallSite, CapturedError, DbLogger, InsertFn, Level, LogConfig, LogRecord},
};

use super::Cli;
use crate::config::ConfigManager;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SinkType {
    Console,
    File,
    Db,
}

impl Display for SinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkType::Console => write!(f, "console"),
            SinkType::File => write!(f, "file"),
            SinkType::Db => write!(f, "db"),
        }
    }
}

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(index = 1, value_name = "LEVEL", help = "log, info, warn, error or fatal.")]
    pub severity: Level,

    #[arg(index = 2)]
    pub message: String,

    #[arg(long, short, value_enum, default_value_t = SinkType::Console)]
    pub sink: SinkType,

    #[arg(long, help = "SQLite database for the db sink. Defaults to the one in the data directory.")]
    pub db: Option<String>,

    #[arg(long, requires = "error_message", help = "Report an error of this kind.")]
    pub error_name: Option<String>,

    #[arg(long, requires = "error_name", help = "Message of the reported error.")]
    pub error_message: Option<String>,

    #[arg(long, help = "Write this line to another file in the log directory.")]
    pub override_file: Option<String>,

    #[arg(long, help = "Render this line with another template.")]
    pub override_format: Option<String>,

    #[arg(long, help = "Encode this line differently. Only used by the file sink.")]
    pub override_encoding: Option<String>,
}

impl Cmd {
    pub async fn run(&self, cli: &Cli, config: &impl ConfigManager) -> eyre::Result<()> {
        if !Level::EMITTABLE.contains(&self.severity) {
            return Err(eyre::eyre!(
                "Can't emit at level {}, pick one of log, info, warn, error or fatal",
                self.severity
            ));
        }

        let logger = cli.logger(config)?;
        let site = CallSite::caller().in_function("sitelog::emit");
        let error = self.error();

        match self.sink {
            SinkType::Console => {
                let mut sink = logger.console().with_config(self.overrides());
                if let Some(error) = error {
                    sink = sink.with_error(error);
                }
                sink.emit(self.severity, &self.message, site)?;
            }
            SinkType::File => {
                let mut sink = logger.file_sink().with_config(self.overrides());
                if let Some(error) = error {
                    sink = sink.with_error(error);
                }
                sink.emit(self.severity, &self.message, site)?;
                log::debug!("appended to {}", logger.file().display());
            }
            SinkType::Db => {
                let path = match &self.db {
                    Some(path) => path.clone(),
                    None => config.get_db_path()?,
                };
                let db = <Sqlite as Database>::new(&path).await?;
                self.emit_to_db(logger, db, error, site).await?;
            }
        }

        Ok(())
    }

    fn overrides(&self) -> LogConfig {
        let mut overrides = LogConfig::new();
        if let Some(file) = &self.override_file {
            overrides = overrides.file(file);
        }
        if let Some(format) = &self.override_format {
            overrides = overrides.format(format);
        }
        if let Some(encoding) = &self.override_encoding {
            overrides = overrides.encoding(encoding);
        }
        overrides
    }

    #[track_caller]
    fn error(&self) -> Option<CapturedError> {
        let name = self.error_name.as_deref()?;
        let message = self.error_message.as_deref().unwrap_or_default();
        let frame = CallSite::caller().in_function("sitelog::emit").frame();

        Some(
            CapturedError::named(name, message)
                .with_trace(format!("{}: {}\n    {}", name, message, frame)),
        )
    }

    async fn emit_to_db(
        &self,
        logger: sitelog::Logger,
        db: Sqlite,
        error: Option<CapturedError>,
        site: CallSite,
    ) -> eyre::Result<()> {
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();

        // The process exits once the command returns, so the insert reports
        // back instead of staying fire-and-forget.
        let insert: InsertFn<Sqlite> = std::sync::Arc::new(
            move |line: &str, db: &Sqlite, record: &LogRecord, _: &DbLogger<Sqlite>| {
                let db = db.clone();
                let entry = LogEntry::new(line, record);
                let sender = sender.clone();
                async move {
                    let result = db.save(&entry).await;
                    let outcome = result.as_ref().map(|_| entry.id()).map_err(|e| e.to_string());
                    let _ = sender.send(outcome);
                    result
                }
                .boxed()
            },
        );

        let db_logger = DbLogger::connect(logger, db, insert, Sqlite::check())
            .await
            .context("Failed connecting to the log database")?;

        let mut sink = db_logger.database();
        if let Some(format) = &self.override_format {
            sink = sink.with_config(sitelog::DbConfig::new().format(format));
        }
        if let Some(error) = error {
            sink = sink.with_error(error);
        }
        sink.emit(self.severity, self.message.clone(), site).await?;

        if !self.severity.passes(db_logger.logger().level()) {
            return Ok(());
        }

        let id = receiver
            .recv()
            .await
            .ok_or_eyre("Insert never completed")?
            .map_err(|e| eyre::eyre!(e))
            .context("Failed storing log line")?;

        log::debug!("stored log line {}", id);
        Ok(())
    }
}
