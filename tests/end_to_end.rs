use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use regex::Regex;
use sitelog::{
    db::{Database, Sqlite},
    logging::{ConsoleWriter, DbLogger, InsertFn, Level, LogConfig, LogRecord, LoggerError},
    CapturedError, Logger,
};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn logger_in(dir: &std::path::Path, level: Level, capture: &Capture) -> Logger {
    Logger::builder()
        .with_dir(dir)
        .with_level(level)
        .with_console(ConsoleWriter::new(capture.clone()))
        .build()
        .unwrap()
}

#[test]
fn default_template_renders_kind_date_and_message() {
    let dir = tempfile::tempdir().unwrap();
    let capture = Capture::default();
    let logger = logger_in(dir.path(), Level::Info, &capture);

    logger.console().info("hello").unwrap();
    logger.console().log("hidden").unwrap();

    let line = Regex::new(r"^\(INFO\)\[\d{1,2}-\d{1,2}-\d{4}, \d{1,2}:\d{2}\] - hello$").unwrap();
    let lines = capture.lines();
    assert_eq!(lines.len(), 1);
    assert!(line.is_match(&lines[0]), "{:?}", lines[0]);
}

#[test]
fn threshold_gates_every_level_of_the_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let capture = Capture::default();
    let mut logger = logger_in(dir.path(), Level::Warn, &capture);
    logger.set_format("%{T} %{R}");

    let sink = logger.file_sink();
    sink.log("a").unwrap();
    sink.info("b").unwrap();
    sink.warn("c").unwrap();
    sink.error("d").unwrap();
    sink.fatal("e").unwrap();

    let contents = std::fs::read_to_string(logger.file()).unwrap();
    assert_eq!(contents, "WARN c\nERROR d\nFATAL e\n");

    logger.set_level(Level::None);
    logger.file_sink().fatal("f").unwrap();
    assert_eq!(std::fs::read_to_string(logger.file()).unwrap(), contents);
}

#[cfg(unix)]
#[test]
fn inaccessible_override_is_rejected_and_instance_file_untouched() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let locked = dir.path().join("locked.log");
    std::fs::write(&locked, "").unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    let accessible = std::fs::OpenOptions::new()
        .read(true)
        .append(true)
        .open(&locked)
        .is_ok();

    let capture = Capture::default();
    let mut logger = logger_in(dir.path(), Level::All, &capture);
    logger.set_format("%{R}");
    let instance_file = logger.file().to_path_buf();

    let result = logger
        .file_sink()
        .with_config(LogConfig::new().file("locked.log"))
        .error("nope");

    if accessible {
        // Privileged users may write regardless of mode.
        result.unwrap();
        assert_eq!(std::fs::read_to_string(&locked).unwrap(), "nope\n");
    } else {
        assert!(matches!(result, Err(LoggerError::ConfigInvalid(_))));
    }
    assert_eq!(logger.file(), instance_file);
    assert!(!instance_file.exists());
}

fn reporting_job(logger: &Logger) -> Result<(), LoggerError> {
    sitelog::warn!(logger.console(), "queue at {}%", 80)
}

#[test]
fn macros_name_the_enclosing_function() {
    let dir = tempfile::tempdir().unwrap();
    let capture = Capture::default();
    let mut logger = logger_in(dir.path(), Level::All, &capture);
    logger.set_format("%{T}|%{F}|%{R}");

    reporting_job(&logger).unwrap();

    assert_eq!(capture.lines(), vec!["WARN|end_to_end::reporting_job|queue at 80%"]);
}

#[test]
fn call_site_line_is_the_callers() {
    let dir = tempfile::tempdir().unwrap();
    let capture = Capture::default();
    let mut logger = logger_in(dir.path(), Level::All, &capture);
    logger.set_format("%{A}:%{L}");

    logger.console().error("x").unwrap();
    let line = line!() - 1;

    assert_eq!(capture.lines(), vec![format!("{}:{}", file!(), line)]);
}

#[derive(Debug, thiserror::Error)]
#[error("token expired")]
struct AuthError;

#[test]
fn domain_errors_use_the_error_template() {
    let dir = tempfile::tempdir().unwrap();
    let capture = Capture::default();
    let mut logger = logger_in(dir.path(), Level::All, &capture);
    logger.set_error_format("%{N}: %{E} / %{R}");

    logger
        .console()
        .with_error(CapturedError::from_error(&AuthError))
        .error("request rejected")
        .unwrap();

    assert_eq!(capture.lines(), vec!["AuthError: token expired / request rejected"]);
}

#[tokio::test]
async fn sqlite_collaborator_stores_rendered_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs.sqlite3").to_string_lossy().to_string();
    let db = Sqlite::new(&path).await.unwrap();

    let capture = Capture::default();
    let mut logger = logger_in(dir.path(), Level::Info, &capture);
    logger.set_format("%{T} %{R}");

    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let store = Sqlite::insert();
    let insert: InsertFn<Sqlite> = Arc::new(
        move |line: &str, db: &Sqlite, record: &LogRecord, logger: &DbLogger<Sqlite>| {
            let pending = store(line, db, record, logger);
            let sender = sender.clone();
            async move {
                let result = pending.await;
                let _ = sender.send(());
                result
            }
            .boxed()
        },
    );

    let db_logger = DbLogger::connect(logger, db.clone(), insert, Sqlite::check())
        .await
        .unwrap();
    db_logger.database().log("skipped").await.unwrap();
    db_logger.database().info("stored").await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .unwrap()
        .unwrap();

    let entries = db.recent(DateTime::<Utc>::UNIX_EPOCH, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].rendered, "INFO stored");
    assert_eq!(entries[0].level, "INFO");
    assert!(entries[0].file.ends_with("end_to_end.rs"));
}
