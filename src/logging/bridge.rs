use eyre::Context;
use log::{LevelFilter, Log};

use super::{trace::CallSite, Level, Logger, INTERNAL_TARGET};

/// Which sink `log` records are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Console,
    File,
}

/// Adapter installing a [`Logger`] behind the `log` facade.
///
/// Records keep their own origin: file, line and module path come from the
/// `log` record rather than a captured trace. Records from sitelog's own
/// target are dropped so the logger never logs about itself.
pub struct Bridge {
    logger: Logger,
    filter: LevelFilter,
    route: Route,
}

impl Bridge {
    pub fn new(logger: Logger, filter: LevelFilter, route: Route) -> Self {
        Self {
            logger,
            filter,
            route,
        }
    }

    pub fn init(self) -> eyre::Result<()> {
        log::set_max_level(self.filter);
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;

        Ok(())
    }

    fn call_site(record: &log::Record) -> CallSite {
        CallSite::new(
            record.file().unwrap_or_default(),
            record.line().unwrap_or_default(),
            0,
        )
        .in_function(record.module_path().unwrap_or_default())
    }
}

impl Log for Bridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.target() != INTERNAL_TARGET
            && self.filter >= metadata.level()
            && Level::from(metadata.level()).passes(self.logger.level())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = Level::from(record.level());
        let site = Self::call_site(record);
        let result = match self.route {
            Route::Console => self.logger.console().emit(level, record.args(), site),
            Route::File => self.logger.file_sink().emit(level, record.args(), site),
        };

        if let Err(err) = result {
            eprintln!("sitelog: {}", err);
        }
    }

    fn flush(&self) {
        let _ = self.logger.console_writer().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{self, Write},
        sync::{Arc, Mutex},
    };

    use crate::logging::ConsoleWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn bridge(dir: &std::path::Path, buffer: &Buffer, route: Route) -> Bridge {
        let logger = Logger::builder()
            .with_dir(dir)
            .with_level(Level::Info)
            .with_format("%{T} %{F} %{A}:%{L} %{R}")
            .with_console(ConsoleWriter::new(buffer.clone()))
            .build()
            .unwrap();
        Bridge::new(logger, LevelFilter::Trace, route)
    }

    fn record<'a>(level: log::Level, target: &'a str, args: std::fmt::Arguments<'a>) -> log::Record<'a> {
        log::Record::builder()
            .level(level)
            .target(target)
            .args(args)
            .file(Some("src/app.rs"))
            .line(Some(21))
            .module_path(Some("app::jobs"))
            .build()
    }

    #[test]
    fn routes_records_with_their_origin() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Buffer::default();
        let bridge = bridge(dir.path(), &buffer, Route::Console);

        bridge.log(&record(log::Level::Warn, "app", format_args!("disk at {}%", 91)));

        let out = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out, "WARN app::jobs src/app.rs:21 disk at 91%\n");
    }

    #[test]
    fn drops_internal_and_gated_records() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Buffer::default();
        let bridge = bridge(dir.path(), &buffer, Route::File);

        bridge.log(&record(log::Level::Error, INTERNAL_TARGET, format_args!("self")));
        bridge.log(&record(log::Level::Debug, "app", format_args!("too low")));
        assert!(!bridge.logger.file().exists());

        bridge.log(&record(log::Level::Error, "app", format_args!("kept")));
        let contents = std::fs::read_to_string(bridge.logger.file()).unwrap();
        assert_eq!(contents, "ERROR app::jobs src/app.rs:21 kept\n");
        assert!(buffer.0.lock().unwrap().is_empty());
    }
}
