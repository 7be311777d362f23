use std::{
    fmt::Display,
    fs::OpenOptions,
    io::{self, Write},
    sync::{Arc, Mutex},
};

use super::{
    merge::{LogConfig, SinkKind},
    palette::ColorPalette,
    pipeline::{Prepared, Request},
    trace::{CallSite, CapturedError},
    Level, Logger, LoggerError, INTERNAL_TARGET,
};

/// Shared handle to where console output goes.
#[derive(Clone)]
pub struct ConsoleWriter {
    handle: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ConsoleWriter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            handle: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self
            .handle
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()
    }

    pub fn flush(&self) -> io::Result<()> {
        self.handle
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?
            .flush()
    }
}

/// Everything a sink call carries besides the level and message.
struct Emission<'a> {
    logger: &'a Logger,
    config: LogConfig,
    error: Option<CapturedError>,
    function: Option<String>,
}

impl<'a> Emission<'a> {
    fn new(logger: &'a Logger) -> Self {
        Self {
            logger,
            config: LogConfig::default(),
            error: None,
            function: None,
        }
    }

    fn prepare(
        &self,
        sink: SinkKind,
        level: Level,
        message: impl Display,
        site: CallSite,
        fallback: &ColorPalette,
    ) -> Result<Option<Prepared>, LoggerError> {
        let site = match &self.function {
            Some(function) => site.in_function(function.as_str()),
            None => site,
        };

        let request = Request {
            owner: "Logger",
            sink,
            level,
            message: message.to_string(),
            overrides: &self.config,
            error: self.error.clone(),
            site,
        };

        self.logger.prepare(request, fallback)
    }
}

/// Builder methods and the five leveled entry points of a synchronous sink
/// wrapping an [`Emission`].
macro_rules! sink_methods {
    () => {
        /// Per-call overrides.
        pub fn with_config(mut self, config: LogConfig) -> Self {
            self.emission.config = config;
            self
        }

        /// Reports `error` instead of capturing the call site.
        pub fn with_error(mut self, error: CapturedError) -> Self {
            self.emission.error = Some(error);
            self
        }

        /// Names the calling function in the captured call site.
        pub fn in_function(mut self, function: impl Into<String>) -> Self {
            self.emission.function = Some(function.into());
            self
        }

        #[track_caller]
        pub fn log(&self, message: impl Display) -> Result<(), LoggerError> {
            self.emit(Level::Log, message, CallSite::caller())
        }

        #[track_caller]
        pub fn info(&self, message: impl Display) -> Result<(), LoggerError> {
            self.emit(Level::Info, message, CallSite::caller())
        }

        #[track_caller]
        pub fn warn(&self, message: impl Display) -> Result<(), LoggerError> {
            self.emit(Level::Warn, message, CallSite::caller())
        }

        #[track_caller]
        pub fn error(&self, message: impl Display) -> Result<(), LoggerError> {
            self.emit(Level::Error, message, CallSite::caller())
        }

        #[track_caller]
        pub fn fatal(&self, message: impl Display) -> Result<(), LoggerError> {
            self.emit(Level::Fatal, message, CallSite::caller())
        }
    };
}

/// Prints rendered lines, colors included. File and encoding overrides are
/// ignored here.
pub struct ConsoleSink<'a> {
    emission: Emission<'a>,
}

impl<'a> ConsoleSink<'a> {
    pub(crate) fn new(logger: &'a Logger) -> Self {
        Self {
            emission: Emission::new(logger),
        }
    }

    sink_methods!();

    pub fn emit(
        &self,
        level: Level,
        message: impl Display,
        site: CallSite,
    ) -> Result<(), LoggerError> {
        let logger = self.emission.logger;
        let prepared =
            self.emission
                .prepare(SinkKind::Console, level, message, site, logger.palette())?;

        match prepared {
            Some(prepared) => logger
                .console_writer()
                .write_line(&prepared.line)
                .map_err(LoggerError::Console),
            None => Ok(()),
        }
    }
}

/// Appends rendered lines to the log file, without colors. The palette
/// override is ignored here.
pub struct FileSink<'a> {
    emission: Emission<'a>,
}

impl<'a> FileSink<'a> {
    pub(crate) fn new(logger: &'a Logger) -> Self {
        Self {
            emission: Emission::new(logger),
        }
    }

    sink_methods!();

    pub fn emit(
        &self,
        level: Level,
        message: impl Display,
        site: CallSite,
    ) -> Result<(), LoggerError> {
        let prepared =
            self.emission
                .prepare(SinkKind::File, level, message, site, &ColorPalette::plain())?;
        let Some(prepared) = prepared else {
            return Ok(());
        };

        let path = &prepared.config.file;
        let write_err = |source: io::Error| LoggerError::Write {
            path: path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(write_err)?;

        let bytes = prepared
            .config
            .encoding
            .encode(&format!("{}\n", prepared.line));
        file.write_all(&bytes).map_err(write_err)?;

        log::trace!(target: INTERNAL_TARGET, "appended {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
