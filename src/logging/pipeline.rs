use super::{
    merge::{EffectiveConfig, LogConfig, SinkKind},
    palette::ColorPalette,
    template::{Field, Fields},
    trace::{CallSite, CapturedError, OriginInfo},
    Level, Logger, LoggerError, INTERNAL_TARGET,
};

/// Structured view of one emission, as handed to database collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    pub kind: String,
    pub message: String,
    pub line: String,
    pub error_name: String,
    pub error_message: String,
    pub file: String,
    pub function: String,
}

impl LogRecord {
    /// Every template field, colors taken from `palette`.
    pub fn fields(&self, palette: &ColorPalette) -> Fields {
        Fields::new()
            .with(Field::Kind, self.kind.as_str())
            .with(Field::Message, self.message.as_str())
            .with(Field::Line, self.line.as_str())
            .with(Field::ErrorName, self.error_name.as_str())
            .with(Field::ErrorMessage, self.error_message.as_str())
            .with(Field::File, self.file.as_str())
            .with(Field::Function, self.function.as_str())
            .with(Field::Red, palette.red.as_str())
            .with(Field::Blue, palette.blue.as_str())
            .with(Field::Green, palette.green.as_str())
            .with(Field::Yellow, palette.yellow.as_str())
            .with(Field::Reset, palette.reset.as_str())
    }
}

pub(crate) struct Request<'a> {
    pub owner: &'static str,
    pub sink: SinkKind,
    pub level: Level,
    pub message: String,
    pub overrides: &'a LogConfig,
    pub error: Option<CapturedError>,
    pub site: CallSite,
}

/// A rendered emission, ready for a sink to write.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    pub record: LogRecord,
    pub line: String,
    pub config: EffectiveConfig,
}

impl Logger {
    pub fn resolve_origin(&self, error: &CapturedError) -> OriginInfo {
        self.resolver().resolve(error.trace())
    }

    /// See [`Classifier`](super::trace::Classifier).
    pub fn is_logger_synthetic(&self, error: &CapturedError) -> bool {
        self.classifier().is_logger_synthetic(error)
    }

    /// Runs one emission through the level gate, origin resolution,
    /// classification, config merge and rendering. `None` means the level
    /// was gated. `All` and `None` are thresholds only and never emit.
    pub(crate) fn prepare(
        &self,
        request: Request<'_>,
        fallback: &ColorPalette,
    ) -> Result<Option<Prepared>, LoggerError> {
        if !Level::EMITTABLE.contains(&request.level) {
            log::trace!(target: INTERNAL_TARGET, "{} is not an emission level", request.level);
            return Ok(None);
        }

        if !request.level.passes(self.level()) {
            log::trace!(target: INTERNAL_TARGET, "{} below threshold {}", request.level, self.level());
            return Ok(None);
        }

        let error = request.error.unwrap_or_else(|| {
            let entry = format!(
                "at {}.{}_{} (sitelog)",
                request.owner,
                request.level.entry_name(),
                request.sink.entry_name()
            );
            CapturedError::synthetic(&entry, &request.site)
        });

        let origin = self.resolve_origin(&error);
        let synthetic = self.is_logger_synthetic(&error);
        let config = self.merge(request.overrides, request.sink, fallback, synthetic)?;

        let details = error.details();
        let record = LogRecord {
            kind: request.level.label().to_string(),
            message: request.message,
            line: origin.line,
            error_name: details.name,
            error_message: details.message,
            file: origin.file,
            function: origin.function,
        };

        let line = config.template.render(&record.fields(&config.palette))?;

        Ok(Some(Prepared {
            record,
            line,
            config,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(level: Level, overrides: &LogConfig, error: Option<CapturedError>) -> Request<'_> {
        Request {
            owner: "Logger",
            sink: SinkKind::Console,
            level,
            message: "hello".to_string(),
            overrides,
            error,
            site: CallSite::new("src/app.rs", 7, 3).in_function("app::run"),
        }
    }

    fn logger(dir: &std::path::Path) -> Logger {
        Logger::builder()
            .with_dir(dir)
            .with_level(Level::Info)
            .with_format("%{T}|%{F}|%{A}|%{L}|%{R}")
            .with_error_format("%{T}|%{N}|%{E}|%{F}|%{R}")
            .build()
            .unwrap()
    }

    #[test]
    fn gated_levels_prepare_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(dir.path());
        let none = LogConfig::new();
        let prepared = logger
            .prepare(request(Level::Log, &none, None), &ColorPalette::plain())
            .unwrap();
        assert!(prepared.is_none());
    }

    #[test]
    fn threshold_only_levels_never_emit() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = logger(dir.path());
        let none = LogConfig::new();

        for threshold in [Level::All, Level::None] {
            logger.set_level(threshold);
            for level in [Level::All, Level::None] {
                let prepared = logger
                    .prepare(request(level, &none, None), &ColorPalette::plain())
                    .unwrap();
                assert!(prepared.is_none(), "{} at threshold {}", level, threshold);
            }
        }
    }

    #[test]
    fn synthetic_marker_uses_normal_format_and_caller_origin() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(dir.path());
        let none = LogConfig::new();
        let prepared = logger
            .prepare(request(Level::Warn, &none, None), &ColorPalette::plain())
            .unwrap()
            .unwrap();

        assert_eq!(prepared.line, "WARN|app::run|src/app.rs|7|hello");
        assert_eq!(prepared.record.error_name, "Error");
        assert_eq!(prepared.record.error_message, "");
    }

    #[test]
    fn domain_errors_use_error_format() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(dir.path());
        let none = LogConfig::new();
        let error = CapturedError::named("ParseError", "unexpected token")
            .with_trace("ParseError: unexpected token\n    at parse (src/parse.rs:12:9)");
        let prepared = logger
            .prepare(request(Level::Error, &none, Some(error)), &ColorPalette::plain())
            .unwrap()
            .unwrap();

        assert_eq!(prepared.line, "ERROR|ParseError|unexpected token|parse|hello");
        assert_eq!(prepared.record.file, "src/parse.rs");
        assert_eq!(prepared.record.line, "12");
    }

    #[test]
    fn errors_without_trace_fall_back_to_normal_format_and_empty_origin() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(dir.path());
        let none = LogConfig::new();
        let error = CapturedError::named("Timeout", "took too long");
        let prepared = logger
            .prepare(request(Level::Fatal, &none, Some(error)), &ColorPalette::plain())
            .unwrap()
            .unwrap();

        assert_eq!(prepared.line, "FATAL||||hello");
        assert_eq!(prepared.record.error_name, "Timeout");
    }
}
