use std::{path::PathBuf, sync::Arc};

use super::{
    encoding::Encoding, palette::ColorPalette, settings::check_file, template::Template, Logger,
    LoggerError,
};

/// The destination of an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    File,
    Database,
}

impl SinkKind {
    pub(crate) fn entry_name(&self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Database => "database",
        }
    }
}

/// Per-call overrides. Anything left unset falls back to the logger's own
/// settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub file: Option<String>,
    pub format: Option<String>,
    pub palette: Option<ColorPalette>,
    pub encoding: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(self, file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..self
        }
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            ..self
        }
    }

    pub fn palette(self, palette: ColorPalette) -> Self {
        Self {
            palette: Some(palette),
            ..self
        }
    }

    pub fn encoding(self, encoding: impl Into<String>) -> Self {
        Self {
            encoding: Some(encoding.into()),
            ..self
        }
    }
}

/// Settings in force for a single emission.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub file: PathBuf,
    pub template: Arc<Template>,
    pub palette: ColorPalette,
    pub encoding: Encoding,
}

impl Logger {
    /// Combines the logger defaults with `overrides` for one call to `sink`.
    ///
    /// Only the file sink looks at the file and encoding overrides, and only
    /// the console honours a palette: file and database output are always
    /// rendered with the plain palette. `synthetic` selects the normal format
    /// over the error format when no format override is given.
    pub fn merge(
        &self,
        overrides: &LogConfig,
        sink: SinkKind,
        fallback: &ColorPalette,
        synthetic: bool,
    ) -> Result<EffectiveConfig, LoggerError> {
        let template = match &overrides.format {
            Some(format) => Arc::new(self.compiler().compile(format)),
            None if synthetic => self.format_template(),
            None => self.error_format_template(),
        };

        let file = match (&overrides.file, sink) {
            (Some(file), SinkKind::File) => check_file(self.dir(), file)?,
            _ => self.file().to_path_buf(),
        };

        let palette = match (&overrides.palette, sink) {
            (Some(palette), SinkKind::Console) => palette.clone(),
            (_, SinkKind::Console) => fallback.clone(),
            _ => ColorPalette::plain(),
        };

        let encoding = match (&overrides.encoding, sink) {
            (Some(encoding), SinkKind::File) => encoding.parse()?,
            _ => self.encoding(),
        };

        Ok(EffectiveConfig {
            file,
            template,
            palette,
            encoding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Level;

    fn logger(dir: &std::path::Path) -> Logger {
        Logger::builder()
            .with_dir(dir)
            .with_format("normal %{R}")
            .with_error_format("error %{R}")
            .build()
            .unwrap()
    }

    #[test]
    fn picks_template_by_classification() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(dir.path());
        let none = LogConfig::new();

        let normal = logger
            .merge(&none, SinkKind::File, &ColorPalette::plain(), true)
            .unwrap();
        assert_eq!(normal.template.source(), "normal %{R}");

        let error = logger
            .merge(&none, SinkKind::File, &ColorPalette::plain(), false)
            .unwrap();
        assert_eq!(error.template.source(), "error %{R}");

        let custom = logger
            .merge(
                &LogConfig::new().format("custom %{R}"),
                SinkKind::Console,
                &ColorPalette::ansi(),
                false,
            )
            .unwrap();
        assert_eq!(custom.template.source(), "custom %{R}");
    }

    #[test]
    fn file_override_is_validated_without_touching_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.csv"), "a,b").unwrap();
        let logger = logger(dir.path());
        let before = logger.file().to_path_buf();

        let err = logger.merge(
            &LogConfig::new().file("data.csv"),
            SinkKind::File,
            &ColorPalette::plain(),
            true,
        );
        assert!(matches!(err, Err(LoggerError::ConfigInvalid(_))));
        assert_eq!(logger.file(), before);

        let ok = logger
            .merge(
                &LogConfig::new().file("other.log"),
                SinkKind::File,
                &ColorPalette::plain(),
                true,
            )
            .unwrap();
        assert_eq!(ok.file.file_name().unwrap(), "other.log");
        assert_eq!(logger.file(), before);
    }

    #[test]
    fn console_ignores_file_and_encoding_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.csv"), "a,b").unwrap();
        let logger = logger(dir.path());

        let config = logger
            .merge(
                &LogConfig::new().file("data.csv").encoding("klingon"),
                SinkKind::Console,
                &ColorPalette::ansi(),
                true,
            )
            .unwrap();
        assert_eq!(config.file, logger.file());
        assert_eq!(config.encoding, Encoding::Utf8);
    }

    #[test]
    fn bad_encoding_override_fails_for_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(dir.path());
        let result = logger.merge(
            &LogConfig::new().encoding("klingon"),
            SinkKind::File,
            &ColorPalette::plain(),
            true,
        );
        assert!(matches!(result, Err(LoggerError::ConfigInvalid(_))));

        let config = logger
            .merge(
                &LogConfig::new().encoding("latin1"),
                SinkKind::File,
                &ColorPalette::plain(),
                true,
            )
            .unwrap();
        assert_eq!(config.encoding, Encoding::Latin1);
        assert_eq!(logger.encoding(), Encoding::Utf8);
    }

    #[test]
    fn palette_only_reaches_the_console() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(dir.path());
        let custom = ColorPalette {
            red: "<r>".to_string(),
            ..ColorPalette::plain()
        };
        let overrides = LogConfig::new().palette(custom.clone());

        let console = logger
            .merge(&overrides, SinkKind::Console, &ColorPalette::ansi(), true)
            .unwrap();
        assert_eq!(console.palette, custom);

        let fallback = logger
            .merge(&LogConfig::new(), SinkKind::Console, &ColorPalette::ansi(), true)
            .unwrap();
        assert_eq!(fallback.palette, ColorPalette::ansi());

        for sink in [SinkKind::File, SinkKind::Database] {
            let config = logger
                .merge(&overrides, sink, &ColorPalette::ansi(), true)
                .unwrap();
            assert!(config.palette.is_plain());
        }
    }

    #[test]
    fn merged_config_does_not_alias_later_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = logger(dir.path());
        let config = logger
            .merge(&LogConfig::new(), SinkKind::File, &ColorPalette::plain(), true)
            .unwrap();

        logger.set_format("changed %{R}");
        logger.set_level(Level::Fatal);
        assert_eq!(config.template.source(), "normal %{R}");
    }
}
