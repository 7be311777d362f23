use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use regex::Regex;

use super::{
    encoding::Encoding,
    palette::ColorPalette,
    settings::{
        check_dir, check_file, DEFAULT_DIR, DEFAULT_ERROR_FORMAT, DEFAULT_FILE, DEFAULT_FORMAT,
    },
    sinks::{ConsoleSink, ConsoleWriter, FileSink},
    template::{PlaceholderCompiler, Template, TemplateCompiler},
    trace::{Classifier, StackResolver},
    Level, LoggerError,
};

/// A configured logger.
///
/// The logger owns the emission pipeline; [`Logger::console`] and
/// [`Logger::file_sink`] hand out sinks that borrow it. Setters take `&mut self`,
/// so a logger can't be reconfigured while a sink is in use. Shared loggers
/// behind a lock need the same discipline from the caller: emissions read,
/// reconfiguration writes.
pub struct Logger {
    dir: PathBuf,
    file: PathBuf,
    format: Arc<Template>,
    error_format: Arc<Template>,
    level: Level,
    encoding: Encoding,
    compiler: Arc<dyn TemplateCompiler>,
    resolver: StackResolver,
    classifier: Classifier,
    palette: ColorPalette,
    console: ConsoleWriter,
}

impl Logger {
    /// A logger with every default: `./logger.log`, level `All`, UTF-8.
    pub fn new() -> Result<Self, LoggerError> {
        Builder::new().build()
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    pub fn console(&self) -> ConsoleSink<'_> {
        ConsoleSink::new(self)
    }

    pub fn file_sink(&self) -> FileSink<'_> {
        FileSink::new(self)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Moves the log file into `dir`, keeping its name. Nothing changes if
    /// either the directory or the file fails validation.
    pub fn set_dir(&mut self, dir: impl AsRef<Path>) -> Result<(), LoggerError> {
        let dir = check_dir(dir)?;
        let name = self.file.file_name().map(PathBuf::from).unwrap_or_default();
        let file = check_file(&dir, name)?;
        self.dir = dir;
        self.file = file;
        Ok(())
    }

    /// Absolute path of the default log file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn set_file(&mut self, file: impl AsRef<Path>) -> Result<(), LoggerError> {
        self.file = check_file(&self.dir, file)?;
        Ok(())
    }

    pub fn format(&self) -> &str {
        self.format.source()
    }

    pub fn set_format(&mut self, format: &str) {
        self.format = Arc::new(self.compiler.compile(format));
    }

    pub fn error_format(&self) -> &str {
        self.error_format.source()
    }

    pub fn set_error_format(&mut self, format: &str) {
        self.error_format = Arc::new(self.compiler.compile(format));
    }

    pub(crate) fn format_template(&self) -> Arc<Template> {
        self.format.clone()
    }

    pub(crate) fn error_format_template(&self) -> Arc<Template> {
        self.error_format.clone()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: &str) -> Result<(), LoggerError> {
        self.encoding = encoding.parse()?;
        Ok(())
    }

    /// The palette console output falls back to.
    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: ColorPalette) {
        self.palette = palette;
    }

    pub fn compiler(&self) -> &dyn TemplateCompiler {
        self.compiler.as_ref()
    }

    pub(crate) fn resolver(&self) -> &StackResolver {
        &self.resolver
    }

    pub(crate) fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub(crate) fn console_writer(&self) -> &ConsoleWriter {
        &self.console
    }
}

pub struct Builder {
    file: PathBuf,
    dir: PathBuf,
    level: Level,
    format: String,
    error_format: String,
    encoding: String,
    compiler: Arc<dyn TemplateCompiler>,
    palette: ColorPalette,
    console: ConsoleWriter,
    internal_frames: Option<Regex>,
    generic_frames: Option<Regex>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_FILE),
            dir: PathBuf::from(DEFAULT_DIR),
            level: Level::All,
            format: DEFAULT_FORMAT.to_string(),
            error_format: DEFAULT_ERROR_FORMAT.to_string(),
            encoding: Encoding::Utf8.name().to_string(),
            compiler: Arc::new(PlaceholderCompiler),
            palette: ColorPalette::ansi(),
            console: ConsoleWriter::stdout(),
            internal_frames: None,
            generic_frames: None,
        }
    }

    pub fn with_file(self, file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..self
        }
    }

    pub fn with_dir(self, dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..self
        }
    }

    pub fn with_level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    pub fn with_format(self, format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..self
        }
    }

    pub fn with_error_format(self, error_format: impl Into<String>) -> Self {
        Self {
            error_format: error_format.into(),
            ..self
        }
    }

    pub fn with_encoding(self, encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
            ..self
        }
    }

    pub fn with_compiler(self, compiler: impl TemplateCompiler + 'static) -> Self {
        Self {
            compiler: Arc::new(compiler),
            ..self
        }
    }

    pub fn with_palette(self, palette: ColorPalette) -> Self {
        Self { palette, ..self }
    }

    pub fn with_console(self, console: ConsoleWriter) -> Self {
        Self { console, ..self }
    }

    /// Signature of the logger's own frames, skipped when resolving origins.
    pub fn with_internal_frames(self, signature: Regex) -> Self {
        Self {
            internal_frames: Some(signature),
            ..self
        }
    }

    /// Signature used to recognize synthetic call-site markers.
    pub fn with_generic_frames(self, signature: Regex) -> Self {
        Self {
            generic_frames: Some(signature),
            ..self
        }
    }

    pub fn build(self) -> Result<Logger, LoggerError> {
        let dir = check_dir(&self.dir)?;
        let file = check_file(&dir, &self.file)?;
        let encoding = self.encoding.parse()?;

        Ok(Logger {
            dir,
            file,
            format: Arc::new(self.compiler.compile(&self.format)),
            error_format: Arc::new(self.compiler.compile(&self.error_format)),
            level: self.level,
            encoding,
            resolver: self
                .internal_frames
                .map(StackResolver::new)
                .unwrap_or_default(),
            classifier: self
                .generic_frames
                .map(Classifier::new)
                .unwrap_or_default(),
            compiler: self.compiler,
            palette: self.palette,
            console: self.console,
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
