pub mod bridge;
pub mod database;
mod encoding;
mod error;
mod level;
mod logger;
mod merge;
mod palette;
mod pipeline;
pub mod settings;
mod sinks;
pub mod template;
pub mod trace;

pub use bridge::{Bridge, Route};
pub use database::{
    accept_any, discard, CheckFn, DbConfig, DbEffectiveConfig, DbLogger, DbSink, FailureObserver,
    InsertFn,
};
pub use encoding::Encoding;
pub use error::LoggerError;
pub use level::Level;
pub use logger::{Builder, Logger};
pub use merge::{EffectiveConfig, LogConfig, SinkKind};
pub use palette::ColorPalette;
pub use pipeline::LogRecord;
pub use sinks::{ConsoleSink, ConsoleWriter, FileSink};
pub use template::{Clock, Field, Fields, Placeholder, PlaceholderCompiler, Template, TemplateCompiler};
pub use trace::{
    CallSite, CapturedError, Classifier, ErrorDetails, ErrorKind, OriginInfo, StackResolver,
};

/// `log` target of the library's own diagnostics.
pub const INTERNAL_TARGET: &str = "sitelog";
