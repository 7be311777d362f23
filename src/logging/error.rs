use thiserror::Error;

use super::template::Field;

/// Errors raised by the logger.
///
/// Origin resolution never produces one of these: a trace that can't be
/// parsed just yields empty origin fields.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// Bad directory, file target, extension, permissions or encoding.
    #[error("invalid logger configuration: {0}")]
    ConfigInvalid(String),

    /// The database connection check returned false or failed.
    #[error("failed connecting to the log database")]
    ConnectionFailed {
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// A template references a field the render call didn't supply.
    #[error("template field '{0}' was not supplied")]
    FieldMissing(Field),

    #[error("failed appending log line to {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing log line to the console")]
    Console(#[source] std::io::Error),

    #[error("no tokio runtime available to dispatch the database insert")]
    NoRuntime,
}

impl LoggerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        LoggerError::ConfigInvalid(msg.into())
    }
}
