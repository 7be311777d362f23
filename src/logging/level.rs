use std::{fmt::Display, str::FromStr};

use crate::logging::LoggerError;

/// Severity threshold and event level.
///
/// Ordering is total: an event is emitted only when its level is greater than
/// or equal to the logger threshold. `All` and `None` are thresholds only,
/// nothing is ever emitted at those levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    #[default]
    All = 0,
    Log = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
    None = 6,
}

impl Level {
    /// The levels that have an emission entry point, lowest first.
    pub const EMITTABLE: [Level; 5] = [
        Level::Log,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// Text substituted for `%{T}`.
    pub fn label(&self) -> &'static str {
        match self {
            Level::All => "ALL",
            Level::Log => "LOG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::None => "NONE",
        }
    }

    /// Name used for the entry point in synthetic call-site traces.
    pub(crate) fn entry_name(&self) -> &'static str {
        match self {
            Level::Log => "log",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::All => "all",
            Level::None => "none",
        }
    }

    pub fn passes(&self, threshold: Level) -> bool {
        *self >= threshold
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "todos" => Ok(Level::All),
            "log" => Ok(Level::Log),
            "info" => Ok(Level::Info),
            "warn" | "warning" | "aviso" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "none" | "off" | "ninguno" => Ok(Level::None),
            other => Err(LoggerError::ConfigInvalid(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        assert!(Level::All < Level::Log);
        assert!(Level::Log < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
        assert!(Level::Fatal < Level::None);
    }

    #[test]
    fn gate_compares_against_threshold() {
        for (i, low) in Level::EMITTABLE.iter().enumerate() {
            for high in &Level::EMITTABLE[i + 1..] {
                assert!(!low.passes(*high), "{} should be gated by {}", low, high);
                assert!(high.passes(*low));
            }
            assert!(low.passes(*low));
            assert!(low.passes(Level::All));
            assert!(!low.passes(Level::None));
        }
    }

    #[test]
    fn parses_english_and_spanish_names() {
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("aviso".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("Todos".parse::<Level>().unwrap(), Level::All);
        assert_eq!("ninguno".parse::<Level>().unwrap(), Level::None);
        assert!(matches!(
            "verbose".parse::<Level>(),
            Err(LoggerError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn maps_log_facade_levels() {
        assert_eq!(Level::from(log::Level::Trace), Level::Log);
        assert_eq!(Level::from(log::Level::Warn), Level::Warn);
    }
}
