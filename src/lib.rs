//! Leveled logging with template-driven lines written to the console, to log
//! files, or to an application-provided database.
//!
//! ```no_run
//! use sitelog::{Level, Logger};
//!
//! let logger = Logger::builder().with_level(Level::Info).build()?;
//! logger.console().info("server started")?;
//! sitelog::warn!(logger.file_sink(), "disk at {}%", 91)?;
//! # Ok::<(), sitelog::LoggerError>(())
//! ```

pub mod db;
pub mod logging;

pub use logging::{
    CallSite, CapturedError, ColorPalette, DbConfig, DbLogger, Encoding, Level, LogConfig,
    LogRecord, Logger, LoggerError,
};

/// Path of the enclosing function, closures stripped.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        let mut name = name;
        while let Some(outer) = name.strip_suffix("::{{closure}}") {
            name = outer;
        }
        name
    }};
}

/// Emits at `LOG` through `sink`, naming the enclosing function.
#[macro_export]
macro_rules! log {
    ($sink:expr, $($arg:tt)+) => {
        $sink
            .in_function($crate::__function_name!())
            .log(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! info {
    ($sink:expr, $($arg:tt)+) => {
        $sink
            .in_function($crate::__function_name!())
            .info(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! warn {
    ($sink:expr, $($arg:tt)+) => {
        $sink
            .in_function($crate::__function_name!())
            .warn(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! error {
    ($sink:expr, $($arg:tt)+) => {
        $sink
            .in_function($crate::__function_name!())
            .error(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! fatal {
    ($sink:expr, $($arg:tt)+) => {
        $sink
            .in_function($crate::__function_name!())
            .fatal(::std::format_args!($($arg)+))
    };
}
