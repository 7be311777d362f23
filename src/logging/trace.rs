//! Call-site capture, stack-origin resolution and error classification.
//!
//! Every emission carries a [`CapturedError`]. When the caller doesn't hand
//! one over, the sink builds a synthetic one from the [`CallSite`] of the
//! logging call: its trace starts with the logger's own entry frame followed
//! by the caller's frame. The resolver skips the logger's frames to find the
//! origin, the classifier recognizes the synthetic marker so the normal
//! (non-error) format is used.

use std::{backtrace::Backtrace, panic::Location, sync::OnceLock};

use regex::Regex;

/// Frames belonging to the logger's own emission methods.
pub const INTERNAL_FRAMES: &str =
    r"at Logger(Db)?\.(log|info|warn|error|fatal)_(console|file|database)";

/// Broader signature covering any method of any logger variant.
pub const GENERIC_FRAMES: &str = r"(?i)at Logger[0-9A-Z_$]*\.[$A-Z_][0-9A-Z_$]*";

/// Name reported for errors of the plain base kind.
pub const BASE_ERROR_NAME: &str = "Error";

static INTERNAL_REGEX: OnceLock<Regex> = OnceLock::new();
static GENERIC_REGEX: OnceLock<Regex> = OnceLock::new();

fn internal_regex() -> &'static Regex {
    INTERNAL_REGEX
        .get_or_init(|| Regex::new(INTERNAL_FRAMES).expect("internal frame signature is valid"))
}

fn generic_regex() -> &'static Regex {
    GENERIC_REGEX
        .get_or_init(|| Regex::new(GENERIC_FRAMES).expect("generic frame signature is valid"))
}

/// Where a logging call was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub function: Option<String>,
}

impl CallSite {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            function: None,
        }
    }

    /// The location of the caller of the `#[track_caller]` chain this is
    /// invoked from.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }

    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        let function = function.into();
        self.function = (!function.is_empty()).then_some(function);
        self
    }

    /// The frame line for this site, e.g. `at app::run (src/app.rs:10:5)`.
    pub fn frame(&self) -> String {
        match &self.function {
            Some(function) => format!(
                "at {} ({}:{}:{})",
                function, self.file, self.line, self.column
            ),
            None => format!("at {}:{}:{}", self.file, self.line, self.column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The plain, unspecialized error kind.
    Base,
    /// A domain error, with its type name.
    Named(String),
}

/// An error handed to the logger, reduced to what the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    kind: ErrorKind,
    message: String,
    trace: Option<String>,
}

impl CapturedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: None,
        }
    }

    /// A base-kind error with the given message and no trace.
    pub fn base(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Base, message)
    }

    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Named(name.into()), message)
    }

    /// Captures a domain error. The trace points at the place the error was
    /// handed to the logger.
    #[track_caller]
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let name = short_type_name(std::any::type_name::<E>());
        Self::named(name, error.to_string()).with_trace(CallSite::caller().frame())
    }

    /// The marker built for a logging call made without an error: the
    /// logger's entry frame on top, the caller below.
    pub fn synthetic(entry_frame: &str, site: &CallSite) -> Self {
        Self::base("").with_trace(format!(
            "{}\n    {}\n    {}",
            BASE_ERROR_NAME,
            entry_frame,
            site.frame()
        ))
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn with_backtrace(self, backtrace: &Backtrace) -> Self {
        self.with_trace(backtrace.to_string())
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            ErrorKind::Base => BASE_ERROR_NAME,
            ErrorKind::Named(name) => name,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    pub fn details(&self) -> ErrorDetails {
        ErrorDetails {
            name: self.name().to_string(),
            message: self.message.clone(),
        }
    }
}

/// Strips the module path and generic arguments from a type name.
fn short_type_name(full: &str) -> String {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    pub name: String,
    pub message: String,
}

/// Call-site metadata. Every field is empty when it couldn't be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginInfo {
    pub function: String,
    pub file: String,
    pub line: String,
}

struct Frame<'a> {
    function: &'a str,
    locator: &'a str,
}

impl Frame<'_> {
    fn signature(&self) -> String {
        if self.function.is_empty() {
            format!("at {}", self.locator)
        } else {
            format!("at {} ({})", self.function, self.locator)
        }
    }

    fn is_backtrace_machinery(&self) -> bool {
        self.function.starts_with("std::backtrace") || self.function.starts_with("backtrace::")
    }
}

/// Finds the caller's frame in a captured trace.
#[derive(Debug, Clone)]
pub struct StackResolver {
    internal: Regex,
}

impl Default for StackResolver {
    fn default() -> Self {
        Self::new(internal_regex().clone())
    }
}

impl StackResolver {
    pub fn new(internal: Regex) -> Self {
        Self { internal }
    }

    pub fn internal_signature(&self) -> &Regex {
        &self.internal
    }

    /// Best effort: a missing trace, a trace without a caller frame or a frame
    /// that doesn't parse all yield an empty [`OriginInfo`].
    pub fn resolve(&self, trace: Option<&str>) -> OriginInfo {
        let Some(trace) = trace else {
            return OriginInfo::default();
        };

        let frame = frames(trace)
            .into_iter()
            .find(|frame| !frame.is_backtrace_machinery() && !self.internal.is_match(&frame.signature()));

        let Some(frame) = frame else {
            return OriginInfo::default();
        };

        match split_locator(frame.locator) {
            Some((file, line)) => OriginInfo {
                function: frame.function.to_string(),
                file: file.to_string(),
                line: line.to_string(),
            },
            None => OriginInfo::default(),
        }
    }
}

/// Collects frames in both the `at function (file:line:col)` shape and the
/// `N: function` / `at file:line:col` pairs of a Rust backtrace.
fn frames(trace: &str) -> Vec<Frame<'_>> {
    let mut frames = Vec::new();
    let mut pending: Option<&str> = None;

    for line in trace.lines().map(str::trim) {
        if let Some(function) = numbered_frame(line) {
            if let Some(previous) = pending.replace(function) {
                frames.push(Frame {
                    function: previous,
                    locator: "",
                });
            }
            continue;
        }

        let Some(body) = strip_at(line) else {
            continue;
        };

        if let Some(function) = pending.take() {
            frames.push(Frame {
                function,
                locator: body,
            });
            continue;
        }

        match body.strip_suffix(')').and_then(|b| b.rsplit_once(" (")) {
            Some((function, locator)) => frames.push(Frame {
                function: function.trim(),
                locator,
            }),
            None => frames.push(Frame {
                function: "",
                locator: body,
            }),
        }
    }

    if let Some(function) = pending {
        frames.push(Frame {
            function,
            locator: "",
        });
    }

    frames
}

fn strip_at(line: &str) -> Option<&str> {
    let head = line.get(..3)?;
    if head.eq_ignore_ascii_case("at ") {
        Some(line[3..].trim())
    } else {
        None
    }
}

/// `12: crate::module::function` from a Rust backtrace.
fn numbered_frame(line: &str) -> Option<&str> {
    let (index, function) = line.split_once(':')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let function = function.trim();
    (!function.is_empty()).then_some(function)
}

/// Splits `file:line[:column]`, tolerating enclosing parentheses and colons
/// inside the file part.
fn split_locator(locator: &str) -> Option<(&str, &str)> {
    let locator = locator.trim().trim_start_matches('(').trim_end_matches(')');
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let (rest, last) = locator.rsplit_once(':')?;
    if !is_number(last) {
        return None;
    }

    match rest.rsplit_once(':') {
        Some((file, line)) if is_number(line) && !file.is_empty() => Some((file, line)),
        _ if !rest.is_empty() => Some((rest, last)),
        _ => None,
    }
}

/// Tells synthetic call-site markers apart from errors the caller passed in.
///
/// This is a heuristic keyed on the naming of the logger's entry frames, not
/// a type check: an error counts as synthetic when it has no trace, or when it
/// is of the base kind and its trace mentions a logger method.
#[derive(Debug, Clone)]
pub struct Classifier {
    generic: Regex,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(generic_regex().clone())
    }
}

impl Classifier {
    pub fn new(generic: Regex) -> Self {
        Self { generic }
    }

    pub fn is_logger_synthetic(&self, error: &CapturedError) -> bool {
        match error.trace() {
            None => true,
            Some(trace) => error.kind() == &ErrorKind::Base && self.generic.is_match(trace),
        }
    }
}
