//! Format-string compiler.
//!
//! A format string is plain text with `%{X}` placeholders. Compiling it splits
//! the text into literal segments and slots; rendering walks the segments and
//! fills each slot from a [`Fields`] map or, for date/time slots, from the
//! clock at the moment of the render. Unknown placeholders are kept verbatim.

use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

use super::LoggerError;

/// Named value a placeholder can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Kind,
    Function,
    File,
    Message,
    Line,
    ErrorName,
    ErrorMessage,
    Red,
    Blue,
    Green,
    Yellow,
    Reset,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Kind => "type",
            Field::Function => "function",
            Field::File => "file",
            Field::Message => "message",
            Field::Line => "line",
            Field::ErrorName => "error_name",
            Field::ErrorMessage => "error_message",
            Field::Red => "color.red",
            Field::Blue => "color.blue",
            Field::Green => "color.green",
            Field::Yellow => "color.yellow",
            Field::Reset => "color.reset",
        };
        write!(f, "{}", name)
    }
}

/// Date/time component read from the clock at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clock {
    Seconds,
    Minutes,
    Hours,
    Day,
    Month,
    Year,
}

impl Clock {
    fn read<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String {
        match self {
            Clock::Seconds => format!("{:02}", now.second()),
            Clock::Minutes => format!("{:02}", now.minute()),
            Clock::Hours => now.hour().to_string(),
            Clock::Day => now.day().to_string(),
            Clock::Month => now.month().to_string(),
            Clock::Year => now.year().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Clock(Clock),
    Field(Field),
}

impl Placeholder {
    /// Every recognized placeholder with the code found between `%{` and `}`.
    pub const ALL: [(&'static str, Placeholder); 18] = [
        ("s", Placeholder::Clock(Clock::Seconds)),
        ("i", Placeholder::Clock(Clock::Minutes)),
        ("H", Placeholder::Clock(Clock::Hours)),
        ("D", Placeholder::Clock(Clock::Day)),
        ("M", Placeholder::Clock(Clock::Month)),
        ("Y", Placeholder::Clock(Clock::Year)),
        ("T", Placeholder::Field(Field::Kind)),
        ("F", Placeholder::Field(Field::Function)),
        ("A", Placeholder::Field(Field::File)),
        ("R", Placeholder::Field(Field::Message)),
        ("L", Placeholder::Field(Field::Line)),
        ("N", Placeholder::Field(Field::ErrorName)),
        ("E", Placeholder::Field(Field::ErrorMessage)),
        ("CR", Placeholder::Field(Field::Red)),
        ("CA", Placeholder::Field(Field::Blue)),
        ("CV", Placeholder::Field(Field::Green)),
        ("CM", Placeholder::Field(Field::Yellow)),
        ("CF", Placeholder::Field(Field::Reset)),
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, placeholder)| *placeholder)
    }

    pub fn code(&self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, p)| p == self)
            .map(|(c, _)| *c)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Placeholder),
}

/// A compiled format string.
///
/// Rendering has no side effects, so one template can be shared between
/// threads and rendered any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn compile(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(start) = rest.find("%{") {
            literal.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                rest = &rest[start..];
                break;
            };

            match Placeholder::from_code(&after[..end]) {
                Some(placeholder) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(placeholder));
                    rest = &after[end + 1..];
                }
                None => {
                    literal.push_str("%{");
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: source.to_string(),
            segments,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fields the template needs at render time, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(Placeholder::Field(field)) => Some(*field),
            _ => None,
        })
    }

    pub fn render(&self, fields: &Fields) -> Result<String, LoggerError> {
        self.render_at(fields, &Local::now())
    }

    /// Renders with the clock slots read from `now` instead of the wall clock.
    pub fn render_at<Tz: TimeZone>(
        &self,
        fields: &Fields,
        now: &DateTime<Tz>,
    ) -> Result<String, LoggerError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(Placeholder::Clock(clock)) => out.push_str(&clock.read(now)),
                Segment::Slot(Placeholder::Field(field)) => {
                    let value = fields.get(*field).ok_or(LoggerError::FieldMissing(*field))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Turns format strings into templates. Each logger owns one.
pub trait TemplateCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Template;
}

/// The stock compiler, recognizing the placeholders listed in [`Placeholder::ALL`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderCompiler;

impl TemplateCompiler for PlaceholderCompiler {
    fn compile(&self, source: &str) -> Template {
        Template::compile(source)
    }
}

/// Values available to a render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    values: BTreeMap<Field, String>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }
}
