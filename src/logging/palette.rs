/// Strings substituted for the color placeholders.
///
/// The palette is a plain lookup table. Console output uses [`ColorPalette::ansi`]
/// unless one is injected, file and database output always use
/// [`ColorPalette::plain`] so no escape codes end up in persisted text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorPalette {
    pub red: String,
    pub blue: String,
    pub green: String,
    pub yellow: String,
    pub reset: String,
}

impl ColorPalette {
    pub fn ansi() -> Self {
        Self {
            red: "\x1b[0;31m".to_string(),
            blue: "\x1b[0;34m".to_string(),
            green: "\x1b[0;32m".to_string(),
            yellow: "\x1b[0;33m".to_string(),
            reset: "\x1b[0m".to_string(),
        }
    }

    /// Every entry empty.
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn is_plain(&self) -> bool {
        self == &Self::plain()
    }
}
