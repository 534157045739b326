use std::fmt;

use thiserror::Error;

pub const ERROR_TAG: &str = "\x1b[31m[ERROR]\x1b[0m";

/// Line/column of a rune in the source, 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Source location attached to reader errors. Each field is set at most
/// once; later attempts keep the first (innermost) value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorContext {
    pub file: Option<String>,
    pub pos: Option<Position>,
}

impl ErrorContext {
    fn set_pos(&mut self, pos: Position) {
        if self.pos.is_none() {
            self.pos = Some(pos);
        }
    }

    fn set_file(&mut self, file: String) {
        if self.file.is_none() {
            self.file = Some(file);
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SorrelError {
    /// End of input at the top level. `Reader::all` treats this as a
    /// clean stop; everywhere else it is a plain error.
    #[error("unexpected end of input")]
    Eof { context: ErrorContext },

    #[error("unexpected end of input while reading {form}")]
    EofInForm { form: String, context: ErrorContext },

    #[error("unmatched delimiter '{delim}'")]
    UnmatchedDelimiter { delim: char, context: ErrorContext },

    #[error("invalid number format '{literal}'")]
    NumberFormat { literal: String, context: ErrorContext },

    #[error("unsupported escape character '\\{escape}'")]
    UnknownEscape { escape: char, context: ErrorContext },

    #[error("invalid unicode escape '\\{token}'")]
    InvalidUnicode { token: String, context: ErrorContext },

    #[error("unsupported character '\\{name}'")]
    UnsupportedChar { name: String, context: ErrorContext },

    #[error("unable to resolve symbol '{0}'")]
    NotFound(String),

    #[error("value of type '{kind}' is not invokable")]
    NotInvokable { kind: String },

    #[error("invalid special form: {message}")]
    InvalidForm { message: String },

    #[error("invalid binding name '{name}'")]
    InvalidBindName { name: String },

    #[error("max call-stack depth ({max}) exceeded")]
    StackOverflow { max: usize },

    #[error("{0}")]
    Message(String),

    /// Internal signal for no-op forms such as comments. Never escapes
    /// `Reader::one`/`Reader::all`.
    #[error("internal skip signal")]
    Skip,
}

impl SorrelError {
    pub fn eof() -> Self {
        SorrelError::Eof {
            context: ErrorContext::default(),
        }
    }

    pub fn eof_in(form: impl Into<String>) -> Self {
        SorrelError::EofInForm {
            form: form.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn unmatched_delimiter(delim: char) -> Self {
        SorrelError::UnmatchedDelimiter {
            delim,
            context: ErrorContext::default(),
        }
    }

    pub fn number_format(literal: impl Into<String>) -> Self {
        SorrelError::NumberFormat {
            literal: literal.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn unknown_escape(escape: char) -> Self {
        SorrelError::UnknownEscape {
            escape,
            context: ErrorContext::default(),
        }
    }

    pub fn invalid_unicode(token: impl Into<String>) -> Self {
        SorrelError::InvalidUnicode {
            token: token.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn unsupported_char(name: impl Into<String>) -> Self {
        SorrelError::UnsupportedChar {
            name: name.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        SorrelError::NotFound(name.into())
    }

    pub fn not_invokable(kind: impl Into<String>) -> Self {
        SorrelError::NotInvokable { kind: kind.into() }
    }

    pub fn invalid_form(message: impl Into<String>) -> Self {
        SorrelError::InvalidForm {
            message: message.into(),
        }
    }

    pub fn invalid_bind_name(name: impl Into<String>) -> Self {
        SorrelError::InvalidBindName { name: name.into() }
    }

    pub fn stack_overflow(max: usize) -> Self {
        SorrelError::StackOverflow { max }
    }

    pub fn message(message: impl Into<String>) -> Self {
        SorrelError::Message(message.into())
    }

    pub fn with_pos(mut self, pos: Position) -> Self {
        if let Some(ctx) = self.context_mut() {
            ctx.set_pos(pos);
        }
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        if let Some(ctx) = self.context_mut() {
            ctx.set_file(file.into());
        }
        self
    }

    pub fn pos(&self) -> Option<Position> {
        self.context_ref().and_then(|ctx| ctx.pos)
    }

    pub fn file(&self) -> Option<&str> {
        self.context_ref().and_then(|ctx| ctx.file.as_deref())
    }

    fn context_ref(&self) -> Option<&ErrorContext> {
        match self {
            SorrelError::Eof { context }
            | SorrelError::EofInForm { context, .. }
            | SorrelError::UnmatchedDelimiter { context, .. }
            | SorrelError::NumberFormat { context, .. }
            | SorrelError::UnknownEscape { context, .. }
            | SorrelError::InvalidUnicode { context, .. }
            | SorrelError::UnsupportedChar { context, .. } => Some(context),
            _ => None,
        }
    }

    fn context_mut(&mut self) -> Option<&mut ErrorContext> {
        match self {
            SorrelError::Eof { context }
            | SorrelError::EofInForm { context, .. }
            | SorrelError::UnmatchedDelimiter { context, .. }
            | SorrelError::NumberFormat { context, .. }
            | SorrelError::UnknownEscape { context, .. }
            | SorrelError::InvalidUnicode { context, .. }
            | SorrelError::UnsupportedChar { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Render an error plus its source location as display lines. The core
/// never prints during evaluation; a front-end decides where these go.
pub fn format_error(err: &SorrelError) -> Vec<String> {
    let mut lines = vec![format!("{} {}", ERROR_TAG, err)];
    match (err.file(), err.pos()) {
        (Some(file), Some(pos)) => lines.push(format!("  at {}:{}", file, pos)),
        (Some(file), None) => lines.push(format!("  at {}", file)),
        (None, Some(pos)) => lines.push(format!("  at {}", pos)),
        (None, None) => {}
    }
    lines
}
