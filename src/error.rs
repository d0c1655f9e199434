//! Error types for the Dana language runtime

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, DanaError>;

/// A point in source text, used to render the "source line + caret" diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
    /// The full text of the offending source line
    pub source_text: String,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, source_text: impl Into<String>) -> Self {
        Self {
            line,
            column,
            source_text: source_text.into(),
        }
    }

    /// Render the source line followed by a line of spaces and a caret at `column`.
    pub fn render_caret(&self) -> String {
        let caret_col = self.column.saturating_sub(1);
        let mut caret_line = " ".repeat(caret_col);
        caret_line.push('^');
        format!("{}\n{}", self.source_text, caret_line)
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// The five named error kinds distinguished by their construction site.
#[derive(Error, Debug)]
pub enum DanaError {
    /// Grammar mismatch, unexpected token, bad indentation.
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        location: Option<SourceLocation>,
    },

    /// Well-formed but semantically invalid tree (e.g. assignment to a bare scope name).
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        location: Option<SourceLocation>,
    },

    /// Type errors, unknown identifier, unknown method, arithmetic errors, step-cap exceeded.
    #[error("Interpret error: {message}")]
    Interpret {
        message: String,
        location: Option<SourceLocation>,
    },

    /// Bad scope key, read-only violation (e.g. writing `__last_value` directly).
    #[error("State error: {message}")]
    State {
        message: String,
        location: Option<SourceLocation>,
    },

    /// Everything else: NLP transcoder failures, LLM failures, I/O, cancellation.
    #[error("Runtime error: {message}")]
    Runtime {
        message: String,
        #[source]
        original: Option<Box<DanaError>>,
    },
}

impl DanaError {
    pub fn parse(message: impl Into<String>) -> Self {
        DanaError::Parse {
            message: message.into(),
            location: None,
        }
    }

    pub fn parse_at(message: impl Into<String>, location: SourceLocation) -> Self {
        DanaError::Parse {
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DanaError::Validation {
            message: message.into(),
            location: None,
        }
    }

    pub fn interpret(message: impl Into<String>) -> Self {
        DanaError::Interpret {
            message: message.into(),
            location: None,
        }
    }

    pub fn interpret_at(message: impl Into<String>, location: SourceLocation) -> Self {
        DanaError::Interpret {
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        DanaError::State {
            message: message.into(),
            location: None,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        DanaError::Runtime {
            message: message.into(),
            original: None,
        }
    }

    pub fn runtime_caused_by(message: impl Into<String>, original: DanaError) -> Self {
        DanaError::Runtime {
            message: message.into(),
            original: Some(Box::new(original)),
        }
    }

    /// This error's source location, if it carries one.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            DanaError::Parse { location, .. }
            | DanaError::Validation { location, .. }
            | DanaError::Interpret { location, .. }
            | DanaError::State { location, .. } => location.as_ref(),
            DanaError::Runtime { .. } => None,
        }
    }

    /// Format the way the REPL displays an error: caret diagnostic first (if any
    /// location is attached), then the message, matching the uniform error model.
    pub fn display_for_repl(&self) -> String {
        match self.location() {
            Some(loc) => format!("{}\n\nError: {}", loc.render_caret(), self),
            None => format!("Error: {}", self),
        }
    }
}

impl From<std::io::Error> for DanaError {
    fn from(e: std::io::Error) -> Self {
        DanaError::runtime(format!("I/O error: {e}"))
    }
}

impl From<serde_json::Error> for DanaError {
    fn from(e: serde_json::Error) -> Self {
        DanaError::runtime(format!("JSON error: {e}"))
    }
}

impl From<reqwest::Error> for DanaError {
    fn from(e: reqwest::Error) -> Self {
        DanaError::Runtime {
            message: format!("HTTP error: {e}"),
            original: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = DanaError::parse("expected: (");
        assert_eq!(err.to_string(), "Parse error: expected: (");
    }

    #[test]
    fn test_state_error_message() {
        let err = DanaError::state("__last_value is a reserved slot");
        assert!(matches!(err, DanaError::State { .. }));
    }

    #[test]
    fn test_caret_rendering() {
        let loc = SourceLocation::new(3, 5, "private.a = ");
        let rendered = loc.render_caret();
        assert_eq!(rendered, "private.a = \n    ^");
    }

    #[test]
    fn test_display_for_repl_without_location() {
        let err = DanaError::interpret("unknown identifier `foo`");
        assert_eq!(
            err.display_for_repl(),
            "Error: Interpret error: unknown identifier `foo`"
        );
    }

    #[test]
    fn test_display_for_repl_with_location() {
        let loc = SourceLocation::new(1, 1, "while true:");
        let err = DanaError::interpret_at("loop step cap exceeded", loc);
        let rendered = err.display_for_repl();
        assert!(rendered.starts_with("while true:\n^"));
        assert!(rendered.contains("Error: Interpret error: loop step cap exceeded"));
    }

    #[test]
    fn test_runtime_caused_by_chains_source() {
        let cause = DanaError::runtime("connection refused");
        let err = DanaError::runtime_caused_by("NLP mode requires an LLM", cause);
        assert!(err.to_string().contains("NLP mode requires an LLM"));
    }
}
