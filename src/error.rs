use thiserror::Error;

/// Source location span for error reporting
/// Represents a range of characters in the input string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (0-indexed byte offset)
    pub start: usize,
    /// End position (exclusive, 0-indexed byte offset)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a span for a single position
    pub fn at(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos + 1,
        }
    }

    /// Check if this span has valid location info
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// Format the span for display (1-indexed for users)
    pub fn display(&self) -> String {
        if !self.is_valid() {
            String::new()
        } else if self.end - self.start == 1 {
            format!(" at position {}", self.start + 1)
        } else {
            format!(" at positions {}-{}", self.start + 1, self.end)
        }
    }
}

fn span_suffix(span: &Option<Span>) -> String {
    span.map_or(String::new(), |s| s.display())
}

/// Errors raised while parsing, differentiating, rendering or configuring a functional
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XcError {
    // Parsing errors
    #[error("Formula cannot be empty")]
    EmptyFormula,

    #[error("Invalid number format: '{value}'{suffix}", suffix = span_suffix(.span))]
    InvalidNumber { value: String, span: Option<Span> },

    #[error("Invalid token: '{token}'{suffix}", suffix = span_suffix(.span))]
    InvalidToken { token: String, span: Option<Span> },

    #[error("Expected '{expected}', but got '{got}'{suffix}", suffix = span_suffix(.span))]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Option<Span>,
    },

    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,

    // Differentiation errors
    #[error("Unknown function '{name}' with {arity} argument(s)")]
    UnknownFunction { name: String, arity: usize },

    #[error("Cannot differentiate '{expr}' with respect to '{var}'")]
    NotDifferentiable { expr: String, var: String },

    #[error("Expression nesting depth exceeds maximum limit")]
    MaxDepthExceeded,

    #[error("Expression size exceeds maximum node count limit")]
    MaxNodesExceeded,

    // Rendering and evaluation errors
    #[error("Cannot render expression as C: {0}")]
    Unrenderable(String),

    #[error("Symbol '{0}' has no value")]
    UnboundSymbol(String),

    // Configuration errors
    #[error("Derivative order must be between 1 and 4, got {0}")]
    InvalidOrder(u8),

    #[error("Invalid functional configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not read functional definition: {0}")]
    Config(String),
}

impl XcError {
    /// Create InvalidConfig from any message
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        XcError::InvalidConfig(msg.into())
    }

    /// Create InvalidToken with span
    pub fn invalid_token_at(token: impl Into<String>, span: Span) -> Self {
        XcError::InvalidToken {
            token: token.into(),
            span: Some(span),
        }
    }

    /// True for errors that are raised before any differentiation work
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            XcError::InvalidOrder(_) | XcError::InvalidConfig(_) | XcError::Config(_)
        )
    }
}

impl From<serde_yaml::Error> for XcError {
    fn from(err: serde_yaml::Error) -> Self {
        XcError::Config(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = XcError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        assert_eq!(Span::at(0).display(), " at position 1");
        assert_eq!(Span::new(2, 5).display(), " at positions 3-5");
        assert_eq!(Span::default().display(), "");
    }

    #[test]
    fn test_error_messages() {
        let err = XcError::invalid_token_at("$", Span::at(3));
        assert_eq!(err.to_string(), "Invalid token: '$' at position 4");

        let err = XcError::UnexpectedToken {
            expected: ")".to_string(),
            got: "end of input".to_string(),
            span: None,
        };
        assert_eq!(err.to_string(), "Expected ')', but got 'end of input'");

        assert_eq!(
            XcError::InvalidOrder(5).to_string(),
            "Derivative order must be between 1 and 4, got 5"
        );
    }

    #[test]
    fn test_config_classification() {
        assert!(XcError::InvalidOrder(0).is_config_error());
        assert!(XcError::invalid_config("bad").is_config_error());
        assert!(!XcError::MaxDepthExceeded.is_config_error());
    }
}
