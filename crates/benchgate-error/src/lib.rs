//! Unified error types for benchgate.
//!
//! Parse and resolution errors are configuration defects. They are kept apart
//! from assertion failures, which are ordinary verdicts and never appear here.

use std::path::PathBuf;

/// A malformed assertion expression.
///
/// `position` is a byte offset into `expression` and always lies on a char
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "invalid assertion \"{expression}\" at position {position}: expected {}, found {}",
    expected_list(.expected),
    found(.expression, .position)
)]
pub struct ParseError {
    pub expression: String,
    pub position: usize,
    /// Human-readable names of the tokens that would have been accepted.
    pub expected: Vec<&'static str>,
}

impl ParseError {
    pub fn new(expression: &str, position: usize, expected: Vec<&'static str>) -> Self {
        Self {
            expression: expression.to_string(),
            position,
            expected,
        }
    }

    /// The unconsumed input starting at the failure position.
    pub fn remainder(&self) -> &str {
        self.expression.get(self.position..).unwrap_or("")
    }
}

fn expected_list(expected: &[&str]) -> String {
    match expected {
        [] => "nothing".to_string(),
        [only] => (*only).to_string(),
        many => format!("one of {}", many.join(", ")),
    }
}

fn found(expression: &str, position: &usize) -> String {
    match expression.get(*position..).unwrap_or("") {
        "" => "end of input".to_string(),
        rest => format!("\"{rest}\""),
    }
}

/// A parsed assertion that cannot be evaluated against the supplied statistics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unresolvable property `{path}`: unknown property")]
    UnknownProperty { path: String },

    #[error("unresolvable property `{path}`: `{field}` was not measured")]
    NotMeasured { path: String, field: String },

    #[error("unresolvable property `{path}`: no baseline statistics available")]
    NoBaseline { path: String },

    #[error("unit mismatch in {context}: cannot relate {left} to {right}")]
    UnitMismatch {
        context: &'static str,
        left: &'static str,
        right: &'static str,
    },
}

/// Either half of an assertion error: it did not parse, or it did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl AssertionError {
    pub fn kind(&self) -> &'static str {
        match self {
            AssertionError::Parse(_) => "parse",
            AssertionError::Resolve(_) => "resolve",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse toml {}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse json {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported schema `{found}` (expected `{expected}`)")]
    Schema {
        found: String,
        expected: &'static str,
    },

    #[error("subject `{0}` is defined more than once")]
    DuplicateSubject(String),

    #[error("unknown subject `{0}`")]
    UnknownSubject(String),

    #[error("max_retries must be <= {max}, got {got}")]
    TooManyRetries { got: u32, max: u32 },

    #[error("retry_threshold must be a positive percentage, got {0}")]
    InvalidRetryThreshold(f64),
}
