use thiserror::Error;

/// Error returned when a document cannot be canonicalized.
#[derive(Error, Debug)]
pub enum CanonicalizeError {
    /// Document text is not valid YAML/JSON.
    #[error("failed to parse document: {0}")]
    Parse(#[source] serde_yaml::Error),
    /// A value did not have the shape its context requires.
    #[error("unexpected {found} in `{context}`, expected {expected}")]
    Shape {
        /// Context name the value was found under.
        context: String,
        /// Shape the context requires.
        expected: &'static str,
        /// Shape actually observed.
        found: &'static str,
    },
    /// Document nested deeper than the canonicalizer allows.
    #[error("recursion limit exceeded: document nested deeper than {max_depth} levels")]
    RecursionLimitExceeded {
        /// The limit that was exceeded.
        max_depth: usize,
    },
    /// Canonical tree could not be rendered back to text.
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

impl CanonicalizeError {
    pub(crate) fn shape(context: &str, expected: &'static str, found: &'static str) -> Self {
        CanonicalizeError::Shape {
            context: context.to_string(),
            expected,
            found,
        }
    }
}

/// Error returned while loading a policy overlay.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Policy file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Policy file is not a valid policy document.
    #[error("invalid policy document: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A registered default is neither a scalar nor a sequence.
    #[error("default for `{field}` must be a scalar or a sequence")]
    InvalidDefault {
        /// Field the default was registered for.
        field: String,
    },
}

/// Failure of one document inside a multi-document stream.
#[derive(Error, Debug)]
#[error("document {index}: {source}")]
pub struct BatchError {
    /// Zero-based position of the document in the stream.
    pub index: usize,
    /// Underlying failure.
    #[source]
    pub source: CanonicalizeError,
}
