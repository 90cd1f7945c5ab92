//! Error types for topicsmooth.
//!
//! The scoring engine itself never fails on lookups or empty histories; these
//! errors cover invalid parameters, counter bookkeeping and the I/O shell.

use thiserror::Error;

/// A specialized `Result` type for topicsmooth operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A smoothing or model parameter was outside its valid range.
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A history counter would have gone negative.
    #[error("Counter underflow: '{0}' has no occurrences to remove")]
    CounterUnderflow(String),

    /// A corpus file could not be parsed.
    #[error("Corpus error at line {line}: {reason}")]
    Corpus { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<confy::ConfyError> for Error {
    fn from(e: confy::ConfyError) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    /// Helper to create a `Corpus` error.
    pub fn corpus(line: usize, reason: impl Into<String>) -> Self {
        Error::Corpus {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(name: &'static str, value: f64, reason: &'static str) -> Self {
        Error::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}
