//! Error types for building a test matrix.

use std::io;
use std::num::ParseIntError;

use thiserror::Error;

/// Errors that can occur while building a test matrix or one of its elements.
///
/// None of these are recovered from internally. They are returned to the caller, which decides
/// whether to terminate the run.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// The `statsd` option is missing or empty.
    #[error("statsd host not defined")]
    MissingStatsdHost,

    /// The `matrix` option is missing or empty.
    #[error("test matrix not defined")]
    MissingMatrix,

    /// A matrix entry does not have the `tag=size` shape.
    #[error("malformed matrix entry `{0}`: expected `tag=size`")]
    MalformedEntry(String),

    /// A matrix entry has an empty tag.
    #[error("matrix entry `{0}` has an empty tag")]
    EmptyTag(String),

    /// A tag contains characters that cannot be part of a metric key.
    #[error("tag `{0}` contains a reserved character (one of `:|@#`)")]
    InvalidTag(String),

    /// The size of a matrix entry is not a non-negative integer.
    #[error("unable to convert `{value}` to an integer")]
    InvalidSize {
        /// The offending size token.
        value: String,
        /// The underlying parse failure.
        #[source]
        source: ParseIntError,
    },

    /// The same tag appears more than once in the matrix.
    #[error("duplicate tag `{0}` in test matrix")]
    DuplicateTag(String),

    /// Creating, writing or closing a temporary file failed.
    #[error("could not {stage} temporary file for tag `{tag}`")]
    TempFile {
        /// The tag of the element being built.
        tag: String,
        /// What was being done to the file.
        stage: &'static str,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The OS random source could not be read.
    #[error("error reading random data")]
    Random(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The StatsD client could not be created or a metric could not be sent.
    #[error("statsd error")]
    Metrics(#[from] cadence::MetricError),
}

/// Result type for matrix operations.
pub type MatrixResult<T> = Result<T, MatrixError>;
