//! LUT parse error types.

use thiserror::Error;

/// Result type for LUT parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while parsing a `.cube` file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Keyword line that could not be parsed.
    #[error("malformed header at line {line}: {msg}")]
    MalformedHeader {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        msg: String,
    },

    /// Missing or invalid LUT_3D_SIZE declaration.
    #[error("missing or invalid LUT_3D_SIZE")]
    MissingSize,

    /// Data row count does not match size^3.
    #[error("expected {expected} data rows, found {found}")]
    RowCountMismatch {
        /// size^3.
        expected: usize,
        /// Rows actually present.
        found: usize,
    },

    /// Data row with a non-numeric or missing channel value.
    #[error("invalid channel value at line {line}")]
    InvalidChannelValue {
        /// 1-based line number.
        line: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
