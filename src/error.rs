use crate::ValueType;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// The database file could not be opened with the requested flags.
    #[error("cannot open '{path}': {message}")]
    Open {
        /// Path handed to the engine.
        path: String,
        /// Diagnostic text from the engine.
        message: String,
        /// Extended engine result code.
        code: i32,
    },
    /// Statement text could not be compiled.
    #[error("error in '{sql}': {message}")]
    Prepare {
        /// Offending statement text.
        sql: String,
        /// Diagnostic text from the engine.
        message: String,
        /// Extended engine result code.
        code: i32,
    },
    /// Statement execution, reset or binding failed inside the engine.
    #[error("error in \"{sql}\": \"{message}\"")]
    Execution {
        /// Statement text that was running.
        sql: String,
        /// Diagnostic text from the engine.
        message: String,
        /// Extended engine result code.
        code: i32,
    },
    /// Parameter index, parameter name or column index does not exist.
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),
    /// A value does not fit the target integer width.
    #[error("value out of range: {0}")]
    Range(String),
    /// Text could not be parsed as a number.
    #[error("parse error: {0}")]
    Parse(String),
    /// A blob has a byte length that cannot be reinterpreted as the target.
    #[error("cannot reinterpret a {len}-byte blob as {target}")]
    Size {
        /// Byte length of the blob.
        len: usize,
        /// Name of the requested numeric type.
        target: &'static str,
    },
    /// A result cell was accessed as an alternative it does not hold.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: ValueType,
        actual: ValueType,
    },
}

impl SqliteError {
    /// Returns the engine result code for engine-originated failures.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Open { code, .. } | Self::Prepare { code, .. } | Self::Execution { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }
}
