use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanTapeError {
    #[error("Missing column in {table}: {column}")]
    MissingColumn { table: String, column: String },

    #[error("Malformed value in {table}.{column}: {reason}")]
    MalformedColumn {
        table: String,
        column: String,
        reason: String,
    },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LoanTapeError {
    fn from(e: serde_json::Error) -> Self {
        LoanTapeError::SerializationError(e.to_string())
    }
}
