use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("archive {archive_id} has a malformed creation timestamp: {value:?}")]
    MalformedTimestamp { archive_id: String, value: String },
}

impl AggregateError {
    pub fn archive_id(&self) -> &str {
        match self {
            AggregateError::MalformedTimestamp { archive_id, .. } => archive_id,
        }
    }
}
