use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unreachable,
    BadStatus,
    Malformed,
    Unauthorized,
    Internal,
}

/// Transient notice shown next to data that fell back to the last-known rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataNotice {
    pub code: ErrorCode,
    pub message: String,
}

impl DataNotice {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct DataError {
    pub code: ErrorCode,
    pub message: String,
}

impl DataError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Malformed, message)
    }
}

impl From<DataError> for DataNotice {
    fn from(value: DataError) -> Self {
        Self {
            code: value.code,
            message: value.message,
        }
    }
}
