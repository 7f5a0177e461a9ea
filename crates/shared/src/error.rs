use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification shown to the user alongside a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Capacity,
    Movement,
    PersistenceRead,
    PersistenceWrite,
    Import,
}

/// Implemented by every typed error that can reach the notification layer.
pub trait Classified: fmt::Display {
    fn code(&self) -> ErrorCode;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerError {
    pub code: ErrorCode,
    pub message: String,
}

impl PlannerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_classified(err: &dyn Classified) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for PlannerError {}

impl Classified for crate::domain::CourseTextError {
    fn code(&self) -> ErrorCode {
        ErrorCode::Validation
    }
}
