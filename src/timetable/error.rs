//! Error types for the timetable engine and its backing store.

use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("teacher is already booked at this day and period")]
    TeacherDoubleBooked,
    #[error("slot already has an entry for this section")]
    SlotOccupied,
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Classifies a rusqlite failure using the uniqueness constraints on
    /// `timetable_entries`.
    pub fn from_write(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref f, Some(ref msg))
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                if msg.contains("timetable_entries.teacher_id") {
                    Self::TeacherDoubleBooked
                } else if msg.contains("timetable_entries.section_id") {
                    Self::SlotOccupied
                } else {
                    Self::Constraint(msg.clone())
                }
            }
            other => Self::Sqlite(other),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimetableError {
    #[error("{0}")]
    Validation(String),
    #[error("{details}")]
    Conflict { details: String },
    #[error("failed to save timetable: {0}")]
    Persistence(#[source] StoreError),
    #[error("failed to load timetable: {0}")]
    Load(#[source] StoreError),
    #[error("{0}")]
    NotFound(String),
    #[error("another save is already in progress")]
    SaveInProgress,
    #[error("clearing a day requires confirmation")]
    ConfirmationRequired,
}

impl TimetableError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "bad_params",
            Self::Conflict { .. } => "teacher_conflict",
            Self::Persistence(StoreError::NotFound(_)) => "not_found",
            Self::Persistence(_) => "persistence_failed",
            Self::Load(_) => "db_query_failed",
            Self::NotFound(_) => "not_found",
            Self::SaveInProgress => "save_in_progress",
            Self::ConfirmationRequired => "confirmation_required",
        }
    }

    /// Extra payload for the IPC error object.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Conflict { details } => Some(json!({ "conflictDetails": details })),
            _ => None,
        }
    }
}
