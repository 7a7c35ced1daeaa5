use super::error::StoreError;
use super::model::{ConflictQuery, ConflictResult};
use super::store::TimetableStore;
use serde::Serialize;

/// Authoritative check: is the teacher already booked at this day/period in
/// this academic year, in any section? Errors are returned to the caller.
pub fn check_conflict(
    store: &dyn TimetableStore,
    query: &ConflictQuery<'_>,
) -> Result<ConflictResult, StoreError> {
    store.check_teacher_conflict(query)
}

/// Outcome of a live conflict probe. A failed query is `Unknown`, never a
/// warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ConflictProbe {
    Clear,
    Conflict { details: String },
    Unknown,
}

impl ConflictProbe {
    pub fn has_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Conflict { details } => Some(details),
            _ => None,
        }
    }
}

/// Non-blocking variant for UI warnings: store failures are swallowed.
pub fn probe_conflict(store: &dyn TimetableStore, query: &ConflictQuery<'_>) -> ConflictProbe {
    match check_conflict(store, query) {
        Ok(r) if r.has_conflict => ConflictProbe::Conflict {
            details: r
                .conflict_details
                .unwrap_or_else(|| "Teacher is already booked in this period".to_string()),
        },
        Ok(_) => ConflictProbe::Clear,
        Err(e) => {
            tracing::debug!(
                teacher_id = query.teacher_id,
                day = query.day.index(),
                period_id = query.period_id,
                error = %e,
                "conflict probe failed; treating as unknown"
            );
            ConflictProbe::Unknown
        }
    }
}
