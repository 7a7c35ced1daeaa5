use super::conflict::check_conflict;
use super::error::TimetableError;
use super::model::{ConflictQuery, NewEntry, TimetableEntry, Weekday};
use super::occupancy::OccupancyIndex;
use super::store::TimetableStore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CopyOutcome {
    Created { entry_id: String },
    SkippedOccupied,
    SkippedConflict { details: String },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopiedEntry {
    pub source_entry_id: String,
    pub period_id: String,
    pub outcome: CopyOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyDayReport {
    pub from_day: Weekday,
    pub to_day: Weekday,
    pub nothing_to_copy: bool,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub entries: Vec<CopiedEntry>,
}

impl CopyDayReport {
    fn empty(from_day: Weekday, to_day: Weekday) -> Self {
        Self {
            from_day,
            to_day,
            nothing_to_copy: false,
            created: 0,
            skipped: 0,
            failed: 0,
            entries: Vec::new(),
        }
    }

    fn record(mut self, source_entry_id: &str, period_id: &str, outcome: CopyOutcome) -> Self {
        match outcome {
            CopyOutcome::Created { .. } => self.created += 1,
            CopyOutcome::SkippedOccupied | CopyOutcome::SkippedConflict { .. } => {
                self.skipped += 1
            }
            CopyOutcome::Failed { .. } => self.failed += 1,
        }
        self.entries.push(CopiedEntry {
            source_entry_id: source_entry_id.to_string(),
            period_id: period_id.to_string(),
            outcome,
        });
        self
    }
}

/// Copies every entry of `from` onto `to` in the same section and year.
///
/// Each entry is handled on its own: an occupied target or a busy teacher is
/// a skip, a failed write is counted and the loop moves on. Nothing already
/// written is rolled back.
pub fn copy_day(
    store: &dyn TimetableStore,
    index: &OccupancyIndex,
    campus_id: Option<&str>,
    from: Weekday,
    to: Weekday,
) -> Result<CopyDayReport, TimetableError> {
    if from == to {
        return Err(TimetableError::validation(
            "source and target day must differ",
        ));
    }
    let sources: Vec<_> = index.entries_on(from).collect();
    if sources.is_empty() {
        tracing::info!(section_id = index.section_id(), from = from.index(), "nothing to copy");
        return Ok(CopyDayReport {
            nothing_to_copy: true,
            ..CopyDayReport::empty(from, to)
        });
    }

    let report = sources
        .into_iter()
        .fold(CopyDayReport::empty(from, to), |report, src| {
            let outcome = copy_one(store, index, campus_id, src, to);
            report.record(&src.id, &src.period_id, outcome)
        });

    tracing::info!(
        section_id = index.section_id(),
        from = from.index(),
        to = to.index(),
        created = report.created,
        skipped = report.skipped,
        failed = report.failed,
        "copy day finished"
    );
    Ok(report)
}

fn copy_one(
    store: &dyn TimetableStore,
    index: &OccupancyIndex,
    campus_id: Option<&str>,
    src: &TimetableEntry,
    to: Weekday,
) -> CopyOutcome {
    // Copy never overwrites.
    if index.is_occupied(to, &src.period_id) {
        return CopyOutcome::SkippedOccupied;
    }

    let query = ConflictQuery {
        teacher_id: &src.teacher_id,
        day: to,
        period_id: &src.period_id,
        academic_year_id: index.academic_year_id(),
        exclude_entry_id: None,
    };
    match check_conflict(store, &query) {
        Ok(r) if r.has_conflict => {
            return CopyOutcome::SkippedConflict {
                details: r.conflict_details.unwrap_or_default(),
            }
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(
            entry_id = %src.id,
            error = %e,
            "conflict check failed during copy; relying on store constraint"
        ),
    }

    let copy = NewEntry {
        section_id: src.section_id.clone(),
        subject_id: src.subject_id.clone(),
        teacher_id: src.teacher_id.clone(),
        period_id: src.period_id.clone(),
        day_of_week: to,
        academic_year_id: src.academic_year_id.clone(),
        room_number: src.room_number.clone(),
        campus_id: src
            .campus_id
            .clone()
            .or_else(|| campus_id.map(str::to_string)),
    };
    match store.create_entry(&copy) {
        Ok(created) => CopyOutcome::Created {
            entry_id: created.id,
        },
        Err(e) => {
            tracing::warn!(entry_id = %src.id, error = %e, "copy of entry failed");
            CopyOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}

/// Explicit go-ahead for destructive bulk deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    NotConfirmed,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::NotConfirmed
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFailure {
    pub entry_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearDayReport {
    pub day: Weekday,
    pub requested: usize,
    pub removed: usize,
    pub failures: Vec<EntryFailure>,
}

/// Deletes every entry on `day`, one at a time. `removed` is what actually
/// went away, not what was asked for.
pub fn clear_day(
    store: &dyn TimetableStore,
    index: &OccupancyIndex,
    day: Weekday,
    confirmation: Confirmation,
) -> Result<ClearDayReport, TimetableError> {
    if confirmation != Confirmation::Confirmed {
        return Err(TimetableError::ConfirmationRequired);
    }

    let mut report = ClearDayReport {
        day,
        requested: 0,
        removed: 0,
        failures: Vec::new(),
    };
    for entry in index.entries_on(day) {
        report.requested += 1;
        match store.delete_entry(&entry.id) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                tracing::warn!(entry_id = %entry.id, error = %e, "clear day: delete failed");
                report.failures.push(EntryFailure {
                    entry_id: entry.id.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        section_id = index.section_id(),
        day = day.index(),
        requested = report.requested,
        removed = report.removed,
        "clear day finished"
    );
    Ok(report)
}
