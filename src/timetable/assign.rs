use super::conflict::check_conflict;
use super::error::{StoreError, TimetableError};
use super::model::{ConflictQuery, EntryPatch, NewEntry, TimetableEntry, Weekday};
use super::occupancy::OccupancyIndex;
use super::store::TimetableStore;

/// One slot's requested (subject, teacher, room). `existing_entry_id` turns
/// the request into an edit of that entry.
#[derive(Debug, Clone, Default)]
pub struct SlotAssignment {
    pub period_id: String,
    pub day: Option<Weekday>,
    pub subject_id: String,
    pub teacher_id: String,
    pub room_number: Option<String>,
    pub existing_entry_id: Option<String>,
}

fn normalize_room(room: Option<&str>) -> Option<String> {
    room.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Validates, conflict-checks and commits one slot. The caller reloads the
/// index afterwards; nothing here patches it.
pub fn assign_slot(
    store: &dyn TimetableStore,
    index: &OccupancyIndex,
    campus_id: Option<&str>,
    req: &SlotAssignment,
) -> Result<TimetableEntry, TimetableError> {
    let subject_id = req.subject_id.trim();
    let teacher_id = req.teacher_id.trim();
    let period_id = req.period_id.trim();
    if subject_id.is_empty() {
        return Err(TimetableError::validation("select a subject"));
    }
    if teacher_id.is_empty() {
        return Err(TimetableError::validation("select a teacher"));
    }
    if period_id.is_empty() {
        return Err(TimetableError::validation("missing period"));
    }
    let Some(day) = req.day else {
        return Err(TimetableError::validation("day must be in 0..=4"));
    };
    let room_number = normalize_room(req.room_number.as_deref());

    let existing_id = req
        .existing_entry_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match existing_id {
        None => {
            if let Some(held) = index.get(day, period_id) {
                return Err(TimetableError::validation(format!(
                    "{} {} already has an entry ({}); edit it instead",
                    day, period_id, held.id
                )));
            }
        }
        Some(id) => {
            let Some(held) = index.find(id) else {
                return Err(TimetableError::NotFound(format!(
                    "entry {} is not part of this timetable",
                    id
                )));
            };
            if held.day_of_week != day || held.period_id != period_id {
                return Err(TimetableError::validation(format!(
                    "entry {} does not occupy {} {}",
                    id, day, period_id
                )));
            }
        }
    }

    let query = ConflictQuery {
        teacher_id,
        day,
        period_id,
        academic_year_id: index.academic_year_id(),
        exclude_entry_id: existing_id,
    };
    match check_conflict(store, &query) {
        Ok(r) if r.has_conflict => {
            let details = r
                .conflict_details
                .unwrap_or_else(|| "Teacher is already booked in this period".to_string());
            tracing::info!(
                section_id = index.section_id(),
                teacher_id,
                day = day.index(),
                period_id,
                %details,
                "assignment rejected: teacher conflict"
            );
            return Err(TimetableError::Conflict { details });
        }
        Ok(_) => {}
        // The store's teacher-slot constraint still rejects a real double booking.
        Err(e) => tracing::warn!(
            teacher_id,
            day = day.index(),
            period_id,
            error = %e,
            "pre-commit conflict check failed; committing anyway"
        ),
    }

    let committed = match existing_id {
        Some(id) => store.update_entry(
            id,
            &EntryPatch {
                subject_id: subject_id.to_string(),
                teacher_id: teacher_id.to_string(),
                room_number,
            },
        ),
        None => store.create_entry(&NewEntry {
            section_id: index.section_id().to_string(),
            subject_id: subject_id.to_string(),
            teacher_id: teacher_id.to_string(),
            period_id: period_id.to_string(),
            day_of_week: day,
            academic_year_id: index.academic_year_id().to_string(),
            room_number,
            campus_id: campus_id.map(str::to_string),
        }),
    };
    committed.map_err(|e| {
        tracing::warn!(
            section_id = index.section_id(),
            day = day.index(),
            period_id,
            error = %e,
            "slot commit failed"
        );
        commit_error(e)
    })
}

fn commit_error(e: StoreError) -> TimetableError {
    match e {
        StoreError::TeacherDoubleBooked => TimetableError::Conflict {
            details: "Teacher is already booked in this period".to_string(),
        },
        other => TimetableError::Persistence(other),
    }
}

/// Deletes an entry of this timetable. Removal never creates a conflict, so
/// no check is made.
pub fn erase_slot(
    store: &dyn TimetableStore,
    index: &OccupancyIndex,
    entry_id: &str,
) -> Result<(), TimetableError> {
    let Some(entry) = index.find(entry_id) else {
        return Err(TimetableError::NotFound(format!(
            "entry {} is not part of this timetable",
            entry_id
        )));
    };
    store.delete_entry(&entry.id).map_err(|e| {
        tracing::warn!(entry_id, error = %e, "erase failed");
        TimetableError::Persistence(e)
    })
}
