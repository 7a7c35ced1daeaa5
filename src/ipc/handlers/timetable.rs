use crate::ipc::error::{err, ok, timetable_err};
use crate::ipc::handlers::setup::load_timetable_setup;
use crate::ipc::helpers::{db_conn, optional_str, parse_bool, required_day, required_str};
use crate::ipc::types::{AppState, Request};
use crate::timetable::conflict::probe_conflict;
use crate::timetable::model::ConflictQuery;
use crate::timetable::{
    Confirmation, ConflictProbe, SessionScope, SlotAssignment, SqliteStore, TimetableSession,
    TimetableStore,
};
use rusqlite::Connection;
use serde_json::{json, Value as JsonValue};

fn resolve_year(conn: &Connection, req: &Request) -> Result<String, JsonValue> {
    if let Some(year) = optional_str(req, "academicYearId")? {
        return Ok(year);
    }
    load_timetable_setup(conn)
        .default_academic_year_id
        .ok_or_else(|| err(&req.id, "bad_params", "missing academicYearId", None))
}

/// Section from params; year from params or setup. Campus is the section's
/// own when it has one (a different `campusId` is rejected), otherwise the
/// param, then setup.
fn resolve_scope(
    conn: &Connection,
    store: &dyn TimetableStore,
    req: &Request,
) -> Result<SessionScope, JsonValue> {
    let section_id = required_str(req, "sectionId")?;
    let academic_year_id = resolve_year(conn, req)?;
    let section = match store.find_section(&section_id) {
        Ok(Some(s)) => s,
        Ok(None) => return Err(err(&req.id, "not_found", "section not found", None)),
        Err(e) => return Err(err(&req.id, "db_query_failed", e.to_string(), None)),
    };
    let requested = optional_str(req, "campusId")?;
    let campus_id = match (section.campus_id, requested) {
        (Some(own), Some(asked)) if own != asked => {
            return Err(err(
                &req.id,
                "bad_params",
                format!("section {} belongs to campus {}, not {}", section_id, own, asked),
                None,
            ));
        }
        (Some(own), _) => own,
        (None, Some(asked)) => asked,
        (None, None) => load_timetable_setup(conn)
            .default_campus_id
            .ok_or_else(|| err(&req.id, "bad_params", "missing campusId", None))?,
    };
    Ok(SessionScope {
        section_id,
        academic_year_id,
        campus_id,
    })
}

fn open_session<'s>(
    state: &AppState,
    conn: &Connection,
    store: &'s dyn TimetableStore,
    req: &Request,
) -> Result<TimetableSession<'s>, JsonValue> {
    let scope = resolve_scope(conn, store, req)?;
    TimetableSession::open(store, scope, state.saving.clone())
        .map_err(|e| timetable_err(&req.id, &e))
}

fn handle_open(state: &mut AppState, req: &Request) -> JsonValue {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let store = SqliteStore::new(conn);
    let session = match open_session(state, conn, &store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "grid": session.grid() }))
}

fn handle_slot_get(state: &mut AppState, req: &Request) -> JsonValue {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let day = match required_day(req, "day") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let period_id = match required_str(req, "periodId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteStore::new(conn);
    let session = match open_session(state, conn, &store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!({ "entry": session.entry_for_slot(day, &period_id) }),
    )
}

fn handle_conflict_check(state: &mut AppState, req: &Request) -> JsonValue {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let teacher_id = match required_str(req, "teacherId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let day = match required_day(req, "day") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let period_id = match required_str(req, "periodId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let academic_year_id = match resolve_year(conn, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exclude_entry_id = match optional_str(req, "excludeEntryId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let probe = if load_timetable_setup(conn).live_conflict_warnings {
        probe_conflict(
            &SqliteStore::new(conn),
            &ConflictQuery {
                teacher_id: &teacher_id,
                day,
                period_id: &period_id,
                academic_year_id: &academic_year_id,
                exclude_entry_id: exclude_entry_id.as_deref(),
            },
        )
    } else {
        ConflictProbe::Unknown
    };
    ok(
        &req.id,
        json!({
            "hasConflict": probe.has_conflict(),
            "conflictDetails": probe.details(),
            "probe": probe,
        }),
    )
}

fn handle_slot_assign(state: &mut AppState, req: &Request) -> JsonValue {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let day = match required_day(req, "day") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let period_id = match required_str(req, "periodId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Blank subject/teacher are left to the engine's validation.
    let subject_id = match optional_str(req, "subjectId") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };
    let teacher_id = match optional_str(req, "teacherId") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };
    let room_number = match optional_str(req, "roomNumber") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let existing_entry_id = match optional_str(req, "existingEntryId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let store = SqliteStore::new(conn);
    let mut session = match open_session(state, conn, &store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let assignment = SlotAssignment {
        period_id,
        day: Some(day),
        subject_id,
        teacher_id,
        room_number,
        existing_entry_id,
    };
    match session.assign_slot(&assignment) {
        Ok(entry) => ok(&req.id, json!({ "entry": entry, "grid": session.grid() })),
        Err(e) => timetable_err(&req.id, &e),
    }
}

fn handle_slot_erase(state: &mut AppState, req: &Request) -> JsonValue {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let entry_id = match required_str(req, "entryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteStore::new(conn);
    let mut session = match open_session(state, conn, &store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match session.erase_slot(&entry_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true, "grid": session.grid() })),
        Err(e) => timetable_err(&req.id, &e),
    }
}

fn handle_day_copy(state: &mut AppState, req: &Request) -> JsonValue {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let from = match required_day(req, "fromDay") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let to = match required_day(req, "toDay") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteStore::new(conn);
    let mut session = match open_session(state, conn, &store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match session.copy_day(from, to) {
        Ok(report) => ok(&req.id, json!({ "report": report, "grid": session.grid() })),
        Err(e) => timetable_err(&req.id, &e),
    }
}

fn handle_day_clear(state: &mut AppState, req: &Request) -> JsonValue {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let day = match required_day(req, "day") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let confirmed = match parse_bool(req, "confirm", false) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteStore::new(conn);
    let mut session = match open_session(state, conn, &store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match session.clear_day(day, Confirmation::from_flag(confirmed)) {
        Ok(report) => ok(&req.id, json!({ "report": report, "grid": session.grid() })),
        Err(e) => timetable_err(&req.id, &e),
    }
}

fn handle_teacher_week(state: &mut AppState, req: &Request) -> JsonValue {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let teacher_id = match required_str(req, "teacherId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let academic_year_id = match resolve_year(conn, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match SqliteStore::new(conn).list_teacher_entries(&teacher_id, &academic_year_id) {
        Ok(entries) => ok(&req.id, json!({ "entries": entries })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<JsonValue> {
    match req.method.as_str() {
        "timetable.open" => Some(handle_open(state, req)),
        "timetable.slot.get" => Some(handle_slot_get(state, req)),
        "timetable.conflict.check" => Some(handle_conflict_check(state, req)),
        "timetable.slot.assign" => Some(handle_slot_assign(state, req)),
        "timetable.slot.erase" => Some(handle_slot_erase(state, req)),
        "timetable.day.copy" => Some(handle_day_copy(state, req)),
        "timetable.day.clear" => Some(handle_day_clear(state, req)),
        "timetable.teacher.week" => Some(handle_teacher_week(state, req)),
        _ => None,
    }
}
