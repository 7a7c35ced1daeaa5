use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{SqliteStore, TimetableStore};
use serde_json::json;

fn handle_periods_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let campus_id = match required_str(req, "campusId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match SqliteStore::new(conn).list_periods(&campus_id) {
        Ok(periods) => ok(&req.id, json!({ "periods": periods })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let grade_id = match optional_str(req, "gradeId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let campus_id = match optional_str(req, "campusId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match SqliteStore::new(conn).list_subjects(grade_id.as_deref(), campus_id.as_deref()) {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_teachers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let campus_id = match optional_str(req, "campusId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match SqliteStore::new(conn).list_teachers(campus_id.as_deref()) {
        Ok(teachers) => ok(&req.id, json!({ "teachers": teachers })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_sections_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let campus_id = match optional_str(req, "campusId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match SqliteStore::new(conn).list_sections(campus_id.as_deref()) {
        Ok(sections) => ok(&req.id, json!({ "sections": sections })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "periods.list" => Some(handle_periods_list(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "teachers.list" => Some(handle_teachers_list(state, req)),
        "sections.list" => Some(handle_sections_list(state, req)),
        _ => None,
    }
}
