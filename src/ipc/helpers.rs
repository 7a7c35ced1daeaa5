use rusqlite::Connection;
use serde_json::Value as JsonValue;

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::timetable::Weekday;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, JsonValue> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, JsonValue> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Absent, null and blank all mean "not given".
pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, JsonValue> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let s = v.as_str().ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    format!("{} must be string or null", key),
                    None,
                )
            })?;
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
    }
}

pub fn parse_bool(req: &Request, key: &str, default: bool) -> Result<bool, JsonValue> {
    match req.params.get(key) {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be boolean", key), None)),
    }
}

pub fn required_day(req: &Request, key: &str) -> Result<Weekday, JsonValue> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    raw.as_i64()
        .and_then(Weekday::from_index)
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be an integer in 0..=4", key),
                None,
            )
        })
}
