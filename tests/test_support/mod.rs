#![allow(dead_code)]

use rusqlite::Connection;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const YEAR: &str = "y2026";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_timetabled");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn timetabled");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Returns the error object of a request that must fail.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value.get("error").cloned().unwrap_or_else(|| json!({}))
}

pub fn error_code(error: &serde_json::Value) -> &str {
    error.get("code").and_then(|v| v.as_str()).unwrap_or("")
}

/// Seeds the roster tables that the daemon treats as read-only. The
/// workspace must already have been selected so the schema exists.
pub fn seed_roster(workspace: &Path) {
    let conn = Connection::open(workspace.join("timetable.sqlite3")).expect("open workspace db");
    conn.execute_batch(
        "INSERT INTO periods(id, campus_id, sort_order, short_name, length_minutes) VALUES
            ('p1', 'main', 1, 'P1', 45),
            ('p2', 'main', 2, 'P2', 45),
            ('p3', 'main', 3, 'P3', 45),
            ('p4', 'main', 4, 'P4', 45),
            ('p5', 'main', 5, 'P5', 45);
         INSERT INTO sections(id, name, grade_id, campus_id) VALUES
            ('s-7a', '7A', 'g7', 'main'),
            ('s-7b', '7B', 'g7', 'main'),
            ('s-x', 'Floating', NULL, NULL);
         INSERT INTO subjects(id, name, code, grade_id, campus_id) VALUES
            ('math', 'Mathematics', 'MAT', NULL, NULL),
            ('eng', 'English', 'ENG', 'g7', 'main'),
            ('sci', 'Science', 'SCI', 'g8', 'main');
         INSERT INTO teachers(id, name, campus_id) VALUES
            ('t-ada', 'Ada Lovelace', 'main'),
            ('t-bob', 'Bob Moses', 'main'),
            ('t-cyd', 'Cyd Charisse', 'main'),
            ('t-dee', 'Dee Rees', 'main'),
            ('t-eve', 'Eve Arden', 'main');",
    )
    .expect("seed roster");
}

pub fn open_workspace(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    prefix: &str,
) -> PathBuf {
    let workspace = temp_dir(prefix);
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed_roster(&workspace);
    workspace
}

/// One cell of a section's week, as sent to `timetable.slot.assign`.
pub struct Slot<'a> {
    pub section_id: &'a str,
    pub day: i64,
    pub period_id: &'a str,
    pub subject_id: &'a str,
    pub teacher_id: &'a str,
}

impl<'a> Slot<'a> {
    pub fn new(
        section_id: &'a str,
        day: i64,
        period_id: &'a str,
        subject_id: &'a str,
        teacher_id: &'a str,
    ) -> Self {
        Self {
            section_id,
            day,
            period_id,
            subject_id,
            teacher_id,
        }
    }
}

pub fn assign(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    slot: Slot<'_>,
) -> serde_json::Value {
    request(
        stdin,
        reader,
        id,
        "timetable.slot.assign",
        json!({
            "sectionId": slot.section_id,
            "academicYearId": YEAR,
            "day": slot.day,
            "periodId": slot.period_id,
            "subjectId": slot.subject_id,
            "teacherId": slot.teacher_id,
        }),
    )
}

pub fn entries_on_day(grid: &serde_json::Value, day: usize) -> Vec<serde_json::Value> {
    grid.pointer(&format!("/days/{}/cells", day))
        .and_then(|v| v.as_array())
        .map(|cells| {
            cells
                .iter()
                .filter_map(|c| c.get("entry").filter(|e| !e.is_null()).cloned())
                .collect()
        })
        .unwrap_or_default()
}
