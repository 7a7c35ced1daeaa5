use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("timetable.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS periods(
            id TEXT PRIMARY KEY,
            campus_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            short_name TEXT NOT NULL,
            length_minutes INTEGER,
            UNIQUE(campus_id, sort_order)
        )",
        [],
    )?;
    ensure_periods_length_minutes(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_periods_campus ON periods(campus_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sections(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            grade_id TEXT,
            campus_id TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT,
            grade_id TEXT,
            campus_id TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            campus_id TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable_entries(
            id TEXT PRIMARY KEY,
            section_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            period_id TEXT NOT NULL,
            day_of_week INTEGER NOT NULL CHECK(day_of_week BETWEEN 0 AND 4),
            academic_year_id TEXT NOT NULL,
            room_number TEXT,
            campus_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(section_id) REFERENCES sections(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(teacher_id) REFERENCES teachers(id),
            FOREIGN KEY(period_id) REFERENCES periods(id)
        )",
        [],
    )?;
    // Workspaces created before multi-campus support have no campus column on entries.
    ensure_timetable_entries_campus_id(conn)?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_timetable_entries_section_slot
         ON timetable_entries(section_id, day_of_week, period_id, academic_year_id)",
        [],
    )?;
    // Backstop for the pre-commit conflict check: a teacher holds at most one
    // entry per (day, period, year) across every section.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_timetable_entries_teacher_slot
         ON timetable_entries(teacher_id, day_of_week, period_id, academic_year_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetable_entries_section_year
         ON timetable_entries(section_id, academic_year_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

fn ensure_periods_length_minutes(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "periods", "length_minutes")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE periods ADD COLUMN length_minutes INTEGER", [])?;
    Ok(())
}

fn ensure_timetable_entries_campus_id(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "timetable_entries", "campus_id")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE timetable_entries ADD COLUMN campus_id TEXT", [])?;

    // Backfill from the owning section where it is known.
    conn.execute(
        "UPDATE timetable_entries
         SET campus_id = (
            SELECT s.campus_id FROM sections s WHERE s.id = timetable_entries.section_id
         )
         WHERE campus_id IS NULL",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
