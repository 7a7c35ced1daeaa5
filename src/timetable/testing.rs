//! Shared fixtures for the engine's unit tests.

use super::error::StoreError;
use super::model::{
    ConflictQuery, ConflictResult, EntryPatch, NewEntry, Period, Section, Subject, Teacher,
    TimetableEntry, Weekday,
};
use super::store::{SqliteStore, TimetableStore};
use crate::db;
use rusqlite::Connection;
use std::cell::Cell;
use std::collections::HashSet;

pub const YEAR: &str = "y2026";

/// In-memory workspace with one campus of five periods, a second campus with
/// one period, three sections and a small roster.
pub fn fixture_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    db::init_schema(&conn).expect("init schema");
    conn.execute_batch(
        "INSERT INTO periods(id, campus_id, sort_order, short_name, length_minutes) VALUES
            ('p3', 'main', 3, 'P3', 45),
            ('p1', 'main', 1, 'P1', 45),
            ('p2', 'main', 2, 'P2', 45),
            ('p5', 'main', 5, 'P5', NULL),
            ('p4', 'main', 4, 'P4', 45),
            ('pa1', 'annex', 1, 'A1', 60);
         INSERT INTO sections(id, name, grade_id, campus_id) VALUES
            ('s-7a', '7A', 'g7', 'main'),
            ('s-7b', '7B', 'g7', 'main'),
            ('s-8a', '8A', 'g8', 'main');
         INSERT INTO subjects(id, name, code, grade_id, campus_id) VALUES
            ('math', 'Mathematics', 'MAT', NULL, NULL),
            ('eng', 'English', 'ENG', 'g7', 'main'),
            ('chem', 'Chemistry', 'CHE', 'g8', 'main'),
            ('art', 'Art', NULL, NULL, 'main');
         INSERT INTO teachers(id, name, campus_id) VALUES
            ('t-ada', 'Ada Lovelace', 'main'),
            ('t-bob', 'Bob Moses', 'main'),
            ('t-cyd', 'Cyd Charisse', 'main'),
            ('t-dee', 'Dee Rees', 'main'),
            ('t-eve', 'Eve Arden', 'main'),
            ('t-fay', 'Fay Wray', 'annex');",
    )
    .expect("seed roster");
    conn
}

pub fn new_entry(
    section_id: &str,
    subject_id: &str,
    teacher_id: &str,
    period_id: &str,
    day: Weekday,
) -> NewEntry {
    NewEntry {
        section_id: section_id.to_string(),
        subject_id: subject_id.to_string(),
        teacher_id: teacher_id.to_string(),
        period_id: period_id.to_string(),
        day_of_week: day,
        academic_year_id: YEAR.to_string(),
        room_number: None,
        campus_id: Some("main".to_string()),
    }
}

/// Store wrapper that injects failures for chosen periods, entry ids, every
/// conflict query, or entry-list reads past a given count.
pub struct FlakyStore<'c> {
    inner: SqliteStore<'c>,
    pub fail_create_periods: HashSet<String>,
    pub fail_delete_ids: HashSet<String>,
    pub fail_conflict_checks: bool,
    pub fail_entry_reads_after: Option<usize>,
    entry_reads: Cell<usize>,
}

impl<'c> FlakyStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            inner: SqliteStore::new(conn),
            fail_create_periods: HashSet::new(),
            fail_delete_ids: HashSet::new(),
            fail_conflict_checks: false,
            fail_entry_reads_after: None,
            entry_reads: Cell::new(0),
        }
    }
}

fn injected() -> StoreError {
    StoreError::Constraint("injected failure".to_string())
}

impl TimetableStore for FlakyStore<'_> {
    fn list_periods(&self, campus_id: &str) -> Result<Vec<Period>, StoreError> {
        self.inner.list_periods(campus_id)
    }

    fn list_entries(
        &self,
        section_id: &str,
        academic_year_id: &str,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        let reads = self.entry_reads.get() + 1;
        self.entry_reads.set(reads);
        if self.fail_entry_reads_after.is_some_and(|limit| reads > limit) {
            return Err(injected());
        }
        self.inner.list_entries(section_id, academic_year_id)
    }

    fn create_entry(&self, entry: &NewEntry) -> Result<TimetableEntry, StoreError> {
        if self.fail_create_periods.contains(&entry.period_id) {
            return Err(injected());
        }
        self.inner.create_entry(entry)
    }

    fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<TimetableEntry, StoreError> {
        self.inner.update_entry(id, patch)
    }

    fn delete_entry(&self, id: &str) -> Result<(), StoreError> {
        if self.fail_delete_ids.contains(id) {
            return Err(injected());
        }
        self.inner.delete_entry(id)
    }

    fn check_teacher_conflict(
        &self,
        query: &ConflictQuery<'_>,
    ) -> Result<ConflictResult, StoreError> {
        if self.fail_conflict_checks {
            return Err(injected());
        }
        self.inner.check_teacher_conflict(query)
    }

    fn list_subjects(
        &self,
        grade_id: Option<&str>,
        campus_id: Option<&str>,
    ) -> Result<Vec<Subject>, StoreError> {
        self.inner.list_subjects(grade_id, campus_id)
    }

    fn list_teachers(&self, campus_id: Option<&str>) -> Result<Vec<Teacher>, StoreError> {
        self.inner.list_teachers(campus_id)
    }

    fn list_sections(&self, campus_id: Option<&str>) -> Result<Vec<Section>, StoreError> {
        self.inner.list_sections(campus_id)
    }

    fn find_section(&self, id: &str) -> Result<Option<Section>, StoreError> {
        self.inner.find_section(id)
    }

    fn list_teacher_entries(
        &self,
        teacher_id: &str,
        academic_year_id: &str,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        self.inner.list_teacher_entries(teacher_id, academic_year_id)
    }
}
