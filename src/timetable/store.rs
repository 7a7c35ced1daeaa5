use super::error::StoreError;
use super::model::{
    ConflictQuery, ConflictResult, EntryPatch, NewEntry, Period, Section, Subject, Teacher,
    TimetableEntry, Weekday,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// Backing store the engine reads from and writes through. The store is the
/// authority on what exists; the engine never caches across a write.
pub trait TimetableStore {
    fn list_periods(&self, campus_id: &str) -> Result<Vec<Period>, StoreError>;
    fn list_entries(
        &self,
        section_id: &str,
        academic_year_id: &str,
    ) -> Result<Vec<TimetableEntry>, StoreError>;
    fn create_entry(&self, entry: &NewEntry) -> Result<TimetableEntry, StoreError>;
    fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<TimetableEntry, StoreError>;
    fn delete_entry(&self, id: &str) -> Result<(), StoreError>;
    fn check_teacher_conflict(&self, query: &ConflictQuery<'_>)
        -> Result<ConflictResult, StoreError>;
    fn list_subjects(
        &self,
        grade_id: Option<&str>,
        campus_id: Option<&str>,
    ) -> Result<Vec<Subject>, StoreError>;
    fn list_teachers(&self, campus_id: Option<&str>) -> Result<Vec<Teacher>, StoreError>;
    fn list_sections(&self, campus_id: Option<&str>) -> Result<Vec<Section>, StoreError>;
    fn find_section(&self, id: &str) -> Result<Option<Section>, StoreError>;
    fn list_teacher_entries(
        &self,
        teacher_id: &str,
        academic_year_id: &str,
    ) -> Result<Vec<TimetableEntry>, StoreError>;
}

pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn load_entry(&self, id: &str) -> Result<Option<TimetableEntry>, StoreError> {
        let sql = format!("{} WHERE e.id = ?", ENTRY_SELECT);
        Ok(self.conn.query_row(&sql, [id], entry_from_row).optional()?)
    }
}

/// Joined with `periods` so lists can follow the period catalog's order.
const ENTRY_SELECT: &str = "SELECT e.id, e.section_id, e.subject_id, e.teacher_id, e.period_id,
        e.day_of_week, e.academic_year_id, e.room_number, e.campus_id
 FROM timetable_entries e
 LEFT JOIN periods p ON p.id = e.period_id";

const ENTRY_ORDER: &str = "ORDER BY e.day_of_week, p.sort_order, e.period_id";

fn entry_from_row(r: &Row<'_>) -> rusqlite::Result<TimetableEntry> {
    let day_raw: i64 = r.get(5)?;
    let day_of_week =
        Weekday::from_index(day_raw).ok_or(rusqlite::Error::IntegralValueOutOfRange(5, day_raw))?;
    Ok(TimetableEntry {
        id: r.get(0)?,
        section_id: r.get(1)?,
        subject_id: r.get(2)?,
        teacher_id: r.get(3)?,
        period_id: r.get(4)?,
        day_of_week,
        academic_year_id: r.get(6)?,
        room_number: r.get(7)?,
        campus_id: r.get(8)?,
    })
}

fn section_from_row(r: &Row<'_>) -> rusqlite::Result<Section> {
    Ok(Section {
        id: r.get(0)?,
        name: r.get(1)?,
        grade_id: r.get(2)?,
        campus_id: r.get(3)?,
    })
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl TimetableStore for SqliteStore<'_> {
    fn list_periods(&self, campus_id: &str) -> Result<Vec<Period>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, campus_id, sort_order, short_name, length_minutes
             FROM periods
             WHERE campus_id = ?
             ORDER BY sort_order, id",
        )?;
        let rows = stmt
            .query_map([campus_id], |r| {
                Ok(Period {
                    id: r.get(0)?,
                    campus_id: r.get(1)?,
                    sort_order: r.get(2)?,
                    short_name: r.get(3)?,
                    length_minutes: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_entries(
        &self,
        section_id: &str,
        academic_year_id: &str,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        let sql = format!(
            "{} WHERE e.section_id = ? AND e.academic_year_id = ? {}",
            ENTRY_SELECT, ENTRY_ORDER
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([section_id, academic_year_id], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn create_entry(&self, entry: &NewEntry) -> Result<TimetableEntry, StoreError> {
        let id = Uuid::new_v4().to_string();
        let ts = now_ts();
        self.conn
            .execute(
                "INSERT INTO timetable_entries(
                    id, section_id, subject_id, teacher_id, period_id, day_of_week,
                    academic_year_id, room_number, campus_id, created_at, updated_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    entry.section_id,
                    entry.subject_id,
                    entry.teacher_id,
                    entry.period_id,
                    entry.day_of_week.index(),
                    entry.academic_year_id,
                    entry.room_number,
                    entry.campus_id,
                    ts,
                    ts
                ],
            )
            .map_err(StoreError::from_write)?;
        Ok(TimetableEntry {
            id,
            section_id: entry.section_id.clone(),
            subject_id: entry.subject_id.clone(),
            teacher_id: entry.teacher_id.clone(),
            period_id: entry.period_id.clone(),
            day_of_week: entry.day_of_week,
            academic_year_id: entry.academic_year_id.clone(),
            room_number: entry.room_number.clone(),
            campus_id: entry.campus_id.clone(),
        })
    }

    fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<TimetableEntry, StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE timetable_entries
                 SET subject_id = ?, teacher_id = ?, room_number = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    patch.subject_id,
                    patch.teacher_id,
                    patch.room_number,
                    now_ts(),
                    id
                ],
            )
            .map_err(StoreError::from_write)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("timetable entry {}", id)));
        }
        self.load_entry(id)?
            .ok_or_else(|| StoreError::NotFound(format!("timetable entry {}", id)))
    }

    fn delete_entry(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM timetable_entries WHERE id = ?", [id])
            .map_err(StoreError::from_write)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("timetable entry {}", id)));
        }
        Ok(())
    }

    fn check_teacher_conflict(
        &self,
        query: &ConflictQuery<'_>,
    ) -> Result<ConflictResult, StoreError> {
        let hit = self
            .conn
            .query_row(
                "SELECT COALESCE(sec.name, e.section_id), COALESCE(sub.name, e.subject_id)
                 FROM timetable_entries e
                 LEFT JOIN sections sec ON sec.id = e.section_id
                 LEFT JOIN subjects sub ON sub.id = e.subject_id
                 WHERE e.teacher_id = ?1
                   AND e.day_of_week = ?2
                   AND e.period_id = ?3
                   AND e.academic_year_id = ?4
                   AND (?5 IS NULL OR e.id <> ?5)
                 ORDER BY e.id
                 LIMIT 1",
                params![
                    query.teacher_id,
                    query.day.index(),
                    query.period_id,
                    query.academic_year_id,
                    query.exclude_entry_id
                ],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(match hit {
            Some((section_name, subject_name)) => ConflictResult::conflict(format!(
                "Teacher is already assigned to {} ({}) on {} in this period",
                section_name, subject_name, query.day
            )),
            None => ConflictResult::clear(),
        })
    }

    fn list_subjects(
        &self,
        grade_id: Option<&str>,
        campus_id: Option<&str>,
    ) -> Result<Vec<Subject>, StoreError> {
        // Subjects without a grade or campus apply everywhere.
        let mut stmt = self.conn.prepare(
            "SELECT id, name, code, grade_id, campus_id
             FROM subjects
             WHERE (?1 IS NULL OR grade_id IS NULL OR grade_id = ?1)
               AND (?2 IS NULL OR campus_id IS NULL OR campus_id = ?2)
             ORDER BY name, id",
        )?;
        let rows = stmt
            .query_map(params![grade_id, campus_id], |r| {
                Ok(Subject {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    code: r.get(2)?,
                    grade_id: r.get(3)?,
                    campus_id: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_teachers(&self, campus_id: Option<&str>) -> Result<Vec<Teacher>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, campus_id
             FROM teachers
             WHERE (?1 IS NULL OR campus_id IS NULL OR campus_id = ?1)
             ORDER BY name, id",
        )?;
        let rows = stmt
            .query_map(params![campus_id], |r| {
                Ok(Teacher {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    campus_id: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_sections(&self, campus_id: Option<&str>) -> Result<Vec<Section>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, grade_id, campus_id
             FROM sections
             WHERE (?1 IS NULL OR campus_id = ?1)
             ORDER BY name, id",
        )?;
        let rows = stmt
            .query_map(params![campus_id], section_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_section(&self, id: &str) -> Result<Option<Section>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, grade_id, campus_id FROM sections WHERE id = ?",
                [id],
                section_from_row,
            )
            .optional()?)
    }

    fn list_teacher_entries(
        &self,
        teacher_id: &str,
        academic_year_id: &str,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        let sql = format!(
            "{} WHERE e.teacher_id = ? AND e.academic_year_id = ? {}",
            ENTRY_SELECT, ENTRY_ORDER
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([teacher_id, academic_year_id], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timetable::testing::{fixture_conn, new_entry};

    #[test]
    fn periods_list_in_sort_order_for_one_campus() {
        let conn = fixture_conn();
        let store = SqliteStore::new(&conn);
        let periods = store.list_periods("main").expect("periods");
        let names: Vec<_> = periods.iter().map(|p| p.short_name.as_str()).collect();
        assert_eq!(names, vec!["P1", "P2", "P3", "P4", "P5"]);
        assert!(store.list_periods("annex").expect("periods").len() == 1);
    }

    #[test]
    fn second_entry_in_same_section_slot_is_rejected() {
        let conn = fixture_conn();
        let store = SqliteStore::new(&conn);
        store
            .create_entry(&new_entry("s-7a", "math", "t-ada", "p1", Weekday::Monday))
            .expect("first");
        let e = store
            .create_entry(&new_entry("s-7a", "eng", "t-bob", "p1", Weekday::Monday))
            .expect_err("duplicate slot");
        assert!(matches!(e, StoreError::SlotOccupied), "{e:?}");
    }

    #[test]
    fn teacher_double_booking_is_rejected_by_the_store() {
        let conn = fixture_conn();
        let store = SqliteStore::new(&conn);
        store
            .create_entry(&new_entry("s-7a", "math", "t-ada", "p1", Weekday::Monday))
            .expect("first");
        let e = store
            .create_entry(&new_entry("s-7b", "math", "t-ada", "p1", Weekday::Monday))
            .expect_err("double booking");
        assert!(matches!(e, StoreError::TeacherDoubleBooked), "{e:?}");
    }

    #[test]
    fn conflict_query_names_section_and_honours_exclusion() {
        let conn = fixture_conn();
        let store = SqliteStore::new(&conn);
        let held = store
            .create_entry(&new_entry("s-7a", "math", "t-ada", "p1", Weekday::Monday))
            .expect("create");

        let mut q = ConflictQuery {
            teacher_id: "t-ada",
            day: Weekday::Monday,
            period_id: "p1",
            academic_year_id: "y2026",
            exclude_entry_id: None,
        };
        let hit = store.check_teacher_conflict(&q).expect("query");
        assert!(hit.has_conflict);
        assert!(hit
            .conflict_details
            .as_deref()
            .is_some_and(|d| d.contains("7A") && d.contains("Mathematics")));

        q.exclude_entry_id = Some(&held.id);
        assert!(!store.check_teacher_conflict(&q).expect("query").has_conflict);

        q.exclude_entry_id = None;
        q.academic_year_id = "y2027";
        assert!(!store.check_teacher_conflict(&q).expect("query").has_conflict);
    }

    #[test]
    fn entries_follow_period_sort_order_not_id_text() {
        let conn = fixture_conn();
        conn.execute(
            "INSERT INTO periods(id, campus_id, sort_order, short_name)
             VALUES('p10', 'main', 10, 'P10')",
            [],
        )
        .expect("extra period");
        let store = SqliteStore::new(&conn);
        for period in ["p10", "p2", "p1"] {
            store
                .create_entry(&new_entry("s-7a", "math", "t-ada", period, Weekday::Monday))
                .expect("seed");
        }
        store
            .create_entry(&new_entry("s-7b", "math", "t-ada", "p3", Weekday::Tuesday))
            .expect("seed");

        let periods: Vec<_> = store
            .list_entries("s-7a", "y2026")
            .expect("entries")
            .into_iter()
            .map(|e| e.period_id)
            .collect();
        assert_eq!(periods, vec!["p1", "p2", "p10"]);

        let week: Vec<_> = store
            .list_teacher_entries("t-ada", "y2026")
            .expect("week")
            .into_iter()
            .map(|e| (e.day_of_week, e.period_id))
            .collect();
        assert_eq!(
            week,
            vec![
                (Weekday::Monday, "p1".to_string()),
                (Weekday::Monday, "p2".to_string()),
                (Weekday::Monday, "p10".to_string()),
                (Weekday::Tuesday, "p3".to_string()),
            ]
        );
    }

    #[test]
    fn update_and_delete_of_missing_entry_report_not_found() {
        let conn = fixture_conn();
        let store = SqliteStore::new(&conn);
        let patch = EntryPatch {
            subject_id: "math".into(),
            teacher_id: "t-ada".into(),
            room_number: None,
        };
        assert!(matches!(
            store.update_entry("nope", &patch),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_entry("nope"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn subjects_filter_keeps_unscoped_rows() {
        let conn = fixture_conn();
        let store = SqliteStore::new(&conn);
        let subjects = store.list_subjects(Some("g7"), Some("main")).expect("subjects");
        let ids: Vec<_> = subjects.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"math"));
        assert!(ids.contains(&"eng"));
        assert!(!ids.contains(&"chem"));
    }
}
