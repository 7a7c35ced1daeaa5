use serde::{Deserialize, Serialize};
use std::fmt;

/// School day of the weekly timetable. Wire form is the index `0..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Monday),
            1 => Some(Self::Tuesday),
            2 => Some(Self::Wednesday),
            3 => Some(Self::Thursday),
            4 => Some(Self::Friday),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Monday => 0,
            Self::Tuesday => 1,
            Self::Wednesday => 2,
            Self::Thursday => 3,
            Self::Friday => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Weekday {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(i64::from(value))
            .ok_or_else(|| format!("day of week must be in 0..=4, got {}", value))
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> Self {
        day.index()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub id: String,
    pub campus_id: String,
    pub sort_order: i64,
    pub short_name: String,
    pub length_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub id: String,
    pub section_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub period_id: String,
    pub day_of_week: Weekday,
    pub academic_year_id: String,
    pub room_number: Option<String>,
    pub campus_id: Option<String>,
}

impl TimetableEntry {
    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.day_of_week, &self.period_id)
    }
}

/// Fields of an entry about to be created. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub section_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub period_id: String,
    pub day_of_week: Weekday,
    pub academic_year_id: String,
    pub room_number: Option<String>,
    pub campus_id: Option<String>,
}

/// Edit-in-place of an occupied slot. Slot coordinates never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPatch {
    pub subject_id: String,
    pub teacher_id: String,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictQuery<'a> {
    pub teacher_id: &'a str,
    pub day: Weekday,
    pub period_id: &'a str,
    pub academic_year_id: &'a str,
    pub exclude_entry_id: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResult {
    pub has_conflict: bool,
    pub conflict_details: Option<String>,
}

impl ConflictResult {
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn conflict(details: impl Into<String>) -> Self {
        Self {
            has_conflict: true,
            conflict_details: Some(details.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub day: Weekday,
    pub period_id: String,
}

impl SlotKey {
    pub fn new(day: Weekday, period_id: &str) -> Self {
        Self {
            day,
            period_id: period_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
    pub grade_id: Option<String>,
    pub campus_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub grade_id: Option<String>,
    pub campus_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub campus_id: Option<String>,
}
