use super::model::{SlotKey, TimetableEntry, Weekday};
use std::collections::BTreeMap;

/// Read model of one section's week for one academic year, keyed by slot.
///
/// There are no mutators: after any write the index is rebuilt from the
/// store's entry list so what the grid shows always matches what the store
/// holds.
#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    section_id: String,
    academic_year_id: String,
    slots: BTreeMap<SlotKey, TimetableEntry>,
    // Slot keys in the order the entries arrived, which is period sort order
    // when built from the store.
    order: Vec<SlotKey>,
}

impl OccupancyIndex {
    pub fn build(
        section_id: &str,
        academic_year_id: &str,
        entries: impl IntoIterator<Item = TimetableEntry>,
    ) -> Self {
        let mut slots: BTreeMap<SlotKey, TimetableEntry> = BTreeMap::new();
        let mut order = Vec::new();
        for entry in entries {
            if entry.section_id != section_id || entry.academic_year_id != academic_year_id {
                continue;
            }
            let key = entry.slot();
            if let Some(kept) = slots.get(&key) {
                tracing::warn!(
                    section_id,
                    day = entry.day_of_week.index(),
                    period_id = %entry.period_id,
                    kept = %kept.id,
                    dropped = %entry.id,
                    "duplicate entries for one slot; keeping the first"
                );
                continue;
            }
            order.push(key.clone());
            slots.insert(key, entry);
        }
        Self {
            section_id: section_id.to_string(),
            academic_year_id: academic_year_id.to_string(),
            slots,
            order,
        }
    }

    pub fn section_id(&self) -> &str {
        &self.section_id
    }

    pub fn academic_year_id(&self) -> &str {
        &self.academic_year_id
    }

    pub fn get(&self, day: Weekday, period_id: &str) -> Option<&TimetableEntry> {
        self.slots.get(&SlotKey::new(day, period_id))
    }

    pub fn is_occupied(&self, day: Weekday, period_id: &str) -> bool {
        self.get(day, period_id).is_some()
    }

    pub fn find(&self, entry_id: &str) -> Option<&TimetableEntry> {
        self.slots.values().find(|e| e.id == entry_id)
    }

    /// Entries on one weekday, in build order.
    pub fn entries_on(&self, day: Weekday) -> impl Iterator<Item = &TimetableEntry> {
        self.order
            .iter()
            .filter(move |k| k.day == day)
            .filter_map(|k| self.slots.get(k))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, section: &str, year: &str, day: Weekday, period: &str) -> TimetableEntry {
        TimetableEntry {
            id: id.to_string(),
            section_id: section.to_string(),
            subject_id: "math".to_string(),
            teacher_id: format!("t-{}", id),
            period_id: period.to_string(),
            day_of_week: day,
            academic_year_id: year.to_string(),
            room_number: None,
            campus_id: None,
        }
    }

    #[test]
    fn build_ignores_entries_outside_scope() {
        let index = OccupancyIndex::build(
            "s1",
            "y1",
            vec![
                entry("a", "s1", "y1", Weekday::Monday, "p1"),
                entry("b", "s2", "y1", Weekday::Monday, "p2"),
                entry("c", "s1", "y0", Weekday::Monday, "p3"),
            ],
        );
        assert_eq!(index.len(), 1);
        assert!(index.is_occupied(Weekday::Monday, "p1"));
        assert!(!index.is_occupied(Weekday::Monday, "p2"));
        assert!(index.find("c").is_none());
    }

    #[test]
    fn entries_on_returns_only_that_day_in_build_order() {
        // The store lists p2 before p10 by sort order.
        let index = OccupancyIndex::build(
            "s1",
            "y1",
            vec![
                entry("b", "s1", "y1", Weekday::Monday, "p2"),
                entry("c", "s1", "y1", Weekday::Tuesday, "p2"),
                entry("a", "s1", "y1", Weekday::Tuesday, "p10"),
                entry("d", "s1", "y1", Weekday::Wednesday, "p1"),
            ],
        );
        let ids: Vec<_> = index
            .entries_on(Weekday::Tuesday)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(index.entries_on(Weekday::Friday).count(), 0);
    }

    #[test]
    fn duplicate_slot_keeps_first_entry() {
        let index = OccupancyIndex::build(
            "s1",
            "y1",
            vec![
                entry("first", "s1", "y1", Weekday::Monday, "p1"),
                entry("second", "s1", "y1", Weekday::Monday, "p1"),
            ],
        );
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.get(Weekday::Monday, "p1").map(|e| e.id.as_str()),
            Some("first")
        );
    }
}
