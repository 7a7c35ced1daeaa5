use super::assign::{self, SlotAssignment};
use super::bulk::{self, ClearDayReport, Confirmation, CopyDayReport};
use super::error::TimetableError;
use super::model::{Period, TimetableEntry, Weekday};
use super::occupancy::OccupancyIndex;
use super::store::TimetableStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-flight flag shared by everything that commits timetable writes. A
/// second commit while one is running is refused instead of queued.
#[derive(Debug, Clone, Default)]
pub struct SaveGate {
    saving: Arc<AtomicBool>,
}

pub struct SaveGuard {
    saving: Arc<AtomicBool>,
}

impl SaveGate {
    pub fn begin(&self) -> Result<SaveGuard, TimetableError> {
        if self
            .saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TimetableError::SaveInProgress);
        }
        Ok(SaveGuard {
            saving: Arc::clone(&self.saving),
        })
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.saving.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionScope {
    pub section_id: String,
    pub academic_year_id: String,
    pub campus_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub period_id: String,
    pub entry: Option<TimetableEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDay {
    pub day: Weekday,
    pub name: &'static str,
    pub cells: Vec<GridCell>,
}

/// Day × period table for the renderer, in period sort order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub section_id: String,
    pub academic_year_id: String,
    pub campus_id: String,
    pub periods: Vec<Period>,
    pub days: Vec<GridDay>,
    pub entry_count: usize,
    /// The last post-commit re-read failed; cells may lag the store.
    pub stale: bool,
}

/// One section's timetable for one academic year, as seen by an editor.
pub struct TimetableSession<'s> {
    store: &'s dyn TimetableStore,
    scope: SessionScope,
    gate: SaveGate,
    periods: Vec<Period>,
    index: OccupancyIndex,
    stale: bool,
}

impl<'s> TimetableSession<'s> {
    pub fn open(
        store: &'s dyn TimetableStore,
        scope: SessionScope,
        gate: SaveGate,
    ) -> Result<Self, TimetableError> {
        let periods = store
            .list_periods(&scope.campus_id)
            .map_err(TimetableError::Load)?;
        let mut session = Self {
            store,
            index: OccupancyIndex::build(&scope.section_id, &scope.academic_year_id, Vec::new()),
            scope,
            gate,
            periods,
            stale: false,
        };
        session.reload()?;
        Ok(session)
    }

    /// Re-reads the entry list and rebuilds the index from scratch.
    pub fn reload(&mut self) -> Result<(), TimetableError> {
        let entries = self
            .store
            .list_entries(&self.scope.section_id, &self.scope.academic_year_id)
            .map_err(TimetableError::Load)?;
        self.index =
            OccupancyIndex::build(&self.scope.section_id, &self.scope.academic_year_id, entries);
        self.stale = false;
        Ok(())
    }

    /// Reload after a write that already landed. A failed re-read must not
    /// turn a committed write into an error, so the index is only flagged.
    fn reload_after_commit(&mut self) {
        if let Err(e) = self.reload() {
            tracing::warn!(
                section_id = %self.scope.section_id,
                error = %e,
                "reload after commit failed; timetable view is stale"
            );
            self.stale = true;
        }
    }

    /// Writes are decided against the index, so a stale one is re-read first.
    fn ensure_fresh(&mut self) -> Result<(), TimetableError> {
        if self.stale {
            self.reload()?;
        }
        Ok(())
    }

    pub fn index(&self) -> &OccupancyIndex {
        &self.index
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn entry_for_slot(&self, day: Weekday, period_id: &str) -> Option<&TimetableEntry> {
        self.index.get(day, period_id)
    }

    pub fn assign_slot(
        &mut self,
        req: &SlotAssignment,
    ) -> Result<TimetableEntry, TimetableError> {
        self.ensure_fresh()?;
        let committed = {
            let _guard = self.gate.begin()?;
            assign::assign_slot(self.store, &self.index, Some(&self.scope.campus_id), req)?
        };
        self.reload_after_commit();
        Ok(committed)
    }

    pub fn erase_slot(&mut self, entry_id: &str) -> Result<(), TimetableError> {
        self.ensure_fresh()?;
        {
            let _guard = self.gate.begin()?;
            assign::erase_slot(self.store, &self.index, entry_id)?;
        }
        self.reload_after_commit();
        Ok(())
    }

    pub fn copy_day(
        &mut self,
        from: Weekday,
        to: Weekday,
    ) -> Result<CopyDayReport, TimetableError> {
        self.ensure_fresh()?;
        let report = {
            let _guard = self.gate.begin()?;
            bulk::copy_day(
                self.store,
                &self.index,
                Some(&self.scope.campus_id),
                from,
                to,
            )?
        };
        self.reload_after_commit();
        Ok(report)
    }

    pub fn clear_day(
        &mut self,
        day: Weekday,
        confirmation: Confirmation,
    ) -> Result<ClearDayReport, TimetableError> {
        self.ensure_fresh()?;
        let report = {
            let _guard = self.gate.begin()?;
            bulk::clear_day(self.store, &self.index, day, confirmation)?
        };
        self.reload_after_commit();
        Ok(report)
    }

    pub fn grid(&self) -> GridView {
        let days = Weekday::ALL
            .iter()
            .map(|&day| GridDay {
                day,
                name: day.name(),
                cells: self
                    .periods
                    .iter()
                    .map(|p| GridCell {
                        period_id: p.id.clone(),
                        entry: self.index.get(day, &p.id).cloned(),
                    })
                    .collect(),
            })
            .collect();
        GridView {
            section_id: self.scope.section_id.clone(),
            academic_year_id: self.scope.academic_year_id.clone(),
            campus_id: self.scope.campus_id.clone(),
            periods: self.periods.clone(),
            days,
            entry_count: self.index.len(),
            stale: self.stale,
        }
    }
}
