//! Weekly timetable construction: slot occupancy, teacher conflict detection,
//! single-slot assignment and bulk day operations.

pub mod assign;
pub mod bulk;
pub mod conflict;
pub mod error;
pub mod model;
pub mod occupancy;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use assign::SlotAssignment;
pub use bulk::Confirmation;
pub use conflict::ConflictProbe;
pub use error::TimetableError;
pub use model::Weekday;
pub use session::{SaveGate, SessionScope, TimetableSession};
pub use store::{SqliteStore, TimetableStore};
