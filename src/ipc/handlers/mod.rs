pub mod core;
pub mod roster;
pub mod setup;
pub mod timetable;
