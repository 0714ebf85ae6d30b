//! Timetable persistence boundary.
//!
//! Two tables back this module: one metadata row per slot, and an
//! append-only history of versions attached to it.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryTimetableStore;
pub use postgres::PostgresTimetableStore;
pub use r#trait::{StoreError, TimetableStore};
