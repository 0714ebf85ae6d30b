//! Entity trait: records that are identified by id rather than by value.

/// Entity marker + minimal interface.
///
/// Timetable metadata and versions are entities: two versions with identical
/// schedules are still distinct submissions.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
