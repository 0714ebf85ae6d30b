//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. A
/// session entry (`subject`, `teacher`, `room`, start/end time) is a value
/// object: two entries with the same fields describe the same class.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Room(String);
///
/// impl ValueObject for Room {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
