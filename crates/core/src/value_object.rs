//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// A value object has no identity and is never mutated in place. Value
/// objects in this workspace are also *validated on construction*: their
/// constructors return `Result`, so holding one is proof the value passed its
/// rules (a `Username` is never empty, a `PasswordDigest` is always 64 hex
/// characters).
///
/// - **Value object**: `Username("ana")` equals any other `Username("ana")`.
/// - **Entity**: two `User`s are the same user only if their `UserId`s match.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
