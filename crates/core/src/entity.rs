//! Entity traits: identity + invariants that hold for the whole lifetime.

use crate::error::{ConstructionError, DomainError};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity whose invariants are checked on construction and on every
/// state transition.
///
/// Implementors list their invariant failures in [`violations`]; an empty
/// list means the state is valid. Constructors call [`check_invariants`]
/// before returning, behaviour methods go through [`commit`].
///
/// [`violations`]: ValidatedEntity::violations
/// [`check_invariants`]: ValidatedEntity::check_invariants
/// [`commit`]: ValidatedEntity::commit
pub trait ValidatedEntity: Entity + Sized {
    /// Entity kind used in error messages and logs (e.g. `"user"`).
    const KIND: &'static str;

    /// Every invariant the current state breaks.
    fn violations(&self) -> Vec<String>;

    fn check_invariants(&self) -> Result<(), ConstructionError> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConstructionError {
                entity: Self::KIND,
                violations,
            })
        }
    }

    /// Check a fully built candidate and hand it back only if it is valid.
    fn construct(candidate: Self) -> Result<Self, ConstructionError> {
        candidate.check_invariants()?;
        Ok(candidate)
    }

    /// Replace `self` with `candidate` if the candidate is valid.
    ///
    /// On failure `self` is left untouched and the failures are reported as
    /// an invariant violation.
    fn commit(&mut self, candidate: Self) -> Result<(), DomainError> {
        let violations = candidate.violations();
        if !violations.is_empty() {
            tracing::warn!(entity = Self::KIND, violations = ?violations, "transition rejected");
            return Err(DomainError::invariant(violations.join("; ")));
        }
        *self = candidate;
        Ok(())
    }
}
