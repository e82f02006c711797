//! Identifiers and identifier generation.
//!
//! Identifiers are opaque 128-bit values. They are compared by value and carry
//! no ordering: two identifiers are either the same entity or they are not.
//! Generation is an injected collaborator ([`IdGenerator`]) so entity
//! construction never embeds a particular randomness source.

use core::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Globally unique, immutable identity value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The all-zero identifier is never handed out by a generator.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for Identifier {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<Identifier> for Uuid {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl FromStr for Identifier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s.trim())
            .map_err(|e| DomainError::invalid_id(format!("Identifier: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Declares a typed identifier wrapping [`Identifier`].
///
/// Typed identifiers keep references to different entity kinds from being
/// mixed up when they cross a boundary.
#[macro_export]
macro_rules! typed_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $t($crate::Identifier);

        impl $t {
            pub fn generate(ids: &dyn $crate::IdGenerator) -> Self {
                Self(ids.next_id())
            }

            pub fn from_identifier(id: $crate::Identifier) -> Self {
                Self(id)
            }

            pub fn identifier(&self) -> $crate::Identifier {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$crate::Identifier> for $t {
            fn from(value: $crate::Identifier) -> Self {
                Self(value)
            }
        }

        impl From<$t> for $crate::Identifier {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::str::FromStr for $t {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id = <$crate::Identifier as core::str::FromStr>::from_str(s)
                    .map_err(|e| $crate::DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(id))
            }
        }
    };
}

typed_id!(
    /// Identifier of an append-only record.
    RecordId,
    "RecordId"
);

/// Source of fresh identifiers.
///
/// Implementations must never return the nil identifier and must never
/// return the same identifier twice.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Identifier;
}

impl<G> IdGenerator for std::sync::Arc<G>
where
    G: IdGenerator + ?Sized,
{
    fn next_id(&self) -> Identifier {
        (**self).next_id()
    }
}

/// Random (UUIDv4) identifiers.
#[derive(Debug, Default, Copy, Clone)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Identifier {
        Identifier(Uuid::new_v4())
    }
}

/// Time-ordered (UUIDv7) identifiers, friendlier to storage indexes.
#[derive(Debug, Default, Copy, Clone)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    fn next_id(&self) -> Identifier {
        Identifier(Uuid::now_v7())
    }
}

/// Deterministic identifiers `1, 2, 3, ...` for tests and replays.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start the sequence at `first` (0 is bumped to 1, nil is never issued).
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.max(1)),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> Identifier {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Identifier::from_u128(u128::from(n))
    }
}
