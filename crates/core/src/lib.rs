//! `steward-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers and their generators, the clock collaborator, the entity
//! contracts and the error taxonomy.

pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod id;
pub mod input;
pub mod value_object;

pub use clock::{Clock, FixedClock, SteppingClock, SystemClock};
pub use entity::{Entity, ValidatedEntity};
pub use error::{ConstructionError, DomainError, DomainResult, FieldError, ValidationError};
pub use id::{IdGenerator, Identifier, RandomIds, RecordId, SequentialIds, TimeOrderedIds};
pub use input::{FieldReader, RawInput, raw_input};
pub use value_object::ValueObject;
