//! Infrastructure layer: persistence plumbing around the domain boundaries.
//!
//! Entities never talk to storage. A [`BoundaryReferenceResolver`] turns an
//! identifier received from another boundary into an owned entity, using a
//! [`PersistenceGateway`] for raw state and a [`Scope`] as the unit of work.

pub mod adapter;
pub mod gateway;
pub mod resolver;
pub mod scope;

pub use adapter::{Persist, Policies, Rehydrate};
pub use gateway::{GatewayError, InMemoryGateway, PersistenceGateway, RawState};
pub use resolver::{BoundaryReferenceResolver, ResolveError};
pub use scope::{Scope, ScopeId};
