use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use steward_core::Identifier;

use crate::scope::Scope;

/// Serialized entity state as storage sees it.
pub type RawState = JsonValue;

/// Storage failure.
///
/// These are **infrastructure errors** as opposed to domain errors
/// (validation, invariants).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("rejected state for {id}: {reason}")]
    InvalidState { id: Identifier, reason: String },
}

/// Raw-state storage behind the resolver.
///
/// ## Design Principles
///
/// - **No domain knowledge**: the gateway stores and returns JSON keyed by
///   identifier; turning it into entities is the resolver's job.
/// - **Scoped calls**: every call names the [`Scope`] it runs in, so an
///   implementation can tie reads and writes to one unit of work.
/// - **All-or-nothing flush**: either every state in a batch is written or
///   none is.
pub trait PersistenceGateway: Send + Sync {
    fn load(&self, id: Identifier, scope: &Scope) -> Result<Option<RawState>, GatewayError>;

    fn flush(&self, scope: &Scope, states: Vec<(Identifier, RawState)>) -> Result<(), GatewayError>;
}

impl<G> PersistenceGateway for Arc<G>
where
    G: PersistenceGateway + ?Sized,
{
    fn load(&self, id: Identifier, scope: &Scope) -> Result<Option<RawState>, GatewayError> {
        (**self).load(id, scope)
    }

    fn flush(
        &self,
        scope: &Scope,
        states: Vec<(Identifier, RawState)>,
    ) -> Result<(), GatewayError> {
        (**self).flush(scope, states)
    }
}

/// In-memory gateway.
///
/// Intended for tests/dev. Shareable behind `Arc` by many scopes.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    states: RwLock<HashMap<Identifier, RawState>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write state directly, outside any unit of work (fixtures, imports).
    pub fn seed(&self, id: impl Into<Identifier>, state: RawState) -> Result<(), GatewayError> {
        let mut states = self
            .states
            .write()
            .map_err(|_| GatewayError::Unavailable("lock poisoned".to_string()))?;
        states.insert(id.into(), state);
        Ok(())
    }

    /// Number of stored states. Still answers after a writer panicked.
    pub fn len(&self) -> usize {
        match self.states.read() {
            Ok(states) => states.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistenceGateway for InMemoryGateway {
    fn load(&self, id: Identifier, scope: &Scope) -> Result<Option<RawState>, GatewayError> {
        let states = self
            .states
            .read()
            .map_err(|_| GatewayError::Unavailable("lock poisoned".to_string()))?;
        let state = states.get(&id).cloned();
        debug!(scope_id = %scope.id(), id = %id, found = state.is_some(), "gateway load");
        Ok(state)
    }

    fn flush(
        &self,
        scope: &Scope,
        states: Vec<(Identifier, RawState)>,
    ) -> Result<(), GatewayError> {
        // Validate the whole batch before touching storage.
        for (id, state) in &states {
            if !state.is_object() {
                return Err(GatewayError::InvalidState {
                    id: *id,
                    reason: "state must be a JSON object".to_string(),
                });
            }
        }

        let mut stored = self
            .states
            .write()
            .map_err(|_| GatewayError::Unavailable("lock poisoned".to_string()))?;
        let written = states.len();
        stored.extend(states);
        debug!(scope_id = %scope.id(), written, "gateway flush");
        Ok(())
    }
}
