//! Unit-of-work scope.

use std::collections::HashMap;

use tracing::{debug, info};

use steward_core::{IdGenerator, Identifier, typed_id};

use crate::gateway::RawState;

typed_id!(
    /// Identifier of a unit-of-work scope.
    ScopeId,
    "ScopeId"
);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Closed,
}

/// A unit of work: the window in which references may be resolved.
///
/// Notes:
/// - Raw state loaded while the scope is open is kept in an identity map, so
///   resolving the same identifier twice reads storage once.
/// - Every state-changing operation takes `&mut Scope`; a scope belongs to a
///   single unit of work at a time.
/// - A closed scope never reopens.
#[derive(Debug)]
pub struct Scope {
    id: ScopeId,
    lifecycle: Lifecycle,
    identity_map: HashMap<Identifier, RawState>,
}

impl Scope {
    pub fn open(ids: &dyn IdGenerator) -> Self {
        let scope = Self {
            id: ScopeId::generate(ids),
            lifecycle: Lifecycle::Open,
            identity_map: HashMap::new(),
        };
        debug!(scope_id = %scope.id, "scope opened");
        scope
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle == Lifecycle::Open
    }

    /// Whether state for `id` was loaded (or flushed) in this scope.
    pub fn has_loaded(&self, id: impl Into<Identifier>) -> bool {
        self.identity_map.contains_key(&id.into())
    }

    pub fn loaded_count(&self) -> usize {
        self.identity_map.len()
    }

    /// End the unit of work. Loaded state stays in memory until [`clear`](Self::clear).
    pub fn close(&mut self) {
        if self.is_open() {
            self.lifecycle = Lifecycle::Closed;
            info!(scope_id = %self.id, loaded = self.identity_map.len(), "scope closed");
        }
    }

    /// Drop everything loaded in this scope and close it.
    pub fn clear(&mut self) {
        let dropped = self.identity_map.len();
        self.identity_map.clear();
        self.lifecycle = Lifecycle::Closed;
        info!(scope_id = %self.id, dropped, "scope cleared");
    }

    pub(crate) fn cached(&self, id: Identifier) -> Option<&RawState> {
        self.identity_map.get(&id)
    }

    pub(crate) fn remember(&mut self, id: Identifier, state: RawState) {
        self.identity_map.insert(id, state);
    }
}
