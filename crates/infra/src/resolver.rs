//! Cross-boundary reference resolution.

use thiserror::Error;
use tracing::{debug, info, warn};

use steward_core::{Identifier, ValidationError};

use crate::adapter::{Persist, Policies, Rehydrate};
use crate::gateway::{GatewayError, PersistenceGateway};
use crate::scope::{Scope, ScopeId};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("scope {0} has expired")]
    ScopeExpired(ScopeId),

    #[error("nothing stored under {0}")]
    NotFound(Identifier),

    #[error("stored {kind} {id} is corrupt: {source}")]
    Corrupt {
        kind: &'static str,
        id: Identifier,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Turns identifiers handed over by another boundary into owned entities.
///
/// The resolver keeps no state of its own: what was loaded lives in the
/// [`Scope`], and every resolved entity is an owned value. Closing or
/// clearing the scope therefore never invalidates an entity already handed
/// out, but the scope cannot resolve anything afterwards.
#[derive(Debug)]
pub struct BoundaryReferenceResolver<G> {
    gateway: G,
    policies: Policies,
}

impl<G> BoundaryReferenceResolver<G>
where
    G: PersistenceGateway,
{
    pub fn new(gateway: G) -> Self {
        Self::with_policies(gateway, Policies::default())
    }

    pub fn with_policies(gateway: G, policies: Policies) -> Self {
        Self { gateway, policies }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Resolve `id` to an entity of type `E` within `scope`.
    ///
    /// State already loaded in `scope` is reused; otherwise it is read
    /// through the gateway and remembered in the scope.
    pub fn resolve<E>(
        &self,
        id: impl Into<Identifier>,
        scope: &mut Scope,
    ) -> Result<E, ResolveError>
    where
        E: Rehydrate,
    {
        let id = id.into();
        if !scope.is_open() {
            warn!(scope_id = %scope.id(), id = %id, kind = E::KIND, "resolve on expired scope");
            return Err(ResolveError::ScopeExpired(scope.id()));
        }

        if let Some(state) = scope.cached(id) {
            let entity = self.rehydrate::<E>(id, state)?;
            debug!(scope_id = %scope.id(), id = %id, kind = E::KIND, "resolved from scope");
            return Ok(entity);
        }

        let Some(state) = self.gateway.load(id, scope)? else {
            warn!(scope_id = %scope.id(), id = %id, kind = E::KIND, "reference not found");
            return Err(ResolveError::NotFound(id));
        };
        let entity = self.rehydrate::<E>(id, &state)?;
        scope.remember(id, state);
        debug!(scope_id = %scope.id(), id = %id, kind = E::KIND, "resolved from gateway");
        Ok(entity)
    }

    /// Write `entities` through the gateway. This is the only write path.
    ///
    /// Returns how many entities were written. Written state is remembered in
    /// `scope`, so later resolves in the same scope see it.
    pub fn flush(
        &self,
        scope: &mut Scope,
        entities: &[&dyn Persist],
    ) -> Result<usize, ResolveError> {
        if !scope.is_open() {
            warn!(scope_id = %scope.id(), "flush on expired scope");
            return Err(ResolveError::ScopeExpired(scope.id()));
        }
        if entities.is_empty() {
            return Ok(0);
        }

        let states: Vec<_> = entities
            .iter()
            .map(|e| (e.identifier(), e.to_raw_state()))
            .collect();
        self.gateway.flush(scope, states.clone())?;

        let written = states.len();
        for (id, state) in states {
            scope.remember(id, state);
        }
        info!(scope_id = %scope.id(), written, "scope flushed");
        Ok(written)
    }

    fn rehydrate<E>(&self, id: Identifier, state: &serde_json::Value) -> Result<E, ResolveError>
    where
        E: Rehydrate,
    {
        let corrupt = |source: ValidationError| {
            warn!(id = %id, kind = E::KIND, error = %source, "stored state is corrupt");
            ResolveError::Corrupt {
                kind: E::KIND,
                id,
                source,
            }
        };

        let entity = E::from_raw_state(state, &self.policies).map_err(corrupt)?;
        if entity.identifier() != id {
            return Err(corrupt(ValidationError::single(
                "id",
                format!("stored under {id} but carries {}", entity.identifier()),
            )));
        }
        Ok(entity)
    }
}
