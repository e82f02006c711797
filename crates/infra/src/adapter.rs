//! Mapping between entities and raw storage state.
//!
//! Entities expose symmetric import/export records; this module is the only
//! place that knows those records are what the gateway stores.

use serde::{Deserialize, Serialize};

use steward_core::{Identifier, RawInput, ValidatedEntity, ValidationError, raw_input};
use steward_identity::{Group, GroupPolicy, ImportPolicy, User};
use steward_messaging::{Message, MessagePolicy};

use crate::gateway::RawState;

/// Policies applied when stored state is turned back into entities.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Policies {
    pub users: ImportPolicy,
    pub groups: GroupPolicy,
    pub messages: MessagePolicy,
}

impl Policies {
    /// Each policy with its own `STEWARD_*` overrides applied.
    pub fn from_env() -> Self {
        Self {
            users: ImportPolicy::from_env(),
            groups: GroupPolicy::from_env(),
            messages: MessagePolicy::from_env(),
        }
    }
}

/// An entity that can be written through a gateway.
pub trait Persist {
    fn identifier(&self) -> Identifier;

    fn to_raw_state(&self) -> RawState;
}

/// An entity that can be rebuilt from stored state.
///
/// Rehydration goes through the entity's import path, so stored state is
/// validated exactly like any other untrusted record.
pub trait Rehydrate: ValidatedEntity + Persist + Sized {
    fn from_raw_state(state: &RawState, policies: &Policies) -> Result<Self, ValidationError>;
}

fn record_of(state: &RawState) -> Result<RawInput, ValidationError> {
    raw_input(state.clone())
}

impl Persist for User {
    fn identifier(&self) -> Identifier {
        self.user_id().identifier()
    }

    fn to_raw_state(&self) -> RawState {
        RawState::Object(self.to_import_record())
    }
}

impl Rehydrate for User {
    fn from_raw_state(state: &RawState, policies: &Policies) -> Result<Self, ValidationError> {
        User::from_import_record(&record_of(state)?, &policies.users)
    }
}

impl Persist for Group {
    fn identifier(&self) -> Identifier {
        self.group_id().identifier()
    }

    fn to_raw_state(&self) -> RawState {
        RawState::Object(self.to_import_record())
    }
}

impl Rehydrate for Group {
    fn from_raw_state(state: &RawState, policies: &Policies) -> Result<Self, ValidationError> {
        Group::from_import_record(&record_of(state)?, &policies.groups)
    }
}

impl Persist for Message {
    fn identifier(&self) -> Identifier {
        self.message_id().identifier()
    }

    fn to_raw_state(&self) -> RawState {
        RawState::Object(self.to_import_record())
    }
}

impl Rehydrate for Message {
    fn from_raw_state(state: &RawState, policies: &Policies) -> Result<Self, ValidationError> {
        Message::from_import_record(&record_of(state)?, &policies.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use steward_core::{RawInput, SequentialIds, raw_input};
    use steward_identity::{RegistrationPolicy, UserId};

    fn form(value: serde_json::Value) -> RawInput {
        raw_input(value).unwrap()
    }

    #[test]
    fn user_state_round_trips() {
        let ids = SequentialIds::new();
        let user = User::from_registration_form(
            &form(json!({ "username": "ana", "password": "x", "email": "Ana@Example.org" })),
            &RegistrationPolicy::default(),
            &ids,
        )
        .unwrap();

        let state = user.to_raw_state();
        assert!(state.is_object());
        let back = User::from_raw_state(&state, &Policies::default()).unwrap();
        assert_eq!(back, user);
        assert_eq!(back.identifier(), user.identifier());
    }

    #[test]
    fn group_state_round_trips() {
        let ids = SequentialIds::new();
        let founder = UserId::from_identifier(Identifier::from_u128(1_000));
        let group = Group::found("lobby", founder, &GroupPolicy::default(), &ids).unwrap();

        let back = Group::from_raw_state(&group.to_raw_state(), &Policies::default()).unwrap();
        assert_eq!(back, group);
    }

    #[test]
    fn non_object_state_is_rejected() {
        let err = User::from_raw_state(&json!([1, 2, 3]), &Policies::default()).unwrap_err();
        assert_eq!(err.field(), Some("input"));
    }
}
