//! User entity.
//!
//! A `User` is only ever obtained from a named constructor (see
//! [`factory`](crate::factory)); there is no empty user to fill in and no
//! setter. Every behaviour method builds the next state, re-checks the
//! invariants and either commits it or leaves the user as it was.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use steward_core::{Clock, DomainError, DomainResult, Entity, ValidatedEntity, typed_id};

use crate::credentials::{Email, Nickname, PasswordDigest, Username};
use crate::policy::RegistrationPolicy;
use crate::roles::{Capability, Role, RoleCatalog, RoleSet};

typed_id!(
    /// Identifier of a user.
    UserId,
    "UserId"
);

/// Why and by whom a user was banned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ban {
    reason: String,
    banned_by: UserId,
    banned_at: DateTime<Utc>,
}

impl Ban {
    pub(crate) fn new(reason: String, banned_by: UserId, banned_at: DateTime<Utc>) -> Self {
        Self {
            reason,
            banned_by,
            banned_at,
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn banned_by(&self) -> UserId {
        self.banned_by
    }

    pub fn banned_at(&self) -> DateTime<Utc> {
        self.banned_at
    }
}

/// User entity.
///
/// # Invariants
/// - The identifier is never nil and never changes.
/// - A user holds at least one role, and no role twice.
/// - A ban always has a non-empty reason and was not issued by the user
///   themself.
/// - A banned user is allowed no capability at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub(crate) id: UserId,
    pub(crate) username: Username,
    pub(crate) nickname: Nickname,
    pub(crate) email: Option<Email>,
    pub(crate) password: PasswordDigest,
    pub(crate) roles: RoleSet,
    pub(crate) ban: Option<Ban>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ValidatedEntity for User {
    const KIND: &'static str = "user";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.id.identifier().is_nil() {
            out.push("identifier must not be nil".to_string());
        }
        if self.roles.is_empty() {
            out.push("a user must hold at least one role".to_string());
        }
        if self.roles.has_duplicates() {
            out.push("a role may only be held once".to_string());
        }
        if let Some(ban) = &self.ban {
            if ban.reason.trim().is_empty() {
                out.push("a ban needs a reason".to_string());
            }
            if ban.banned_by == self.id {
                out.push("a user cannot ban themself".to_string());
            }
        }
        out
    }
}

impl User {
    pub fn user_id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Name to show other users.
    pub fn to_nickname(&self) -> &str {
        self.nickname.as_str()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_ref().map(Email::as_str)
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.password.matches(password)
    }

    /// Whether the user may exercise `capability`. Banned users may not
    /// exercise any.
    pub fn can(&self, capability: &Capability) -> bool {
        self.ban.is_none() && self.roles.allows(capability)
    }

    pub fn holds_role(&self, role: &Role) -> bool {
        self.roles.holds(role)
    }

    pub fn role_count(&self) -> usize {
        self.roles.count()
    }

    pub fn is_banned(&self) -> bool {
        self.ban.is_some()
    }

    pub fn ban(&self) -> Option<&Ban> {
        self.ban.as_ref()
    }

    /// Whether `self` may act on `roles` held by someone else: it must be
    /// unbanned and allowed everything those roles allow.
    fn outranks(&self, roles: &RoleSet) -> bool {
        self.ban.is_none() && self.roles.dominates(roles)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Behaviour
    // ─────────────────────────────────────────────────────────────────────────

    pub fn change_nickname(&mut self, nickname: &str) -> DomainResult<()> {
        let nickname = Nickname::parse(nickname)
            .map_err(|e| DomainError::invariant(format!("nickname: {e}")))?;
        let candidate = Self {
            nickname,
            ..self.clone()
        };
        self.commit(candidate)
    }

    pub fn change_email(&mut self, email: Option<&str>) -> DomainResult<()> {
        let email = email
            .map(Email::parse)
            .transpose()
            .map_err(|e| DomainError::invariant(format!("email: {e}")))?;
        let candidate = Self {
            email,
            ..self.clone()
        };
        self.commit(candidate)
    }

    /// Replace the password after proving knowledge of the current one.
    pub fn change_password(
        &mut self,
        current: &str,
        new: &str,
        policy: &RegistrationPolicy,
    ) -> DomainResult<()> {
        if !self.password.matches(current) {
            return Err(DomainError::unauthorized("current password does not match"));
        }
        let password = PasswordDigest::from_plaintext(new, policy.min_password_length)
            .map_err(|e| DomainError::invariant(format!("password: {e}")))?;
        let candidate = Self {
            password,
            ..self.clone()
        };
        self.commit(candidate)
    }

    /// Grant `role` on behalf of `granted_by`.
    ///
    /// The granting user must already be allowed everything the role allows
    /// (no privilege escalation), and banned users receive no new roles.
    pub fn grant_role(
        &mut self,
        role: Role,
        granted_by: &User,
        catalog: &RoleCatalog,
    ) -> DomainResult<()> {
        if self.is_banned() {
            return Err(DomainError::invariant("user is banned"));
        }
        if self.roles.holds(&role) {
            return Err(DomainError::invariant(format!("role '{role}' already held")));
        }

        let granted = RoleSet::default()
            .with(role.clone(), catalog)
            .ok_or_else(|| DomainError::invariant(format!("unknown role '{role}'")))?;
        if !granted_by.outranks(&granted) {
            warn!(
                user_id = %self.id,
                granted_by = %granted_by.id,
                role = %role,
                "role grant refused"
            );
            return Err(DomainError::unauthorized(format!(
                "{} may not grant '{role}'",
                granted_by.username()
            )));
        }

        let roles = self
            .roles
            .with(role.clone(), catalog)
            .ok_or_else(|| DomainError::invariant(format!("unknown role '{role}'")))?;
        self.commit(Self {
            roles,
            ..self.clone()
        })?;
        info!(user_id = %self.id, role = %role, "role granted");
        Ok(())
    }

    /// Revoke `role` on behalf of `revoked_by`, under the same rule as
    /// [`grant_role`](Self::grant_role). The last remaining role cannot be
    /// revoked.
    pub fn revoke_role(&mut self, role: &Role, revoked_by: &User) -> DomainResult<()> {
        if !self.roles.holds(role) {
            return Err(DomainError::invariant(format!("role '{role}' not held")));
        }
        if !revoked_by.outranks(&self.roles.only(role)) {
            warn!(
                user_id = %self.id,
                revoked_by = %revoked_by.id,
                role = %role,
                "role revocation refused"
            );
            return Err(DomainError::unauthorized(format!(
                "{} may not revoke '{role}'",
                revoked_by.username()
            )));
        }
        let roles = self.roles.without(role);
        self.commit(Self {
            roles,
            ..self.clone()
        })?;
        info!(user_id = %self.id, role = %role, "role revoked");
        Ok(())
    }

    /// Ban this user. `banned_by` needs the `user.ban` capability and must
    /// outrank every role this user holds.
    pub fn apply_ban(
        &mut self,
        banned_by: &User,
        reason: &str,
        clock: &dyn Clock,
    ) -> DomainResult<()> {
        if !banned_by.can(&Capability::USER_BAN) || !banned_by.outranks(&self.roles) {
            return Err(DomainError::unauthorized(format!(
                "{} may not ban {}",
                banned_by.username(),
                self.username()
            )));
        }
        if self.is_banned() {
            return Err(DomainError::invariant("user already banned"));
        }

        let ban = Ban::new(reason.trim().to_string(), banned_by.id, clock.now());
        self.commit(Self {
            ban: Some(ban),
            ..self.clone()
        })?;
        info!(user_id = %self.id, banned_by = %banned_by.id, "user banned");
        Ok(())
    }

    pub fn lift_ban(&mut self, lifted_by: &User) -> DomainResult<()> {
        if !lifted_by.can(&Capability::USER_BAN) || !lifted_by.outranks(&self.roles) {
            return Err(DomainError::unauthorized(format!(
                "{} may not lift the ban on {}",
                lifted_by.username(),
                self.username()
            )));
        }
        if !self.is_banned() {
            return Err(DomainError::invariant("user is not banned"));
        }
        self.commit(Self {
            ban: None,
            ..self.clone()
        })?;
        info!(user_id = %self.id, lifted_by = %lifted_by.id, "ban lifted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;
    use steward_core::{FixedClock, SequentialIds, raw_input};

    fn clock() -> FixedClock {
        FixedClock::at(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
    }

    fn register(ids: &SequentialIds, username: &str) -> User {
        let form = raw_input(json!({ "username": username, "password": "pw" })).unwrap();
        User::from_registration_form(&form, &RegistrationPolicy::default(), ids).unwrap()
    }

    fn admin(ids: &SequentialIds) -> User {
        let policy = RegistrationPolicy::default().with_default_roles(vec![Role::ADMIN]);
        let form = raw_input(json!({ "username": "boss", "password": "pw" })).unwrap();
        User::from_registration_form(&form, &policy, ids).unwrap()
    }

    #[test]
    fn nickname_change_is_validated() {
        let ids = SequentialIds::new();
        let mut ana = register(&ids, "ana");

        ana.change_nickname("Ana B.").unwrap();
        assert_eq!(ana.to_nickname(), "Ana B.");

        let before = ana.clone();
        let err = ana.change_nickname("   ").unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("nickname"));
        assert_eq!(ana, before);
    }

    #[test]
    fn member_cannot_ban() {
        let ids = SequentialIds::new();
        let mut ana = register(&ids, "ana");
        let bob = register(&ids, "bob");

        let err = ana.apply_ban(&bob, "spam", &clock()).unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
        assert!(!ana.is_banned());
    }

    #[test]
    fn ban_denies_every_capability_until_lifted() {
        let ids = SequentialIds::new();
        let boss = admin(&ids);
        let mut ana = register(&ids, "ana");
        assert!(ana.can(&Capability::MESSAGE_POST));

        ana.apply_ban(&boss, "spam", &clock()).unwrap();
        assert!(ana.is_banned());
        assert!(!ana.can(&Capability::MESSAGE_POST));
        let ban = ana.ban().unwrap();
        assert_eq!(ban.reason(), "spam");
        assert_eq!(ban.banned_by(), boss.user_id());
        assert_eq!(ban.banned_at(), clock().now());

        ana.lift_ban(&boss).unwrap();
        assert!(ana.can(&Capability::MESSAGE_POST));
    }

    #[test]
    fn ban_without_reason_is_rejected() {
        let ids = SequentialIds::new();
        let boss = admin(&ids);
        let mut ana = register(&ids, "ana");
        let before = ana.clone();

        let err = ana.apply_ban(&boss, "  ", &clock()).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(ana, before);
    }

    #[test]
    fn cannot_ban_oneself() {
        let ids = SequentialIds::new();
        let mut boss = admin(&ids);
        let same = boss.clone();

        let err = boss.apply_ban(&same, "testing", &clock()).unwrap_err();
        assert!(err.to_string().contains("themself"));
        assert!(!boss.is_banned());
    }

    #[test]
    fn grant_requires_dominating_granter() {
        let ids = SequentialIds::new();
        let catalog = RoleCatalog::builtin();
        let boss = admin(&ids);
        let bob = register(&ids, "bob");
        let mut ana = register(&ids, "ana");

        let err = ana.grant_role(Role::MODERATOR, &bob, &catalog).unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        ana.grant_role(Role::MODERATOR, &boss, &catalog).unwrap();
        assert!(ana.holds_role(&Role::MODERATOR));
        assert!(ana.can(&Capability::USER_BAN));
        assert_eq!(ana.role_count(), 2);

        let err = ana.grant_role(Role::MODERATOR, &boss, &catalog).unwrap_err();
        assert!(err.to_string().contains("already held"));
    }

    #[test]
    fn last_role_cannot_be_revoked() {
        let ids = SequentialIds::new();
        let boss = admin(&ids);
        let mut ana = register(&ids, "ana");
        let before = ana.clone();

        let err = ana.revoke_role(&Role::MEMBER, &boss).unwrap_err();
        assert!(err.to_string().contains("at least one role"));
        assert_eq!(ana, before);
    }

    #[test]
    fn rejected_new_values_are_invariant_violations() {
        let ids = SequentialIds::new();
        let policy = RegistrationPolicy::default().with_min_password_length(4);
        let mut ana = register(&ids, "ana");
        let before = ana.clone();

        let err = ana.change_email(Some("not an email")).unwrap_err();
        assert!(err.is_invariant_violation());
        let err = ana.change_password("pw", "abc", &policy).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(ana, before);
    }

    #[test]
    fn revocation_needs_an_outranking_user() {
        let ids = SequentialIds::new();
        let catalog = RoleCatalog::builtin();
        let boss = admin(&ids);
        let bob = register(&ids, "bob");
        let mut ana = register(&ids, "ana");
        ana.grant_role(Role::MODERATOR, &boss, &catalog).unwrap();
        let before = ana.clone();

        let err = ana.revoke_role(&Role::MODERATOR, &bob).unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
        assert_eq!(ana, before);

        ana.revoke_role(&Role::MODERATOR, &boss).unwrap();
        assert!(!ana.holds_role(&Role::MODERATOR));
    }

    #[test]
    fn moderator_cannot_ban_an_administrator() {
        let ids = SequentialIds::new();
        let catalog = RoleCatalog::builtin();
        let mut boss = admin(&ids);
        let mut mia = register(&ids, "mia");
        mia.grant_role(Role::MODERATOR, &boss, &catalog).unwrap();
        let before = boss.clone();

        let err = boss.apply_ban(&mia, "coup", &clock()).unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
        assert_eq!(boss, before);

        let mut ana = register(&ids, "ana");
        ana.apply_ban(&mia, "spam", &clock()).unwrap();
        assert!(ana.is_banned());
    }

    #[test]
    fn banned_user_gets_no_new_roles() {
        let ids = SequentialIds::new();
        let catalog = RoleCatalog::builtin();
        let boss = admin(&ids);
        let mut ana = register(&ids, "ana");
        ana.apply_ban(&boss, "spam", &clock()).unwrap();

        let err = ana.grant_role(Role::MODERATOR, &boss, &catalog).unwrap_err();
        assert!(err.to_string().contains("banned"));
    }

    #[test]
    fn password_change_needs_current_password() {
        let ids = SequentialIds::new();
        let policy = RegistrationPolicy::default();
        let mut ana = register(&ids, "ana");

        assert!(ana.change_password("wrong", "next", &policy).is_err());
        ana.change_password("pw", "next", &policy).unwrap();
        assert!(ana.verify_password("next"));
        assert!(!ana.verify_password("pw"));
    }

    #[derive(Debug, Clone)]
    enum Step {
        Grant(u8),
        Revoke(u8),
        Ban,
        Lift,
        Nickname(String),
    }

    fn role_for(n: u8) -> Role {
        match n % 3 {
            0 => Role::ADMIN,
            1 => Role::MODERATOR,
            _ => Role::MEMBER,
        }
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            any::<u8>().prop_map(Step::Grant),
            any::<u8>().prop_map(Step::Revoke),
            Just(Step::Ban),
            Just(Step::Lift),
            "[ a-z]{0,8}".prop_map(Step::Nickname),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after every behaviour call the user is either unchanged
        /// (call rejected) or valid.
        #[test]
        fn behaviour_never_leaves_user_invalid(steps in prop::collection::vec(step(), 1..30)) {
            let ids = SequentialIds::new();
            let catalog = RoleCatalog::builtin();
            let boss = admin(&ids);
            let mut ana = register(&ids, "ana");

            for s in steps {
                let before = ana.clone();
                let result = match s {
                    Step::Grant(n) => ana.grant_role(role_for(n), &boss, &catalog),
                    Step::Revoke(n) => ana.revoke_role(&role_for(n), &boss),
                    Step::Ban => ana.apply_ban(&boss, "policy", &clock()),
                    Step::Lift => ana.lift_ban(&boss),
                    Step::Nickname(n) => ana.change_nickname(&n),
                };
                match result {
                    Ok(()) => prop_assert!(ana.violations().is_empty()),
                    Err(e) => {
                        prop_assert!(e.is_invariant_violation(), "unexpected rejection: {:?}", e);
                        prop_assert_eq!(&ana, &before);
                    }
                }
            }
        }
    }
}
