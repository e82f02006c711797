//! Roles, capabilities and the encapsulated [`RoleSet`].

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Role identifier.
///
/// Roles are opaque names; what a role allows is decided by a
/// [`RoleCatalog`] at the moment the role is granted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const MODERATOR: Role = Role(Cow::Borrowed("moderator"));
    pub const MEMBER: Role = Role(Cow::Borrowed("member"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability identifier (e.g. `"message.post"`).
///
/// The wildcard capability `"*"` allows everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub const ALL: Capability = Capability(Cow::Borrowed("*"));
    pub const MESSAGE_READ: Capability = Capability(Cow::Borrowed("message.read"));
    pub const MESSAGE_POST: Capability = Capability(Cow::Borrowed("message.post"));
    pub const MESSAGE_DELETE: Capability = Capability(Cow::Borrowed("message.delete"));
    pub const USER_BAN: Capability = Capability(Cow::Borrowed("user.ban"));
    pub const GROUP_MANAGE: Capability = Capability(Cow::Borrowed("group.manage"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Whether holding `self` satisfies a request for `requested`.
    pub fn covers(&self, requested: &Capability) -> bool {
        self.is_wildcard() || self == requested
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping from role names to the capabilities they grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCatalog {
    grants: HashMap<Role, Vec<Capability>>,
}

impl RoleCatalog {
    pub fn empty() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    /// Built-in catalog: `admin`, `moderator`, `member`.
    pub fn builtin() -> Self {
        Self::empty()
            .with_role(Role::ADMIN, [Capability::ALL])
            .with_role(
                Role::MODERATOR,
                [
                    Capability::USER_BAN,
                    Capability::MESSAGE_DELETE,
                    Capability::MESSAGE_READ,
                    Capability::MESSAGE_POST,
                ],
            )
            .with_role(Role::MEMBER, [Capability::MESSAGE_READ, Capability::MESSAGE_POST])
    }

    pub fn with_role(
        mut self,
        role: Role,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        self.grants.insert(role, capabilities.into_iter().collect());
        self
    }

    pub fn knows(&self, role: &Role) -> bool {
        self.grants.contains_key(role)
    }

    pub(crate) fn capabilities_of(&self, role: &Role) -> Option<&[Capability]> {
        self.grants.get(role).map(Vec::as_slice)
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Grant {
    role: Role,
    capabilities: Vec<Capability>,
}

/// The roles a user holds.
///
/// Only derived answers leave this type: whether a capability is allowed,
/// whether a role is held, how many roles there are. Changing the set is
/// crate-private and goes through `User::grant_role` / `User::revoke_role`,
/// which check the user's invariants around it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleSet {
    grants: Vec<Grant>,
}

impl RoleSet {
    pub fn allows(&self, requested: &Capability) -> bool {
        self.grants
            .iter()
            .flat_map(|g| g.capabilities.iter())
            .any(|held| held.covers(requested))
    }

    pub fn holds(&self, role: &Role) -> bool {
        self.grants.iter().any(|g| &g.role == role)
    }

    pub fn count(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Whether every capability the other set allows is allowed here too.
    pub fn dominates(&self, other: &RoleSet) -> bool {
        other
            .grants
            .iter()
            .flat_map(|g| g.capabilities.iter())
            .all(|c| self.allows(c))
    }

    pub(crate) fn with(&self, role: Role, catalog: &RoleCatalog) -> Option<RoleSet> {
        let capabilities = catalog.capabilities_of(&role)?.to_vec();
        let mut next = self.clone();
        next.grants.push(Grant { role, capabilities });
        Some(next)
    }

    /// The part of this set granted by `role`.
    pub(crate) fn only(&self, role: &Role) -> RoleSet {
        RoleSet {
            grants: self.grants.iter().filter(|g| &g.role == role).cloned().collect(),
        }
    }

    pub(crate) fn without(&self, role: &Role) -> RoleSet {
        let mut next = self.clone();
        next.grants.retain(|g| &g.role != role);
        next
    }

    pub(crate) fn role_names(&self) -> Vec<String> {
        self.grants.iter().map(|g| g.role.as_str().to_string()).collect()
    }

    pub(crate) fn has_duplicates(&self) -> bool {
        self.grants
            .iter()
            .enumerate()
            .any(|(i, g)| self.grants[..i].iter().any(|h| h.role == g.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_covers_everything() {
        let set = RoleSet::default().with(Role::ADMIN, &RoleCatalog::builtin()).unwrap();
        assert!(set.allows(&Capability::USER_BAN));
        assert!(set.allows(&Capability::new("anything.at.all")));
    }

    #[test]
    fn member_cannot_ban() {
        let set = RoleSet::default().with(Role::MEMBER, &RoleCatalog::builtin()).unwrap();
        assert!(set.allows(&Capability::MESSAGE_POST));
        assert!(!set.allows(&Capability::USER_BAN));
        assert!(set.holds(&Role::MEMBER));
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn unknown_role_cannot_be_added() {
        assert!(RoleSet::default().with(Role::new("wizard"), &RoleCatalog::builtin()).is_none());
    }

    #[test]
    fn without_removes_only_that_role() {
        let catalog = RoleCatalog::builtin();
        let set = RoleSet::default()
            .with(Role::MEMBER, &catalog)
            .and_then(|s| s.with(Role::MODERATOR, &catalog))
            .unwrap();
        let reduced = set.without(&Role::MODERATOR);
        assert!(reduced.holds(&Role::MEMBER));
        assert!(!reduced.holds(&Role::MODERATOR));
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn admin_dominates_moderator() {
        let catalog = RoleCatalog::builtin();
        let admin = RoleSet::default().with(Role::ADMIN, &catalog).unwrap();
        let moderator = RoleSet::default().with(Role::MODERATOR, &catalog).unwrap();
        assert!(admin.dominates(&moderator));
        assert!(!moderator.dominates(&admin));
    }

    #[test]
    fn only_keeps_a_single_role() {
        let catalog = RoleCatalog::builtin();
        let set = RoleSet::default()
            .with(Role::MEMBER, &catalog)
            .and_then(|s| s.with(Role::MODERATOR, &catalog))
            .unwrap();
        let moderator = set.only(&Role::MODERATOR);
        assert_eq!(moderator.count(), 1);
        assert!(moderator.allows(&Capability::USER_BAN));
        assert!(set.only(&Role::ADMIN).is_empty());
    }
}
