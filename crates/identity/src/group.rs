//! Group entity and its encapsulated membership.
//!
//! Members are referenced by [`UserId`] only; a group never holds a `User`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use steward_core::{
    DomainError, DomainResult, Entity, FieldReader, IdGenerator, RawInput, ValidatedEntity,
    ValidationError, typed_id,
};

use crate::policy::GroupPolicy;
use crate::roles::Capability;
use crate::user::UserId;

typed_id!(
    /// Identifier of a group.
    GroupId,
    "GroupId"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Rank {
    Administrator,
    Member,
}

impl Rank {
    fn allows(self, capability: &Capability) -> bool {
        match self {
            Rank::Administrator => [
                Capability::GROUP_MANAGE,
                Capability::MESSAGE_DELETE,
                Capability::MESSAGE_POST,
                Capability::MESSAGE_READ,
            ]
            .contains(capability),
            Rank::Member => {
                [Capability::MESSAGE_POST, Capability::MESSAGE_READ].contains(capability)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Member {
    user: UserId,
    rank: Rank,
}

/// Who belongs to a group, and at which rank.
///
/// Never leaves the group; `Group` forwards the queries and owns every change.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Membership {
    members: Vec<Member>,
}

impl Membership {
    fn founded_by(founder: UserId) -> Self {
        Self {
            members: vec![Member {
                user: founder,
                rank: Rank::Administrator,
            }],
        }
    }

    fn rank_of(&self, user: UserId) -> Option<Rank> {
        self.members.iter().find(|m| m.user == user).map(|m| m.rank)
    }

    fn is_member(&self, user: UserId) -> bool {
        self.rank_of(user).is_some()
    }

    fn is_administrator(&self, user: UserId) -> bool {
        self.rank_of(user) == Some(Rank::Administrator)
    }

    fn allows(&self, user: UserId, capability: &Capability) -> bool {
        self.rank_of(user).is_some_and(|rank| rank.allows(capability))
    }

    fn member_count(&self) -> usize {
        self.members.len()
    }

    fn administrator_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.rank == Rank::Administrator)
            .count()
    }

    fn with(&self, user: UserId, rank: Rank) -> Self {
        let mut next = self.clone();
        next.members.push(Member { user, rank });
        next
    }

    fn ranked(&self, user: UserId, rank: Rank) -> Self {
        let mut next = self.clone();
        for m in next.members.iter_mut().filter(|m| m.user == user) {
            m.rank = rank;
        }
        next
    }

    fn without(&self, user: UserId) -> Self {
        let mut next = self.clone();
        next.members.retain(|m| m.user != user);
        next
    }

    fn has_duplicates(&self) -> bool {
        self.members
            .iter()
            .enumerate()
            .any(|(i, m)| self.members[..i].iter().any(|n| n.user == m.user))
    }
}

/// A named group of users.
///
/// # Invariants
/// - The name is non-empty.
/// - There is always at least one administrator, so the last one can be
///   neither removed nor demoted.
/// - Nobody is a member twice.
/// - Membership never exceeds the capacity fixed when the group was founded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    name: String,
    capacity: usize,
    members: Membership,
}

impl Entity for Group {
    type Id = GroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ValidatedEntity for Group {
    const KIND: &'static str = "group";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.id.identifier().is_nil() {
            out.push("identifier must not be nil".to_string());
        }
        if self.name.trim().is_empty() {
            out.push("a group needs a name".to_string());
        }
        if self.members.administrator_count() == 0 {
            out.push("a group must keep at least one administrator".to_string());
        }
        if self.members.has_duplicates() {
            out.push("a user may only be a member once".to_string());
        }
        if self.members.member_count() > self.capacity {
            out.push(format!("a group holds at most {} members", self.capacity));
        }
        out
    }
}

fn parse_name(raw: &str, policy: &GroupPolicy) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("must not be empty".to_string());
    }
    if name.chars().count() > policy.max_name_length {
        return Err(format!("must be at most {} characters", policy.max_name_length));
    }
    Ok(name.to_string())
}

impl Group {
    /// Found a new group with `founder` as its only administrator.
    pub fn found(
        name: &str,
        founder: UserId,
        policy: &GroupPolicy,
        ids: &dyn IdGenerator,
    ) -> Result<Group, ValidationError> {
        let name = parse_name(name, policy).map_err(|e| ValidationError::single("name", e))?;
        let group = Group::construct(Group {
            id: GroupId::generate(ids),
            name,
            capacity: policy.max_members,
            members: Membership::founded_by(founder),
        })?;
        debug!(group_id = %group.id, founder = %founder, "group founded");
        Ok(group)
    }

    /// Rebuild a group from a stored record (`id`, `name`, `capacity`,
    /// `members: [{ user, rank }]`).
    pub fn from_import_record(
        record: &RawInput,
        policy: &GroupPolicy,
    ) -> Result<Group, ValidationError> {
        let mut r = FieldReader::new(record);
        let id = r
            .required_str("id")
            .and_then(|raw| r.check("id", raw.parse::<GroupId>()));
        let name = r
            .required_str("name")
            .and_then(|raw| r.check("name", parse_name(&raw, policy)));
        let capacity = r
            .optional_as::<usize>("capacity")
            .unwrap_or(policy.max_members);
        let members = r.optional_as::<Vec<Member>>("members").unwrap_or_default();

        r.finish()?;
        let (Some(id), Some(name)) = (id, name) else {
            return Err(ValidationError::single("input", "incomplete group record"));
        };

        Ok(Group::construct(Group {
            id,
            name,
            capacity,
            members: Membership { members },
        })?)
    }

    /// Export in the shape [`Group::from_import_record`] accepts.
    pub fn to_import_record(&self) -> RawInput {
        let mut record = RawInput::new();
        record.insert("id".into(), json!(self.id.to_string()));
        record.insert("name".into(), json!(self.name));
        record.insert("capacity".into(), json!(self.capacity));
        record.insert("members".into(), json!(self.members.members));
        record
    }

    pub fn group_id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_member(&self, user: UserId) -> bool {
        self.members.is_member(user)
    }

    pub fn is_administrator(&self, user: UserId) -> bool {
        self.members.is_administrator(user)
    }

    /// Whether `user` may exercise `capability` inside this group.
    pub fn allows(&self, user: UserId, capability: &Capability) -> bool {
        self.members.allows(user, capability)
    }

    pub fn member_count(&self) -> usize {
        self.members.member_count()
    }

    pub fn administrator_count(&self) -> usize {
        self.members.administrator_count()
    }

    fn ensure_manager(&self, actor: UserId) -> DomainResult<()> {
        if self.allows(actor, &Capability::GROUP_MANAGE) {
            Ok(())
        } else {
            Err(DomainError::unauthorized(format!(
                "{actor} does not administer group {}",
                self.id
            )))
        }
    }

    fn with_members(&self, members: Membership) -> Self {
        Self {
            members,
            ..self.clone()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Behaviour
    // ─────────────────────────────────────────────────────────────────────────

    pub fn rename(&mut self, actor: UserId, name: &str, policy: &GroupPolicy) -> DomainResult<()> {
        self.ensure_manager(actor)?;
        let name = parse_name(name, policy)
            .map_err(|e| DomainError::invariant(format!("name: {e}")))?;
        self.commit(Self {
            name,
            ..self.clone()
        })
    }

    pub fn add_member(&mut self, actor: UserId, user: UserId) -> DomainResult<()> {
        self.ensure_manager(actor)?;
        if self.is_member(user) {
            return Err(DomainError::invariant(format!("{user} is already a member")));
        }
        self.commit(self.with_members(self.members.with(user, Rank::Member)))?;
        info!(group_id = %self.id, user_id = %user, "member added");
        Ok(())
    }

    pub fn promote(&mut self, actor: UserId, user: UserId) -> DomainResult<()> {
        self.ensure_manager(actor)?;
        match self.members.rank_of(user) {
            None => Err(DomainError::invariant(format!("{user} is not a member"))),
            Some(Rank::Administrator) => {
                Err(DomainError::invariant(format!("{user} is already an administrator")))
            }
            Some(Rank::Member) => {
                self.commit(self.with_members(self.members.ranked(user, Rank::Administrator)))?;
                info!(group_id = %self.id, user_id = %user, "member promoted");
                Ok(())
            }
        }
    }

    pub fn demote(&mut self, actor: UserId, user: UserId) -> DomainResult<()> {
        self.ensure_manager(actor)?;
        if !self.is_administrator(user) {
            return Err(DomainError::invariant(format!("{user} is not an administrator")));
        }
        self.commit(self.with_members(self.members.ranked(user, Rank::Member)))?;
        info!(group_id = %self.id, user_id = %user, "administrator demoted");
        Ok(())
    }

    /// Remove `user`. Administrators may remove anyone; members may only
    /// remove themselves (leave).
    pub fn remove_member(&mut self, actor: UserId, user: UserId) -> DomainResult<()> {
        if actor != user {
            self.ensure_manager(actor)?;
        }
        if !self.is_member(user) {
            return Err(DomainError::invariant(format!("{user} is not a member")));
        }
        self.commit(self.with_members(self.members.without(user)))?;
        info!(group_id = %self.id, user_id = %user, "member removed");
        Ok(())
    }
}
