//! `steward-identity` — users, groups and roles.
//!
//! Entities here are valid by construction: they come out of named
//! constructors (`User::from_registration_form`, `User::from_import_record`,
//! `Group::found`) and change only through behaviour methods that re-check
//! their invariants.

pub mod credentials;
pub mod factory;
pub mod group;
pub mod policy;
pub mod roles;
pub mod user;

pub use credentials::{CredentialError, Email, Nickname, PasswordDigest, Username, UsernameRules};
pub use group::{Group, GroupId};
pub use policy::{GroupPolicy, ImportPolicy, RegistrationPolicy};
pub use roles::{Capability, Role, RoleCatalog, RoleSet};
pub use user::{Ban, User, UserId};
