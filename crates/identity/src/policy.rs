//! Validation policies for the identity boundary.
//!
//! Each named constructor takes its own policy, so the rules for a form
//! submission and for an import row live in one place each.

use serde::{Deserialize, Serialize};

use steward_core::config::{env_list_or, env_or};

use crate::credentials::UsernameRules;
use crate::roles::{Role, RoleCatalog};

/// Rules for `User::from_registration_form`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationPolicy {
    pub min_username_length: usize,
    pub max_username_length: usize,
    pub min_password_length: usize,
    /// Names nobody may register (compared case-insensitively).
    pub reserved_usernames: Vec<String>,
    /// Roles every newly registered user starts with.
    pub default_roles: Vec<Role>,
    pub catalog: RoleCatalog,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            min_username_length: 1,
            max_username_length: 32,
            min_password_length: 1,
            reserved_usernames: vec!["admin".into(), "root".into(), "system".into()],
            default_roles: vec![Role::MEMBER],
            catalog: RoleCatalog::builtin(),
        }
    }
}

impl RegistrationPolicy {
    /// Defaults overridden by `STEWARD_USERNAME_MIN_LEN`,
    /// `STEWARD_USERNAME_MAX_LEN`, `STEWARD_PASSWORD_MIN_LEN` and
    /// `STEWARD_RESERVED_USERNAMES` (comma-separated).
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            min_username_length: env_or("STEWARD_USERNAME_MIN_LEN", d.min_username_length),
            max_username_length: env_or("STEWARD_USERNAME_MAX_LEN", d.max_username_length),
            min_password_length: env_or("STEWARD_PASSWORD_MIN_LEN", d.min_password_length),
            reserved_usernames: env_list_or("STEWARD_RESERVED_USERNAMES", d.reserved_usernames),
            ..d
        }
    }

    pub fn with_min_password_length(mut self, min: usize) -> Self {
        self.min_password_length = min;
        self
    }

    pub fn with_reserved(mut self, name: impl Into<String>) -> Self {
        self.reserved_usernames.push(name.into());
        self
    }

    pub fn with_default_roles(mut self, roles: Vec<Role>) -> Self {
        self.default_roles = roles;
        self
    }

    pub fn with_catalog(mut self, catalog: RoleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub(crate) fn username_rules(&self) -> UsernameRules {
        UsernameRules {
            min_length: self.min_username_length,
            max_length: self.max_username_length,
            legacy_charset: false,
        }
    }

    pub(crate) fn is_reserved(&self, username: &str) -> bool {
        self.reserved_usernames
            .iter()
            .any(|r| r.eq_ignore_ascii_case(username))
    }
}

/// Rules for `User::from_import_record` (and rehydration from storage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPolicy {
    pub max_username_length: usize,
    /// Accept usernames created before the strict charset existed.
    pub allow_legacy_usernames: bool,
    pub catalog: RoleCatalog,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            max_username_length: 64,
            allow_legacy_usernames: true,
            catalog: RoleCatalog::builtin(),
        }
    }
}

impl ImportPolicy {
    /// Defaults overridden by `STEWARD_IMPORT_USERNAME_MAX_LEN` and
    /// `STEWARD_IMPORT_ALLOW_LEGACY`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_username_length: env_or("STEWARD_IMPORT_USERNAME_MAX_LEN", d.max_username_length),
            allow_legacy_usernames: env_or("STEWARD_IMPORT_ALLOW_LEGACY", d.allow_legacy_usernames),
            ..d
        }
    }

    pub fn strict(mut self) -> Self {
        self.allow_legacy_usernames = false;
        self
    }

    pub fn with_catalog(mut self, catalog: RoleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub(crate) fn username_rules(&self) -> UsernameRules {
        UsernameRules {
            min_length: 1,
            max_length: self.max_username_length,
            legacy_charset: self.allow_legacy_usernames,
        }
    }
}

/// Rules for founding and growing a `Group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupPolicy {
    pub max_name_length: usize,
    pub max_members: usize,
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self {
            max_name_length: 64,
            max_members: 1000,
        }
    }
}

impl GroupPolicy {
    /// Defaults overridden by `STEWARD_GROUP_NAME_MAX_LEN` and
    /// `STEWARD_GROUP_MAX_MEMBERS`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_name_length: env_or("STEWARD_GROUP_NAME_MAX_LEN", d.max_name_length),
            max_members: env_or("STEWARD_GROUP_MAX_MEMBERS", d.max_members),
        }
    }

    pub fn with_max_members(mut self, max: usize) -> Self {
        self.max_members = max;
        self
    }
}
