//! Named constructors for [`User`].
//!
//! Each creation scenario has its own constructor and its own policy:
//!
//! | constructor                 | input                         | policy               |
//! |-----------------------------|-------------------------------|----------------------|
//! | `from_registration_form`    | sign-up form (clear password) | `RegistrationPolicy` |
//! | `from_import_record`        | export / storage row          | `ImportPolicy`       |
//!
//! Both are one-shot: they either return a valid user or a
//! [`ValidationError`] listing every failing field. [`User::to_import_record`]
//! produces exactly the shape `from_import_record` reads back.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

use steward_core::{FieldReader, IdGenerator, RawInput, ValidatedEntity, ValidationError};

use crate::credentials::{CredentialError, Email, Nickname, PasswordDigest, Username};
use crate::policy::{ImportPolicy, RegistrationPolicy};
use crate::roles::{Role, RoleCatalog, RoleSet};
use crate::user::{Ban, User, UserId};

fn roles_from(
    reader: &mut FieldReader<'_>,
    names: &[Role],
    catalog: &RoleCatalog,
) -> Option<RoleSet> {
    let mut set = RoleSet::default();
    for role in names {
        match set.with(role.clone(), catalog) {
            Some(next) => set = next,
            None => {
                reader.reject("roles", format!("unknown role '{role}'"));
                return None;
            }
        }
    }
    Some(set)
}

fn nickname_or_username(
    reader: &mut FieldReader<'_>,
    raw: Option<String>,
    username: Option<&Username>,
) -> Option<Nickname> {
    match raw {
        Some(raw) => reader.check("nickname", Nickname::parse(&raw)),
        None => username.and_then(|u| reader.check("nickname", Nickname::parse(u.as_str()))),
    }
}

impl User {
    /// Register a new user from a sign-up form.
    ///
    /// Fields: `username` and `password` (required), `nickname` (defaults to
    /// the username) and `email` (optional). A fresh identifier is drawn from
    /// `ids`; the password is stored only as a digest.
    pub fn from_registration_form(
        form: &RawInput,
        policy: &RegistrationPolicy,
        ids: &dyn IdGenerator,
    ) -> Result<User, ValidationError> {
        let mut r = FieldReader::new(form);

        let username = r
            .required_str("username")
            .and_then(|raw| r.check("username", Username::parse(&raw, policy.username_rules())))
            .and_then(|u| {
                if policy.is_reserved(u.as_str()) {
                    r.reject("username", CredentialError::Reserved.to_string());
                    None
                } else {
                    Some(u)
                }
            });
        let password = r.required_str("password").and_then(|raw| {
            r.check(
                "password",
                PasswordDigest::from_plaintext(&raw, policy.min_password_length),
            )
        });
        let nickname_raw = r.optional_str("nickname");
        let nickname = nickname_or_username(&mut r, nickname_raw, username.as_ref());
        let email = r
            .optional_str("email")
            .map(|raw| r.check("email", Email::parse(&raw)));
        let roles = roles_from(&mut r, &policy.default_roles, &policy.catalog);

        r.finish()?;
        let (Some(username), Some(password), Some(nickname), Some(roles)) =
            (username, password, nickname, roles)
        else {
            return Err(ValidationError::single("input", "incomplete registration form"));
        };

        let user = User::construct(User {
            id: UserId::generate(ids),
            username,
            nickname,
            email: email.flatten(),
            password,
            roles,
            ban: None,
        })?;

        debug!(user_id = %user.id, username = user.username(), "user registered");
        Ok(user)
    }

    /// Rebuild a user from an import row (or a stored record).
    ///
    /// Fields: `id`, `username`, `password_digest` (required); `nickname`,
    /// `email`, `roles`, and the ban triple `banned_reason` / `banned_by` /
    /// `banned_at` (optional; all three or none). The identifier is taken
    /// from the record, never generated.
    pub fn from_import_record(
        record: &RawInput,
        policy: &ImportPolicy,
    ) -> Result<User, ValidationError> {
        let mut r = FieldReader::new(record);

        let id = r
            .required_str("id")
            .and_then(|raw| r.check("id", raw.parse::<UserId>()))
            .and_then(|id| {
                if id.identifier().is_nil() {
                    r.reject("id", "must not be nil");
                    None
                } else {
                    Some(id)
                }
            });
        let username = r
            .required_str("username")
            .and_then(|raw| r.check("username", Username::parse(&raw, policy.username_rules())));
        let password = r
            .required_str("password_digest")
            .and_then(|raw| r.check("password_digest", PasswordDigest::from_hex(&raw)));
        let nickname_raw = r.optional_str("nickname");
        let nickname = nickname_or_username(&mut r, nickname_raw, username.as_ref());
        let email = r
            .optional_str("email")
            .map(|raw| r.check("email", Email::parse(&raw)));
        let role_names: Vec<Role> = r.string_list("roles").into_iter().map(Role::new).collect();
        let roles = roles_from(&mut r, &role_names, &policy.catalog);
        let ban = read_ban(&mut r);

        r.finish()?;
        let (Some(id), Some(username), Some(password), Some(nickname), Some(roles)) =
            (id, username, password, nickname, roles)
        else {
            return Err(ValidationError::single("input", "incomplete import record"));
        };

        let user = User::construct(User {
            id,
            username,
            nickname,
            email: email.flatten(),
            password,
            roles,
            ban,
        })?;

        debug!(user_id = %user.id, "user imported");
        Ok(user)
    }

    /// Export in the shape [`User::from_import_record`] accepts.
    pub fn to_import_record(&self) -> RawInput {
        let mut record = RawInput::new();
        record.insert("id".into(), json!(self.id.to_string()));
        record.insert("username".into(), json!(self.username.as_str()));
        record.insert("nickname".into(), json!(self.nickname.as_str()));
        record.insert("password_digest".into(), json!(self.password.as_hex()));
        record.insert("roles".into(), json!(self.roles.role_names()));
        if let Some(email) = &self.email {
            record.insert("email".into(), json!(email.as_str()));
        }
        if let Some(ban) = &self.ban {
            record.insert("banned_reason".into(), json!(ban.reason()));
            record.insert("banned_by".into(), json!(ban.banned_by().to_string()));
            record.insert("banned_at".into(), Value::String(ban.banned_at().to_rfc3339()));
        }
        record
    }
}

fn read_ban(r: &mut FieldReader<'_>) -> Option<Ban> {
    let reason = r.optional_str("banned_reason");
    let by = r
        .optional_str("banned_by")
        .and_then(|raw| r.check("banned_by", raw.parse::<UserId>()));
    let at = r.optional_str("banned_at").and_then(|raw| {
        r.check(
            "banned_at",
            DateTime::parse_from_rfc3339(raw.trim()).map(|t| t.with_timezone(&Utc)),
        )
    });

    match (reason, by, at) {
        (None, None, None) => None,
        (Some(reason), Some(by), Some(at)) => Some(Ban::new(reason.trim().to_string(), by, at)),
        _ => {
            r.reject(
                "banned_reason",
                "banned_reason, banned_by and banned_at must be given together",
            );
            None
        }
    }
}
