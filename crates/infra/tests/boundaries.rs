//! Cross-boundary flows: identity, messaging and the resolver together.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use steward_core::{Identifier, SequentialIds, SteppingClock, raw_input};
use steward_identity::{Capability, Group, GroupPolicy, RegistrationPolicy, Role, RoleCatalog, User};
use steward_infra::{
    BoundaryReferenceResolver, GatewayError, InMemoryGateway, PersistenceGateway, RawState,
    ResolveError, Scope,
};
use steward_messaging::{Message, MessagePolicy, ReadLog};

/// Gateway wrapper that counts loads.
#[derive(Default)]
struct CountingGateway {
    inner: InMemoryGateway,
    loads: AtomicUsize,
}

impl CountingGateway {
    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl PersistenceGateway for CountingGateway {
    fn load(&self, id: Identifier, scope: &Scope) -> Result<Option<RawState>, GatewayError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(id, scope)
    }

    fn flush(
        &self,
        scope: &Scope,
        states: Vec<(Identifier, RawState)>,
    ) -> Result<(), GatewayError> {
        self.inner.flush(scope, states)
    }
}

fn register(username: &str, ids: &SequentialIds) -> Result<User> {
    steward_observability::init();
    let form = raw_input(json!({ "username": username, "password": "correct horse" }))?;
    Ok(User::from_registration_form(&form, &RegistrationPolicy::default(), ids)?)
}

fn clock() -> SteppingClock {
    SteppingClock::new(
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap(),
        Duration::seconds(5),
    )
}

#[test]
fn resolved_entities_outlive_their_scope() -> Result<()> {
    let ids = SequentialIds::new();
    let resolver = BoundaryReferenceResolver::new(InMemoryGateway::new());
    let ana = register("ana", &ids)?;

    let mut setup = Scope::open(&ids);
    resolver.flush(&mut setup, &[&ana])?;
    setup.close();

    let mut scope = Scope::open(&ids);
    let mut resolved: User = resolver.resolve(ana.user_id(), &mut scope)?;
    scope.clear();

    resolved.change_nickname("Ana B.")?;
    assert_eq!(resolved.to_nickname(), "Ana B.");

    let err = resolver.resolve::<User>(ana.user_id(), &mut scope).unwrap_err();
    assert!(matches!(err, ResolveError::ScopeExpired(id) if id == scope.id()));
    Ok(())
}

#[test]
fn a_scope_loads_each_reference_once() -> Result<()> {
    let ids = SequentialIds::new();
    let gateway = Arc::new(CountingGateway::default());
    let resolver = BoundaryReferenceResolver::new(gateway.clone());
    let ana = register("ana", &ids)?;

    let mut setup = Scope::open(&ids);
    resolver.flush(&mut setup, &[&ana])?;

    let mut scope = Scope::open(&ids);
    let first: User = resolver.resolve(ana.user_id(), &mut scope)?;
    let second: User = resolver.resolve(ana.user_id(), &mut scope)?;
    assert_eq!(first, second);
    assert_eq!(gateway.loads(), 1);

    let mut fresh = Scope::open(&ids);
    let _: User = resolver.resolve(ana.user_id(), &mut fresh)?;
    assert_eq!(gateway.loads(), 2);
    Ok(())
}

#[test]
fn message_author_is_resolved_by_identifier() -> Result<()> {
    let ids = SequentialIds::new();
    let clock = clock();
    let resolver = BoundaryReferenceResolver::new(InMemoryGateway::new());

    let ana = register("ana", &ids)?;
    let lobby = Group::found("lobby", ana.user_id(), &GroupPolicy::default(), &ids)?;
    let message = Message::compose(
        ana.user_id(),
        lobby.group_id(),
        "welcome",
        &MessagePolicy::default(),
        &ids,
        &clock,
    )?;

    let mut scope = Scope::open(&ids);
    assert_eq!(resolver.flush(&mut scope, &[&ana, &lobby, &message])?, 3);
    scope.close();

    let mut scope = Scope::open(&ids);
    let stored: Message = resolver.resolve(message.message_id(), &mut scope)?;
    let author: User = resolver.resolve(stored.author(), &mut scope)?;
    let channel: Group = resolver.resolve(stored.channel(), &mut scope)?;

    assert_eq!(author.username(), "ana");
    assert!(channel.is_administrator(author.user_id()));
    assert!(author.can(&Capability::MESSAGE_POST));
    Ok(())
}

#[test]
fn reads_are_logged_without_touching_the_stored_message() -> Result<()> {
    let ids = SequentialIds::new();
    let clock = clock();
    let resolver = BoundaryReferenceResolver::new(InMemoryGateway::new());

    let ana = register("ana", &ids)?;
    let bo = register("bo", &ids)?;
    let lobby = Group::found("lobby", ana.user_id(), &GroupPolicy::default(), &ids)?;
    let message = Message::compose(
        ana.user_id(),
        lobby.group_id(),
        "hi all",
        &MessagePolicy::default(),
        &ids,
        &clock,
    )?;

    let mut scope = Scope::open(&ids);
    resolver.flush(&mut scope, &[&message])?;

    let mut reads = ReadLog::new();
    let first = message.record_read(ana.user_id(), &mut reads, &ids, &clock);
    let second = message.record_read(bo.user_id(), &mut reads, &ids, &clock);

    assert_eq!(reads.len(), 2);
    assert_ne!(first.id(), second.id());
    assert_eq!(reads.read_count(message.message_id()), 2);

    let mut later = Scope::open(&ids);
    let stored: Message = resolver.resolve(message.message_id(), &mut later)?;
    assert_eq!(stored, message);
    Ok(())
}

#[test]
fn moderation_changes_survive_a_round_trip() -> Result<()> {
    let ids = SequentialIds::new();
    let clock = clock();
    let catalog = RoleCatalog::builtin();
    let resolver = BoundaryReferenceResolver::new(InMemoryGateway::new());

    let mut root = register("root_user", &ids)?;
    let mut mod_user = register("mia", &ids)?;
    let mut troll = register("troll", &ids)?;

    // The first administrator comes from an import.
    let mut record = root.to_import_record();
    record.insert("roles".into(), json!(["admin"]));
    root = User::from_import_record(&record, &Default::default())?;

    mod_user.grant_role(Role::MODERATOR, &root, &catalog)?;
    troll.apply_ban(&mod_user, "spam", &clock)?;

    let mut scope = Scope::open(&ids);
    resolver.flush(&mut scope, &[&root, &mod_user, &troll])?;
    scope.clear();

    let mut scope = Scope::open(&ids);
    let troll_back: User = resolver.resolve(troll.user_id(), &mut scope)?;
    let mod_back: User = resolver.resolve(mod_user.user_id(), &mut scope)?;

    assert!(troll_back.is_banned());
    assert_eq!(troll_back.ban().map(|b| b.banned_by()), Some(mod_user.user_id()));
    assert!(mod_back.holds_role(&Role::MODERATOR));
    assert!(mod_back.can(&Capability::USER_BAN));
    Ok(())
}

#[test]
fn corrupt_rows_are_reported_not_repaired() -> Result<()> {
    let ids = SequentialIds::new();
    let gateway = InMemoryGateway::new();
    let id = Identifier::from_u128(31_337);
    gateway.seed(
        id,
        json!({
            "id": id.to_string(),
            "username": "",
            "password_digest": "nope",
        }),
    )?;

    let resolver = BoundaryReferenceResolver::new(gateway);
    let mut scope = Scope::open(&ids);
    match resolver.resolve::<User>(id, &mut scope) {
        Err(ResolveError::Corrupt { kind, source, .. }) => {
            assert_eq!(kind, "user");
            assert!(source.failed("username"));
            assert!(source.failed("password_digest"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}
