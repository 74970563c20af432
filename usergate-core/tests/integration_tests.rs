//! Integration tests for the usergate core
//!
//! Tests the full pipeline without an HTTP stack: config → gate → route
//! table → store.

use usergate_core::{
    InMemoryUserStore, Method, NewUser, Operation, Rejection, UserId, UserPatch, UserStore,
    UsergateConfig, UsergateError,
};

/// Run one request through gate and table, the way the server does.
fn dispatch(
    config: &UsergateConfig,
    store: &dyn UserStore,
    method: Method,
    path: &str,
    authorization: Option<&str>,
) -> Result<Option<(Operation, Option<String>)>, UsergateError> {
    let table = config.route_table()?;
    if table.is_protected(path) {
        config.gate()?.check(authorization)?;
    }

    let Some(m) = table.resolve(method, path) else {
        return Ok(None);
    };
    let user_id = m.user_id().map(str::to_string);

    match (m.operation, user_id.as_deref()) {
        (Operation::List, _) => {
            store.list();
        }
        (Operation::Create, _) => {
            store.create(NewUser::new("Carol", "carol@example.com"))?;
        }
        (Operation::GetOne, Some(id)) => {
            store.get(&UserId::from(id))?;
        }
        (Operation::Update, Some(id)) => {
            store.update(&UserId::from(id), UserPatch::default())?;
        }
        (Operation::Delete, Some(id)) => {
            store.delete(&UserId::from(id))?;
        }
        _ => unreachable!("item routes always capture userId"),
    }
    Ok(Some((m.operation, user_id)))
}

#[test]
fn test_unauthenticated_requests_never_reach_the_store() {
    let config = UsergateConfig::with_token("s3cret");
    let store = InMemoryUserStore::new();

    for header in [None, Some(""), Some("s3cret"), Some("Bearer "), Some("Bearer s3cre")] {
        let err = dispatch(&config, &store, Method::Post, "/api/rest/users", header).unwrap_err();
        assert!(matches!(err, UsergateError::Unauthorized(_)));
    }
    assert!(store.is_empty());
}

#[test]
fn test_rejection_reasons_are_kept() {
    let config = UsergateConfig::with_token("s3cret");
    let store = InMemoryUserStore::new();

    let reason = |header| match dispatch(&config, &store, Method::Get, "/api/rest/users", header) {
        Err(UsergateError::Unauthorized(r)) => r,
        other => panic!("expected rejection, got {:?}", other),
    };
    assert_eq!(reason(None), Rejection::MissingHeader);
    assert_eq!(reason(Some("Token s3cret")), Rejection::MalformedHeader);
    assert_eq!(reason(Some("Bearer s3cret!")), Rejection::InvalidToken);
}

#[test]
fn test_authenticated_crud_cycle() {
    let config = UsergateConfig::with_token("s3cret");
    let store = InMemoryUserStore::new();
    let auth = Some("Bearer s3cret");

    let created = dispatch(&config, &store, Method::Post, "/api/rest/users", auth).unwrap();
    assert_eq!(created, Some((Operation::Create, None)));
    assert_eq!(store.len(), 1);

    let listed = dispatch(&config, &store, Method::Get, "/api/rest/users", auth).unwrap();
    assert_eq!(listed, Some((Operation::List, None)));

    let fetched = dispatch(&config, &store, Method::Get, "/api/rest/users/1", auth).unwrap();
    assert_eq!(fetched, Some((Operation::GetOne, Some("1".to_string()))));

    let patched = dispatch(&config, &store, Method::Patch, "/api/rest/users/1", auth).unwrap();
    assert_eq!(patched, Some((Operation::Update, Some("1".to_string()))));

    let deleted = dispatch(&config, &store, Method::Delete, "/api/rest/users/1", auth).unwrap();
    assert_eq!(deleted, Some((Operation::Delete, Some("1".to_string()))));
    assert!(store.is_empty());

    let gone = dispatch(&config, &store, Method::Get, "/api/rest/users/1", auth).unwrap_err();
    assert!(matches!(gone, UsergateError::UserNotFound(_)));
}

#[test]
fn test_unknown_protected_path_is_gated_first() {
    let config = UsergateConfig::with_token("s3cret");
    let store = InMemoryUserStore::new();

    let err = dispatch(&config, &store, Method::Get, "/api/rest/nothing", None).unwrap_err();
    assert!(matches!(err, UsergateError::Unauthorized(_)));

    let routed =
        dispatch(&config, &store, Method::Get, "/api/rest/nothing", Some("Bearer s3cret")).unwrap();
    assert_eq!(routed, None);
}

#[test]
fn test_paths_outside_the_prefix_skip_the_gate() {
    let config = UsergateConfig::with_token("s3cret");
    let store = InMemoryUserStore::new();
    assert_eq!(
        dispatch(&config, &store, Method::Get, "/health/live", None).unwrap(),
        None
    );
}

#[test]
fn test_custom_prefix() {
    let mut config = UsergateConfig::with_token("s3cret");
    config.auth.protected_prefix = "/v1".to_string();
    config.validate().unwrap();
    let store = InMemoryUserStore::new();

    let routed = dispatch(&config, &store, Method::Get, "/v1/users", Some("Bearer s3cret")).unwrap();
    assert_eq!(routed, Some((Operation::List, None)));
    assert!(dispatch(&config, &store, Method::Get, "/v1/users", None).is_err());
}
