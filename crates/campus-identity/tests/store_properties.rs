//! Behavioural properties of the identity store across backends.

use std::sync::Arc;

use campus_core::{IdentityRecord, Profile, Role};
use campus_identity::{
    FileStore, IdentityStore, KeyValueStore, MemoryStore, SessionContext, keys,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn record(credential: &str, role: Role, subject: &str) -> IdentityRecord {
    IdentityRecord::new(credential, role, subject)
        .with_profile(Profile::new().with("name", subject).with("department", "CSE"))
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

#[rstest]
#[case(&[("token", "abc123")], Some("abc123"))]
#[case(&[("access_token", "a2")], Some("a2"))]
#[case(&[("jwt_token", "j"), ("accessToken", "c")], Some("c"))]
#[case(&[("jwt_token", "j"), ("token", "t"), ("access_token", "a")], Some("t"))]
#[case(&[("token", ""), ("jwt_token", "j")], Some("j"))]
#[case(&[], None)]
fn migration_is_idempotent(#[case] legacy: &[(&str, &str)], #[case] expected: Option<&str>) {
    let backend = MemoryStore::with_entries(legacy.iter().copied());
    let store = IdentityStore::new(Arc::new(backend.clone()));

    store.initialize().expect("first init");
    let after_once = store.read().credential;
    assert_eq!(after_once.as_deref(), expected);
    assert!(store.legacy_keys_present().is_empty());

    let second = store.initialize().expect("second init");
    assert!(second.is_noop());
    assert_eq!(store.read().credential, after_once);

    let entries = backend.load().expect("load");
    for key in keys::DEFAULT_LEGACY_KEYS {
        assert!(!entries.contains_key(key), "{key} should be gone");
    }
}

#[test]
fn canonical_credential_wins_over_legacy() {
    let backend = MemoryStore::with_entries([(keys::CREDENTIAL, "current"), ("token", "old")]);
    let store = IdentityStore::new(Arc::new(backend.clone()));

    let migration = store.initialize().expect("init");
    assert_eq!(migration.migrated_from, None);
    assert_eq!(migration.removed, vec!["token".to_string()]);
    assert_eq!(store.read().credential.as_deref(), Some("current"));
}

#[test]
fn migrated_credential_alone_is_not_a_session() {
    let store = IdentityStore::open(Arc::new(MemoryStore::with_entries([("token", "abc123")])))
        .expect("open");
    assert!(!store.is_authenticated());
    assert_eq!(
        store.auth_header().map(|h| h.value().to_string()).as_deref(),
        Some("Bearer abc123")
    );
}

#[test]
fn custom_legacy_keys_are_honoured() {
    let backend = MemoryStore::with_entries([("sessionToken", "s1"), ("token", "t1")]);
    let store = IdentityStore::with_legacy_keys(Arc::new(backend.clone()), ["sessionToken"]);
    store.initialize().expect("init");

    assert_eq!(store.read().credential.as_deref(), Some("s1"));
    // Not in the configured list, so left alone.
    assert_eq!(backend.get("token").expect("get").as_deref(), Some("t1"));
}

// ---------------------------------------------------------------------------
// Round trip + clear
// ---------------------------------------------------------------------------

#[rstest]
#[case(record("t1", Role::Student, "S1"))]
#[case(record("eyJ.payload.sig", Role::Faculty, "FAC001"))]
#[case(IdentityRecord::new("a", Role::Admin, "ADM-1"))]
fn write_then_read_round_trips(#[case] original: IdentityRecord) {
    let store = IdentityStore::new(Arc::new(MemoryStore::new()));
    store.write(&original).expect("write");
    assert_eq!(store.read(), original);
}

#[test]
fn clear_is_complete() {
    let backend = MemoryStore::new();
    let store = IdentityStore::new(Arc::new(backend.clone()));
    store.write(&record("t1", Role::Student, "S1")).expect("write");
    for key in keys::DEFAULT_LEGACY_KEYS {
        backend.set(key, "junk").expect("set");
    }

    store.clear().expect("clear");

    assert!(!store.is_authenticated());
    assert!(store.read().is_empty());
    assert!(store.auth_header().is_none());
    assert!(store.legacy_keys_present().is_empty());
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[test]
fn readers_never_see_credential_without_role_and_subject() {
    let backend = MemoryStore::new();
    let store = Arc::new(IdentityStore::new(Arc::new(backend)));

    std::thread::scope(|scope| {
        let writer = Arc::clone(&store);
        scope.spawn(move || {
            for i in 0..500 {
                let subject = format!("S{i}");
                writer
                    .write(&record(&format!("t{i}"), Role::Student, &subject))
                    .expect("write");
                writer.clear().expect("clear");
            }
        });

        for _ in 0..2 {
            let reader = Arc::clone(&store);
            scope.spawn(move || {
                for _ in 0..2000 {
                    let snapshot = reader.read();
                    if snapshot.credential.is_some() {
                        assert!(snapshot.role.is_some(), "role missing: {snapshot:?}");
                        assert!(snapshot.subject_id.is_some(), "subject missing: {snapshot:?}");
                    }
                }
            });
        }
    });
}

// ---------------------------------------------------------------------------
// File backend: two surfaces sharing one persisted store
// ---------------------------------------------------------------------------

#[test]
fn file_backend_shares_identity_between_handles() {
    let tmp = tempfile::TempDir::new().expect("tmp dir");
    let path = tmp.path().join("identity.json");

    let shell = IdentityStore::open(Arc::new(FileStore::new(&path))).expect("open shell");
    let widget = IdentityStore::open(Arc::new(FileStore::new(&path))).expect("open widget");

    shell.write(&record("t1", Role::Faculty, "FAC001")).expect("write");
    assert!(widget.is_authenticated());
    assert_eq!(widget.read().role, Some(Role::Faculty));

    widget.clear().expect("clear");
    assert!(!shell.is_authenticated());
    assert_eq!(shell.version(), widget.version());
}

#[test]
fn file_backend_survives_reopen() {
    let tmp = tempfile::TempDir::new().expect("tmp dir");
    let path = tmp.path().join("identity.json");

    {
        let store = IdentityStore::open(Arc::new(FileStore::new(&path))).expect("open");
        store.write(&record("t1", Role::Student, "S1")).expect("write");
    }

    let reopened = IdentityStore::open(Arc::new(FileStore::new(&path))).expect("reopen");
    assert_eq!(reopened.read(), record("t1", Role::Student, "S1"));
}

#[test]
fn corrupt_file_recovers_through_clear_and_login() {
    let tmp = tempfile::TempDir::new().expect("tmp dir");
    let path = tmp.path().join("identity.json");
    std::fs::write(&path, "{\"authToken\": \"trunc").expect("seed");

    let store = Arc::new(IdentityStore::new(Arc::new(FileStore::new(&path))));
    assert!(!store.is_authenticated());

    store.clear().expect("clear over corrupt file");
    assert_eq!(store.version(), 1);

    let session = SessionContext::new(Arc::clone(&store));
    session
        .login(record("t2", Role::Faculty, "F2"))
        .expect("login after recovery");

    let reopened = IdentityStore::open(Arc::new(FileStore::new(&path))).expect("reopen");
    assert_eq!(reopened.read(), record("t2", Role::Faculty, "F2"));
}

#[test]
fn open_rewrites_corrupt_file() {
    let tmp = tempfile::TempDir::new().expect("tmp dir");
    let path = tmp.path().join("identity.json");
    std::fs::write(&path, "not json at all").expect("seed");

    let store = IdentityStore::open(Arc::new(FileStore::new(&path))).expect("open");

    assert!(!store.is_authenticated());
    assert!(FileStore::new(&path).load().expect("valid json").is_empty());
}

#[test]
fn from_config_uses_configured_file() {
    let tmp = tempfile::TempDir::new().expect("tmp dir");
    let path = tmp.path().join("state").join("identity.json");
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, r#"{"jwt_token":"from-old-release"}"#).expect("seed");

    let config = campus_config::StorageConfig {
        path: path.to_string_lossy().into_owned(),
        ..Default::default()
    };
    let store = IdentityStore::from_config(&config).expect("from config");
    assert_eq!(store.read().credential.as_deref(), Some("from-old-release"));
    assert!(store.legacy_keys_present().is_empty());
}
