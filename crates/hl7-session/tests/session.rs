use std::fs;

use chrono::{Duration, Utc};

use hl7_model::FieldPath;
use hl7_session::{SessionError, SessionManager, SessionTemplate};
use hl7_standards::load_default_registry;

fn manager_in(dir: &tempfile::TempDir) -> SessionManager {
    SessionManager::open(dir.path().join("sessions.json")).expect("open store")
}

#[test]
fn lock_field_creates_a_temporary_session_implicitly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_in(&dir);

    assert!(manager.current().is_none());
    let session = manager
        .lock_field(FieldPath::field("PID", 3), "TEST-001")
        .expect("lock field");

    assert!(session.is_temporary());
    let parts: Vec<&str> = session.name.split('_').collect();
    assert_eq!(parts.len(), 3, "friendly name is adjective_animal_year");

    let current = manager.current().expect("current session");
    assert_eq!(current.name, session.name);
    assert_eq!(
        current.locks.get(&FieldPath::field("PID", 3)).map(String::as_str),
        Some("TEST-001")
    );
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");

    {
        let manager = SessionManager::open(&path).expect("open");
        manager
            .lock_field(FieldPath::field("PID", 3), "TEST-001")
            .expect("lock");
        manager.save("regression_fixture").expect("save");
    }

    let reopened = SessionManager::open(&path).expect("reopen");
    let current = reopened.current().expect("current survives restart");
    assert_eq!(current.name, "regression_fixture");
    assert!(!current.is_temporary());
}

#[test]
fn save_promotes_and_rejects_taken_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = load_default_registry().expect("registry");
    let manager = manager_in(&dir);

    assert!(matches!(
        manager.save("fixture_one"),
        Err(SessionError::NoCurrentSession)
    ));

    manager
        .lock_field(FieldPath::field("PID", 3), "A")
        .expect("lock");
    let saved = manager.save("fixture_one").expect("save");
    assert!(!saved.is_temporary());

    // Re-saving the current session under its own name is a no-op rename.
    manager.save("fixture_one").expect("idempotent save");

    // A taken name cannot be claimed by an import.
    let template = manager.export("fixture_one").expect("export");
    assert!(matches!(
        manager.import(&template, &registry),
        Err(SessionError::NameTaken(_))
    ));
}

#[test]
fn expired_temporary_sessions_are_purged_lazily() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");

    {
        let manager = SessionManager::open(&path).expect("open");
        manager
            .lock_field(FieldPath::field("PID", 3), "TEST-001")
            .expect("lock");
    }

    // Age the session past its TTL by rewriting the persisted expiry.
    let mut store: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read store")).expect("json");
    let expired = (Utc::now() - Duration::hours(1)).to_rfc3339();
    for (_, session) in store["sessions"].as_object_mut().expect("sessions") {
        session["expires_at"] = serde_json::Value::String(expired.clone());
    }
    fs::write(&path, serde_json::to_string_pretty(&store).unwrap()).expect("write store");

    let manager = SessionManager::open(&path).expect("reopen");
    assert!(manager.current().is_none(), "expired session is not current");
    assert!(manager.list().is_empty(), "expired session is purged");
}

#[test]
fn remove_deletes_immediately() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_in(&dir);
    manager
        .lock_field(FieldPath::field("PID", 3), "X")
        .expect("lock");
    let name = manager.save("doomed_fixture").expect("save").name;

    manager.remove(&name).expect("remove");
    assert!(manager.current().is_none());
    assert!(matches!(
        manager.use_session(&name),
        Err(SessionError::UnknownSession(_))
    ));
}

#[test]
fn export_then_import_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = load_default_registry().expect("registry");
    let manager = manager_in(&dir);

    manager
        .lock_field(FieldPath::field("PID", 3), "TEST-001")
        .expect("lock identifier");
    manager
        .lock_field(FieldPath::field("PID", 8), "F")
        .expect("lock sex");
    manager.save("demo_locks").expect("save");

    let template = manager.export("demo_locks").expect("export");
    let json = template.to_json().expect("serialize template");
    let parsed = SessionTemplate::from_json(&json).expect("parse template");

    let other_dir = tempfile::tempdir().expect("tempdir");
    let other = manager_in(&other_dir);
    let imported = other.import(&parsed, &registry).expect("import");
    assert_eq!(imported.name, "demo_locks");
    assert_eq!(
        imported.locks.get(&FieldPath::field("PID", 3)).map(String::as_str),
        Some("TEST-001")
    );
}

#[test]
fn import_rejects_invalid_locked_values_wholesale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = load_default_registry().expect("registry");
    let manager = manager_in(&dir);

    let mut template = SessionTemplate {
        name: "bad_locks".to_string(),
        author: Some("integration tests".to_string()),
        created_at: Utc::now(),
        description: None,
        locks: Default::default(),
    };
    template
        .locks
        .insert(FieldPath::field("PID", 3), "OK-VALUE".to_string());
    // 'Q' is not an administrative sex code.
    template
        .locks
        .insert(FieldPath::field("PID", 8), "Q".to_string());

    let error = manager
        .import(&template, &registry)
        .expect_err("invalid code must reject the template");
    assert!(matches!(error, SessionError::ImportValidation { .. }));

    // No partial session state was created.
    assert!(manager.list().is_empty());
    assert!(manager.current().is_none());
}
