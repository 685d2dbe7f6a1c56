//! Both user stores honour the same contract.
use std::collections::BTreeSet;
use std::sync::Arc;

use backend_lib::config::{StorageBackend, StorageSettings};
use backend_lib::error::AppError;
use backend_lib::storage::{open_store, CredentialStore, MemoryStore, SqliteStore};
use gatekeeper_common::User;
use tempfile::TempDir;

fn user(name: &str, hash: &str, roles: &[&str]) -> User {
    User::new(
        name,
        hash,
        roles.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
    )
}

const RACERS: usize = 16;

async fn exercise_contract(store: Arc<dyn CredentialStore>) {
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.find_by_username("kiran").await.unwrap().is_none());

    let created = store.create(user("kiran", "h1", &["USER"])).await.unwrap();
    let id = created.id.expect("store assigns an id");
    assert_eq!(store.find_by_username("kiran").await.unwrap(), Some(created.clone()));

    // Case-sensitive exact match
    assert!(store.find_by_username("KIRAN").await.unwrap().is_none());
    assert!(store.find_by_username("kira").await.unwrap().is_none());

    // Duplicate create is refused and leaves the record untouched
    let err = store.create(user("kiran", "h2", &["ADMIN"])).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateUsername(name) if name == "kiran"));
    assert_eq!(
        store.find_by_username("kiran").await.unwrap().unwrap().password_hash,
        "h1"
    );

    // Save overwrites in place and keeps the id
    let saved = store.save(user("kiran", "h3", &["ADMIN", "USER"])).await.unwrap();
    assert_eq!(saved.id, Some(id));
    let fetched = store.find_by_username("kiran").await.unwrap().unwrap();
    assert_eq!(fetched.password_hash, "h3");
    assert!(fetched.has_role("ADMIN") && fetched.has_role("USER"));

    // Save inserts new users with a fresh id
    let other = store.save(user("ravi", "h4", &["USER"])).await.unwrap();
    assert!(other.id.is_some());
    assert_ne!(other.id, Some(id));
    assert_eq!(store.count().await.unwrap(), 2);

    racing_creates_have_one_winner(Arc::clone(&store)).await;
    parallel_saves_do_not_interfere(Arc::clone(&store)).await;
}

async fn racing_creates_have_one_winner(store: Arc<dyn CredentialStore>) {
    let before = store.count().await.unwrap();

    let handles: Vec<_> = (0..RACERS)
        .map(|n| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create(user("racer", &format!("h{n}"), &["USER"])).await })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(created) => winners.push(created),
            Err(AppError::DuplicateUsername(name)) => assert_eq!(name, "racer"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    let stored = store.find_by_username("racer").await.unwrap().unwrap();
    assert_eq!(stored, winners[0]);
    assert_eq!(store.count().await.unwrap(), before + 1);
}

async fn parallel_saves_do_not_interfere(store: Arc<dyn CredentialStore>) {
    let before = store.count().await.unwrap();

    let handles: Vec<_> = (0..RACERS)
        .map(|n| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .save(user(&format!("saver-{n}"), &format!("s{n}"), &["USER"]))
                    .await
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        let saved = handle.await.unwrap().unwrap();
        assert!(ids.insert(saved.id.expect("store assigns an id")));
    }

    for n in 0..RACERS {
        let found = store
            .find_by_username(&format!("saver-{n}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.password_hash, format!("s{n}"));
        assert!(ids.contains(&found.id.unwrap()));
    }
    assert_eq!(store.count().await.unwrap(), before + RACERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_store_contract() {
    exercise_contract(Arc::new(MemoryStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_file_store_contract() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("users.db").display());
    let store = SqliteStore::connect(&url).await.unwrap();
    exercise_contract(Arc::new(store)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_memory_store_contract() {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    exercise_contract(Arc::new(store)).await;
}

#[tokio::test]
async fn test_sqlite_store_persists_across_reconnects() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("users.db").display());

    {
        let store = SqliteStore::connect(&url).await.unwrap();
        store.create(user("kiran", "h1", &["USER"])).await.unwrap();
    }

    let settings = StorageSettings {
        backend: StorageBackend::Sqlite,
        database_url: Some(url),
    };
    let store = open_store(&settings).await.unwrap();
    let found = store.find_by_username("kiran").await.unwrap().unwrap();
    assert_eq!(found.roles, BTreeSet::from(["USER".to_string()]));
}
