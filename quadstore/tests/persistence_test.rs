/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use quadstore::storage::file_io::DATA_FILE_NAME;
use quadstore::{MemoryStore, StoreConfig, StoreConnection, StoreError};
use shared::quad::Statement;
use shared::terms::{Term, XSD_INTEGER};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn ex(name: &str) -> Term {
    Term::iri(format!("http://example.org/{}", name))
}

fn all_statements(con: &StoreConnection) -> BTreeSet<Statement> {
    con.get_statements(None, None, None, true, &[])
        .unwrap()
        .collect::<Result<BTreeSet<_>, _>>()
        .unwrap()
}

fn add_one(store: &MemoryStore, object: &str) {
    let mut con = store.connection().unwrap();
    con.begin().unwrap();
    con.add_statement(&ex("s"), &ex("p"), &ex(object), None).unwrap();
    con.commit().unwrap();
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn modified(dir: &Path) -> std::time::SystemTime {
    fs::metadata(dir.join(DATA_FILE_NAME))
        .and_then(|m| m.modified())
        .unwrap()
}

#[test]
fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let expected = {
        let store = MemoryStore::open(StoreConfig::persistent(dir.path())).unwrap();
        let mut con = store.connection().unwrap();
        con.begin().unwrap();
        con.add_statement(&ex("a"), &ex("name"), &Term::lang_literal("Anne", "en"), None)
            .unwrap();
        con.add_statement(&ex("a"), &ex("age"), &Term::typed_literal("42", XSD_INTEGER), Some(&ex("g")))
            .unwrap();
        con.add_statement(&Term::blank("b0"), &ex("label"), &Term::literal("plain"), Some(&Term::blank("ctx")))
            .unwrap();
        con.add_inferred_statement(&ex("a"), &ex("type"), &ex("Person"), None).unwrap();
        con.add_inferred_statement(&ex("a"), &ex("type"), &ex("Agent"), Some(&ex("g"))).unwrap();
        con.commit().unwrap();
        con.set_namespace("ex", "http://example.org/").unwrap();
        let expected = all_statements(&con);
        drop(con);
        store.shut_down().unwrap();
        expected
    };

    let store = MemoryStore::open(StoreConfig::persistent(dir.path())).unwrap();
    let con = store.connection().unwrap();
    assert_eq!(all_statements(&con), expected);
    assert_eq!(con.size(&[]).unwrap(), 3);
    assert_eq!(con.get_namespace("ex").unwrap().as_deref(), Some("http://example.org/"));
}

#[test]
fn test_missing_data_file_is_created() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("nested").join("store");
    let store = MemoryStore::open(StoreConfig::persistent(&data_dir)).unwrap();
    assert!(data_dir.join(DATA_FILE_NAME).exists());
    assert_eq!(store.connection().unwrap().size(&[]).unwrap(), 0);
}

#[test]
fn test_empty_data_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(DATA_FILE_NAME), b"").unwrap();
    let store = MemoryStore::open(StoreConfig::persistent(dir.path())).unwrap();
    assert_eq!(store.connection().unwrap().size(&[]).unwrap(), 0);
}

#[test]
fn test_corrupt_data_file_fails_to_open() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(DATA_FILE_NAME), b"NOPE\x02garbage").unwrap();
    let result = MemoryStore::open(StoreConfig::persistent(dir.path()));
    assert!(matches!(result, Err(StoreError::CorruptSnapshot(_))));
}

#[test]
fn test_future_version_fails_to_open() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(DATA_FILE_NAME), b"BMSF\x09").unwrap();
    let result = MemoryStore::open(StoreConfig::persistent(dir.path()));
    assert!(matches!(
        result,
        Err(StoreError::UnsupportedVersion { found: 9, .. })
    ));
}

#[test]
fn test_zero_delay_syncs_on_commit() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(StoreConfig::persistent(dir.path())).unwrap();
    add_one(&store, "o1");
    assert!(!store.has_unsynced_changes());

    // Read the file from a second, volatile look at the directory
    let snapshot = quadstore::storage::file_io::FileIo::new(dir.path())
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.statements.len(), 1);
}

#[test]
fn test_negative_delay_syncs_only_at_shutdown() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(StoreConfig::persistent(dir.path()).with_sync_delay(-1)).unwrap();
    let initial = modified(dir.path());
    add_one(&store, "o1");
    assert!(store.has_unsynced_changes());
    assert_eq!(modified(dir.path()), initial);

    store.shut_down().unwrap();
    assert!(!store.has_unsynced_changes());
    let reopened = MemoryStore::open(StoreConfig::persistent(dir.path())).unwrap();
    assert_eq!(reopened.connection().unwrap().size(&[]).unwrap(), 1);
}

#[test]
fn test_positive_delay_syncs_later() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(StoreConfig::persistent(dir.path()).with_sync_delay(50)).unwrap();
    add_one(&store, "o1");
    assert!(wait_for(|| !store.has_unsynced_changes()));
}

#[test]
fn test_begin_postpones_pending_sync() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(StoreConfig::persistent(dir.path()).with_sync_delay(300)).unwrap();
    add_one(&store, "o1");

    let mut con = store.connection().unwrap();
    con.begin().unwrap();
    thread::sleep(Duration::from_millis(600));
    assert!(store.has_unsynced_changes());

    con.add_statement(&ex("s"), &ex("p"), &ex("o2"), None).unwrap();
    con.commit().unwrap();
    assert!(wait_for(|| !store.has_unsynced_changes()));
}

#[test]
fn test_explicit_sync() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(StoreConfig::persistent(dir.path()).with_sync_delay(-1)).unwrap();
    add_one(&store, "o1");
    store.sync().unwrap();
    assert!(!store.has_unsynced_changes());
}

#[test]
fn test_in_memory_store_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        data_dir: Some(dir.path().to_path_buf()),
        persist: false,
        ..StoreConfig::default()
    };
    let store = MemoryStore::open(config).unwrap();
    add_one(&store, "o1");
    store.shut_down().unwrap();
    assert!(!dir.path().join(DATA_FILE_NAME).exists());
}
