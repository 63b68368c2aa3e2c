/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use quadstore::MemoryStore;
use shared::algebra::{Dataset, TupleExpr, Var};
use shared::binding::BindingSet;
use shared::terms::Term;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const BATCH: usize = 10;

fn ex(name: &str) -> Term {
    Term::iri(format!("http://example.org/{}", name))
}

fn populated(n: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let mut con = store.connection().unwrap();
    con.begin().unwrap();
    for i in 0..n {
        con.add_statement(&ex(&format!("s{}", i)), &ex("p"), &ex(&format!("o{}", i)), None)
            .unwrap();
        con.add_statement(&ex(&format!("o{}", i)), &ex("q"), &Term::integer(i as i64), None)
            .unwrap();
    }
    con.commit().unwrap();
    store
}

#[test]
fn test_early_cursor_drop_releases_lock() {
    let store = populated(5);
    let con = store.connection().unwrap();

    let mut cursor = con.get_statements(None, None, None, false, &[]).unwrap();
    assert!(cursor.next().is_some());
    assert_eq!(store.active_readers(), 1);
    drop(cursor);
    assert_eq!(store.active_readers(), 0);

    let mut cursor = con.get_statements(Some(&ex("s1")), None, None, false, &[]).unwrap();
    cursor.close();
    cursor.close();
    assert_eq!(store.active_readers(), 0);
}

#[test]
fn test_partial_query_releases_all_locks() {
    let store = populated(5);
    let con = store.connection().unwrap();
    let tree = TupleExpr::join(
        TupleExpr::pattern(Var::new("s"), Var::constant(ex("p")), Var::new("o")),
        TupleExpr::pattern(Var::new("o"), Var::constant(ex("q")), Var::new("n")),
    );

    let mut result = con
        .evaluate(&tree, &Dataset::new(), &BindingSet::new(), false)
        .unwrap();
    assert!(result.next().is_some());
    assert!(store.active_readers() >= 1);
    drop(result);
    assert_eq!(store.active_readers(), 0);

    let count = con
        .evaluate(&tree, &Dataset::new(), &BindingSet::new(), false)
        .unwrap()
        .count();
    assert_eq!(count, 5);
    assert_eq!(store.active_readers(), 0);
}

#[test]
fn test_commit_waits_for_open_cursors() {
    let store = populated(3);
    let reader = store.connection().unwrap();
    let cursor = reader.get_statements(None, None, None, false, &[]).unwrap();

    let committed = Arc::new(AtomicBool::new(false));
    let writer = {
        let store = Arc::clone(&store);
        let committed = Arc::clone(&committed);
        thread::spawn(move || {
            let mut con = store.connection().unwrap();
            con.begin().unwrap();
            con.add_statement(&ex("x"), &ex("p"), &ex("y"), None).unwrap();
            con.commit().unwrap();
            committed.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(200));
    assert!(!committed.load(Ordering::SeqCst));
    drop(cursor);
    writer.join().unwrap();
    assert!(committed.load(Ordering::SeqCst));
    assert_eq!(reader.size(&[]).unwrap(), 7);
}

#[test]
fn test_writers_are_serialized() {
    let store = Arc::new(MemoryStore::new());
    let mut first = store.connection().unwrap();
    first.begin().unwrap();

    let started = Arc::new(AtomicBool::new(false));
    let second = {
        let store = Arc::clone(&store);
        let started = Arc::clone(&started);
        thread::spawn(move || {
            let mut con = store.connection().unwrap();
            con.begin().unwrap();
            started.store(true, Ordering::SeqCst);
            con.rollback().unwrap();
        })
    };

    thread::sleep(Duration::from_millis(200));
    assert!(!started.load(Ordering::SeqCst));
    first.rollback().unwrap();
    second.join().unwrap();
    assert!(started.load(Ordering::SeqCst));
}

#[test]
fn test_readers_never_see_partial_commits() {
    let store = Arc::new(MemoryStore::new());
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut con = store.connection().unwrap();
            for round in 0..30 {
                con.begin().unwrap();
                for i in 0..BATCH {
                    let s = ex(&format!("s{}_{}", round, i));
                    con.add_statement(&s, &ex("p"), &Term::integer(i as i64), None).unwrap();
                }
                con.commit().unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let con = store.connection().unwrap();
                while !done.load(Ordering::SeqCst) {
                    let size = con.size(&[]).unwrap();
                    assert_eq!(size % BATCH, 0, "observed a partial commit: {}", size);
                    // Leave the writer a gap to get the write lock
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.connection().unwrap().size(&[]).unwrap(), 30 * BATCH);
    assert_eq!(store.active_readers(), 0);
}
