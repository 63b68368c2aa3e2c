/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod cursor;
pub mod file_io;
pub mod lock_manager;
pub mod namespace_store;
pub mod statement_index;
pub mod statement_list;
pub mod sync_timer;
pub mod txn_status;

use crate::error::{Result, StoreError};
use cursor::StatementCursor;
use lock_manager::ReadWriteLockManager;
use shared::terms::Term;
use statement_index::Graph;
use std::sync::{Arc, RwLock};
use txn_status::ReadMode;

/// Read access to the index: hands out cursors that each hold a query read
/// lock.
#[derive(Debug, Clone)]
pub struct StatementSource {
    graph: Arc<RwLock<Graph>>,
    query_lock: ReadWriteLockManager,
}

impl StatementSource {
    pub fn new(graph: Arc<RwLock<Graph>>, query_lock: ReadWriteLockManager) -> Self {
        StatementSource { graph, query_lock }
    }

    pub fn graph(&self) -> &Arc<RwLock<Graph>> {
        &self.graph
    }

    pub fn query_lock(&self) -> &ReadWriteLockManager {
        &self.query_lock
    }

    pub fn statements(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        contexts: &[Option<Term>],
        explicit_only: bool,
        mode: ReadMode,
    ) -> Result<StatementCursor> {
        let lock = self.query_lock.read()?;
        let plan = {
            let graph = self
                .graph
                .read()
                .map_err(|_| StoreError::LockPoisoned("statement index"))?;
            graph.plan(subject, predicate, object, contexts, explicit_only, mode)
        };
        Ok(StatementCursor::new(Arc::clone(&self.graph), plan, lock))
    }
}
