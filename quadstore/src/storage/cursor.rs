/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::lock_manager::ReadLock;
use super::statement_index::{FindPlan, Graph};
use crate::error::{Result, StoreError};
use shared::quad::Statement;
use std::sync::{Arc, RwLock};

/// Lazy sequence of statements matching a lookup.
///
/// The cursor holds a query read lock until it is exhausted, closed or
/// dropped. The graph itself is only borrowed for the duration of each
/// `next` call.
#[derive(Debug)]
pub struct StatementCursor {
    graph: Arc<RwLock<Graph>>,
    plan: Option<FindPlan>,
    position: usize,
    lock: Option<ReadLock>,
}

impl StatementCursor {
    pub(crate) fn new(graph: Arc<RwLock<Graph>>, plan: Option<FindPlan>, lock: ReadLock) -> Self {
        StatementCursor {
            graph,
            plan,
            position: 0,
            lock: Some(lock),
        }
    }

    /// Releases the read lock. Safe to call more than once.
    pub fn close(&mut self) {
        self.plan = None;
        if let Some(mut lock) = self.lock.take() {
            lock.release();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock.is_none()
    }

    fn advance(&mut self) -> Result<Option<Statement>> {
        let Some(plan) = self.plan.as_ref() else {
            return Ok(None);
        };
        let graph = self
            .graph
            .read()
            .map_err(|_| StoreError::LockPoisoned("statement index"))?;
        let Some(list) = graph.list(plan.driver) else {
            return Ok(None);
        };
        while let Some(id) = list.get(self.position) {
            self.position += 1;
            if let Some(st) = graph.matching(id, &plan.pattern) {
                return Ok(graph.decode(st));
            }
        }
        Ok(None)
    }
}

impl Iterator for StatementCursor {
    type Item = Result<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(st)) => Some(Ok(st)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

impl Drop for StatementCursor {
    fn drop(&mut self) {
        self.close();
    }
}
