/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::error::{Result, StoreError};
use crate::evaluation::{BindingIter, EvaluationStrategy};
use crate::memory_store::StoreInner;
use crate::optimizer;
use crate::storage::cursor::StatementCursor;
use crate::storage::lock_manager::{ExclusiveLock, ReadLock};
use crate::storage::statement_index::Graph;
use crate::storage::txn_status::ReadMode;
use log::{debug, error, trace, warn};
use shared::algebra::{Dataset, TupleExpr};
use shared::binding::BindingSet;
use shared::terms::Term;
use std::fmt;
use std::sync::Arc;

/// Lazy query solutions. Holds a query read lock until exhausted, closed or
/// dropped.
pub struct QueryResult {
    inner: Option<BindingIter>,
    lock: Option<ReadLock>,
}

impl QueryResult {
    pub fn close(&mut self) {
        // Nested cursors go first, then our own token
        self.inner = None;
        if let Some(mut lock) = self.lock.take() {
            lock.release();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock.is_none()
    }
}

impl Iterator for QueryResult {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.as_mut()?.next() {
            None => {
                self.close();
                None
            }
            Some(Err(e)) => {
                self.close();
                Some(Err(e))
            }
            item => item,
        }
    }
}

impl Drop for QueryResult {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A session on a [`MemoryStore`](crate::MemoryStore).
///
/// Reads see committed data, or the connection's own pending changes while
/// it holds the transaction. All writes need an open transaction; a
/// connection dropped mid-transaction rolls back.
///
/// Cursors and query results hold the query read lock. Close them before
/// calling `commit` or `rollback` from the same thread, otherwise the
/// commit waits for them forever.
pub struct StoreConnection {
    store: Arc<StoreInner>,
    txn: Option<ExclusiveLock>,
    closed: bool,
}

impl StoreConnection {
    pub(crate) fn new(store: Arc<StoreInner>) -> Self {
        StoreConnection {
            store,
            txn: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(StoreError::ConnectionClosed);
        }
        self.store.ensure_open()
    }

    fn read_mode(&self) -> ReadMode {
        if self.txn.is_some() {
            ReadMode::Transaction
        } else {
            ReadMode::Committed
        }
    }

    pub fn is_active(&self) -> bool {
        self.txn.is_some()
    }

    pub fn begin(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.txn.is_some() {
            return Err(StoreError::TransactionAlreadyActive);
        }
        let lock = self.store.txn_lock.acquire()?;
        self.store.cancel_sync();
        self.txn = Some(lock);
        trace!("Transaction started");
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.txn.is_none() {
            return Err(StoreError::NoActiveTransaction);
        }
        let summary = {
            let _write = self.store.query_lock().write()?;
            let mut graph = self.store.source.graph().write()?;
            graph.commit()
        };
        if let Some(mut lock) = self.txn.take() {
            lock.release();
        }
        debug!(
            "Transaction committed (added: {}, removed: {})",
            summary.added, summary.removed
        );
        self.store.committed(summary)
    }

    pub fn rollback(&mut self) -> Result<()> {
        let Some(mut lock) = self.txn.take() else {
            return Err(StoreError::NoActiveTransaction);
        };
        debug!("Rolling back transaction");
        let result = (|| -> Result<usize> {
            let _write = self.store.query_lock().write()?;
            let mut graph = self.store.source.graph().write()?;
            Ok(graph.rollback())
        })();
        lock.release();
        let reverted = result?;
        trace!("Reverted {} statements", reverted);
        Ok(())
    }

    fn write<T>(&mut self, f: impl FnOnce(&mut Graph) -> T) -> Result<T> {
        self.ensure_open()?;
        if self.txn.is_none() {
            return Err(StoreError::NoActiveTransaction);
        }
        let mut graph = self.store.source.graph().write()?;
        Ok(f(&mut graph))
    }

    fn check_statement(subject: &Term, predicate: &Term, context: Option<&Term>) -> Result<()> {
        if !subject.is_resource() {
            return Err(StoreError::InvalidArgument(format!(
                "subject must be an IRI or blank node, got {}",
                subject
            )));
        }
        if !predicate.is_iri() {
            return Err(StoreError::InvalidArgument(format!(
                "predicate must be an IRI, got {}",
                predicate
            )));
        }
        if let Some(ctx) = context.filter(|c| !c.is_resource()) {
            return Err(StoreError::InvalidArgument(format!(
                "context must be an IRI or blank node, got {}",
                ctx
            )));
        }
        Ok(())
    }

    /// Adds an explicit statement. Returns whether the store changed.
    pub fn add_statement(
        &mut self,
        subject: &Term,
        predicate: &Term,
        object: &Term,
        context: Option<&Term>,
    ) -> Result<bool> {
        Self::check_statement(subject, predicate, context)?;
        self.write(|graph| graph.add(subject, predicate, object, context, true))
    }

    pub fn add_inferred_statement(
        &mut self,
        subject: &Term,
        predicate: &Term,
        object: &Term,
        context: Option<&Term>,
    ) -> Result<bool> {
        Self::check_statement(subject, predicate, context)?;
        self.write(|graph| graph.add(subject, predicate, object, context, false))
    }

    /// Removes the explicit statements matching the pattern. An empty
    /// context list matches every context; `None` in the list is the default
    /// graph.
    pub fn remove_statements(
        &mut self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        contexts: &[Option<Term>],
    ) -> Result<usize> {
        self.write(|graph| graph.remove(subject, predicate, object, contexts, true))
    }

    pub fn remove_inferred_statements(
        &mut self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        contexts: &[Option<Term>],
    ) -> Result<usize> {
        self.write(|graph| graph.remove(subject, predicate, object, contexts, false))
    }

    /// Removes every explicit statement in the given contexts (all of them
    /// when empty).
    pub fn clear(&mut self, contexts: &[Option<Term>]) -> Result<usize> {
        self.remove_statements(None, None, None, contexts)
    }

    pub fn get_statements(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        include_inferred: bool,
        contexts: &[Option<Term>],
    ) -> Result<StatementCursor> {
        self.ensure_open()?;
        self.store.source.statements(
            subject,
            predicate,
            object,
            contexts,
            !include_inferred,
            self.read_mode(),
        )
    }

    /// Number of explicit statements in the given contexts.
    pub fn size(&self, contexts: &[Option<Term>]) -> Result<usize> {
        let mut count = 0;
        for st in self.get_statements(None, None, None, false, contexts)? {
            st?;
            count += 1;
        }
        Ok(count)
    }

    pub fn context_ids(&self) -> Result<Vec<Term>> {
        self.ensure_open()?;
        let _read = self.store.query_lock().read()?;
        let graph = self.store.source.graph().read()?;
        Ok(graph.context_ids(self.read_mode()))
    }

    /// Evaluates an algebra tree. `bindings` are fixed values for variables
    /// of the tree and appear in every solution.
    pub fn evaluate(
        &self,
        expr: &TupleExpr,
        dataset: &Dataset,
        bindings: &BindingSet,
        include_inferred: bool,
    ) -> Result<QueryResult> {
        self.ensure_open()?;
        trace!("Incoming query model: {:?}", expr);

        let lock = self.store.query_lock().read()?;
        let optimized = {
            let graph = self.store.source.graph().read()?;
            optimizer::optimize(expr, dataset, bindings, &*graph)
        };
        trace!("Optimized query model: {:?}", optimized);

        let strategy = EvaluationStrategy::new(
            self.store.source.clone(),
            dataset.clone(),
            self.read_mode(),
            include_inferred,
            self.store.config.evaluation.clone(),
        );
        let inner = strategy.evaluate(&Arc::new(optimized), bindings)?;
        Ok(QueryResult {
            inner: Some(inner),
            lock: Some(lock),
        })
    }

    pub fn get_namespace(&self, prefix: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        Ok(self.store.namespaces.read()?.get(prefix).map(str::to_string))
    }

    /// All prefix/name pairs, ordered by prefix.
    pub fn namespaces(&self) -> Result<Vec<(String, String)>> {
        self.ensure_open()?;
        let namespaces = self.store.namespaces.read()?;
        Ok(namespaces
            .iter()
            .map(|(p, n)| (p.to_string(), n.to_string()))
            .collect())
    }

    // Namespace changes take effect immediately, outside any transaction.
    pub fn set_namespace(&self, prefix: &str, name: &str) -> Result<()> {
        self.ensure_open()?;
        if self.store.namespaces.write()?.set(prefix, name)? {
            self.store.mark_changed();
        }
        Ok(())
    }

    pub fn remove_namespace(&self, prefix: &str) -> Result<()> {
        self.ensure_open()?;
        if self.store.namespaces.write()?.remove(prefix) {
            self.store.mark_changed();
        }
        Ok(())
    }

    pub fn clear_namespaces(&self) -> Result<()> {
        self.ensure_open()?;
        if self.store.namespaces.write()?.clear() {
            self.store.mark_changed();
        }
        Ok(())
    }

    /// Rolls back an open transaction and closes the connection.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.txn.is_some() {
            warn!("Closing connection with an active transaction, rolling back");
            self.rollback()?;
        }
        Ok(())
    }
}

impl Drop for StoreConnection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to roll back transaction of dropped connection: {}", e);
        }
    }
}

impl fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConnection")
            .field("active", &self.is_active())
            .field("closed", &self.closed)
            .finish()
    }
}
