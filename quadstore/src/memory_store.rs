/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::config::StoreConfig;
use crate::connection::StoreConnection;
use crate::error::{Result, StoreError};
use crate::storage::file_io::FileIo;
use crate::storage::lock_manager::{ExclusiveLockManager, ReadWriteLockManager};
use crate::storage::namespace_store::NamespaceStore;
use crate::storage::statement_index::{CommitSummary, Graph};
use crate::storage::sync_timer::SyncTimer;
use crate::storage::StatementSource;
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, error, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// What a committed transaction changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChangedEvent {
    pub statements_added: bool,
    pub statements_removed: bool,
}

/// Callback invoked after every commit that added or removed statements.
/// Runs on the committing thread.
pub trait StoreListener: Send + Sync {
    fn store_changed(&self, event: &StoreChangedEvent);
}

/// State shared by the store handle, its connections and the sync worker.
pub(crate) struct StoreInner {
    pub(crate) source: StatementSource,
    pub(crate) namespaces: RwLock<NamespaceStore>,
    pub(crate) txn_lock: ExclusiveLockManager,
    pub(crate) config: StoreConfig,
    listeners: RwLock<Vec<Arc<dyn StoreListener>>>,
    subscribers: Mutex<Vec<Sender<StoreChangedEvent>>>,
    file_io: Option<FileIo>,
    contents_changed: AtomicBool,
    sync_lock: Mutex<()>,
    sync_timer: Mutex<Option<SyncTimer>>,
    shut_down: AtomicBool,
}

impl fmt::Debug for StoreInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreInner")
            .field("config", &self.config)
            .field("file_io", &self.file_io)
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish()
    }
}

impl StoreInner {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            Err(StoreError::ShutDown)
        } else {
            Ok(())
        }
    }

    pub(crate) fn query_lock(&self) -> &ReadWriteLockManager {
        self.source.query_lock()
    }

    pub(crate) fn mark_changed(&self) {
        self.contents_changed.store(true, Ordering::SeqCst);
    }

    /// Called when a transaction starts; a pending deferred sync waits for
    /// the next commit.
    pub(crate) fn cancel_sync(&self) {
        if let Ok(timer) = self.sync_timer.lock() {
            if let Some(timer) = timer.as_ref() {
                timer.cancel();
            }
        }
    }

    /// Bookkeeping after the index committed: flags the contents for the next
    /// sync, notifies listeners and runs or schedules the sync.
    pub(crate) fn committed(&self, summary: CommitSummary) -> Result<()> {
        if summary.changed {
            self.mark_changed();
        }
        if summary.added || summary.removed {
            self.notify(StoreChangedEvent {
                statements_added: summary.added,
                statements_removed: summary.removed,
            });
        }
        if summary.changed {
            self.schedule_sync()?;
        }
        Ok(())
    }

    fn notify(&self, event: StoreChangedEvent) {
        match self.listeners.read() {
            Ok(listeners) => {
                for listener in listeners.iter() {
                    listener.store_changed(&event);
                }
            }
            Err(_) => warn!("Listener registry poisoned, skipping notification"),
        }
        if let Ok(mut subscribers) = self.subscribers.lock() {
            // Dropped receivers unsubscribe
            subscribers.retain(|tx| tx.send(event).is_ok());
        }
    }

    fn schedule_sync(&self) -> Result<()> {
        if self.file_io.is_none() {
            return Ok(());
        }
        match self.config.sync_delay_ms {
            0 => self.sync(),
            delay if delay > 0 => {
                if let Some(timer) = self.sync_timer.lock()?.as_ref() {
                    timer.schedule(Duration::from_millis(delay as u64));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Writes the committed contents to disk when they changed since the
    /// last sync.
    pub(crate) fn sync(&self) -> Result<()> {
        let Some(file_io) = self.file_io.as_ref() else {
            return Ok(());
        };
        let _sync = self.sync_lock.lock()?;
        if !self.contents_changed.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        debug!("Syncing data to {}", file_io.data_file().display());
        let result = (|| -> Result<()> {
            // The read lock keeps commits out while the snapshot is taken
            let _read = self.query_lock().read()?;
            let statements: Vec<_> = self.source.graph().read()?.committed_statements().collect();
            let namespaces = self.namespaces.read()?.clone();
            file_io.write(&namespaces, statements.into_iter())
        })();

        if let Err(e) = &result {
            error!("Failed to sync to file: {}", e);
            self.mark_changed();
        }
        result
    }

    fn shut_down(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("Shutting down MemoryStore");
        let timer = self.sync_timer.lock()?.take();
        if let Some(mut timer) = timer {
            timer.shutdown();
        }
        self.sync()
    }
}

/// In-memory quad store with optional snapshot persistence.
///
/// Dropping the store shuts it down, which writes pending changes.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// A volatile store.
    pub fn new() -> Self {
        Self::build(StoreConfig::in_memory(), Graph::new(), NamespaceStore::new(), None)
    }

    /// Opens a store, loading the snapshot of a persistent configuration.
    /// A missing data file is created; a malformed one is a fatal error.
    pub fn open(config: StoreConfig) -> Result<Self> {
        debug!("Initializing MemoryStore...");
        let mut graph = Graph::new();
        let mut namespaces = NamespaceStore::new();

        let file_io = match (&config.data_dir, config.persist) {
            (Some(dir), true) => Some(FileIo::new(dir)),
            (None, true) => {
                debug!("No data directory configured, store is not persisted");
                None
            }
            _ => None,
        };

        if let Some(io) = &file_io {
            if io.exists() {
                debug!("Reading data from {}...", io.data_file().display());
                if let Some(snapshot) = io.read()? {
                    for (prefix, name) in &snapshot.namespaces {
                        namespaces.set(prefix, name)?;
                    }
                    for st in &snapshot.statements {
                        graph.insert_committed(
                            &st.subject,
                            &st.predicate,
                            &st.object,
                            st.context.as_ref(),
                            st.explicit,
                        );
                    }
                }
            } else {
                debug!("Initializing data file {}", io.data_file().display());
                io.write(&namespaces, std::iter::empty())?;
            }
        }

        let store = Self::build(config, graph, namespaces, file_io);
        store.start_sync_timer();
        debug!("MemoryStore initialized with {} statements", store.inner.source.graph().read()?.len());
        Ok(store)
    }

    fn build(
        config: StoreConfig,
        graph: Graph,
        namespaces: NamespaceStore,
        file_io: Option<FileIo>,
    ) -> Self {
        let source = StatementSource::new(Arc::new(RwLock::new(graph)), ReadWriteLockManager::new());
        MemoryStore {
            inner: Arc::new(StoreInner {
                source,
                namespaces: RwLock::new(namespaces),
                txn_lock: ExclusiveLockManager::new(),
                config,
                listeners: RwLock::new(Vec::new()),
                subscribers: Mutex::new(Vec::new()),
                file_io,
                contents_changed: AtomicBool::new(false),
                sync_lock: Mutex::new(()),
                sync_timer: Mutex::new(None),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    fn start_sync_timer(&self) {
        if self.inner.file_io.is_none() || self.inner.config.sync_delay_ms <= 0 {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let timer = SyncTimer::spawn(move || {
            if let Some(inner) = weak.upgrade() {
                if let Err(e) = inner.sync() {
                    warn!("Unable to sync on timer: {}", e);
                }
            }
        });
        if let Ok(mut slot) = self.inner.sync_timer.lock() {
            *slot = Some(timer);
        }
    }

    pub fn connection(&self) -> Result<StoreConnection> {
        self.inner.ensure_open()?;
        Ok(StoreConnection::new(Arc::clone(&self.inner)))
    }

    pub fn add_listener(&self, listener: Arc<dyn StoreListener>) -> Result<()> {
        self.inner.listeners.write()?.push(listener);
        Ok(())
    }

    /// Change events as a channel. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Result<Receiver<StoreChangedEvent>> {
        let (tx, rx) = unbounded();
        self.inner.subscribers.lock()?.push(tx);
        Ok(rx)
    }

    pub fn sync(&self) -> Result<()> {
        self.inner.sync()
    }

    /// Stops the sync worker and writes pending changes. Later calls do
    /// nothing; connections opened before fail with `ShutDown`.
    pub fn shut_down(&self) -> Result<()> {
        self.inner.shut_down()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Read tokens currently held by open cursors and query results.
    pub fn active_readers(&self) -> usize {
        self.inner.query_lock().active_readers()
    }

    /// Whether committed changes have not been written to disk yet.
    pub fn has_unsynced_changes(&self) -> bool {
        self.inner.contents_changed.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Err(e) = self.inner.shut_down() {
            error!("Error while shutting down store: {}", e);
        }
    }
}
