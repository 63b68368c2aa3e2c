/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Transaction and query locks.
//!
//! Every token releases on drop. `release` may be called earlier and is
//! idempotent. A thread that still holds a [`ReadLock`] must not ask for the
//! [`WriteLock`] of the same manager: the write side waits for all readers.

use crate::error::{Result, StoreError};
use log::trace;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Default)]
struct ExclusiveState {
    held: Mutex<bool>,
    released: Condvar,
}

/// Serializes writers: at most one transaction is open at a time.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveLockManager {
    state: Arc<ExclusiveState>,
}

impl ExclusiveLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock is free.
    pub fn acquire(&self) -> Result<ExclusiveLock> {
        let mut held = self
            .state
            .held
            .lock()
            .map_err(|_| StoreError::LockPoisoned("transaction lock"))?;
        while *held {
            held = self
                .state
                .released
                .wait(held)
                .map_err(|_| StoreError::LockPoisoned("transaction lock"))?;
        }
        *held = true;
        Ok(ExclusiveLock {
            state: Some(Arc::clone(&self.state)),
        })
    }

    /// Returns `None` instead of blocking when the lock is taken.
    pub fn try_acquire(&self) -> Result<Option<ExclusiveLock>> {
        let mut held = self
            .state
            .held
            .lock()
            .map_err(|_| StoreError::LockPoisoned("transaction lock"))?;
        if *held {
            return Ok(None);
        }
        *held = true;
        Ok(Some(ExclusiveLock {
            state: Some(Arc::clone(&self.state)),
        }))
    }

    pub fn is_locked(&self) -> bool {
        self.state.held.lock().map(|held| *held).unwrap_or(true)
    }
}

#[derive(Debug)]
pub struct ExclusiveLock {
    state: Option<Arc<ExclusiveState>>,
}

impl ExclusiveLock {
    pub fn release(&mut self) {
        if let Some(state) = self.state.take() {
            // A poisoned flag is still reset so waiters can make progress
            let mut held = state.held.lock().unwrap_or_else(|e| e.into_inner());
            *held = false;
            state.released.notify_one();
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Default)]
struct RwCounts {
    readers: usize,
    writer: bool,
}

#[derive(Debug, Default)]
struct RwState {
    counts: Mutex<RwCounts>,
    changed: Condvar,
}

/// Multi-reader, single-writer lock that lets new readers in while a writer
/// is waiting.
#[derive(Debug, Clone, Default)]
pub struct ReadWriteLockManager {
    state: Arc<RwState>,
}

impl ReadWriteLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> Result<ReadLock> {
        let mut counts = self
            .state
            .counts
            .lock()
            .map_err(|_| StoreError::LockPoisoned("query lock"))?;
        while counts.writer {
            counts = self
                .state
                .changed
                .wait(counts)
                .map_err(|_| StoreError::LockPoisoned("query lock"))?;
        }
        counts.readers += 1;
        trace!("read lock acquired, {} active readers", counts.readers);
        Ok(ReadLock {
            state: Some(Arc::clone(&self.state)),
        })
    }

    pub fn write(&self) -> Result<WriteLock> {
        let mut counts = self
            .state
            .counts
            .lock()
            .map_err(|_| StoreError::LockPoisoned("query lock"))?;
        while counts.writer || counts.readers > 0 {
            counts = self
                .state
                .changed
                .wait(counts)
                .map_err(|_| StoreError::LockPoisoned("query lock"))?;
        }
        counts.writer = true;
        trace!("write lock acquired");
        Ok(WriteLock {
            state: Some(Arc::clone(&self.state)),
        })
    }

    /// Number of read tokens currently alive.
    pub fn active_readers(&self) -> usize {
        self.state
            .counts
            .lock()
            .map(|c| c.readers)
            .unwrap_or_else(|e| e.into_inner().readers)
    }

    pub fn is_write_locked(&self) -> bool {
        self.state
            .counts
            .lock()
            .map(|c| c.writer)
            .unwrap_or_else(|e| e.into_inner().writer)
    }
}

#[derive(Debug)]
pub struct ReadLock {
    state: Option<Arc<RwState>>,
}

impl ReadLock {
    pub fn release(&mut self) {
        if let Some(state) = self.state.take() {
            let mut counts = state.counts.lock().unwrap_or_else(|e| e.into_inner());
            counts.readers = counts.readers.saturating_sub(1);
            if counts.readers == 0 {
                state.changed.notify_all();
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }
}

impl Drop for ReadLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug)]
pub struct WriteLock {
    state: Option<Arc<RwState>>,
}

impl WriteLock {
    pub fn release(&mut self) {
        if let Some(state) = self.state.take() {
            let mut counts = state.counts.lock().unwrap_or_else(|e| e.into_inner());
            counts.writer = false;
            state.changed.notify_all();
        }
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        self.release();
    }
}
