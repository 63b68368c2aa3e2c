/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crossbeam::channel::{unbounded, RecvTimeoutError, Sender};
use log::debug;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

enum SyncCommand {
    Schedule(Duration),
    Cancel,
    Shutdown,
}

/// Background worker running a sync task once a scheduled delay expires.
///
/// Scheduling while a run is already pending keeps the earlier deadline.
/// Cancelling drops the pending run.
#[derive(Debug)]
pub struct SyncTimer {
    sender: Sender<SyncCommand>,
    handle: Option<JoinHandle<()>>,
    worker: ThreadId,
}

impl SyncTimer {
    pub fn spawn<F>(task: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (sender, receiver) = unbounded::<SyncCommand>();
        let handle = thread::spawn(move || {
            let mut deadline: Option<Instant> = None;
            loop {
                let command = match deadline {
                    Some(at) => {
                        let remaining = at.saturating_duration_since(Instant::now());
                        match receiver.recv_timeout(remaining) {
                            Ok(command) => command,
                            Err(RecvTimeoutError::Timeout) => {
                                deadline = None;
                                debug!("Sync delay elapsed, running sync task");
                                task();
                                continue;
                            }
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    None => match receiver.recv() {
                        Ok(command) => command,
                        Err(_) => break,
                    },
                };
                match command {
                    SyncCommand::Schedule(delay) => {
                        if deadline.is_none() {
                            deadline = Some(Instant::now() + delay);
                        }
                    }
                    SyncCommand::Cancel => deadline = None,
                    SyncCommand::Shutdown => break,
                }
            }
            debug!("Sync timer: shutdown complete");
        });
        let worker = handle.thread().id();
        SyncTimer {
            sender,
            handle: Some(handle),
            worker,
        }
    }

    pub fn schedule(&self, delay: Duration) {
        // A closed channel means the worker is gone; nothing left to run
        let _ = self.sender.send(SyncCommand::Schedule(delay));
    }

    pub fn cancel(&self) {
        let _ = self.sender.send(SyncCommand::Cancel);
    }

    /// Stops the worker without running a pending task.
    pub fn shutdown(&mut self) {
        let _ = self.sender.send(SyncCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            // The task itself may end up dropping the store
            if thread::current().id() != self.worker {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for SyncTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
