/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::io;
use thiserror::Error;

/// Errors surfaced by the store. All of them abort the operation that
/// raised them; an open transaction is left for the caller to roll back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("unsupported snapshot version {found}, expected at most {supported}")]
    UnsupportedVersion { found: u8, supported: u8 },

    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("store has been shut down")]
    ShutDown,

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("no active transaction")]
    NoActiveTransaction,

    #[error("a transaction is already active on this connection")]
    TransactionAlreadyActive,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Signals that a value expression could not be computed for a solution
/// (type error, unbound variable). Consumers treat it as "false" or skip
/// the row; it never terminates a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Default)]
#[error("expression evaluation failed")]
pub struct ExprError;

pub type ExprResult<T> = std::result::Result<T, ExprError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned("store state")
    }
}
