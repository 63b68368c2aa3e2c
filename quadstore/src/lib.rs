/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! In-memory transactional quad store with an algebra evaluator.
//!
//! Statements live in a multi-index arena guarded by a transaction lock and
//! a reader-preferring query lock. Queries are operator trees from
//! [`shared::algebra`], rewritten by a cost-based optimizer and evaluated
//! lazily against the index.

pub mod config;
pub mod connection;
pub mod error;
pub mod evaluation;
pub mod memory_store;
pub mod optimizer;
pub mod storage;

pub use config::{EmptyExtremum, EvaluationOptions, StoreConfig};
pub use connection::{QueryResult, StoreConnection};
pub use error::{Result, StoreError};
pub use memory_store::{MemoryStore, StoreChangedEvent, StoreListener};
pub use storage::cursor::StatementCursor;
