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
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What `MIN`/`MAX` produce when no value of the group parses as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyExtremum {
    /// Leave the aggregate unbound.
    #[default]
    Unbound,
    /// Emit the running sentinel, `INF` for `MIN` and `-INF` for `MAX`.
    Infinity,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    pub empty_extremum: EmptyExtremum,
    /// Group output keeps first-seen order instead of hash order.
    pub ordered_groups: bool,
}

/// Store configuration, loadable from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: Option<PathBuf>,
    pub persist: bool,
    /// `0` syncs after every commit, a positive value defers the sync by that
    /// many milliseconds, a negative value syncs only on shutdown.
    pub sync_delay_ms: i64,
    pub evaluation: EvaluationOptions,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_dir: None,
            persist: true,
            sync_delay_ms: 0,
            evaluation: EvaluationOptions::default(),
        }
    }
}

impl StoreConfig {
    /// A volatile store: nothing is read from or written to disk.
    pub fn in_memory() -> Self {
        StoreConfig {
            persist: false,
            ..Self::default()
        }
    }

    pub fn persistent(data_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    pub fn with_sync_delay(mut self, millis: i64) -> Self {
        self.sync_delay_ms = millis;
        self
    }

    pub fn with_empty_extremum(mut self, policy: EmptyExtremum) -> Self {
        self.evaluation.empty_extremum = policy;
        self
    }

    pub fn with_ordered_groups(mut self, ordered: bool) -> Self {
        self.evaluation.ordered_groups = ordered;
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Whether snapshots are read and written.
    pub fn is_persistent(&self) -> bool {
        self.persist && self.data_dir.is_some()
    }
}
