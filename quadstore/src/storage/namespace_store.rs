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
use std::collections::BTreeMap;

/// Prefix to namespace name mapping, kept in prefix order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceStore {
    namespaces: BTreeMap<String, String>,
}

impl NamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// Returns whether the mapping changed.
    pub fn set(&mut self, prefix: &str, name: &str) -> Result<bool> {
        if name.is_empty() {
            return Err(StoreError::InvalidArgument(format!(
                "empty namespace name for prefix '{}'",
                prefix
            )));
        }
        let previous = self.namespaces.insert(prefix.to_string(), name.to_string());
        Ok(previous.as_deref() != Some(name))
    }

    pub fn remove(&mut self, prefix: &str) -> bool {
        self.namespaces.remove(prefix).is_some()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.namespaces.is_empty();
        self.namespaces.clear();
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces
            .iter()
            .map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}
