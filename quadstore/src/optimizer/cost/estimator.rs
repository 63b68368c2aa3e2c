/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::storage::statement_index::Position;
use shared::algebra::{StatementPattern, Var};
use shared::terms::Term;
use std::collections::BTreeSet;

/// Statistics the estimator reads from the index.
pub trait CardinalitySource {
    fn total_statements(&self) -> usize;

    /// Size of the adjacency list of `term` at `position`, or `None` when
    /// the term was never interned.
    fn list_size(&self, term: &Term, position: Position) -> Option<usize>;
}

/// Heuristic cardinality of statement patterns, used to order joins.
/// Only the relative order of estimates matters.
pub struct CardinalityEstimator<'a> {
    source: &'a dyn CardinalitySource,
}

impl<'a> CardinalityEstimator<'a> {
    /// Creates a new estimator over the given statistics
    pub fn new(source: &'a dyn CardinalitySource) -> Self {
        Self { source }
    }

    /// Estimates the number of results of `pattern` once the variables in
    /// `bound_vars` are bound by preceding join operands.
    pub fn estimate(&self, pattern: &StatementPattern, bound_vars: &BTreeSet<String>) -> f64 {
        let mut min_list: Option<usize> = None;
        let mut constant_count = 0usize;
        let mut bound_var_count = 0usize;

        for (var, position) in Self::positions(pattern) {
            match &var.value {
                Some(value) => {
                    constant_count += 1;
                    match self.source.list_size(value, position) {
                        Some(size) => {
                            min_list = Some(min_list.map_or(size, |m| m.min(size)));
                        }
                        // Unknown term, the pattern cannot match
                        None => return 0.0,
                    }
                }
                None => {
                    if bound_vars.contains(&var.name) {
                        bound_var_count += 1;
                    }
                }
            }
        }

        match min_list {
            None => {
                let total = self.source.total_statements() as f64;
                if bound_var_count > 1 {
                    total.powf(1.0 / (2 * bound_var_count) as f64)
                } else {
                    total
                }
            }
            Some(size) => {
                let sqrt_factor = 2 * bound_var_count + constant_count.saturating_sub(1);
                let size = size as f64;
                if sqrt_factor > 1 {
                    size.powf(1.0 / sqrt_factor as f64)
                } else {
                    size
                }
            }
        }
    }

    fn positions(pattern: &StatementPattern) -> impl Iterator<Item = (&Var, Position)> {
        [
            (&pattern.subject, Position::Subject),
            (&pattern.predicate, Position::Predicate),
            (&pattern.object, Position::Object),
        ]
        .into_iter()
        .chain(pattern.context.as_ref().map(|c| (c, Position::Context)))
    }
}
