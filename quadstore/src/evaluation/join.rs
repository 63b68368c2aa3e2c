/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::strategy::{BindingIter, EvaluationStrategy};
use crate::error::Result;
use shared::algebra::TupleExpr;
use shared::binding::BindingSet;
use std::sync::Arc;

/// Nested-loop join: the right operand is evaluated once per left solution,
/// with that solution as its input bindings.
pub struct JoinIterator {
    strategy: EvaluationStrategy,
    left: BindingIter,
    right_expr: Arc<TupleExpr>,
    right: Option<BindingIter>,
}

impl JoinIterator {
    pub fn new(strategy: EvaluationStrategy, left: BindingIter, right_expr: Arc<TupleExpr>) -> Self {
        JoinIterator {
            strategy,
            left,
            right_expr,
            right: None,
        }
    }
}

impl Iterator for JoinIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(right) = self.right.as_mut() {
                match right.next() {
                    Some(item) => return Some(item),
                    // Exhausted right cursors are dropped right away
                    None => self.right = None,
                }
            }

            match self.left.next()? {
                Ok(left) => match self.strategy.evaluate(&self.right_expr, &left) {
                    Ok(right) => self.right = Some(right),
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
