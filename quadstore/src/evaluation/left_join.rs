/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Optional (left outer) join.

use super::strategy::{BindingIter, EvaluationStrategy};
use super::value_eval;
use crate::error::Result;
use log::trace;
use shared::algebra::{TupleExpr, ValueExpr};
use shared::binding::BindingSet;
use std::collections::BTreeSet;
use std::sync::Arc;

pub fn evaluate(
    strategy: &EvaluationStrategy,
    left: &Arc<TupleExpr>,
    right: &Arc<TupleExpr>,
    condition: Option<&ValueExpr>,
    bindings: &BindingSet,
) -> Result<BindingIter> {
    let left_names = left.binding_names();
    let right_names = right.binding_names();

    // Outer bindings for variables only the optional side mentions
    let problem_vars: BTreeSet<String> = bindings
        .names()
        .filter(|n| right_names.contains(*n) && !left_names.contains(*n))
        .map(str::to_string)
        .collect();

    let mut scope = left_names;
    scope.extend(right_names);
    let scope = Arc::new(scope);

    if problem_vars.is_empty() {
        let left_iter = strategy.evaluate(left, bindings)?;
        return Ok(Box::new(LeftJoinIterator::new(
            strategy.clone(),
            left_iter,
            Arc::clone(right),
            condition.cloned(),
            scope,
        )));
    }

    trace!("left join with outer bindings for {:?}", problem_vars);
    let mut reduced = bindings.clone();
    let mut removed = BindingSet::new();
    for name in &problem_vars {
        if let Some(value) = reduced.remove(name) {
            removed.insert(name.clone(), value);
        }
    }
    let left_iter = strategy.evaluate(left, &reduced)?;
    let inner = LeftJoinIterator::new(
        strategy.clone(),
        left_iter,
        Arc::clone(right),
        condition.cloned(),
        scope,
    );
    Ok(Box::new(inner.filter_map(move |item| match item {
        Ok(mut solution) => {
            if !solution.is_compatible(&removed) {
                return None;
            }
            solution.extend_from(&removed);
            Some(Ok(solution))
        }
        Err(e) => Some(Err(e)),
    })))
}

enum State {
    AdvanceLeft,
    DrainRight {
        left: BindingSet,
        right: BindingIter,
        matched: bool,
    },
    Done,
}

/// State machine over the left operand: for every left solution the right
/// operand is drained, and the left solution alone is emitted when no right
/// solution passed the condition.
pub struct LeftJoinIterator {
    strategy: EvaluationStrategy,
    left: BindingIter,
    right_expr: Arc<TupleExpr>,
    condition: Option<ValueExpr>,
    scope: Arc<BTreeSet<String>>,
    state: State,
}

impl LeftJoinIterator {
    pub fn new(
        strategy: EvaluationStrategy,
        left: BindingIter,
        right_expr: Arc<TupleExpr>,
        condition: Option<ValueExpr>,
        scope: Arc<BTreeSet<String>>,
    ) -> Self {
        LeftJoinIterator {
            strategy,
            left,
            right_expr,
            condition,
            scope,
            state: State::AdvanceLeft,
        }
    }
}

/// The condition only sees the variables of the left join itself.
fn condition_holds(
    condition: Option<&ValueExpr>,
    scope: &BTreeSet<String>,
    solution: &BindingSet,
) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    let mut scoped = solution.clone();
    scoped.retain(|name| scope.contains(name));
    value_eval::is_true(condition, &scoped).unwrap_or(false)
}

impl Iterator for LeftJoinIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                State::Done => return None,
                State::AdvanceLeft => match self.left.next() {
                    None => {
                        self.state = State::Done;
                        return None;
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    Some(Ok(left)) => match self.strategy.evaluate(&self.right_expr, &left) {
                        Ok(right) => {
                            self.state = State::DrainRight {
                                left,
                                right,
                                matched: false,
                            }
                        }
                        Err(e) => return Some(Err(e)),
                    },
                },
                State::DrainRight { right, matched, .. } => match right.next() {
                    Some(Ok(solution)) => {
                        if condition_holds(self.condition.as_ref(), &self.scope, &solution) {
                            *matched = true;
                            return Some(Ok(solution));
                        }
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        let unmatched = !*matched;
                        // Dropping the state closes the right cursor
                        let previous = std::mem::replace(&mut self.state, State::AdvanceLeft);
                        if unmatched {
                            if let State::DrainRight { left, .. } = previous {
                                return Some(Ok(left));
                            }
                        }
                    }
                },
            }
        }
    }
}
