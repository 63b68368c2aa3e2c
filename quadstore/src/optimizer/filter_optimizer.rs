/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::QueryOptimizer;
use crate::error::Result;
use shared::algebra::{Dataset, TupleExpr, ValueExpr};
use shared::binding::BindingSet;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Splits conjunctive filters and moves each conjunct as close to the
/// statement patterns producing its variables as possible.
pub struct FilterOptimizer;

impl FilterOptimizer {
    fn conjuncts(expr: &ValueExpr, out: &mut Vec<ValueExpr>) {
        match expr {
            ValueExpr::And(left, right) => {
                Self::conjuncts(left, out);
                Self::conjuncts(right, out);
            }
            other => out.push(other.clone()),
        }
    }

    fn rewrite(expr: &TupleExpr) -> Result<TupleExpr> {
        match expr {
            TupleExpr::Filter { arg, condition } => {
                let mut current = Self::rewrite(arg)?;
                let mut parts = Vec::new();
                Self::conjuncts(condition, &mut parts);
                for part in parts {
                    let vars = part.variables();
                    current = Self::push(current, part, &vars);
                }
                Ok(current)
            }
            other => other.map_children(&mut Self::rewrite),
        }
    }

    fn covers(expr: &TupleExpr, vars: &BTreeSet<String>) -> bool {
        let assured = expr.assured_binding_names();
        vars.iter().all(|v| assured.contains(v))
    }

    fn push(expr: TupleExpr, condition: ValueExpr, vars: &BTreeSet<String>) -> TupleExpr {
        match expr {
            TupleExpr::Join { left, right } => {
                if Self::covers(&left, vars) {
                    TupleExpr::Join {
                        left: Arc::new(Self::push(Arc::unwrap_or_clone(left), condition, vars)),
                        right,
                    }
                } else if Self::covers(&right, vars) {
                    TupleExpr::Join {
                        left,
                        right: Arc::new(Self::push(Arc::unwrap_or_clone(right), condition, vars)),
                    }
                } else {
                    TupleExpr::filter(TupleExpr::Join { left, right }, condition)
                }
            }
            TupleExpr::LeftJoin {
                left,
                right,
                condition: join_condition,
            } if Self::covers(&left, vars) => TupleExpr::LeftJoin {
                left: Arc::new(Self::push(Arc::unwrap_or_clone(left), condition, vars)),
                right,
                condition: join_condition,
            },
            TupleExpr::Union { left, right } => TupleExpr::Union {
                left: Arc::new(Self::push(
                    Arc::unwrap_or_clone(left),
                    condition.clone(),
                    vars,
                )),
                right: Arc::new(Self::push(Arc::unwrap_or_clone(right), condition, vars)),
            },
            TupleExpr::Filter {
                arg,
                condition: inner,
            } => TupleExpr::Filter {
                arg: Arc::new(Self::push(Arc::unwrap_or_clone(arg), condition, vars)),
                condition: inner,
            },
            other => TupleExpr::filter(other, condition),
        }
    }
}

impl QueryOptimizer for FilterOptimizer {
    fn name(&self) -> &'static str {
        "FilterOptimizer"
    }

    fn optimize(
        &self,
        expr: &TupleExpr,
        _dataset: &Dataset,
        _bindings: &BindingSet,
    ) -> Result<TupleExpr> {
        Self::rewrite(expr)
    }
}
