/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::{map_node_exprs, transform_up, QueryOptimizer};
use crate::error::Result;
use crate::evaluation::value_eval;
use shared::algebra::{Dataset, TupleExpr, ValueExpr};
use shared::binding::BindingSet;
use shared::terms::Term;
use std::sync::Arc;

/// Folds variable-free value expressions and drops filters whose condition
/// turned out constant.
pub struct ConstantOptimizer;

impl ConstantOptimizer {
    fn constant_bool(expr: &ValueExpr) -> Option<bool> {
        match expr {
            ValueExpr::Constant(term) => value_eval::effective_boolean_value(term).ok(),
            _ => None,
        }
    }

    pub(crate) fn fold(expr: &ValueExpr) -> Result<ValueExpr> {
        let expr = expr.map_children(&mut Self::fold)?;

        match &expr {
            ValueExpr::Constant(_) => return Ok(expr),
            ValueExpr::And(left, right) => {
                match (Self::constant_bool(left), Self::constant_bool(right)) {
                    (Some(false), _) | (_, Some(false)) => {
                        return Ok(ValueExpr::Constant(Term::boolean(false)))
                    }
                    (Some(true), _) => return Ok((**right).clone()),
                    (_, Some(true)) => return Ok((**left).clone()),
                    _ => {}
                }
            }
            ValueExpr::Or(left, right) => {
                match (Self::constant_bool(left), Self::constant_bool(right)) {
                    (Some(true), _) | (_, Some(true)) => {
                        return Ok(ValueExpr::Constant(Term::boolean(true)))
                    }
                    (Some(false), _) => return Ok((**right).clone()),
                    (_, Some(false)) => return Ok((**left).clone()),
                    _ => {}
                }
            }
            _ => {}
        }

        if expr.variables().is_empty() {
            if let Ok(value) = value_eval::evaluate(&expr, &BindingSet::new()) {
                return Ok(ValueExpr::Constant(value));
            }
        }
        Ok(expr)
    }
}

impl QueryOptimizer for ConstantOptimizer {
    fn name(&self) -> &'static str {
        "ConstantOptimizer"
    }

    fn optimize(
        &self,
        expr: &TupleExpr,
        _dataset: &Dataset,
        _bindings: &BindingSet,
    ) -> Result<TupleExpr> {
        transform_up(expr, &mut |node| {
            let node = map_node_exprs(node, &mut Self::fold)?;
            Ok(match node {
                TupleExpr::Filter { arg, condition } => match Self::constant_bool(&condition) {
                    Some(true) => Arc::unwrap_or_clone(arg),
                    Some(false) => TupleExpr::EmptySet,
                    None => TupleExpr::Filter { arg, condition },
                },
                other => other,
            })
        })
    }
}
