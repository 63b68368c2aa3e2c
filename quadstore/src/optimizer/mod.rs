/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Rewrites an algebra tree before evaluation. Every pass is best-effort:
//! a pass that fails is logged and its input is kept.

pub mod binding_assigner;
pub mod constant_optimizer;
pub mod cost;
pub mod filter_optimizer;
pub mod join_optimizer;

use crate::error::Result;
use binding_assigner::BindingAssigner;
use constant_optimizer::ConstantOptimizer;
use cost::estimator::CardinalitySource;
use filter_optimizer::FilterOptimizer;
use join_optimizer::JoinOptimizer;
use log::{trace, warn};
use shared::algebra::{AggregateOperator, Dataset, TupleExpr, ValueExpr};
use shared::binding::BindingSet;

pub trait QueryOptimizer {
    fn name(&self) -> &'static str;

    fn optimize(&self, expr: &TupleExpr, dataset: &Dataset, bindings: &BindingSet)
        -> Result<TupleExpr>;
}

/// Runs the fixed pipeline: binding assignment, constant folding, filter
/// push-down and join ordering.
pub fn optimize(
    expr: &TupleExpr,
    dataset: &Dataset,
    bindings: &BindingSet,
    source: &dyn CardinalitySource,
) -> TupleExpr {
    let join_optimizer = JoinOptimizer::new(source);
    let pipeline: [&dyn QueryOptimizer; 4] = [
        &BindingAssigner,
        &ConstantOptimizer,
        &FilterOptimizer,
        &join_optimizer,
    ];

    let mut current = expr.clone();
    for pass in pipeline {
        match pass.optimize(&current, dataset, bindings) {
            Ok(next) => {
                trace!("{} produced {:?}", pass.name(), next);
                current = next;
            }
            Err(e) => warn!("{} failed, keeping its input: {}", pass.name(), e),
        }
    }
    current
}

/// Applies `f` to every node, children first.
pub(crate) fn transform_up(
    expr: &TupleExpr,
    f: &mut impl FnMut(TupleExpr) -> Result<TupleExpr>,
) -> Result<TupleExpr> {
    let rebuilt = expr.map_children(&mut |child| transform_up(child, f))?;
    f(rebuilt)
}

/// Rebuilds a node with the value expressions it owns mapped through `f`.
/// Children are left as they are.
pub(crate) fn map_node_exprs(
    expr: TupleExpr,
    f: &mut impl FnMut(&ValueExpr) -> Result<ValueExpr>,
) -> Result<TupleExpr> {
    Ok(match expr {
        TupleExpr::Filter { arg, condition } => TupleExpr::Filter {
            arg,
            condition: f(&condition)?,
        },
        TupleExpr::LeftJoin {
            left,
            right,
            condition: Some(condition),
        } => TupleExpr::LeftJoin {
            left,
            right,
            condition: Some(f(&condition)?),
        },
        TupleExpr::Extension { arg, mut elements } => {
            for elem in &mut elements {
                elem.expr = f(&elem.expr)?;
            }
            TupleExpr::Extension { arg, elements }
        }
        TupleExpr::Order { arg, mut elements } => {
            for elem in &mut elements {
                elem.expr = f(&elem.expr)?;
            }
            TupleExpr::Order { arg, elements }
        }
        TupleExpr::Group {
            arg,
            group_vars,
            mut elements,
        } => {
            for elem in &mut elements {
                elem.operator = map_aggregate(&elem.operator, f)?;
            }
            TupleExpr::Group {
                arg,
                group_vars,
                elements,
            }
        }
        other => other,
    })
}

fn map_aggregate(
    operator: &AggregateOperator,
    f: &mut impl FnMut(&ValueExpr) -> Result<ValueExpr>,
) -> Result<AggregateOperator> {
    Ok(match operator {
        AggregateOperator::Count(None) => AggregateOperator::Count(None),
        AggregateOperator::Count(Some(e)) => AggregateOperator::Count(Some(f(e)?)),
        AggregateOperator::Min(e) => AggregateOperator::Min(f(e)?),
        AggregateOperator::Max(e) => AggregateOperator::Max(f(e)?),
        AggregateOperator::Sum(e) => AggregateOperator::Sum(f(e)?),
        AggregateOperator::Avg(e) => AggregateOperator::Avg(f(e)?),
        AggregateOperator::Sample(e) => AggregateOperator::Sample(f(e)?),
        AggregateOperator::GroupConcat { arg, separator } => AggregateOperator::GroupConcat {
            arg: f(arg)?,
            separator: separator.clone(),
        },
    })
}
