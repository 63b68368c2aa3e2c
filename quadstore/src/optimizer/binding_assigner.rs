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
use shared::algebra::{Dataset, TupleExpr, ValueExpr, Var};
use shared::binding::BindingSet;

/// Turns outer bindings into constant values on the variables they name.
pub struct BindingAssigner;

impl BindingAssigner {
    fn assign(var: &mut Var, bindings: &BindingSet) {
        if var.value.is_none() {
            if let Some(value) = bindings.get(&var.name) {
                var.value = Some(value.clone());
            }
        }
    }

    fn assign_expr(expr: &ValueExpr, bindings: &BindingSet) -> Result<ValueExpr> {
        Ok(match expr {
            ValueExpr::Var(var) => {
                let mut var = var.clone();
                Self::assign(&mut var, bindings);
                ValueExpr::Var(var)
            }
            ValueExpr::Bound(var) => {
                let mut var = var.clone();
                Self::assign(&mut var, bindings);
                ValueExpr::Bound(var)
            }
            other => other.map_children(&mut |child| Self::assign_expr(child, bindings))?,
        })
    }
}

impl QueryOptimizer for BindingAssigner {
    fn name(&self) -> &'static str {
        "BindingAssigner"
    }

    fn optimize(
        &self,
        expr: &TupleExpr,
        _dataset: &Dataset,
        bindings: &BindingSet,
    ) -> Result<TupleExpr> {
        if bindings.is_empty() {
            return Ok(expr.clone());
        }
        transform_up(expr, &mut |node| {
            let node = match node {
                TupleExpr::StatementPattern(mut sp) => {
                    for var in sp.vars_mut() {
                        Self::assign(var, bindings);
                    }
                    TupleExpr::StatementPattern(sp)
                }
                other => other,
            };
            map_node_exprs(node, &mut |e| Self::assign_expr(e, bindings))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::algebra::CompareOp;
    use shared::terms::Term;

    #[test]
    fn test_assigns_pattern_and_filter_vars() {
        let tree = TupleExpr::filter(
            TupleExpr::pattern(Var::new("s"), Var::constant(Term::iri("p")), Var::new("o")),
            ValueExpr::compare(ValueExpr::var("s"), CompareOp::Ne, ValueExpr::var("o")),
        );
        let bindings = BindingSet::new().with("s", Term::iri("alice"));
        let out = BindingAssigner
            .optimize(&tree, &Dataset::new(), &bindings)
            .unwrap();

        let TupleExpr::Filter { arg, condition } = out else {
            panic!("expected filter");
        };
        let TupleExpr::StatementPattern(sp) = &*arg else {
            panic!("expected pattern");
        };
        assert_eq!(sp.subject.value, Some(Term::iri("alice")));
        assert_eq!(sp.subject.name, "s");
        assert!(sp.object.value.is_none());
        assert_eq!(condition.variables().into_iter().collect::<Vec<_>>(), vec!["o"]);
    }

    #[test]
    fn test_empty_bindings_leave_tree_untouched() {
        let tree = TupleExpr::pattern(Var::new("s"), Var::new("p"), Var::new("o"));
        let out = BindingAssigner
            .optimize(&tree, &Dataset::new(), &BindingSet::new())
            .unwrap();
        assert_eq!(out, tree);
    }
}
