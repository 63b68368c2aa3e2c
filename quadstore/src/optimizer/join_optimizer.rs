/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::cost::estimator::{CardinalityEstimator, CardinalitySource};
use super::QueryOptimizer;
use crate::error::Result;
use shared::algebra::{Dataset, TupleExpr};
use shared::binding::BindingSet;
use std::collections::BTreeSet;

/// Reorders join chains, cheapest operand first given what the operands
/// already chosen will bind.
pub struct JoinOptimizer<'a> {
    estimator: CardinalityEstimator<'a>,
}

impl<'a> JoinOptimizer<'a> {
    pub fn new(source: &'a dyn CardinalitySource) -> Self {
        Self {
            estimator: CardinalityEstimator::new(source),
        }
    }

    fn flatten(expr: &TupleExpr, out: &mut Vec<TupleExpr>) {
        match expr {
            TupleExpr::Join { left, right } => {
                Self::flatten(left, out);
                Self::flatten(right, out);
            }
            other => out.push(other.clone()),
        }
    }

    fn cost(&self, expr: &TupleExpr, bound: &BTreeSet<String>) -> f64 {
        match expr {
            TupleExpr::StatementPattern(sp) => self.estimator.estimate(sp, bound),
            TupleExpr::EmptySet => 0.0,
            TupleExpr::SingletonSet => 1.0,
            TupleExpr::BindingSetAssignment(rows) => rows.len() as f64,
            // Wrappers that never add rows cost what their argument costs
            TupleExpr::Filter { arg, .. }
            | TupleExpr::Extension { arg, .. }
            | TupleExpr::Order { arg, .. }
            | TupleExpr::Distinct(arg) => self.cost(arg, bound),
            // Anything else goes after the patterns, in its original order
            _ => f64::MAX,
        }
    }

    fn rewrite(&self, expr: &TupleExpr, outer: &BTreeSet<String>) -> Result<TupleExpr> {
        if !matches!(expr, TupleExpr::Join { .. }) {
            return expr.map_children(&mut |child| self.rewrite(child, outer));
        }

        let mut operands = Vec::new();
        Self::flatten(expr, &mut operands);
        let mut remaining = operands
            .iter()
            .map(|op| self.rewrite(op, outer))
            .collect::<Result<Vec<_>>>()?;

        let mut bound = outer.clone();
        let mut ordered: Vec<TupleExpr> = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let mut best = 0;
            let mut best_cost = f64::INFINITY;
            for (i, op) in remaining.iter().enumerate() {
                let cost = self.cost(op, &bound);
                if cost < best_cost {
                    best = i;
                    best_cost = cost;
                }
            }
            let chosen = remaining.remove(best);
            bound.extend(chosen.binding_names());
            ordered.push(chosen);
        }

        let mut iter = ordered.into_iter();
        let first = iter.next().unwrap_or(TupleExpr::SingletonSet);
        Ok(iter.fold(first, TupleExpr::join))
    }
}

impl QueryOptimizer for JoinOptimizer<'_> {
    fn name(&self) -> &'static str {
        "JoinOptimizer"
    }

    fn optimize(
        &self,
        expr: &TupleExpr,
        _dataset: &Dataset,
        bindings: &BindingSet,
    ) -> Result<TupleExpr> {
        let outer: BTreeSet<String> = bindings.names().map(str::to_string).collect();
        self.rewrite(expr, &outer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::statement_index::Position;
    use shared::algebra::{CompareOp, ValueExpr, Var};
    use shared::terms::Term;
    use std::collections::HashMap;

    struct FixedStats {
        lists: HashMap<Term, usize>,
    }

    impl CardinalitySource for FixedStats {
        fn total_statements(&self) -> usize {
            1_000
        }

        fn list_size(&self, term: &Term, _position: Position) -> Option<usize> {
            self.lists.get(term).copied()
        }
    }

    fn create_test_stats() -> FixedStats {
        let mut lists = HashMap::new();
        lists.insert(Term::iri("type"), 500);
        lists.insert(Term::iri("name"), 200);
        lists.insert(Term::iri("email"), 5);
        FixedStats { lists }
    }

    fn pattern(p: &str, o: &str) -> TupleExpr {
        TupleExpr::pattern(Var::new("x"), Var::constant(Term::iri(p)), Var::new(o))
    }

    fn order_of(expr: &TupleExpr, out: &mut Vec<TupleExpr>) {
        JoinOptimizer::flatten(expr, out);
    }

    #[test]
    fn test_orders_by_selectivity() {
        let stats = create_test_stats();
        let optimizer = JoinOptimizer::new(&stats);
        let tree = TupleExpr::join(
            TupleExpr::join(pattern("type", "t"), pattern("name", "n")),
            pattern("email", "e"),
        );
        let out = optimizer
            .optimize(&tree, &Dataset::new(), &BindingSet::new())
            .unwrap();

        let mut order = Vec::new();
        order_of(&out, &mut order);
        assert_eq!(
            order,
            vec![pattern("email", "e"), pattern("name", "n"), pattern("type", "t")]
        );
        // Left-deep
        assert!(matches!(&out, TupleExpr::Join { right, .. } if **right == pattern("type", "t")));
    }

    #[test]
    fn test_unknown_term_goes_first() {
        let stats = create_test_stats();
        let optimizer = JoinOptimizer::new(&stats);
        let tree = TupleExpr::join(pattern("email", "e"), pattern("missing", "m"));
        let out = optimizer
            .optimize(&tree, &Dataset::new(), &BindingSet::new())
            .unwrap();
        assert_eq!(out, TupleExpr::join(pattern("missing", "m"), pattern("email", "e")));
    }

    #[test]
    fn test_recurses_below_other_operators() {
        let stats = create_test_stats();
        let optimizer = JoinOptimizer::new(&stats);
        let inner = TupleExpr::join(pattern("type", "t"), pattern("email", "e"));
        let tree = TupleExpr::projection(inner, &["x"]);
        let out = optimizer
            .optimize(&tree, &Dataset::new(), &BindingSet::new())
            .unwrap();
        assert_eq!(
            out,
            TupleExpr::projection(TupleExpr::join(pattern("email", "e"), pattern("type", "t")), &["x"])
        );
    }

    #[test]
    fn test_filtered_pattern_is_costed_by_its_pattern() {
        let stats = create_test_stats();
        let optimizer = JoinOptimizer::new(&stats);
        let email = TupleExpr::filter(
            pattern("email", "e"),
            ValueExpr::compare(
                ValueExpr::var("e"),
                CompareOp::Ne,
                ValueExpr::Constant(Term::literal("")),
            ),
        );
        let tree = TupleExpr::join(pattern("type", "t"), email.clone());
        let out = optimizer
            .optimize(&tree, &Dataset::new(), &BindingSet::new())
            .unwrap();
        assert_eq!(out, TupleExpr::join(email, pattern("type", "t")));
    }
}
