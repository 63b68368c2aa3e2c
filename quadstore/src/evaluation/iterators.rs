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
use super::value_eval;
use crate::error::Result;
use rustc_hash::FxHashSet;
use shared::algebra::{ExtensionElem, ProjectionElem, TupleExpr, ValueExpr};
use shared::binding::BindingSet;
use std::sync::Arc;

/// Keeps the solutions for which the condition is true. A condition that
/// fails to evaluate rejects the solution.
pub struct FilterIterator {
    inner: BindingIter,
    condition: ValueExpr,
}

impl FilterIterator {
    pub fn new(inner: BindingIter, condition: ValueExpr) -> Self {
        FilterIterator { inner, condition }
    }
}

impl Iterator for FilterIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(solution) => {
                    if value_eval::is_true(&self.condition, &solution).unwrap_or(false) {
                        return Some(Ok(solution));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub struct ProjectionIterator {
    inner: BindingIter,
    elements: Vec<ProjectionElem>,
    parent: BindingSet,
}

impl ProjectionIterator {
    pub fn new(inner: BindingIter, elements: Vec<ProjectionElem>, parent: BindingSet) -> Self {
        ProjectionIterator {
            inner,
            elements,
            parent,
        }
    }

    fn project(&self, solution: &BindingSet) -> BindingSet {
        let mut result = self.parent.clone();
        for elem in &self.elements {
            if let Some(value) = solution.get(&elem.source) {
                result.insert(elem.target.clone(), value.clone());
            }
        }
        result
    }
}

impl Iterator for ProjectionIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.map(|solution| self.project(&solution)))
    }
}

/// Adds computed bindings. Elements are applied in order so later ones can
/// refer to earlier ones; an element that fails to evaluate stays unbound.
pub struct ExtensionIterator {
    inner: BindingIter,
    elements: Vec<ExtensionElem>,
}

impl ExtensionIterator {
    pub fn new(inner: BindingIter, elements: Vec<ExtensionElem>) -> Self {
        ExtensionIterator { inner, elements }
    }
}

impl Iterator for ExtensionIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut solution = match self.inner.next()? {
            Ok(solution) => solution,
            Err(e) => return Some(Err(e)),
        };
        for elem in &self.elements {
            if let Ok(value) = value_eval::evaluate(&elem.expr, &solution) {
                solution.insert(elem.name.clone(), value);
            }
        }
        Some(Ok(solution))
    }
}

/// Left operand first, then the right one, which is only evaluated once
/// the left is exhausted.
pub struct UnionIterator {
    strategy: EvaluationStrategy,
    left: Option<BindingIter>,
    right_expr: Arc<TupleExpr>,
    right: Option<BindingIter>,
    bindings: BindingSet,
}

impl UnionIterator {
    pub fn new(
        strategy: EvaluationStrategy,
        left: BindingIter,
        right_expr: Arc<TupleExpr>,
        bindings: BindingSet,
    ) -> Self {
        UnionIterator {
            strategy,
            left: Some(left),
            right_expr,
            right: None,
            bindings,
        }
    }
}

impl Iterator for UnionIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(left) = self.left.as_mut() {
            match left.next() {
                Some(item) => return Some(item),
                None => {
                    self.left = None;
                    match self.strategy.evaluate(&self.right_expr, &self.bindings) {
                        Ok(right) => self.right = Some(right),
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
        }
        self.right.as_mut()?.next()
    }
}

pub struct DistinctIterator {
    inner: BindingIter,
    seen: FxHashSet<BindingSet>,
}

impl DistinctIterator {
    pub fn new(inner: BindingIter) -> Self {
        DistinctIterator {
            inner,
            seen: FxHashSet::default(),
        }
    }
}

impl Iterator for DistinctIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(solution) => {
                    if !self.seen.contains(&solution) {
                        self.seen.insert(solution.clone());
                        return Some(Ok(solution));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Inline rows (VALUES), joined with the incoming bindings.
pub struct BindingsAssignmentIterator {
    rows: std::vec::IntoIter<BindingSet>,
    bindings: BindingSet,
}

impl BindingsAssignmentIterator {
    pub fn new(rows: Vec<BindingSet>, bindings: BindingSet) -> Self {
        BindingsAssignmentIterator {
            rows: rows.into_iter(),
            bindings,
        }
    }
}

impl Iterator for BindingsAssignmentIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        for row in self.rows.by_ref() {
            if self.bindings.is_compatible(&row) {
                let mut merged = self.bindings.clone();
                merged.extend_from(&row);
                return Some(Ok(merged));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::algebra::CompareOp;
    use shared::terms::Term;

    fn iter_of(rows: Vec<BindingSet>) -> BindingIter {
        Box::new(rows.into_iter().map(Ok))
    }

    fn row(name: &str, value: i64) -> BindingSet {
        BindingSet::new().with(name, Term::integer(value))
    }

    #[test]
    fn test_filter_rejects_errors() {
        let rows = vec![row("x", 1), row("x", 5), BindingSet::new()];
        let cond = ValueExpr::compare(
            ValueExpr::var("x"),
            CompareOp::Gt,
            ValueExpr::Constant(Term::integer(2)),
        );
        let out: Vec<_> = FilterIterator::new(iter_of(rows), cond)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out, vec![row("x", 5)]);
    }

    #[test]
    fn test_projection_renames_and_drops() {
        let input = row("x", 1).with("y", Term::iri("http://example.org/y"));
        let elements = vec![ProjectionElem {
            source: "x".to_string(),
            target: "z".to_string(),
        }];
        let out: Vec<_> = ProjectionIterator::new(iter_of(vec![input]), elements, BindingSet::new())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out, vec![row("z", 1)]);
    }

    #[test]
    fn test_extension_leaves_failures_unbound() {
        let elements = vec![
            ExtensionElem {
                name: "s".to_string(),
                expr: ValueExpr::Str(Box::new(ValueExpr::var("x"))),
            },
            ExtensionElem {
                name: "t".to_string(),
                expr: ValueExpr::Str(Box::new(ValueExpr::var("missing"))),
            },
        ];
        let out: Vec<_> = ExtensionIterator::new(iter_of(vec![row("x", 7)]), elements)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out[0].get("s"), Some(&Term::literal("7")));
        assert!(!out[0].contains("t"));
    }

    #[test]
    fn test_distinct() {
        let rows = vec![row("x", 1), row("x", 1), row("x", 2)];
        let out: Vec<_> = DistinctIterator::new(iter_of(rows)).collect::<Result<_>>().unwrap();
        assert_eq!(out, vec![row("x", 1), row("x", 2)]);
    }

    #[test]
    fn test_bindings_assignment_joins_with_input() {
        let rows = vec![row("x", 1).with("y", Term::integer(10)), row("x", 2)];
        let out: Vec<_> = BindingsAssignmentIterator::new(rows, row("x", 1))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out, vec![row("x", 1).with("y", Term::integer(10))]);
    }
}
