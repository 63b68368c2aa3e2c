/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::group::GroupIterator;
use super::iterators::{
    BindingsAssignmentIterator, DistinctIterator, ExtensionIterator, FilterIterator,
    ProjectionIterator, UnionIterator,
};
use super::join::JoinIterator;
use super::left_join;
use super::value_eval;
use crate::config::EvaluationOptions;
use crate::error::Result;
use crate::storage::txn_status::ReadMode;
use crate::storage::StatementSource;
use shared::algebra::{Dataset, Scope, StatementPattern, TupleExpr, Var};
use shared::binding::BindingSet;
use shared::quad::Statement;
use shared::terms::Term;
use std::sync::Arc;

/// Lazy sequence of solutions produced by an operator.
pub type BindingIter = Box<dyn Iterator<Item = Result<BindingSet>> + Send>;

pub fn empty_iter() -> BindingIter {
    Box::new(std::iter::empty())
}

pub fn single_iter(bindings: BindingSet) -> BindingIter {
    Box::new(std::iter::once(Ok(bindings)))
}

#[derive(Debug)]
struct StrategyContext {
    source: StatementSource,
    dataset: Dataset,
    mode: ReadMode,
    include_inferred: bool,
    options: EvaluationOptions,
}

/// Walks an algebra tree and turns every node into a pull-based iterator.
/// Cloning is cheap; iterators keep a clone to evaluate sub-trees on demand.
#[derive(Debug, Clone)]
pub struct EvaluationStrategy {
    context: Arc<StrategyContext>,
}

impl EvaluationStrategy {
    pub fn new(
        source: StatementSource,
        dataset: Dataset,
        mode: ReadMode,
        include_inferred: bool,
        options: EvaluationOptions,
    ) -> Self {
        EvaluationStrategy {
            context: Arc::new(StrategyContext {
                source,
                dataset,
                mode,
                include_inferred,
                options,
            }),
        }
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.context.options
    }

    pub fn evaluate(&self, expr: &Arc<TupleExpr>, bindings: &BindingSet) -> Result<BindingIter> {
        match &**expr {
            TupleExpr::StatementPattern(sp) => self.evaluate_pattern(sp, bindings),
            TupleExpr::Join { left, right } => {
                let left_iter = self.evaluate(left, bindings)?;
                Ok(Box::new(JoinIterator::new(
                    self.clone(),
                    left_iter,
                    Arc::clone(right),
                )))
            }
            TupleExpr::LeftJoin {
                left,
                right,
                condition,
            } => left_join::evaluate(self, left, right, condition.as_ref(), bindings),
            TupleExpr::Filter { arg, condition } => Ok(Box::new(FilterIterator::new(
                self.evaluate(arg, bindings)?,
                condition.clone(),
            ))),
            TupleExpr::Group {
                arg,
                group_vars,
                elements,
            } => Ok(Box::new(GroupIterator::new(
                self.clone(),
                Arc::clone(arg),
                group_vars.clone(),
                elements.clone(),
                bindings.clone(),
            ))),
            TupleExpr::Projection { arg, elements } => Ok(Box::new(ProjectionIterator::new(
                self.evaluate(arg, bindings)?,
                elements.clone(),
                bindings.clone(),
            ))),
            TupleExpr::Extension { arg, elements } => Ok(Box::new(ExtensionIterator::new(
                self.evaluate(arg, bindings)?,
                elements.clone(),
            ))),
            TupleExpr::Union { left, right } => Ok(Box::new(UnionIterator::new(
                self.clone(),
                self.evaluate(left, bindings)?,
                Arc::clone(right),
                bindings.clone(),
            ))),
            TupleExpr::Distinct(arg) => {
                Ok(Box::new(DistinctIterator::new(self.evaluate(arg, bindings)?)))
            }
            TupleExpr::Slice { arg, offset, limit } => {
                let iter = self.evaluate(arg, bindings)?.skip(*offset);
                match limit {
                    Some(limit) => Ok(Box::new(iter.take(*limit))),
                    None => Ok(Box::new(iter)),
                }
            }
            TupleExpr::Order { arg, elements } => {
                let mut rows = self.evaluate(arg, bindings)?.collect::<Result<Vec<_>>>()?;
                rows.sort_by(|a, b| {
                    for elem in elements {
                        let left = value_eval::evaluate(&elem.expr, a).ok();
                        let right = value_eval::evaluate(&elem.expr, b).ok();
                        let mut ord = value_eval::order_compare(left.as_ref(), right.as_ref());
                        if !elem.ascending {
                            ord = ord.reverse();
                        }
                        if ord != std::cmp::Ordering::Equal {
                            return ord;
                        }
                    }
                    std::cmp::Ordering::Equal
                });
                Ok(Box::new(rows.into_iter().map(Ok)))
            }
            TupleExpr::SingletonSet => Ok(single_iter(bindings.clone())),
            TupleExpr::EmptySet => Ok(empty_iter()),
            TupleExpr::BindingSetAssignment(rows) => Ok(Box::new(BindingsAssignmentIterator::new(
                rows.clone(),
                bindings.clone(),
            ))),
        }
    }

    fn evaluate_pattern(&self, sp: &StatementPattern, bindings: &BindingSet) -> Result<BindingIter> {
        let value_of = |var: &Var| -> Option<Term> {
            var.value.clone().or_else(|| bindings.get(&var.name).cloned())
        };
        let subject = value_of(&sp.subject);
        let predicate = value_of(&sp.predicate);
        let object = value_of(&sp.object);
        let context = sp.context.as_ref().and_then(value_of);

        let Some((contexts, named_only)) = self.graphs_for(sp.scope, context.as_ref()) else {
            return Ok(empty_iter());
        };

        let cursor = self.context.source.statements(
            subject.as_ref(),
            predicate.as_ref(),
            object.as_ref(),
            &contexts,
            !self.context.include_inferred,
            self.context.mode,
        )?;

        let unbound = |var: &Var| (!var.has_value()).then(|| var.name.clone());
        let names = [
            unbound(&sp.subject),
            unbound(&sp.predicate),
            unbound(&sp.object),
            sp.context.as_ref().and_then(unbound),
        ];
        let base = bindings.clone();

        Ok(Box::new(cursor.filter_map(move |item| match item {
            Ok(st) => {
                if named_only && st.context.is_none() {
                    return None;
                }
                bind_statement(&base, &names, st).map(Ok)
            }
            Err(e) => Some(Err(e)),
        })))
    }

    /// Contexts to query for a pattern and whether default-graph statements
    /// must be dropped. `None` means the pattern cannot match.
    fn graphs_for(&self, scope: Scope, context: Option<&Term>) -> Option<(Vec<Option<Term>>, bool)> {
        let dataset = &self.context.dataset;
        if dataset.is_empty() {
            return match context {
                Some(ctx) => Some((vec![Some(ctx.clone())], false)),
                None => Some((Vec::new(), scope == Scope::NamedContexts)),
            };
        }

        let graphs: Vec<Option<Term>> = match scope {
            Scope::DefaultContexts => dataset.default_graphs.clone(),
            Scope::NamedContexts => dataset.named_graphs.iter().cloned().map(Some).collect(),
        };
        if graphs.is_empty() {
            return None;
        }
        match context {
            Some(ctx) => {
                let ctx = Some(ctx.clone());
                graphs.contains(&ctx).then(|| (vec![ctx], false))
            }
            None => Some((graphs, false)),
        }
    }
}

/// Extends `base` with the values of a matching statement. Repeated
/// variables must agree, otherwise the statement is rejected.
fn bind_statement(base: &BindingSet, names: &[Option<String>; 4], st: Statement) -> Option<BindingSet> {
    let mut result = base.clone();
    let values = [Some(st.subject), Some(st.predicate), Some(st.object), st.context];
    for (name, value) in names.iter().zip(values) {
        let (Some(name), Some(value)) = (name, value) else {
            continue;
        };
        match result.get(name) {
            Some(existing) if *existing != value => return None,
            Some(_) => {}
            None => result.insert(name.clone(), value),
        }
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_statement_checks_repeated_vars() {
        let names = [Some("x".to_string()), None, Some("x".to_string()), None];
        let same = Statement::new(Term::iri("a"), Term::iri("p"), Term::iri("a"), None);
        let different = Statement::new(Term::iri("a"), Term::iri("p"), Term::iri("b"), None);
        assert!(bind_statement(&BindingSet::new(), &names, same).is_some());
        assert!(bind_statement(&BindingSet::new(), &names, different).is_none());
    }

    #[test]
    fn test_bind_statement_skips_default_context() {
        let names = [Some("s".to_string()), None, None, Some("g".to_string())];
        let st = Statement::new(Term::iri("a"), Term::iri("p"), Term::iri("b"), None);
        let result = bind_statement(&BindingSet::new(), &names, st).unwrap();
        assert!(result.contains("s"));
        assert!(!result.contains("g"));
    }
}
