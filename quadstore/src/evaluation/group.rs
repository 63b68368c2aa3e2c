/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Grouping and aggregation.

use super::strategy::EvaluationStrategy;
use super::value_eval;
use crate::config::{EmptyExtremum, EvaluationOptions};
use crate::error::Result;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use shared::algebra::{AggregateOperator, GroupElem, TupleExpr, ValueExpr};
use shared::binding::BindingSet;
use shared::terms::{NumericKind, Term, XSD_STRING};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Grouping key: the XOR of the hashes of the bound group values. Equality
/// compares the values themselves, absent ones included.
#[derive(Debug, Clone, Eq)]
struct GroupKey {
    hash: u64,
    values: Vec<Option<Term>>,
}

impl GroupKey {
    fn new(group_vars: &[String], solution: &BindingSet) -> Self {
        let mut hash = 0u64;
        let values = group_vars
            .iter()
            .map(|name| {
                let value = solution.get(name).cloned();
                if let Some(term) = &value {
                    let mut hasher = FxHasher::default();
                    term.hash(&mut hasher);
                    hash ^= hasher.finish();
                }
                value
            })
            .collect();
        GroupKey { hash, values }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.values == other.values
    }
}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

struct Entry {
    prototype: BindingSet,
    solutions: Vec<BindingSet>,
}

/// Materializes its input on first pull, then streams one solution per group.
pub struct GroupIterator {
    strategy: EvaluationStrategy,
    arg: Arc<TupleExpr>,
    group_vars: Vec<String>,
    elements: Vec<GroupElem>,
    parent: BindingSet,
    results: Option<std::vec::IntoIter<BindingSet>>,
}

impl GroupIterator {
    pub fn new(
        strategy: EvaluationStrategy,
        arg: Arc<TupleExpr>,
        group_vars: Vec<String>,
        elements: Vec<GroupElem>,
        parent: BindingSet,
    ) -> Self {
        GroupIterator {
            strategy,
            arg,
            group_vars,
            elements,
            parent,
            results: None,
        }
    }

    fn build(&self) -> Result<Vec<BindingSet>> {
        let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();
        let mut entries: Vec<Entry> = Vec::new();

        // The input cursor is closed when it goes out of scope
        for solution in self.strategy.evaluate(&self.arg, &self.parent)? {
            let solution = solution?;
            let key = GroupKey::new(&self.group_vars, &solution);
            match index.get(&key) {
                Some(&i) => entries[i].solutions.push(solution),
                None => {
                    index.insert(key, entries.len());
                    entries.push(Entry {
                        prototype: solution.clone(),
                        solutions: vec![solution],
                    });
                }
            }
        }

        let options = self.strategy.options();
        let (parent, group_vars, elements) = (&self.parent, &self.group_vars, &self.elements);
        let solutions: Vec<BindingSet> = entries
            .par_iter()
            .map(|entry| group_solution(parent, group_vars, elements, entry, options))
            .collect();

        if options.ordered_groups {
            Ok(solutions)
        } else {
            let distinct: FxHashSet<BindingSet> = solutions.into_iter().collect();
            Ok(distinct.into_iter().collect())
        }
    }
}

impl Iterator for GroupIterator {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.results.is_none() {
            match self.build() {
                Ok(solutions) => self.results = Some(solutions.into_iter()),
                Err(e) => {
                    self.results = Some(Vec::new().into_iter());
                    return Some(Err(e));
                }
            }
        }
        self.results.as_mut()?.next().map(Ok)
    }
}

fn group_solution(
    parent: &BindingSet,
    group_vars: &[String],
    elements: &[GroupElem],
    entry: &Entry,
    options: &EvaluationOptions,
) -> BindingSet {
    let mut solution = parent.clone();
    for name in group_vars {
        if let Some(value) = entry.prototype.get(name) {
            solution.insert(name.clone(), value.clone());
        }
    }
    for elem in elements {
        if let Some(value) = aggregate(&elem.operator, &entry.solutions, options) {
            solution.insert(elem.name.clone(), value);
        }
    }
    solution
}

/// Values of `expr` over the group, skipping rows where it fails.
fn values(expr: &ValueExpr, solutions: &[BindingSet]) -> Vec<Term> {
    solutions
        .iter()
        .filter_map(|s| value_eval::evaluate(expr, s).ok())
        .collect()
}

fn distinct_values(expr: &ValueExpr, solutions: &[BindingSet]) -> Vec<Term> {
    let mut seen = FxHashSet::default();
    values(expr, solutions)
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

pub fn aggregate(
    operator: &AggregateOperator,
    solutions: &[BindingSet],
    options: &EvaluationOptions,
) -> Option<Term> {
    match operator {
        AggregateOperator::Count(Some(expr)) => {
            Some(Term::integer(distinct_values(expr, solutions).len() as i64))
        }
        AggregateOperator::Count(None) => Some(Term::integer(solutions.len() as i64)),
        AggregateOperator::Min(expr) => extremum(expr, solutions, options, f64::INFINITY, f64::min),
        AggregateOperator::Max(expr) => {
            extremum(expr, solutions, options, f64::NEG_INFINITY, f64::max)
        }
        AggregateOperator::Sum(expr) => sum(&values(expr, solutions)).map(|(kind, total)| {
            value_eval::numeric_term(kind, total)
        }),
        AggregateOperator::Avg(expr) => {
            let vals = values(expr, solutions);
            if vals.is_empty() {
                return Some(Term::double(0.0));
            }
            let (_, total) = sum(&vals)?;
            Some(Term::double(total / vals.len() as f64))
        }
        AggregateOperator::Sample(expr) => solutions
            .first()
            .and_then(|s| value_eval::evaluate(expr, s).ok()),
        AggregateOperator::GroupConcat { arg, separator } => {
            let separator = separator.as_deref().unwrap_or(" ");
            let joined = values(arg, solutions)
                .iter()
                .map(Term::lexical)
                .collect::<Vec<_>>()
                .join(separator);
            Some(Term::typed_literal(joined, XSD_STRING))
        }
    }
}

fn extremum(
    expr: &ValueExpr,
    solutions: &[BindingSet],
    options: &EvaluationOptions,
    start: f64,
    pick: fn(f64, f64) -> f64,
) -> Option<Term> {
    let numbers: Vec<f64> = distinct_values(expr, solutions)
        .iter()
        .filter_map(|v| v.as_literal().and_then(|lit| lit.as_double()))
        .collect();
    if numbers.is_empty() && options.empty_extremum == EmptyExtremum::Unbound {
        return None;
    }
    Some(Term::double(numbers.into_iter().fold(start, pick)))
}

/// Sum with numeric type promotion. `None` if a value is not numeric.
fn sum(values: &[Term]) -> Option<(NumericKind, f64)> {
    let mut kind = NumericKind::Integer;
    let mut total = 0.0;
    for value in values {
        let lit = value.as_literal()?;
        kind = kind.max(lit.numeric_kind()?);
        total += lit.numeric_value()?;
    }
    Some((kind, total))
}
