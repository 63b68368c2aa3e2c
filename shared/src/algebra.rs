/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Query algebra: the operator tree handed to the evaluator.

use crate::binding::BindingSet;
use crate::terms::Term;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A pattern variable. After binding assignment or for constant positions
/// `value` is set and the variable matches only that term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub name: String,
    pub value: Option<Term>,
    pub anonymous: bool,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Var {
            name: name.into(),
            value: None,
            anonymous: false,
        }
    }

    /// An anonymous variable fixed to `value`.
    pub fn constant(value: Term) -> Self {
        Var {
            name: format!("-const-{}", value),
            value: Some(value),
            anonymous: true,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Which graphs a statement pattern ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    DefaultContexts,
    NamedContexts,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementPattern {
    pub subject: Var,
    pub predicate: Var,
    pub object: Var,
    pub context: Option<Var>,
    pub scope: Scope,
}

impl StatementPattern {
    pub fn new(subject: Var, predicate: Var, object: Var) -> Self {
        StatementPattern {
            subject,
            predicate,
            object,
            context: None,
            scope: Scope::DefaultContexts,
        }
    }

    /// A pattern over named graphs with `context` as graph variable.
    pub fn in_context(subject: Var, predicate: Var, object: Var, context: Var) -> Self {
        StatementPattern {
            subject,
            predicate,
            object,
            context: Some(context),
            scope: Scope::NamedContexts,
        }
    }

    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .chain(self.context.as_ref())
    }

    pub fn vars_mut(&mut self) -> impl Iterator<Item = &mut Var> {
        [&mut self.subject, &mut self.predicate, &mut self.object]
            .into_iter()
            .chain(self.context.as_mut())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Scalar expressions used by filters, extensions, ordering and aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueExpr {
    Var(Var),
    Constant(Term),
    Bound(Var),
    Str(Box<ValueExpr>),
    Lang(Box<ValueExpr>),
    Datatype(Box<ValueExpr>),
    IsIri(Box<ValueExpr>),
    IsBlank(Box<ValueExpr>),
    IsLiteral(Box<ValueExpr>),
    Regex {
        arg: Box<ValueExpr>,
        pattern: Box<ValueExpr>,
        flags: Option<Box<ValueExpr>>,
    },
    And(Box<ValueExpr>, Box<ValueExpr>),
    Or(Box<ValueExpr>, Box<ValueExpr>),
    Not(Box<ValueExpr>),
    SameTerm(Box<ValueExpr>, Box<ValueExpr>),
    Compare {
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
        op: CompareOp,
    },
    Math {
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
        op: MathOp,
    },
}

impl ValueExpr {
    pub fn var(name: impl Into<String>) -> Self {
        ValueExpr::Var(Var::new(name))
    }

    pub fn compare(left: ValueExpr, op: CompareOp, right: ValueExpr) -> Self {
        ValueExpr::Compare {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    pub fn and(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::Or(Box::new(left), Box::new(right))
    }

    /// Names of the unassigned variables this expression reads.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            ValueExpr::Var(v) | ValueExpr::Bound(v) => {
                if !v.has_value() {
                    out.insert(v.name.clone());
                }
            }
            ValueExpr::Constant(_) => {}
            _ => {
                for child in self.children() {
                    child.collect_variables(out);
                }
            }
        }
    }

    pub fn children(&self) -> Vec<&ValueExpr> {
        match self {
            ValueExpr::Var(_) | ValueExpr::Constant(_) | ValueExpr::Bound(_) => Vec::new(),
            ValueExpr::Str(a)
            | ValueExpr::Lang(a)
            | ValueExpr::Datatype(a)
            | ValueExpr::IsIri(a)
            | ValueExpr::IsBlank(a)
            | ValueExpr::IsLiteral(a)
            | ValueExpr::Not(a) => vec![&**a],
            ValueExpr::Regex { arg, pattern, flags } => {
                let mut out: Vec<&ValueExpr> = vec![&**arg, &**pattern];
                if let Some(f) = flags {
                    out.push(&**f);
                }
                out
            }
            ValueExpr::And(a, b) | ValueExpr::Or(a, b) | ValueExpr::SameTerm(a, b) => {
                vec![&**a, &**b]
            }
            ValueExpr::Compare { left, right, .. } | ValueExpr::Math { left, right, .. } => {
                vec![&**left, &**right]
            }
        }
    }

    /// Rebuilds this node with its children mapped through `f`.
    pub fn map_children<E>(
        &self,
        f: &mut impl FnMut(&ValueExpr) -> Result<ValueExpr, E>,
    ) -> Result<ValueExpr, E> {
        let mut apply = |e: &ValueExpr| f(e).map(Box::new);
        Ok(match self {
            ValueExpr::Var(_) | ValueExpr::Constant(_) | ValueExpr::Bound(_) => self.clone(),
            ValueExpr::Str(a) => ValueExpr::Str(apply(a)?),
            ValueExpr::Lang(a) => ValueExpr::Lang(apply(a)?),
            ValueExpr::Datatype(a) => ValueExpr::Datatype(apply(a)?),
            ValueExpr::IsIri(a) => ValueExpr::IsIri(apply(a)?),
            ValueExpr::IsBlank(a) => ValueExpr::IsBlank(apply(a)?),
            ValueExpr::IsLiteral(a) => ValueExpr::IsLiteral(apply(a)?),
            ValueExpr::Not(a) => ValueExpr::Not(apply(a)?),
            ValueExpr::Regex { arg, pattern, flags } => ValueExpr::Regex {
                arg: apply(arg)?,
                pattern: apply(pattern)?,
                flags: match flags {
                    Some(fl) => Some(apply(fl)?),
                    None => None,
                },
            },
            ValueExpr::And(a, b) => ValueExpr::And(apply(a)?, apply(b)?),
            ValueExpr::Or(a, b) => ValueExpr::Or(apply(a)?, apply(b)?),
            ValueExpr::SameTerm(a, b) => ValueExpr::SameTerm(apply(a)?, apply(b)?),
            ValueExpr::Compare { left, right, op } => ValueExpr::Compare {
                left: apply(left)?,
                right: apply(right)?,
                op: *op,
            },
            ValueExpr::Math { left, right, op } => ValueExpr::Math {
                left: apply(left)?,
                right: apply(right)?,
                op: *op,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateOperator {
    /// `COUNT(expr)` counts distinct values, `COUNT(*)` rows.
    Count(Option<ValueExpr>),
    Min(ValueExpr),
    Max(ValueExpr),
    Sum(ValueExpr),
    Avg(ValueExpr),
    Sample(ValueExpr),
    GroupConcat {
        arg: ValueExpr,
        separator: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupElem {
    pub name: String,
    pub operator: AggregateOperator,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionElem {
    pub source: String,
    pub target: String,
}

impl ProjectionElem {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        ProjectionElem {
            source: name.clone(),
            target: name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionElem {
    pub name: String,
    pub expr: ValueExpr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderElem {
    pub expr: ValueExpr,
    pub ascending: bool,
}

/// Operator tree. Children are shared so lazy evaluation can hold on to a
/// sub-tree for as long as its result sequence lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TupleExpr {
    StatementPattern(StatementPattern),
    Join {
        left: Arc<TupleExpr>,
        right: Arc<TupleExpr>,
    },
    LeftJoin {
        left: Arc<TupleExpr>,
        right: Arc<TupleExpr>,
        condition: Option<ValueExpr>,
    },
    Filter {
        arg: Arc<TupleExpr>,
        condition: ValueExpr,
    },
    Group {
        arg: Arc<TupleExpr>,
        group_vars: Vec<String>,
        elements: Vec<GroupElem>,
    },
    Projection {
        arg: Arc<TupleExpr>,
        elements: Vec<ProjectionElem>,
    },
    Extension {
        arg: Arc<TupleExpr>,
        elements: Vec<ExtensionElem>,
    },
    Union {
        left: Arc<TupleExpr>,
        right: Arc<TupleExpr>,
    },
    Distinct(Arc<TupleExpr>),
    Slice {
        arg: Arc<TupleExpr>,
        offset: usize,
        limit: Option<usize>,
    },
    Order {
        arg: Arc<TupleExpr>,
        elements: Vec<OrderElem>,
    },
    SingletonSet,
    EmptySet,
    BindingSetAssignment(Vec<BindingSet>),
}

impl TupleExpr {
    pub fn pattern(subject: Var, predicate: Var, object: Var) -> Self {
        TupleExpr::StatementPattern(StatementPattern::new(subject, predicate, object))
    }

    pub fn join(left: TupleExpr, right: TupleExpr) -> Self {
        TupleExpr::Join {
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    pub fn left_join(left: TupleExpr, right: TupleExpr, condition: Option<ValueExpr>) -> Self {
        TupleExpr::LeftJoin {
            left: Arc::new(left),
            right: Arc::new(right),
            condition,
        }
    }

    pub fn filter(arg: TupleExpr, condition: ValueExpr) -> Self {
        TupleExpr::Filter {
            arg: Arc::new(arg),
            condition,
        }
    }

    pub fn union(left: TupleExpr, right: TupleExpr) -> Self {
        TupleExpr::Union {
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    pub fn group(arg: TupleExpr, group_vars: Vec<String>, elements: Vec<GroupElem>) -> Self {
        TupleExpr::Group {
            arg: Arc::new(arg),
            group_vars,
            elements,
        }
    }

    pub fn projection(arg: TupleExpr, names: &[&str]) -> Self {
        TupleExpr::Projection {
            arg: Arc::new(arg),
            elements: names.iter().map(|n| ProjectionElem::new(*n)).collect(),
        }
    }

    pub fn children(&self) -> Vec<&TupleExpr> {
        match self {
            TupleExpr::StatementPattern(_)
            | TupleExpr::SingletonSet
            | TupleExpr::EmptySet
            | TupleExpr::BindingSetAssignment(_) => Vec::new(),
            TupleExpr::Join { left, right }
            | TupleExpr::LeftJoin { left, right, .. }
            | TupleExpr::Union { left, right } => vec![&**left, &**right],
            TupleExpr::Filter { arg, .. }
            | TupleExpr::Group { arg, .. }
            | TupleExpr::Projection { arg, .. }
            | TupleExpr::Extension { arg, .. }
            | TupleExpr::Distinct(arg)
            | TupleExpr::Slice { arg, .. }
            | TupleExpr::Order { arg, .. } => vec![&**arg],
        }
    }

    /// Rebuilds this node with its children mapped through `f`, in the order
    /// returned by [`TupleExpr::children`].
    pub fn map_children<E>(
        &self,
        f: &mut impl FnMut(&TupleExpr) -> Result<TupleExpr, E>,
    ) -> Result<TupleExpr, E> {
        let mut apply = |e: &TupleExpr| f(e).map(Arc::new);
        Ok(match self {
            TupleExpr::StatementPattern(_)
            | TupleExpr::SingletonSet
            | TupleExpr::EmptySet
            | TupleExpr::BindingSetAssignment(_) => self.clone(),
            TupleExpr::Join { left, right } => TupleExpr::Join {
                left: apply(left)?,
                right: apply(right)?,
            },
            TupleExpr::LeftJoin {
                left,
                right,
                condition,
            } => TupleExpr::LeftJoin {
                left: apply(left)?,
                right: apply(right)?,
                condition: condition.clone(),
            },
            TupleExpr::Union { left, right } => TupleExpr::Union {
                left: apply(left)?,
                right: apply(right)?,
            },
            TupleExpr::Filter { arg, condition } => TupleExpr::Filter {
                arg: apply(arg)?,
                condition: condition.clone(),
            },
            TupleExpr::Group {
                arg,
                group_vars,
                elements,
            } => TupleExpr::Group {
                arg: apply(arg)?,
                group_vars: group_vars.clone(),
                elements: elements.clone(),
            },
            TupleExpr::Projection { arg, elements } => TupleExpr::Projection {
                arg: apply(arg)?,
                elements: elements.clone(),
            },
            TupleExpr::Extension { arg, elements } => TupleExpr::Extension {
                arg: apply(arg)?,
                elements: elements.clone(),
            },
            TupleExpr::Distinct(arg) => TupleExpr::Distinct(apply(arg)?),
            TupleExpr::Slice { arg, offset, limit } => TupleExpr::Slice {
                arg: apply(arg)?,
                offset: *offset,
                limit: *limit,
            },
            TupleExpr::Order { arg, elements } => TupleExpr::Order {
                arg: apply(arg)?,
                elements: elements.clone(),
            },
        })
    }

    /// Every variable name a solution of this expression may bind.
    pub fn binding_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_binding_names(&mut out);
        out
    }

    fn collect_binding_names(&self, out: &mut BTreeSet<String>) {
        match self {
            TupleExpr::StatementPattern(sp) => {
                out.extend(sp.vars().map(|v| v.name.clone()));
            }
            TupleExpr::Group {
                group_vars,
                elements,
                ..
            } => {
                out.extend(group_vars.iter().cloned());
                out.extend(elements.iter().map(|e| e.name.clone()));
            }
            TupleExpr::Projection { elements, .. } => {
                out.extend(elements.iter().map(|e| e.target.clone()));
            }
            TupleExpr::Extension { arg, elements } => {
                arg.collect_binding_names(out);
                out.extend(elements.iter().map(|e| e.name.clone()));
            }
            TupleExpr::BindingSetAssignment(rows) => {
                for row in rows {
                    out.extend(row.names().map(str::to_string));
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_binding_names(out);
                }
            }
        }
    }

    /// Names bound in every solution of this expression.
    pub fn assured_binding_names(&self) -> BTreeSet<String> {
        match self {
            TupleExpr::StatementPattern(sp) => sp.vars().map(|v| v.name.clone()).collect(),
            TupleExpr::Join { left, right } => {
                let mut out = left.assured_binding_names();
                out.extend(right.assured_binding_names());
                out
            }
            TupleExpr::LeftJoin { left, .. } => left.assured_binding_names(),
            TupleExpr::Union { left, right } => left
                .assured_binding_names()
                .intersection(&right.assured_binding_names())
                .cloned()
                .collect(),
            TupleExpr::Group { group_vars, .. } => group_vars.iter().cloned().collect(),
            TupleExpr::Projection { arg, elements } => {
                let inner = arg.assured_binding_names();
                elements
                    .iter()
                    .filter(|e| inner.contains(&e.source))
                    .map(|e| e.target.clone())
                    .collect()
            }
            TupleExpr::Extension { arg, .. }
            | TupleExpr::Filter { arg, .. }
            | TupleExpr::Distinct(arg)
            | TupleExpr::Slice { arg, .. }
            | TupleExpr::Order { arg, .. } => arg.assured_binding_names(),
            TupleExpr::SingletonSet | TupleExpr::EmptySet => BTreeSet::new(),
            TupleExpr::BindingSetAssignment(rows) => {
                let mut iter = rows.iter();
                let mut out: BTreeSet<String> = match iter.next() {
                    Some(first) => first.names().map(str::to_string).collect(),
                    None => return BTreeSet::new(),
                };
                for row in iter {
                    out.retain(|n| row.contains(n));
                }
                out
            }
        }
    }
}

/// Graphs a query ranges over. An empty dataset means "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub default_graphs: Vec<Option<Term>>,
    pub named_graphs: Vec<Term>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.default_graphs.is_empty() && self.named_graphs.is_empty()
    }
}
