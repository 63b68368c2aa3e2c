/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Value expression evaluation.

use crate::error::{ExprError, ExprResult};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use shared::algebra::{CompareOp, MathOp, ValueExpr};
use shared::binding::BindingSet;
use shared::terms::{format_double, Literal, NumericKind, Term, XSD_BOOLEAN, XSD_STRING};
use std::cell::RefCell;
use std::cmp::Ordering;

/// Compiled patterns kept per thread; cleared once it holds this many.
const REGEX_CACHE_LIMIT: usize = 64;

thread_local! {
    static REGEX_CACHE: RefCell<FxHashMap<(String, String), Regex>> =
        RefCell::new(FxHashMap::default());
}

pub fn evaluate(expr: &ValueExpr, bindings: &BindingSet) -> ExprResult<Term> {
    match expr {
        ValueExpr::Var(var) => match &var.value {
            Some(value) => Ok(value.clone()),
            None => bindings.get(&var.name).cloned().ok_or(ExprError),
        },
        ValueExpr::Constant(term) => Ok(term.clone()),
        ValueExpr::Bound(var) => Ok(Term::boolean(
            var.value.is_some() || bindings.contains(&var.name),
        )),
        ValueExpr::Str(arg) => match evaluate(arg, bindings)? {
            Term::Iri(iri) => Ok(Term::literal(iri)),
            Term::Literal(lit) => Ok(Term::literal(lit.label)),
            Term::BlankNode(_) => Err(ExprError),
        },
        ValueExpr::Lang(arg) => match evaluate(arg, bindings)? {
            Term::Literal(lit) => Ok(Term::literal(lit.language.unwrap_or_default())),
            _ => Err(ExprError),
        },
        ValueExpr::Datatype(arg) => match evaluate(arg, bindings)? {
            Term::Literal(Literal {
                datatype: Some(dt), ..
            }) => Ok(Term::Iri(dt)),
            Term::Literal(Literal { language: None, .. }) => Ok(Term::iri(XSD_STRING)),
            _ => Err(ExprError),
        },
        ValueExpr::IsIri(arg) => Ok(Term::boolean(evaluate(arg, bindings)?.is_iri())),
        ValueExpr::IsBlank(arg) => Ok(Term::boolean(evaluate(arg, bindings)?.is_blank())),
        ValueExpr::IsLiteral(arg) => Ok(Term::boolean(evaluate(arg, bindings)?.is_literal())),
        ValueExpr::Regex {
            arg,
            pattern,
            flags,
        } => evaluate_regex(arg, pattern, flags.as_deref(), bindings).map(Term::boolean),
        ValueExpr::And(left, right) => {
            let l = is_true(left, bindings);
            if l == Ok(false) {
                return Ok(Term::boolean(false));
            }
            match (l, is_true(right, bindings)) {
                (Ok(true), Ok(r)) => Ok(Term::boolean(r)),
                (_, Ok(false)) => Ok(Term::boolean(false)),
                _ => Err(ExprError),
            }
        }
        ValueExpr::Or(left, right) => {
            let l = is_true(left, bindings);
            if l == Ok(true) {
                return Ok(Term::boolean(true));
            }
            match (l, is_true(right, bindings)) {
                (Ok(false), Ok(r)) => Ok(Term::boolean(r)),
                (_, Ok(true)) => Ok(Term::boolean(true)),
                _ => Err(ExprError),
            }
        }
        ValueExpr::Not(arg) => Ok(Term::boolean(!is_true(arg, bindings)?)),
        ValueExpr::SameTerm(left, right) => Ok(Term::boolean(
            evaluate(left, bindings)? == evaluate(right, bindings)?,
        )),
        ValueExpr::Compare { left, right, op } => {
            let l = evaluate(left, bindings)?;
            let r = evaluate(right, bindings)?;
            compare(&l, &r, *op).map(Term::boolean)
        }
        ValueExpr::Math { left, right, op } => {
            let l = evaluate(left, bindings)?;
            let r = evaluate(right, bindings)?;
            math(&l, &r, *op)
        }
    }
}

/// Effective boolean value of `expr`.
pub fn is_true(expr: &ValueExpr, bindings: &BindingSet) -> ExprResult<bool> {
    effective_boolean_value(&evaluate(expr, bindings)?)
}

pub fn effective_boolean_value(term: &Term) -> ExprResult<bool> {
    let Term::Literal(lit) = term else {
        return Err(ExprError);
    };
    if lit.datatype.as_deref() == Some(XSD_BOOLEAN) {
        return lit.as_bool().ok_or(ExprError);
    }
    if lit.numeric_kind().is_some() {
        let value = lit.numeric_value().ok_or(ExprError)?;
        return Ok(value != 0.0 && !value.is_nan());
    }
    if lit.is_string() || lit.language.is_some() {
        return Ok(!lit.label.is_empty());
    }
    Err(ExprError)
}

fn simple_label(term: &Term) -> ExprResult<&str> {
    match term {
        Term::Literal(lit) if lit.is_string() => Ok(&lit.label),
        _ => Err(ExprError),
    }
}

fn evaluate_regex(
    arg: &ValueExpr,
    pattern: &ValueExpr,
    flags: Option<&ValueExpr>,
    bindings: &BindingSet,
) -> ExprResult<bool> {
    let text = evaluate(arg, bindings)?;
    let text = match &text {
        Term::Literal(lit) if lit.datatype.is_none() || lit.is_string() => lit.label.as_str(),
        _ => return Err(ExprError),
    };
    let pattern = evaluate(pattern, bindings)?;
    let pattern = simple_label(&pattern)?;
    let flags = match flags {
        Some(f) => simple_label(&evaluate(f, bindings)?)?.to_string(),
        None => String::new(),
    };
    let regex = compile_regex(pattern, &flags)?;
    Ok(regex.is_match(text))
}

fn compile_regex(pattern: &str, flags: &str) -> ExprResult<Regex> {
    let key = (pattern.to_string(), flags.to_string());
    if let Some(regex) = REGEX_CACHE.with(|cache| cache.borrow().get(&key).cloned()) {
        return Ok(regex);
    }

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            's' => builder.dot_matches_new_line(true),
            'm' => builder.multi_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => return Err(ExprError),
        };
    }
    let regex = builder.build().map_err(|_| ExprError)?;
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.len() >= REGEX_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(key, regex.clone());
    });
    Ok(regex)
}

fn numeric(term: &Term) -> Option<(NumericKind, f64)> {
    let lit = term.as_literal()?;
    Some((lit.numeric_kind()?, lit.numeric_value()?))
}

/// Compares two terms with a comparison operator. Numeric literals compare
/// by value and simple literals lexically; anything else only supports
/// (in)equality.
pub fn compare(left: &Term, right: &Term, op: CompareOp) -> ExprResult<bool> {
    let ordering = match (left, right) {
        (Term::Literal(l), Term::Literal(r)) => {
            if let (Some((_, a)), Some((_, b))) = (numeric(left), numeric(right)) {
                a.partial_cmp(&b)
            } else if l.is_string() && r.is_string() {
                Some(l.label.cmp(&r.label))
            } else if let (Some(a), Some(b)) = (l.as_bool(), r.as_bool()) {
                Some(a.cmp(&b))
            } else {
                None
            }
        }
        _ => None,
    };

    match ordering {
        Some(ord) => Ok(match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }),
        None => match op {
            CompareOp::Eq => Ok(left == right),
            CompareOp::Ne => Ok(left != right),
            _ => Err(ExprError),
        },
    }
}

fn math(left: &Term, right: &Term, op: MathOp) -> ExprResult<Term> {
    let (lk, a) = numeric(left).ok_or(ExprError)?;
    let (rk, b) = numeric(right).ok_or(ExprError)?;
    let mut kind = lk.max(rk);

    if kind == NumericKind::Integer && op != MathOp::Div {
        let (a, b) = (a as i64, b as i64);
        let value = match op {
            MathOp::Add => a.checked_add(b),
            MathOp::Sub => a.checked_sub(b),
            MathOp::Mul => a.checked_mul(b),
            MathOp::Div => None,
        }
        .ok_or(ExprError)?;
        return Ok(Term::integer(value));
    }
    if kind == NumericKind::Integer {
        // Integer division yields a decimal
        kind = NumericKind::Decimal;
    }
    let value = match op {
        MathOp::Add => a + b,
        MathOp::Sub => a - b,
        MathOp::Mul => a * b,
        MathOp::Div => {
            if b == 0.0 && kind == NumericKind::Decimal {
                return Err(ExprError);
            }
            a / b
        }
    };
    Ok(numeric_term(kind, value))
}

pub fn numeric_term(kind: NumericKind, value: f64) -> Term {
    match kind {
        NumericKind::Integer => Term::integer(value as i64),
        NumericKind::Decimal => Term::typed_literal(format_decimal(value), kind.datatype()),
        NumericKind::Float | NumericKind::Double => {
            Term::typed_literal(format_double(value), kind.datatype())
        }
    }
}

fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn kind_rank(term: &Term) -> u8 {
    match term {
        Term::BlankNode(_) => 0,
        Term::Iri(_) => 1,
        Term::Literal(_) => 2,
    }
}

/// Total order used by ORDER BY: unbound, blank nodes, IRIs, then literals.
/// Numeric literals are ordered by value.
pub fn order_compare(left: Option<&Term>, right: Option<&Term>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(l), Some(r)) => {
            if let (Some((_, a)), Some((_, b))) = (numeric(l), numeric(r)) {
                if let Some(ord) = a.partial_cmp(&b) {
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
            kind_rank(l)
                .cmp(&kind_rank(r))
                .then_with(|| l.lexical().cmp(r.lexical()))
                .then_with(|| l.cmp(r))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::algebra::Var;
    use shared::terms::{XSD_DECIMAL, XSD_INTEGER};

    fn var(name: &str) -> ValueExpr {
        ValueExpr::var(name)
    }

    fn lit(term: Term) -> ValueExpr {
        ValueExpr::Constant(term)
    }

    #[test]
    fn test_unbound_variable_fails() {
        assert_eq!(evaluate(&var("x"), &BindingSet::new()), Err(ExprError));
        let bound = ValueExpr::Bound(Var::new("x"));
        assert_eq!(is_true(&bound, &BindingSet::new()), Ok(false));
    }

    #[test]
    fn test_numeric_comparison_across_types() {
        let bindings = BindingSet::new().with("age", Term::integer(30));
        let expr = ValueExpr::compare(
            var("age"),
            CompareOp::Gt,
            lit(Term::typed_literal("29.5", XSD_DECIMAL)),
        );
        assert_eq!(is_true(&expr, &bindings), Ok(true));
    }

    #[test]
    fn test_incomparable_ordering_fails() {
        let expr = ValueExpr::compare(lit(Term::iri("a")), CompareOp::Lt, lit(Term::iri("b")));
        assert_eq!(is_true(&expr, &BindingSet::new()), Err(ExprError));
        let eq = ValueExpr::compare(lit(Term::iri("a")), CompareOp::Eq, lit(Term::iri("a")));
        assert_eq!(is_true(&eq, &BindingSet::new()), Ok(true));
    }

    #[test]
    fn test_and_or_error_handling() {
        let error = var("missing");
        let f = lit(Term::boolean(false));
        let t = lit(Term::boolean(true));
        let b = BindingSet::new();
        assert_eq!(is_true(&ValueExpr::and(error.clone(), f.clone()), &b), Ok(false));
        assert_eq!(is_true(&ValueExpr::and(error.clone(), t.clone()), &b), Err(ExprError));
        assert_eq!(is_true(&ValueExpr::or(error.clone(), t), &b), Ok(true));
        assert_eq!(is_true(&ValueExpr::or(error, f), &b), Err(ExprError));
    }

    #[test]
    fn test_regex_is_compiled_once_per_pattern() {
        REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
        let expr = ValueExpr::Regex {
            arg: Box::new(var("name")),
            pattern: Box::new(lit(Term::literal("^al"))),
            flags: Some(Box::new(lit(Term::literal("i")))),
        };
        for name in ["Alice", "Bob", "Albert"] {
            let row = BindingSet::new().with("name", Term::literal(name));
            evaluate(&expr, &row).unwrap();
        }
        REGEX_CACHE.with(|cache| {
            let cache = cache.borrow();
            assert_eq!(cache.len(), 1);
            assert!(cache.contains_key(&("^al".to_string(), "i".to_string())));
        });
    }

    #[test]
    fn test_unknown_regex_flag_is_not_cached() {
        REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
        assert_eq!(compile_regex("a", "q").unwrap_err(), ExprError);
        REGEX_CACHE.with(|cache| assert!(cache.borrow().is_empty()));
    }

    #[test]
    fn test_regex_flags() {
        let expr = ValueExpr::Regex {
            arg: Box::new(lit(Term::literal("Alice"))),
            pattern: Box::new(lit(Term::literal("^ali"))),
            flags: Some(Box::new(lit(Term::literal("i")))),
        };
        assert_eq!(is_true(&expr, &BindingSet::new()), Ok(true));
    }

    #[test]
    fn test_integer_math_and_division() {
        let sum = ValueExpr::Math {
            left: Box::new(lit(Term::integer(2))),
            right: Box::new(lit(Term::integer(3))),
            op: MathOp::Add,
        };
        assert_eq!(evaluate(&sum, &BindingSet::new()), Ok(Term::integer(5)));
        let div = ValueExpr::Math {
            left: Box::new(lit(Term::integer(3))),
            right: Box::new(lit(Term::integer(2))),
            op: MathOp::Div,
        };
        assert_eq!(
            evaluate(&div, &BindingSet::new()),
            Ok(Term::typed_literal("1.5", XSD_DECIMAL))
        );
    }

    #[test]
    fn test_effective_boolean_value() {
        assert_eq!(effective_boolean_value(&Term::literal("")), Ok(false));
        assert_eq!(effective_boolean_value(&Term::literal("x")), Ok(true));
        assert_eq!(
            effective_boolean_value(&Term::typed_literal("0", XSD_INTEGER)),
            Ok(false)
        );
        assert_eq!(effective_boolean_value(&Term::iri("x")), Err(ExprError));
    }

    #[test]
    fn test_order_compare() {
        let two = Term::integer(2);
        let ten = Term::integer(10);
        assert_eq!(order_compare(Some(&two), Some(&ten)), Ordering::Less);
        assert_eq!(order_compare(None, Some(&two)), Ordering::Less);
        assert_eq!(
            order_compare(Some(&Term::iri("z")), Some(&Term::literal("a"))),
            Ordering::Less
        );
    }
}
