/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_INT: &str = "http://www.w3.org/2001/XMLSchema#int";
pub const XSD_LONG: &str = "http://www.w3.org/2001/XMLSchema#long";

/// An RDF value: IRI, blank node or literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

/// A literal with an optional language tag or datatype. At most one of the
/// two is set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub label: String,
    pub language: Option<String>,
    pub datatype: Option<String>,
}

/// Numeric type ladder used for arithmetic and SUM promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericKind {
    Integer,
    Decimal,
    Float,
    Double,
}

impl NumericKind {
    pub fn datatype(self) -> &'static str {
        match self {
            NumericKind::Integer => XSD_INTEGER,
            NumericKind::Decimal => XSD_DECIMAL,
            NumericKind::Float => XSD_FLOAT,
            NumericKind::Double => XSD_DOUBLE,
        }
    }

    pub fn from_datatype(datatype: &str) -> Option<Self> {
        match datatype {
            XSD_INTEGER | XSD_INT | XSD_LONG => Some(NumericKind::Integer),
            XSD_DECIMAL => Some(NumericKind::Decimal),
            XSD_FLOAT => Some(NumericKind::Float),
            XSD_DOUBLE => Some(NumericKind::Double),
            _ => None,
        }
    }
}

impl Literal {
    pub fn plain(label: impl Into<String>) -> Self {
        Literal {
            label: label.into(),
            language: None,
            datatype: None,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.language.is_none() && self.datatype.is_none()
    }

    /// True for plain literals and `xsd:string` typed ones.
    pub fn is_string(&self) -> bool {
        self.language.is_none()
            && self.datatype.as_deref().map_or(true, |dt| dt == XSD_STRING)
    }

    pub fn numeric_kind(&self) -> Option<NumericKind> {
        self.datatype.as_deref().and_then(NumericKind::from_datatype)
    }

    /// Value of a literal with a numeric datatype.
    pub fn numeric_value(&self) -> Option<f64> {
        self.numeric_kind()?;
        self.label.trim().parse::<f64>().ok()
    }

    /// Lenient coercion: any literal whose label parses as a number.
    pub fn as_double(&self) -> Option<f64> {
        self.label.trim().parse::<f64>().ok()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.datatype.as_deref() {
            Some(XSD_BOOLEAN) => match self.label.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::BlankNode(id.into())
    }

    pub fn literal(label: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(label))
    }

    pub fn lang_literal(label: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal {
            label: label.into(),
            language: Some(language.into()),
            datatype: None,
        })
    }

    pub fn typed_literal(label: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal {
            label: label.into(),
            language: None,
            datatype: Some(datatype.into()),
        })
    }

    pub fn integer(value: i64) -> Self {
        Term::typed_literal(value.to_string(), XSD_INTEGER)
    }

    pub fn double(value: f64) -> Self {
        Term::typed_literal(format_double(value), XSD_DOUBLE)
    }

    pub fn boolean(value: bool) -> Self {
        Term::typed_literal(if value { "true" } else { "false" }, XSD_BOOLEAN)
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// IRIs and blank nodes may appear as subject or context.
    pub fn is_resource(&self) -> bool {
        !self.is_literal()
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// The lexical form: IRI string, blank node id or literal label.
    pub fn lexical(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::BlankNode(id) => id,
            Term::Literal(lit) => &lit.label,
        }
    }
}

/// Canonical lexical form of a double, keeping a decimal point for integral values.
pub fn format_double(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "INF".to_string() } else { "-INF".to_string() }
    } else if value.is_nan() {
        "NaN".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn escape(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape(&self.label))?;
        if let Some(lang) = &self.language {
            write!(f, "@{}", lang)
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{}>", dt)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(id) => write!(f, "_:{}", id),
            Term::Literal(lit) => lit.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(Term::iri("http://ex.org/a").to_string(), "<http://ex.org/a>");
        assert_eq!(Term::blank("b0").to_string(), "_:b0");
        assert_eq!(Term::lang_literal("chat", "fr").to_string(), "\"chat\"@fr");
        assert_eq!(
            Term::integer(4).to_string(),
            format!("\"4\"^^<{}>", XSD_INTEGER)
        );
    }

    #[test]
    fn test_numeric_literals() {
        let lit = Literal {
            label: "2.5".to_string(),
            language: None,
            datatype: Some(XSD_DECIMAL.to_string()),
        };
        assert_eq!(lit.numeric_kind(), Some(NumericKind::Decimal));
        assert_eq!(lit.numeric_value(), Some(2.5));
        assert_eq!(Literal::plain("2.5").numeric_value(), None);
        assert_eq!(Literal::plain("2.5").as_double(), Some(2.5));
    }

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(3.0), "3.0");
        assert_eq!(format_double(0.25), "0.25");
        assert_eq!(format_double(f64::INFINITY), "INF");
    }
}
