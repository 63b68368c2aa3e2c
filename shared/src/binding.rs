/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::terms::Term;
use std::collections::BTreeMap;
use std::fmt;

/// One query solution: variable name to bound term, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingSet {
    bindings: BTreeMap<String, Term>,
}

impl BindingSet {
    pub fn new() -> Self {
        BindingSet {
            bindings: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Binds `name`, overwriting any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Term) {
        self.bindings.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Term> {
        self.bindings.remove(name)
    }

    pub fn with(mut self, name: impl Into<String>, value: Term) -> Self {
        self.insert(name, value);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Keeps only the bindings whose name satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.bindings.retain(|k, _| keep(k));
    }

    /// Two solutions are compatible when they agree on every shared name.
    pub fn is_compatible(&self, other: &BindingSet) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .iter()
            .all(|(name, value)| large.get(name).map_or(true, |v| v == value))
    }

    /// Adds every binding of `other` not already present.
    pub fn extend_from(&mut self, other: &BindingSet) {
        for (name, value) in other.iter() {
            if !self.contains(name) {
                self.insert(name, value.clone());
            }
        }
    }
}

impl FromIterator<(String, Term)> for BindingSet {
    fn from_iter<I: IntoIterator<Item = (String, Term)>>(iter: I) -> Self {
        BindingSet {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for BindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        let a = BindingSet::new().with("x", Term::iri("a")).with("y", Term::iri("b"));
        let b = BindingSet::new().with("x", Term::iri("a"));
        let c = BindingSet::new().with("x", Term::iri("c"));
        assert!(a.is_compatible(&b));
        assert!(!a.is_compatible(&c));
        assert!(b.is_compatible(&BindingSet::new()));
    }

    #[test]
    fn test_extend_keeps_existing() {
        let mut a = BindingSet::new().with("x", Term::iri("a"));
        let b = BindingSet::new().with("x", Term::iri("b")).with("z", Term::iri("z"));
        a.extend_from(&b);
        assert_eq!(a.get("x"), Some(&Term::iri("a")));
        assert_eq!(a.get("z"), Some(&Term::iri("z")));
    }
}
