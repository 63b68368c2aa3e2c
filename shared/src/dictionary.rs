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
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Dense identifier of an interned term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TermId(pub u32);

impl TermId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// Dictionary for encoding and decoding terms
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    term_to_id: FxHashMap<Term, TermId>,
    id_to_term: Vec<Term>,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary {
            term_to_id: FxHashMap::default(),
            id_to_term: Vec::new(),
        }
    }

    /// Interns `term`, returning the existing id when it is already known.
    pub fn encode(&mut self, term: &Term) -> TermId {
        if let Some(&id) = self.term_to_id.get(term) {
            id
        } else {
            let id = TermId(self.id_to_term.len() as u32);
            self.term_to_id.insert(term.clone(), id);
            self.id_to_term.push(term.clone());
            id
        }
    }

    /// Looks a term up without interning it.
    pub fn lookup(&self, term: &Term) -> Option<TermId> {
        self.term_to_id.get(term).copied()
    }

    pub fn decode(&self, id: TermId) -> Option<&Term> {
        self.id_to_term.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.id_to_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_term.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, &Term)> {
        self.id_to_term
            .iter()
            .enumerate()
            .map(|(i, term)| (TermId(i as u32), term))
    }
}
