/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::dictionary::TermId;
use crate::terms::Term;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoded quad as stored by the index. `context == None` is the default graph.
#[derive(PartialEq, Debug, Clone, Copy, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub subject: TermId,
    pub predicate: TermId,
    pub object: TermId,
    pub context: Option<TermId>,
}

/// A decoded statement as handed out to callers.
#[derive(PartialEq, Debug, Clone, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub context: Option<Term>,
    pub explicit: bool,
}

impl Statement {
    pub fn new(subject: Term, predicate: Term, object: Term, context: Option<Term>) -> Self {
        Statement {
            subject,
            predicate,
            object,
            context,
            explicit: true,
        }
    }

    /// Same quad, ignoring the explicit flag.
    pub fn same_quad(&self, other: &Statement) -> bool {
        self.subject == other.subject
            && self.predicate == other.predicate
            && self.object == other.object
            && self.context == other.context
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{} {} {} {} .", self.subject, self.predicate, self.object, ctx),
            None => write!(f, "{} {} {} .", self.subject, self.predicate, self.object),
        }
    }
}
