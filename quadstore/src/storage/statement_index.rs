/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The authoritative quad set.
//!
//! Statements live in a slot arena. Each one is linked into the primary list
//! and into the subject, predicate, object and (when present) context list of
//! its terms. Lists are only compacted by [`Graph::commit`] and
//! [`Graph::rollback`], which callers run under the query write lock.

use super::statement_list::{StatementId, StatementList};
use super::txn_status::{CommitAction, ReadMode, TxnStatus};
use crate::optimizer::cost::estimator::CardinalitySource;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use shared::dictionary::{Dictionary, TermId};
use shared::quad::{Quad, Statement};
use shared::terms::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Subject,
    Predicate,
    Object,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemStatement {
    pub quad: Quad,
    pub explicit: bool,
    pub status: TxnStatus,
}

#[derive(Debug, Clone, Default)]
struct TermLists {
    subject: StatementList,
    predicate: StatementList,
    object: StatementList,
    context: StatementList,
}

impl TermLists {
    fn get(&self, position: Position) -> &StatementList {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
            Position::Context => &self.context,
        }
    }

    fn get_mut(&mut self, position: Position) -> &mut StatementList {
        match position {
            Position::Subject => &mut self.subject,
            Position::Predicate => &mut self.predicate,
            Position::Object => &mut self.object,
            Position::Context => &mut self.context,
        }
    }
}

/// The list a lookup walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    All,
    Term(TermId, Position),
}

/// Resolved lookup criteria. `contexts == None` accepts any context, a
/// `None` entry in the list stands for the default graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadPattern {
    pub subject: Option<TermId>,
    pub predicate: Option<TermId>,
    pub object: Option<TermId>,
    pub contexts: Option<Vec<Option<TermId>>>,
    pub explicit_only: bool,
    pub mode: ReadMode,
}

impl QuadPattern {
    fn accepts(&self, st: &MemStatement) -> bool {
        let q = &st.quad;
        self.subject.map_or(true, |s| s == q.subject)
            && self.predicate.map_or(true, |p| p == q.predicate)
            && self.object.map_or(true, |o| o == q.object)
            && self
                .contexts
                .as_ref()
                .map_or(true, |ctxs| ctxs.contains(&q.context))
            && st.status.is_visible(st.explicit, self.mode, self.explicit_only)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindPlan {
    pub driver: Driver,
    pub pattern: QuadPattern,
}

/// What a commit did, as reported to listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub added: bool,
    pub removed: bool,
    /// Any committed state changed, including explicit flag flips.
    pub changed: bool,
}

#[derive(Debug, Default)]
pub struct Graph {
    dictionary: Dictionary,
    slots: Vec<Option<MemStatement>>,
    free_slots: Vec<StatementId>,
    lookup: FxHashMap<Quad, StatementId>,
    all: StatementList,
    term_lists: Vec<TermLists>,
    txn_statements: FxHashSet<StatementId>,
    live: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Number of physical rows, uncommitted ones included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.txn_statements.is_empty()
    }

    fn encode(&mut self, term: &Term) -> TermId {
        let id = self.dictionary.encode(term);
        if self.term_lists.len() <= id.index() {
            self.term_lists.resize_with(id.index() + 1, TermLists::default);
        }
        id
    }

    fn resolve(&self, term: Option<&Term>) -> Result<Option<TermId>, ()> {
        match term {
            Some(t) => self.dictionary.lookup(t).map(Some).ok_or(()),
            None => Ok(None),
        }
    }

    /// Builds a lookup plan. `None` means the lookup can match nothing,
    /// typically because a bound term was never interned.
    pub fn plan(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        contexts: &[Option<Term>],
        explicit_only: bool,
        mode: ReadMode,
    ) -> Option<FindPlan> {
        let subject = self.resolve(subject).ok()?;
        let predicate = self.resolve(predicate).ok()?;
        let object = self.resolve(object).ok()?;

        let contexts = if contexts.is_empty() {
            None
        } else {
            let mut ids: Vec<Option<TermId>> = Vec::with_capacity(contexts.len());
            for ctx in contexts {
                let id = match ctx {
                    None => None,
                    // Unknown contexts cannot match anything
                    Some(term) => match self.dictionary.lookup(term) {
                        Some(id) => Some(id),
                        None => continue,
                    },
                };
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            if ids.is_empty() {
                return None;
            }
            Some(ids)
        };

        let mut candidates = vec![Driver::All];
        if let Some(s) = subject {
            candidates.push(Driver::Term(s, Position::Subject));
        }
        if let Some(p) = predicate {
            candidates.push(Driver::Term(p, Position::Predicate));
        }
        if let Some(o) = object {
            candidates.push(Driver::Term(o, Position::Object));
        }
        if let Some([Some(c)]) = contexts.as_deref() {
            candidates.push(Driver::Term(*c, Position::Context));
        }
        let driver = candidates
            .into_iter()
            .min_by_key(|d| self.list(*d).map_or(0, StatementList::len))
            .unwrap_or(Driver::All);

        Some(FindPlan {
            driver,
            pattern: QuadPattern {
                subject,
                predicate,
                object,
                contexts,
                explicit_only,
                mode,
            },
        })
    }

    pub fn list(&self, driver: Driver) -> Option<&StatementList> {
        match driver {
            Driver::All => Some(&self.all),
            Driver::Term(id, position) => self.term_lists.get(id.index()).map(|l| l.get(position)),
        }
    }

    pub fn statement(&self, id: StatementId) -> Option<&MemStatement> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// The statement at `id` when it satisfies `pattern`.
    pub fn matching(&self, id: StatementId, pattern: &QuadPattern) -> Option<&MemStatement> {
        self.statement(id).filter(|st| pattern.accepts(st))
    }

    pub fn decode(&self, st: &MemStatement) -> Option<Statement> {
        let q = &st.quad;
        let context = match q.context {
            Some(c) => Some(self.dictionary.decode(c)?.clone()),
            None => None,
        };
        Some(Statement {
            subject: self.dictionary.decode(q.subject)?.clone(),
            predicate: self.dictionary.decode(q.predicate)?.clone(),
            object: self.dictionary.decode(q.object)?.clone(),
            context,
            explicit: st.explicit,
        })
    }

    /// Ids of all statements matching `plan`, in driver order.
    pub fn matching_ids(&self, plan: &FindPlan) -> Vec<StatementId> {
        match self.list(plan.driver) {
            Some(list) => list
                .iter()
                .filter(|id| self.matching(*id, &plan.pattern).is_some())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Adds or re-adds a statement inside the open transaction. Returns
    /// whether anything changed.
    pub fn add(
        &mut self,
        subject: &Term,
        predicate: &Term,
        object: &Term,
        context: Option<&Term>,
        explicit: bool,
    ) -> bool {
        let quad = self.encode_quad(subject, predicate, object, context);
        if let Some(&id) = self.lookup.get(&quad) {
            let Some(st) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
                return false;
            };
            match st.status.on_add(st.explicit, explicit) {
                Some(t) => {
                    st.status = t.status;
                    st.explicit = t.explicit;
                    self.txn_statements.insert(id);
                    true
                }
                None => false,
            }
        } else {
            let id = self.insert_new(quad, explicit, TxnStatus::New);
            self.txn_statements.insert(id);
            true
        }
    }

    /// Inserts an already committed statement, as done while loading a
    /// snapshot.
    pub fn insert_committed(
        &mut self,
        subject: &Term,
        predicate: &Term,
        object: &Term,
        context: Option<&Term>,
        explicit: bool,
    ) {
        let quad = self.encode_quad(subject, predicate, object, context);
        match self.lookup.get(&quad) {
            Some(&id) => {
                if let Some(st) = self.slots.get_mut(id.index()).and_then(Option::as_mut) {
                    st.explicit |= explicit;
                }
            }
            None => {
                self.insert_new(quad, explicit, TxnStatus::Neutral);
            }
        }
    }

    fn encode_quad(
        &mut self,
        subject: &Term,
        predicate: &Term,
        object: &Term,
        context: Option<&Term>,
    ) -> Quad {
        Quad {
            subject: self.encode(subject),
            predicate: self.encode(predicate),
            object: self.encode(object),
            context: context.map(|c| self.encode(c)),
        }
    }

    fn insert_new(&mut self, quad: Quad, explicit: bool, status: TxnStatus) -> StatementId {
        let st = MemStatement {
            quad,
            explicit,
            status,
        };
        let id = match self.free_slots.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(st);
                id
            }
            None => {
                self.slots.push(Some(st));
                StatementId((self.slots.len() - 1) as u32)
            }
        };
        self.lookup.insert(quad, id);
        self.all.push(id);
        for (term, position) in Self::positions(&quad) {
            self.term_lists[term.index()].get_mut(position).push(id);
        }
        self.live += 1;
        id
    }

    fn positions(quad: &Quad) -> impl Iterator<Item = (TermId, Position)> {
        [
            Some((quad.subject, Position::Subject)),
            Some((quad.predicate, Position::Predicate)),
            Some((quad.object, Position::Object)),
            quad.context.map(|c| (c, Position::Context)),
        ]
        .into_iter()
        .flatten()
    }

    /// Marks every statement matching the pattern as removed in the open
    /// transaction, through the explicit or the inferred path.
    pub fn remove(
        &mut self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        contexts: &[Option<Term>],
        explicit: bool,
    ) -> usize {
        let Some(plan) = self.plan(subject, predicate, object, contexts, explicit, ReadMode::Transaction)
        else {
            return 0;
        };
        let mut removed = 0;
        for id in self.matching_ids(&plan) {
            let Some(st) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
                continue;
            };
            if let Some((t, counted)) = st.status.on_remove(st.explicit, explicit) {
                st.status = t.status;
                st.explicit = t.explicit;
                self.txn_statements.insert(id);
                if counted {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Resolves every pending status. Run under the query write lock.
    pub fn commit(&mut self) -> CommitSummary {
        let mut summary = CommitSummary::default();
        let mut purged = FxHashSet::default();

        for id in std::mem::take(&mut self.txn_statements) {
            let Some(st) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
                continue;
            };
            match st.status {
                TxnStatus::Neutral => continue,
                TxnStatus::New => summary.added = true,
                TxnStatus::Deprecated => summary.removed = true,
                _ => {}
            }
            summary.changed = true;
            match st.status.on_commit(st.explicit) {
                CommitAction::Keep { explicit } => {
                    st.explicit = explicit;
                    st.status = TxnStatus::Neutral;
                }
                CommitAction::Purge => {
                    purged.insert(id);
                }
            }
        }

        self.purge(&purged);
        debug!(
            "commit: added={} removed={} purged {} statements",
            summary.added,
            summary.removed,
            purged.len()
        );
        summary
    }

    /// Reverts every pending status. Run under the query write lock.
    pub fn rollback(&mut self) -> usize {
        let mut purged = FxHashSet::default();
        let mut reverted = 0;
        for id in std::mem::take(&mut self.txn_statements) {
            let Some(st) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
                continue;
            };
            if st.status == TxnStatus::Neutral {
                continue;
            }
            reverted += 1;
            if st.status.purged_on_rollback() {
                purged.insert(id);
            } else {
                st.status = TxnStatus::Neutral;
            }
        }
        self.purge(&purged);
        reverted
    }

    fn purge(&mut self, purged: &FxHashSet<StatementId>) {
        if purged.is_empty() {
            return;
        }
        let mut touched: FxHashSet<(TermId, Position)> = FxHashSet::default();
        for id in purged {
            if let Some(st) = self.slots.get_mut(id.index()).and_then(Option::take) {
                self.lookup.remove(&st.quad);
                touched.extend(Self::positions(&st.quad));
                self.free_slots.push(*id);
                self.live -= 1;
            }
        }
        self.all.compact(purged);
        for (term, position) in touched {
            if let Some(lists) = self.term_lists.get_mut(term.index()) {
                lists.get_mut(position).compact(purged);
            }
        }
    }

    /// Resources used as the context of at least one visible statement.
    pub fn context_ids(&self, mode: ReadMode) -> Vec<Term> {
        self.dictionary
            .iter()
            .filter(|(_, term)| term.is_resource())
            .filter(|(id, _)| {
                self.term_lists.get(id.index()).map_or(false, |lists| {
                    lists.context.iter().any(|sid| {
                        self.statement(sid)
                            .map_or(false, |st| st.status.is_visible(st.explicit, mode, false))
                    })
                })
            })
            .map(|(_, term)| term.clone())
            .collect()
    }

    /// Committed statements in insertion order.
    pub fn committed_statements(&self) -> impl Iterator<Item = Statement> + '_ {
        self.all.iter().filter_map(move |id| {
            let st = self.statement(id)?;
            if st.status.is_visible(st.explicit, ReadMode::Committed, false) {
                self.decode(st)
            } else {
                None
            }
        })
    }
}

impl CardinalitySource for Graph {
    fn total_statements(&self) -> usize {
        self.live
    }

    fn list_size(&self, term: &Term, position: Position) -> Option<usize> {
        let id = self.dictionary.lookup(term)?;
        Some(self.list(Driver::Term(id, position)).map_or(0, StatementList::len))
    }
}
