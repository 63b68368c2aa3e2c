/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use rustc_hash::FxHashSet;

/// Slot of a statement in the index arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(pub u32);

impl StatementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Append-only list of statement ids. Positions stay valid until
/// [`StatementList::compact`] runs, which only happens with the query write
/// lock held.
#[derive(Debug, Clone, Default)]
pub struct StatementList {
    ids: Vec<StatementId>,
}

impl StatementList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: StatementId) {
        self.ids.push(id);
    }

    pub fn get(&self, position: usize) -> Option<StatementId> {
        self.ids.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StatementId> + '_ {
        self.ids.iter().copied()
    }

    /// Drops every id in `purged`, keeping the order of the rest.
    pub fn compact(&mut self, purged: &FxHashSet<StatementId>) {
        self.ids.retain(|id| !purged.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_keeps_order() {
        let mut list = StatementList::new();
        for i in 0..5 {
            list.push(StatementId(i));
        }
        let purged: FxHashSet<_> = [StatementId(1), StatementId(3)].into_iter().collect();
        list.compact(&purged);
        assert_eq!(
            list.iter().collect::<Vec<_>>(),
            vec![StatementId(0), StatementId(2), StatementId(4)]
        );
    }
}
