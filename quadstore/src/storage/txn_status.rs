/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Per-statement transaction status and its transition table.

/// Visibility tag of a stored statement relative to the open transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxnStatus {
    /// Committed, untouched by the open transaction.
    #[default]
    Neutral,
    /// Added in the open transaction.
    New,
    /// Committed, removed in the open transaction.
    Deprecated,
    /// Added and then removed in the open transaction.
    Zombie,
    /// Committed as inferred, promoted to explicit.
    Explicit,
    /// Committed as explicit, demoted to inferred.
    Inferred,
}

/// Which state a reader wants to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadMode {
    /// Everything, regardless of status.
    Raw,
    /// Last committed state.
    Committed,
    /// State as seen from inside the open transaction.
    Transaction,
}

/// New status and explicit flag after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: TxnStatus,
    pub explicit: bool,
}

impl Transition {
    fn to(status: TxnStatus, explicit: bool) -> Self {
        Transition { status, explicit }
    }
}

/// Outcome of a commit for one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    Keep { explicit: bool },
    Purge,
}

impl TxnStatus {
    /// Re-adding an existing statement. `None` means nothing changes.
    pub fn on_add(self, stored_explicit: bool, explicit: bool) -> Option<Transition> {
        match self {
            TxnStatus::Neutral if !stored_explicit && explicit => {
                Some(Transition::to(TxnStatus::Explicit, stored_explicit))
            }
            TxnStatus::New if !stored_explicit && explicit => {
                Some(Transition::to(TxnStatus::New, true))
            }
            TxnStatus::Deprecated => {
                if stored_explicit == explicit {
                    Some(Transition::to(TxnStatus::Neutral, stored_explicit))
                } else if explicit {
                    Some(Transition::to(TxnStatus::Explicit, stored_explicit))
                } else {
                    Some(Transition::to(TxnStatus::Inferred, stored_explicit))
                }
            }
            TxnStatus::Inferred if stored_explicit && explicit => {
                Some(Transition::to(TxnStatus::Neutral, stored_explicit))
            }
            TxnStatus::Zombie => Some(Transition::to(TxnStatus::New, explicit)),
            _ => None,
        }
    }

    /// Removing a statement through the explicit (`true`) or inferred path.
    /// The flag of the outcome tells whether the statement counts as removed.
    pub fn on_remove(self, stored_explicit: bool, explicit: bool) -> Option<(Transition, bool)> {
        match self {
            TxnStatus::Neutral if stored_explicit == explicit => {
                Some((Transition::to(TxnStatus::Deprecated, stored_explicit), true))
            }
            TxnStatus::New if stored_explicit == explicit => {
                Some((Transition::to(TxnStatus::Zombie, stored_explicit), true))
            }
            TxnStatus::Inferred if stored_explicit && !explicit => {
                Some((Transition::to(TxnStatus::Deprecated, stored_explicit), true))
            }
            TxnStatus::Explicit if !stored_explicit && explicit => {
                Some((Transition::to(TxnStatus::Neutral, stored_explicit), false))
            }
            _ => None,
        }
    }

    pub fn on_commit(self, stored_explicit: bool) -> CommitAction {
        match self {
            TxnStatus::Deprecated | TxnStatus::Zombie => CommitAction::Purge,
            TxnStatus::Explicit => CommitAction::Keep { explicit: true },
            TxnStatus::Inferred => CommitAction::Keep { explicit: false },
            TxnStatus::Neutral | TxnStatus::New => CommitAction::Keep {
                explicit: stored_explicit,
            },
        }
    }

    /// `true` when rollback must drop the statement entirely.
    pub fn purged_on_rollback(self) -> bool {
        matches!(self, TxnStatus::New | TxnStatus::Zombie)
    }

    pub fn is_visible(self, stored_explicit: bool, mode: ReadMode, explicit_only: bool) -> bool {
        match mode {
            ReadMode::Raw => !explicit_only || stored_explicit,
            ReadMode::Committed => {
                if matches!(self, TxnStatus::New | TxnStatus::Zombie) {
                    return false;
                }
                !explicit_only || stored_explicit
            }
            ReadMode::Transaction => {
                if matches!(self, TxnStatus::Deprecated | TxnStatus::Zombie) {
                    return false;
                }
                if explicit_only
                    && ((!stored_explicit && self != TxnStatus::Explicit)
                        || self == TxnStatus::Inferred)
                {
                    return false;
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_promotes_neutral_inferred() {
        let t = TxnStatus::Neutral.on_add(false, true).unwrap();
        assert_eq!(t, Transition::to(TxnStatus::Explicit, false));
    }

    #[test]
    fn test_add_neutral_same_flag_is_noop() {
        assert_eq!(TxnStatus::Neutral.on_add(true, true), None);
        assert_eq!(TxnStatus::Neutral.on_add(true, false), None);
        assert_eq!(TxnStatus::Neutral.on_add(false, false), None);
    }

    #[test]
    fn test_add_new_inferred_becomes_explicit() {
        let t = TxnStatus::New.on_add(false, true).unwrap();
        assert_eq!(t, Transition::to(TxnStatus::New, true));
        assert_eq!(TxnStatus::New.on_add(true, false), None);
    }

    #[test]
    fn test_add_deprecated_same_flag_restores() {
        let t = TxnStatus::Deprecated.on_add(true, true).unwrap();
        assert_eq!(t, Transition::to(TxnStatus::Neutral, true));
    }

    #[test]
    fn test_add_deprecated_inferred_as_explicit() {
        let t = TxnStatus::Deprecated.on_add(false, true).unwrap();
        assert_eq!(t, Transition::to(TxnStatus::Explicit, false));
    }

    #[test]
    fn test_add_deprecated_explicit_as_inferred() {
        let t = TxnStatus::Deprecated.on_add(true, false).unwrap();
        assert_eq!(t, Transition::to(TxnStatus::Inferred, true));
    }

    #[test]
    fn test_add_inferred_back_to_explicit() {
        let t = TxnStatus::Inferred.on_add(true, true).unwrap();
        assert_eq!(t, Transition::to(TxnStatus::Neutral, true));
    }

    #[test]
    fn test_add_zombie_revives() {
        let t = TxnStatus::Zombie.on_add(true, false).unwrap();
        assert_eq!(t, Transition::to(TxnStatus::New, false));
    }

    #[test]
    fn test_add_explicit_is_noop() {
        assert_eq!(TxnStatus::Explicit.on_add(false, true), None);
    }

    #[test]
    fn test_remove_neutral_deprecates() {
        let (t, counted) = TxnStatus::Neutral.on_remove(true, true).unwrap();
        assert_eq!(t.status, TxnStatus::Deprecated);
        assert!(counted);
        assert_eq!(TxnStatus::Neutral.on_remove(true, false), None);
    }

    #[test]
    fn test_remove_new_becomes_zombie() {
        let (t, counted) = TxnStatus::New.on_remove(false, false).unwrap();
        assert_eq!(t.status, TxnStatus::Zombie);
        assert!(counted);
    }

    #[test]
    fn test_remove_inferred_demotion_deprecates() {
        let (t, counted) = TxnStatus::Inferred.on_remove(true, false).unwrap();
        assert_eq!(t.status, TxnStatus::Deprecated);
        assert!(counted);
    }

    #[test]
    fn test_remove_explicit_promotion_reverts() {
        let (t, counted) = TxnStatus::Explicit.on_remove(false, true).unwrap();
        assert_eq!(t.status, TxnStatus::Neutral);
        assert!(!counted);
    }

    #[test]
    fn test_remove_removed_is_noop() {
        assert_eq!(TxnStatus::Deprecated.on_remove(true, true), None);
        assert_eq!(TxnStatus::Zombie.on_remove(true, true), None);
    }

    #[test]
    fn test_commit_actions() {
        assert_eq!(TxnStatus::New.on_commit(true), CommitAction::Keep { explicit: true });
        assert_eq!(TxnStatus::Deprecated.on_commit(true), CommitAction::Purge);
        assert_eq!(TxnStatus::Zombie.on_commit(false), CommitAction::Purge);
        assert_eq!(TxnStatus::Explicit.on_commit(false), CommitAction::Keep { explicit: true });
        assert_eq!(TxnStatus::Inferred.on_commit(true), CommitAction::Keep { explicit: false });
    }

    #[test]
    fn test_rollback_purges_only_uncommitted() {
        assert!(TxnStatus::New.purged_on_rollback());
        assert!(TxnStatus::Zombie.purged_on_rollback());
        assert!(!TxnStatus::Deprecated.purged_on_rollback());
        assert!(!TxnStatus::Explicit.purged_on_rollback());
    }

    #[test]
    fn test_visibility_modes() {
        assert!(!TxnStatus::New.is_visible(true, ReadMode::Committed, false));
        assert!(TxnStatus::New.is_visible(true, ReadMode::Transaction, false));
        assert!(TxnStatus::Deprecated.is_visible(true, ReadMode::Committed, false));
        assert!(!TxnStatus::Deprecated.is_visible(true, ReadMode::Transaction, false));
        assert!(TxnStatus::Zombie.is_visible(true, ReadMode::Raw, false));
        // Promotion is visible as explicit inside the transaction only
        assert!(TxnStatus::Explicit.is_visible(false, ReadMode::Transaction, true));
        assert!(!TxnStatus::Explicit.is_visible(false, ReadMode::Committed, true));
        assert!(!TxnStatus::Inferred.is_visible(true, ReadMode::Transaction, true));
        assert!(TxnStatus::Inferred.is_visible(true, ReadMode::Committed, true));
    }
}
