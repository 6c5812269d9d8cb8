//! Relocation policy

use std::fmt;

/// How relocations found by comparison are turned into suboperations.
///
/// Chosen per invocation; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelocationSyncMode {
    /// Relocations are reported and blocked
    #[default]
    Disabled,
    /// Rename files in the destination to match the base
    Move {
        allow_duplicate_increase: bool,
        allow_duplicate_reduction: bool,
    },
    /// Store a fresh copy at every base path, never move anything
    AdditiveDuplicating,
}

impl RelocationSyncMode {
    pub fn strict_move() -> Self {
        Self::Move {
            allow_duplicate_increase: false,
            allow_duplicate_reduction: false,
        }
    }
}

impl fmt::Display for RelocationSyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Move {
                allow_duplicate_increase,
                allow_duplicate_reduction,
            } => write!(
                f,
                "move (duplicate increase: {}, duplicate reduction: {})",
                allow_duplicate_increase, allow_duplicate_reduction
            ),
            Self::AdditiveDuplicating => write!(f, "additive duplicating"),
        }
    }
}
