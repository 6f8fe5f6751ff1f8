//! Status DAGs (§3, §8 "status monotonicity").
//!
//! `MyInfo` and `MyNode` share one status enum and one monotonicity rule:
//! a transition is valid iff the target rank is strictly greater than the
//! current rank. This reproduces the DAG
//! `Init -> Pending -> InternalPending -> InternalSync -> Alive -> Deleted`
//! while still allowing the two documented shortcuts (`Pending -> Alive` for
//! a freshly bootstrapped identity, `InternalSync -> Alive` for a joined
//! device catching up) because both skip forward, never backward.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Status {
    Init,
    Pending,
    InternalPending,
    InternalSync,
    Alive,
    Deleted,
}

impl Status {
    fn rank(self) -> u8 {
        match self {
            Status::Init => 0,
            Status::Pending => 1,
            Status::InternalPending => 2,
            Status::InternalSync => 3,
            Status::Alive => 4,
            Status::Deleted => 5,
        }
    }

    /// True if moving from `self` to `next` is a forward (or no-op)
    /// transition. Regressions are rejected by the caller, which should
    /// then no-op rather than error (§4.5: "status may only advance, never
    /// regress").
    pub fn can_advance_to(self, next: Status) -> bool {
        next.rank() >= self.rank()
    }

    pub fn is_forward_progress(self, next: Status) -> bool {
        next.rank() > self.rank()
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Init
    }
}

/// Oplog acceptance state, encoded in the original as one varying byte of
/// the primary-key prefix (`g`/`m`/`i` — §3, §6).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum OplogStatus {
    Alive,
    PendingMasterQuorum,
    InternalPending,
}

impl OplogStatus {
    pub fn prefix_byte(self) -> u8 {
        match self {
            OplogStatus::Alive => b'g',
            OplogStatus::PendingMasterQuorum => b'm',
            OplogStatus::InternalPending => b'i',
        }
    }
}
