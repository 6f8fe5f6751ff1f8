//! Startup mode selection (§4.4): which peer set (if any) to hand
//! `openraft::Raft::new`/`initialize` depends on the identity's current
//! status when the process boots.

use meshid_types::Status;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartupMode {
    /// Rejoin from stable storage with no peer list: the raft log already
    /// knows its membership.
    RejoinFromStable,
    /// Bootstrap a one-member cluster containing only self, at `weight`.
    BootstrapSelf { weight: u32 },
    /// Restart from stable storage (the steady-state case: the group has
    /// already been through at least one commit).
    RestartFromStable,
}

pub fn startup_mode(status: Status, self_weight: u32) -> StartupMode {
    match status {
        Status::Init | Status::InternalPending | Status::InternalSync => StartupMode::RejoinFromStable,
        Status::Pending => StartupMode::BootstrapSelf { weight: self_weight },
        Status::Alive | Status::Deleted => StartupMode::RestartFromStable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_bootstraps_a_one_peer_cluster() {
        assert_eq!(startup_mode(Status::Pending, 2), StartupMode::BootstrapSelf { weight: 2 });
    }

    #[test]
    fn mid_join_statuses_rejoin_with_no_peer_list() {
        assert_eq!(startup_mode(Status::Init, 1), StartupMode::RejoinFromStable);
        assert_eq!(startup_mode(Status::InternalPending, 1), StartupMode::RejoinFromStable);
        assert_eq!(startup_mode(Status::InternalSync, 1), StartupMode::RejoinFromStable);
    }

    #[test]
    fn alive_restarts_from_stable_storage() {
        assert_eq!(startup_mode(Status::Alive, 4), StartupMode::RestartFromStable);
    }
}
