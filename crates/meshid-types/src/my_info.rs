//! `MyInfo` (§3): the identity record itself.

use crate::ids::MeshId;
use crate::status::Status;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MyInfo {
    pub version: u32,
    pub id: MeshId,
    pub create_ts: Timestamp,
    pub update_ts: Timestamp,
    pub status: Status,
    pub log_id: Option<MeshId>,
    pub owner_id: MeshId,
    /// Folded in from the onboarding `InitMeInfoSync` payload and the
    /// `setMyName`/`setMyImage` RPCs (SPEC_FULL §3 supplement) — not the
    /// out-of-scope account subsystem's richer profile data.
    pub user_name: Vec<u8>,
    pub user_img: Vec<u8>,
}

impl MyInfo {
    pub fn new(id: MeshId) -> Self {
        let ts = Timestamp::now();
        MyInfo {
            version: CURRENT_VERSION,
            id,
            create_ts: ts,
            update_ts: ts,
            status: Status::Pending,
            log_id: None,
            owner_id: id,
            user_name: Vec::new(),
            user_img: Vec::new(),
        }
    }

    /// Advance `status`, ignoring the request if it would regress
    /// (§4.5: "status may only advance, never regress").
    pub fn advance_status(&mut self, next: Status, at: Timestamp) {
        if self.status.can_advance_to(next) {
            self.status = next;
            self.update_ts = at;
        }
    }

    /// `Revoke` as literally implemented by the original (§9 open
    /// question): only marks the identity deleted locally. No broadcast,
    /// no key-store clearing, no process exit, despite the docstring that
    /// describes those steps.
    pub fn revoke(&mut self) {
        self.status = Status::Deleted;
        self.update_ts = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoke_only_marks_deleted() {
        let mut me = MyInfo::new(MeshId::ZERO);
        me.status = Status::Alive;
        me.revoke();
        assert_eq!(me.status, Status::Deleted);
    }

    #[test]
    fn advance_status_ignores_regression() {
        let mut me = MyInfo::new(MeshId::ZERO);
        me.status = Status::Alive;
        let before = me.update_ts;
        me.advance_status(Status::Pending, before.plus_seconds(10));
        assert_eq!(me.status, Status::Alive);
        assert_eq!(me.update_ts, before);
    }

    #[test]
    fn advance_status_applies_forward_moves() {
        let mut me = MyInfo::new(MeshId::ZERO);
        assert_eq!(me.status, Status::Pending);
        me.advance_status(Status::Alive, Timestamp::from_secs(5));
        assert_eq!(me.status, Status::Alive);
        assert_eq!(me.update_ts, Timestamp::from_secs(5));
    }
}
