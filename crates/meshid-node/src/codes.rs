//! Frame `code` values (§4.7, §6): the outer-envelope discriminant a
//! received frame is dispatched on, before the inner op-key-encrypted
//! payload is even touched.
//!
//! Grounded on `original_source/service/ptt_types.go`'s `CodeType`
//! constants (`StatusCode`, `JoinCode`, `JoinAckCode`, `OpCode`,
//! `OpAckCode`, `OpFailCode`, plus the peer-identify pair) and the
//! dispatch switch in `ptt_oplog.go`.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FrameCode {
    Status,
    Join,
    JoinAck,
    Op,
    OpAck,
    OpFail,
    IdentifyPeer,
    IdentifyPeerAck,
}

impl FrameCode {
    pub const STATUS: u64 = 0;
    pub const JOIN: u64 = 1;
    pub const JOIN_ACK: u64 = 2;
    pub const OP: u64 = 3;
    pub const OP_ACK: u64 = 4;
    pub const OP_FAIL: u64 = 5;
    pub const IDENTIFY_PEER: u64 = 6;
    pub const IDENTIFY_PEER_ACK: u64 = 7;

    pub fn from_u64(code: u64) -> Option<Self> {
        match code {
            Self::STATUS => Some(FrameCode::Status),
            Self::JOIN => Some(FrameCode::Join),
            Self::JOIN_ACK => Some(FrameCode::JoinAck),
            Self::OP => Some(FrameCode::Op),
            Self::OP_ACK => Some(FrameCode::OpAck),
            Self::OP_FAIL => Some(FrameCode::OpFail),
            Self::IDENTIFY_PEER => Some(FrameCode::IdentifyPeer),
            Self::IDENTIFY_PEER_ACK => Some(FrameCode::IdentifyPeerAck),
            _ => None,
        }
    }

    pub fn as_u64(self) -> u64 {
        match self {
            FrameCode::Status => Self::STATUS,
            FrameCode::Join => Self::JOIN,
            FrameCode::JoinAck => Self::JOIN_ACK,
            FrameCode::Op => Self::OP,
            FrameCode::OpAck => Self::OP_ACK,
            FrameCode::OpFail => Self::OP_FAIL,
            FrameCode::IdentifyPeer => Self::IDENTIFY_PEER,
            FrameCode::IdentifyPeerAck => Self::IDENTIFY_PEER_ACK,
        }
    }

    /// `join*` codes route through the `joins` table; `op*` through `ops`.
    pub fn routes_via_joins(self) -> bool {
        matches!(self, FrameCode::Join | FrameCode::JoinAck)
    }

    pub fn routes_via_ops(self) -> bool {
        matches!(self, FrameCode::Op | FrameCode::OpAck | FrameCode::OpFail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u64() {
        for code in [
            FrameCode::Status,
            FrameCode::Join,
            FrameCode::JoinAck,
            FrameCode::Op,
            FrameCode::OpAck,
            FrameCode::OpFail,
            FrameCode::IdentifyPeer,
            FrameCode::IdentifyPeerAck,
        ] {
            assert_eq!(FrameCode::from_u64(code.as_u64()), Some(code));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(FrameCode::from_u64(99), None);
    }

    #[test]
    fn routing_class_matches_code_family() {
        assert!(FrameCode::Join.routes_via_joins());
        assert!(FrameCode::JoinAck.routes_via_joins());
        assert!(!FrameCode::Op.routes_via_joins());

        assert!(FrameCode::Op.routes_via_ops());
        assert!(FrameCode::OpAck.routes_via_ops());
        assert!(FrameCode::OpFail.routes_via_ops());
        assert!(!FrameCode::Status.routes_via_ops());
    }
}
