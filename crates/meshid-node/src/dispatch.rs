//! Outer-envelope decode and first-stage dispatch (§4.7).
//!
//! "Frame handling: decode the outer envelope to `(code, hash, enc_data)`;
//! by `code` ... dispatch: `join*` looks up `hash` in the joins map →
//! onboarding handler; `op*` looks up `hash` in the ops map → entity PM →
//! decrypts with the entity's op-key → dispatches by inner op-type."
//! Grounded on `original_source/service/ptt_oplog.go`'s code-switch and
//! `ptt.go`'s peer read loop that feeds it.

use meshid_crypto::Frame;
use meshid_types::{Address, MeshId};

use crate::codes::FrameCode;
use crate::error::{NodeError, Result};
use crate::routing::RouteTable;

/// The frame's code resolved to a concrete route, ready for the caller to
/// act on. `enc_data` is still `ev_with_salt` — undecrypted, since the
/// decryption key (join-key vs. the target entity's op-key) depends on
/// which branch this is.
pub enum RoutedFrame {
    Join { entity: MeshId, frame: Frame },
    Op { entity: MeshId, frame: Frame },
    IdentifyPeer { frame: Frame },
    Status { frame: Frame },
}

/// Parse the wire bytes, classify the code, and resolve `hash` against the
/// matching route table. Does not decrypt the payload: that's the
/// onboarding handler's or the entity PM's job, each with the right key.
pub fn route_inbound(
    bytes: &[u8],
    joins: &RouteTable,
    ops: &RouteTable,
) -> Result<RoutedFrame> {
    let frame = Frame::from_bytes(bytes)?;
    let code = FrameCode::from_u64(frame.code).ok_or(NodeError::UnknownCode(frame.code))?;

    match code {
        FrameCode::Join | FrameCode::JoinAck => {
            let entity = lookup_or_self(joins, &frame.hash, code)?;
            Ok(RoutedFrame::Join { entity, frame })
        }
        FrameCode::Op | FrameCode::OpAck | FrameCode::OpFail => {
            let entity = ops.lookup(&frame.hash).ok_or(NodeError::UnknownRoute)?;
            Ok(RoutedFrame::Op { entity, frame })
        }
        FrameCode::IdentifyPeer | FrameCode::IdentifyPeerAck => {
            Ok(RoutedFrame::IdentifyPeer { frame })
        }
        FrameCode::Status => Ok(RoutedFrame::Status { frame }),
    }
}

/// `JoinAck` frames carry the hash of the *requester's* join-key, which is
/// only in the joins table on the requester side; the acker side looks the
/// same hash up freshly from the just-handled `JoinRequest`. Both ends
/// resolve through the same table, so a miss is always `UnknownRoute`.
fn lookup_or_self(joins: &RouteTable, hash: &Address, _code: FrameCode) -> Result<MeshId> {
    joins.lookup(hash).ok_or(NodeError::UnknownRoute)
}
