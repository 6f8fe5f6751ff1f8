//! `SendRaftMsgs` outbound filtering (§4.4), grounded on
//! `original_source/me/protocol_send_raft_msgs.go`: group by destination
//! raft-id, drop self-addressed messages, drop destinations whose device
//! status can't yet decrypt (`Init`/`InternalPending`), drop destinations
//! with no live peer connection, forward survivors one frame per
//! destination.

use meshid_types::Status;
use std::collections::HashMap;

/// What the filter needs to know about a raft-id to decide whether a
/// message to it should go out. Implemented by the membership component,
/// which owns `my_nodes` and the peer registry.
pub trait RaftDestination {
    fn status(&self, raft_id: u64) -> Option<Status>;
    fn has_live_peer(&self, raft_id: u64) -> bool;
}

/// Group `msgs` (each `(destination_raft_id, payload)`) by destination,
/// dropping everything `original_source/me/protocol_send_raft_msgs.go`
/// drops: messages to self, to a device that can't yet decrypt
/// (`Init`/`InternalPending`), and to a device with no live peer.
pub fn filter_outbound_raft_msgs<T: Clone>(
    msgs: &[(u64, T)],
    self_raft_id: u64,
    dest: &dyn RaftDestination,
) -> HashMap<u64, Vec<T>> {
    let mut grouped: HashMap<u64, Vec<T>> = HashMap::new();
    for (to, msg) in msgs {
        if *to == self_raft_id {
            continue;
        }
        grouped.entry(*to).or_default().push(msg.clone());
    }

    grouped.retain(|&raft_id, _| {
        let status = dest.status(raft_id);
        match status {
            None => false,
            Some(Status::Init) | Some(Status::InternalPending) => false,
            Some(_) => dest.has_live_peer(raft_id),
        }
    });

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdMap;

    struct FakeDest {
        statuses: StdMap<u64, Status>,
        live: StdMap<u64, bool>,
    }

    impl RaftDestination for FakeDest {
        fn status(&self, raft_id: u64) -> Option<Status> {
            self.statuses.get(&raft_id).copied()
        }
        fn has_live_peer(&self, raft_id: u64) -> bool {
            *self.live.get(&raft_id).unwrap_or(&false)
        }
    }

    #[test]
    fn drops_messages_addressed_to_self() {
        let dest = FakeDest { statuses: StdMap::new(), live: StdMap::new() };
        let msgs = vec![(1u64, "m")];
        let grouped = filter_outbound_raft_msgs(&msgs, 1, &dest);
        assert!(grouped.is_empty());
    }

    #[test]
    fn drops_devices_that_cannot_yet_decrypt() {
        let mut statuses = StdMap::new();
        statuses.insert(2u64, Status::InternalPending);
        let mut live = StdMap::new();
        live.insert(2u64, true);
        let dest = FakeDest { statuses, live };

        let msgs = vec![(2u64, "m")];
        let grouped = filter_outbound_raft_msgs(&msgs, 1, &dest);
        assert!(grouped.is_empty());
    }

    #[test]
    fn drops_unknown_devices_and_devices_with_no_live_peer() {
        let mut statuses = StdMap::new();
        statuses.insert(2u64, Status::Alive);
        let dest = FakeDest { statuses, live: StdMap::new() };

        let msgs = vec![(2u64, "m"), (3u64, "m")];
        let grouped = filter_outbound_raft_msgs(&msgs, 1, &dest);
        assert!(grouped.is_empty());
    }

    #[test]
    fn forwards_to_alive_devices_with_a_live_peer() {
        let mut statuses = StdMap::new();
        statuses.insert(2u64, Status::Alive);
        let mut live = StdMap::new();
        live.insert(2u64, true);
        let dest = FakeDest { statuses, live };

        let msgs = vec![(2u64, "a"), (2u64, "b"), (1u64, "self")];
        let grouped = filter_outbound_raft_msgs(&msgs, 1, &dest);
        assert_eq!(grouped.get(&2u64).unwrap(), &vec!["a", "b"]);
    }
}
