//! Weighted quorum overlay (§4.4): Raft's native vote-counting handles
//! leader election and log commitment; authority over which oplog
//! signatures are *accepted* is a separate, weight-based calculation keyed
//! by node-sign-id rather than raft-id.

use meshid_types::{quorum, weight::NodeType, NodeSignId, SignInfo};
use std::collections::HashMap;

#[derive(Clone, Default)]
pub struct WeightTable {
    weights: HashMap<NodeSignId, u32>,
}

impl WeightTable {
    pub fn new() -> Self {
        WeightTable::default()
    }

    pub fn insert(&mut self, signer: NodeSignId, node_type: NodeType) {
        self.weights.insert(signer, node_type.weight());
    }

    pub fn remove(&mut self, signer: &NodeSignId) {
        self.weights.remove(signer);
    }

    pub fn total_weight(&self) -> u32 {
        self.weights.values().sum()
    }

    /// Sum of weights contributed by distinct known signers in `signs`;
    /// unknown signers contribute nothing (§4.4: "the PM's
    /// `is_valid_internal_oplog` uses the device weights... rather than
    /// counts").
    pub fn weigh(&self, signs: &[SignInfo]) -> u32 {
        signs
            .iter()
            .filter_map(|s| self.weights.get(&s.signer_id))
            .sum()
    }

    /// True iff the weighed signature set meets quorum against this
    /// table's total weight.
    pub fn is_valid_internal_oplog(&self, signs: &[SignInfo]) -> bool {
        self.weigh(signs) >= quorum(self.total_weight())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshid_types::SignInfo;

    fn sign(id: u8) -> SignInfo {
        SignInfo {
            signer_id: NodeSignId([id; 32]),
            hash: [0; 32],
            salt: [0; 16],
            sig: vec![],
            pubkey: vec![],
        }
    }

    #[test]
    fn unknown_signers_contribute_no_weight() {
        let mut table = WeightTable::new();
        table.insert(NodeSignId([1; 32]), NodeType::Server);
        let weighed = table.weigh(&[sign(1), sign(99)]);
        assert_eq!(weighed, 4);
    }

    #[test]
    fn quorum_requires_majority_by_weight_not_by_count() {
        let mut table = WeightTable::new();
        table.insert(NodeSignId([1; 32]), NodeType::Server); // weight 4
        table.insert(NodeSignId([2; 32]), NodeType::Mobile); // weight 1
        table.insert(NodeSignId([3; 32]), NodeType::Mobile); // weight 1
        // total = 6, quorum = 4
        assert!(!table.is_valid_internal_oplog(&[sign(2), sign(3)])); // weight 2
        assert!(table.is_valid_internal_oplog(&[sign(1)])); // weight 4
    }
}
