//! Device class and the weight table (§3).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum NodeType {
    Mobile,
    Desktop,
    Server,
}

impl NodeType {
    /// `weight(mobile)=1, weight(desktop)=2, weight(server)=4` (§3).
    pub fn weight(self) -> u32 {
        match self {
            NodeType::Mobile => 1,
            NodeType::Desktop => 2,
            NodeType::Server => 4,
        }
    }
}

/// `Quorum = floor(total/2) + 1` (§3).
pub fn quorum(total_weight: u32) -> u32 {
    total_weight / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_table_matches_spec() {
        assert_eq!(NodeType::Mobile.weight(), 1);
        assert_eq!(NodeType::Desktop.weight(), 2);
        assert_eq!(NodeType::Server.weight(), 4);
    }

    proptest::proptest! {
        #[test]
        fn quorum_is_always_a_strict_majority_of_total_weight(total in 1u32..10_000) {
            let q = quorum(total);
            // a quorum-sized coalition outweighs everyone outside it
            proptest::prop_assert!(q * 2 > total);
            // one less than quorum never does
            proptest::prop_assert!((q - 1) * 2 <= total);
        }

        #[test]
        fn quorum_never_exceeds_total_weight(total in 0u32..10_000) {
            proptest::prop_assert!(quorum(total) <= total + 1);
        }
    }

    #[test]
    fn quorum_is_majority_by_weight() {
        assert_eq!(quorum(6), 4);
        assert_eq!(quorum(4), 3);
        assert_eq!(quorum(2), 2);
        assert_eq!(quorum(1), 1);
    }
}
