//! `raftEntriesToApply` skip arithmetic (§4.4): at startup a batch of
//! committed entries may overlap ones already applied before the last
//! restart. `original_source/me/protocol_raft_entries.go`:
//!
//! ```text
//! firstIdx := ents[0].Index
//! newFirstIdx := raftAppliedIndex - firstIdx + 1
//! if newFirstIdx < len(ents) { newEnts = ents[newFirstIdx:] }
//! ```
//!
//! Translated to a slice of already-owned entries rather than an in-place
//! reslice, since `u64` subtraction here must saturate instead of
//! wrapping (the Go code relies on `raftAppliedIndex >= firstIdx - 1`
//! always holding; we don't assume that and saturate instead of panicking
//! on underflow).

use crate::types::RaftEntry;

/// Drop the prefix of `entries` already reflected in `applied_index`,
/// returning the suffix that still needs to be applied.
pub fn raft_entries_to_apply(entries: &[RaftEntry], applied_index: u64) -> &[RaftEntry] {
    let Some(first) = entries.first() else {
        return entries;
    };
    let first_idx = first.index;
    let new_first_idx = applied_index as i64 - first_idx as i64 + 1;
    let skip = new_first_idx.max(0) as usize;
    if skip < entries.len() {
        &entries[skip..]
    } else {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryKind;

    fn entries(indices: &[u64]) -> Vec<RaftEntry> {
        indices
            .iter()
            .map(|&index| RaftEntry {
                index,
                kind: EntryKind::Normal(vec![]),
            })
            .collect()
    }

    #[test]
    fn no_overlap_returns_everything() {
        let ents = entries(&[5, 6, 7]);
        let applied = 4;
        let result = raft_entries_to_apply(&ents, applied);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn partial_overlap_skips_already_applied_prefix() {
        let ents = entries(&[5, 6, 7, 8]);
        let applied = 6;
        let result = raft_entries_to_apply(&ents, applied);
        assert_eq!(result.iter().map(|e| e.index).collect::<Vec<_>>(), vec![7, 8]);
    }

    #[test]
    fn full_overlap_returns_empty() {
        let ents = entries(&[1, 2, 3]);
        let applied = 10;
        assert!(raft_entries_to_apply(&ents, applied).is_empty());
    }

    #[test]
    fn empty_input_returns_empty() {
        let ents: Vec<RaftEntry> = vec![];
        assert!(raft_entries_to_apply(&ents, 0).is_empty());
    }
}
