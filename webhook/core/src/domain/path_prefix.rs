// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Prefix Matcher
//!
//! Decides whether one export path is an ancestor of another. A plain
//! `starts_with` would claim `/abc` owns `/abcdef`; the match only counts
//! when the shared prefix ends on a boundary character.
//!
//! `-` is a boundary as well as `/`: provisioners derive sub-volume paths
//! such as `/vol1-shard1` from `/vol1`.

/// Characters that may directly follow a matching prefix
pub const BOUNDARY_CHARS: [char; 2] = ['/', '-'];

/// `true` iff `candidate` is `target` or a boundary-delimited prefix of it
pub fn is_prefix_of(candidate: &str, target: &str) -> bool {
    match target.strip_prefix(candidate) {
        Some("") => true,
        Some(rest) => rest.starts_with(&BOUNDARY_CHARS[..]),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_table() {
        let cases = [
            ("/fsA", "/fsA", true),
            ("/fsA", "/fsA/sub", true),
            ("/fsA", "/fsA-other", true),
            ("/fsA", "/fsAB", false),
            ("/fsB", "/fsA/sub", false),
        ];

        for (candidate, target, expected) in cases {
            assert_eq!(
                is_prefix_of(candidate, target),
                expected,
                "is_prefix_of({candidate:?}, {target:?})"
            );
        }
    }

    #[test]
    fn test_direction_matters() {
        assert!(is_prefix_of("/vol1", "/vol1-shard1"));
        assert!(!is_prefix_of("/vol1-shard1", "/vol1"));
    }

    #[test]
    fn test_nested_levels() {
        assert!(is_prefix_of("/data", "/data/team/project"));
        assert!(is_prefix_of("/data/team", "/data/team-archive/2025"));
        assert!(!is_prefix_of("/data/team", "/data/teams"));
    }

    #[test]
    fn test_other_separators_are_not_boundaries() {
        assert!(!is_prefix_of("/fsA", "/fsA_backup"));
        assert!(!is_prefix_of("/fsA", "/fsA.old"));
    }
}
