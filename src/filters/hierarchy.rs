//! Filter dependency hierarchy
//!
//! The hierarchy is a fixed table: each key has a depth and the keys that
//! directly depend on it. Changing a key invalidates everything reachable
//! from it. Adding a key means adding a row here, nothing else.
//!
//! ```text
//! Agency ──┬── Cluster ── SubCluster ──┬── City
//!          │                           └── RouteNumber
//!          └── LineGroup
//! LineType (independent)
//! ```

use super::types::FilterKey;

struct Node {
    key: FilterKey,
    depth: u8,
    children: &'static [FilterKey],
}

/// Indexed by `FilterKey::index()`
const HIERARCHY: [Node; 7] = [
    Node {
        key: FilterKey::Agency,
        depth: 0,
        children: &[FilterKey::Cluster, FilterKey::LineGroup],
    },
    Node {
        key: FilterKey::Cluster,
        depth: 1,
        children: &[FilterKey::SubCluster],
    },
    Node {
        key: FilterKey::SubCluster,
        depth: 2,
        children: &[FilterKey::City, FilterKey::RouteNumber],
    },
    Node {
        key: FilterKey::City,
        depth: 3,
        children: &[],
    },
    Node {
        key: FilterKey::RouteNumber,
        depth: 3,
        children: &[],
    },
    Node {
        key: FilterKey::LineType,
        depth: 3,
        children: &[],
    },
    Node {
        key: FilterKey::LineGroup,
        depth: 3,
        children: &[],
    },
];

fn node(key: FilterKey) -> &'static Node {
    let node = &HIERARCHY[key.index()];
    debug_assert_eq!(node.key, key);
    node
}

/// Depth of a key in the hierarchy (Agency is 0)
pub fn depth(key: FilterKey) -> u8 {
    node(key).depth
}

/// Keys that directly depend on `key`
pub fn children(key: FilterKey) -> &'static [FilterKey] {
    node(key).children
}

/// Every key invalidated when `key` changes, in hierarchy order
pub fn invalidated_by(key: FilterKey) -> Vec<FilterKey> {
    let mut seen = [false; FilterKey::ALL.len()];
    let mut stack: Vec<FilterKey> = children(key).to_vec();

    while let Some(next) = stack.pop() {
        if std::mem::replace(&mut seen[next.index()], true) {
            continue;
        }
        stack.extend_from_slice(children(next));
    }

    FilterKey::ALL
        .iter()
        .copied()
        .filter(|k| seen[k.index()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_key() {
        for key in FilterKey::ALL {
            assert_eq!(node(key).key, key);
        }
    }

    #[test]
    fn test_children_are_deeper() {
        for key in FilterKey::ALL {
            for child in children(key) {
                assert!(depth(*child) > depth(key), "{} -> {}", key, child);
            }
        }
    }

    #[test]
    fn test_agency_invalidation() {
        assert_eq!(
            invalidated_by(FilterKey::Agency),
            vec![
                FilterKey::Cluster,
                FilterKey::SubCluster,
                FilterKey::City,
                FilterKey::RouteNumber,
                FilterKey::LineGroup,
            ]
        );
    }

    #[test]
    fn test_cluster_invalidation() {
        assert_eq!(
            invalidated_by(FilterKey::Cluster),
            vec![FilterKey::SubCluster, FilterKey::City, FilterKey::RouteNumber]
        );
    }

    #[test]
    fn test_leaves_invalidate_nothing() {
        for key in [
            FilterKey::City,
            FilterKey::RouteNumber,
            FilterKey::LineType,
            FilterKey::LineGroup,
        ] {
            assert!(invalidated_by(key).is_empty());
        }
    }

    #[test]
    fn test_invalidated_keys_are_deeper() {
        for key in FilterKey::ALL {
            for dependent in invalidated_by(key) {
                assert!(depth(dependent) > depth(key));
                assert_ne!(dependent, key);
            }
        }
    }
}
