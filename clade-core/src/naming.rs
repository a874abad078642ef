//! Path-encoded node names.
//!
//! A node's position in the hierarchy is encoded in its name: integer
//! segments joined by [`SEPARATOR`], so `"0_1_2"` is the third child of the
//! second child of the root `"0"`. Rebuilt subtrees carry the
//! [`REBUILD_MARKER`] on the segment that was rebuilt (`"0_1u_0"`).
//!
//! Names order by depth first and then segment by segment on the numeric
//! value of each segment, so `"0_9"` sorts before `"0_10"`.

use std::{cmp::Ordering, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Separator between path segments.
pub const SEPARATOR: char = '_';

/// Suffix appended to a node name when its subtree is rebuilt from scratch.
pub const REBUILD_MARKER: char = 'u';

/// Default name of the root node.
pub const DEFAULT_ROOT: &str = "0";

/// Name of a node in the cluster hierarchy.
///
/// # Examples
/// ```
/// use clade_core::NodeName;
///
/// let name = NodeName::from("0_1_2");
/// assert_eq!(name.depth(), 2);
/// assert_eq!(name.parent(), Some(NodeName::from("0_1")));
/// assert!(name.is_descendant_of(&NodeName::from("0")));
/// assert_eq!(NodeName::from("0_1").rebuilt().as_str(), "0_1u");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeName(Arc<str>);

impl NodeName {
    /// Returns the raw name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of separators in the name; the root sits at depth zero.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.matches(SEPARATOR).count()
    }

    /// Returns the name with its last segment removed, or `None` for a
    /// single-segment name.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self::from(parent))
    }

    /// Reports whether `self` lies strictly below `ancestor`.
    ///
    /// Matching is on whole segments: `"0_10"` is not a descendant of `"0_1"`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }

    /// Reports whether `self` is an immediate child of `parent`.
    #[must_use]
    pub fn is_child_of(&self, parent: &Self) -> bool {
        self.is_descendant_of(parent) && self.depth() == parent.depth() + 1
    }

    /// Returns the name used for a freshly rebuilt copy of this node.
    #[must_use]
    pub fn rebuilt(&self) -> Self {
        Self::from(format!("{}{REBUILD_MARKER}", self.0))
    }

    /// Reports whether any segment of the name carries the rebuild marker.
    #[must_use]
    pub fn has_rebuild_lineage(&self) -> bool {
        self.segments()
            .any(|segment| segment.ends_with(REBUILD_MARKER))
    }

    /// Returns the name of the `index`-th child of this node.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        Self::from(format!("{}{SEPARATOR}{index}", self.0))
    }

    /// Iterates over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    fn hierarchy_cmp(&self, other: &Self) -> Ordering {
        self.depth()
            .cmp(&other.depth())
            .then_with(|| {
                self.segments()
                    .map(segment_key)
                    .cmp(other.segments().map(segment_key))
            })
            .then_with(|| self.0.cmp(&other.0))
    }
}

/// Splits a segment into its numeric prefix and any trailing marker text.
///
/// Segments without digits sort after every numeric segment.
fn segment_key(segment: &str) -> (u64, &str) {
    let digits = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    let (number, suffix) = segment.split_at(digits);
    let value = if number.is_empty() {
        u64::MAX
    } else {
        number.parse().unwrap_or(u64::MAX)
    };
    (value, suffix)
}

impl Ord for NodeName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hierarchy_cmp(other)
    }
}

impl PartialOrd for NodeName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeName {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for NodeName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl Default for NodeName {
    fn default() -> Self {
        Self::from(DEFAULT_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn names_serialise_as_plain_strings() {
        let name = NodeName::from("0_1u_3");
        let json = serde_json::to_string(&name).expect("serialises");
        assert_eq!(json, "\"0_1u_3\"");
        let back: NodeName = serde_json::from_str(&json).expect("deserialises");
        assert_eq!(back, name);
    }

    #[rstest]
    #[case("0", 0, None)]
    #[case("0_1", 1, Some("0"))]
    #[case("0_1_12", 2, Some("0_1"))]
    #[case("0_1u_3", 2, Some("0_1u"))]
    fn depth_and_parent(#[case] raw: &str, #[case] depth: usize, #[case] parent: Option<&str>) {
        let name = NodeName::from(raw);
        assert_eq!(name.depth(), depth);
        assert_eq!(name.parent(), parent.map(NodeName::from));
    }

    #[rstest]
    #[case("0_1_2", "0_1", true)]
    #[case("0_1_2", "0", true)]
    #[case("0_10", "0_1", false)]
    #[case("0_1", "0_1", false)]
    #[case("0_1u_0", "0_1", false)]
    #[case("0_1u_0", "0_1u", true)]
    fn descendant_matching_respects_segments(
        #[case] name: &str,
        #[case] ancestor: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(
            NodeName::from(name).is_descendant_of(&NodeName::from(ancestor)),
            expected
        );
    }

    #[test]
    fn rebuilt_names_carry_the_marker() {
        let rebuilt = NodeName::from("0_1").rebuilt();
        assert_eq!(rebuilt.as_str(), "0_1u");
        assert_eq!(rebuilt.depth(), 1);
        assert!(rebuilt.has_rebuild_lineage());
        assert!(rebuilt.child(0).has_rebuild_lineage());
        assert!(!NodeName::from("0_1_0").has_rebuild_lineage());
    }

    #[test]
    fn ordering_is_depth_then_numeric() {
        let mut names: Vec<NodeName> = ["0_10", "0_1_0", "0_9", "0_1", "0_1u", "0_2_10", "0_2_3"]
            .into_iter()
            .map(NodeName::from)
            .collect();
        names.sort();
        let raw: Vec<&str> = names.iter().map(NodeName::as_str).collect();
        assert_eq!(
            raw,
            ["0_1", "0_1u", "0_9", "0_10", "0_1_0", "0_2_3", "0_2_10"]
        );
    }

    fn name_strategy() -> impl Strategy<Value = NodeName> {
        prop::collection::vec(0_u32..40, 1..6).prop_map(|segments| {
            let joined: Vec<String> = segments.iter().map(ToString::to_string).collect();
            NodeName::from(joined.join("_"))
        })
    }

    proptest! {
        #[test]
        fn depth_counts_separators(name in name_strategy()) {
            prop_assert_eq!(name.depth(), name.as_str().matches('_').count());
        }

        #[test]
        fn parent_strips_one_segment(name in name_strategy()) {
            match name.parent() {
                Some(parent) => {
                    prop_assert_eq!(parent.depth() + 1, name.depth());
                    prop_assert!(name.is_child_of(&parent));
                }
                None => prop_assert_eq!(name.depth(), 0),
            }
        }

        #[test]
        fn shallower_names_sort_first(left in name_strategy(), right in name_strategy()) {
            if left.depth() < right.depth() {
                prop_assert!(left < right);
            }
        }
    }
}
