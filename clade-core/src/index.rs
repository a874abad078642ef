//! Name index over a hierarchy's columns.
//!
//! Children and descendants are derived from path-encoded names once per
//! pass instead of rescanning column names for every node.

use std::collections::{HashMap, HashSet};

use crate::naming::NodeName;

/// Maps each node to its direct children and all strict descendants.
#[derive(Clone, Debug, Default)]
pub struct HierarchyIndex {
    children: HashMap<NodeName, Vec<NodeName>>,
    descendants: HashMap<NodeName, Vec<NodeName>>,
}

impl HierarchyIndex {
    /// Indexes `names`. Every ancestor of an indexed name is reachable,
    /// including ancestors that are not themselves in `names`, such as the
    /// root of a membership table that omits its root column.
    ///
    /// # Examples
    /// ```
    /// use clade_core::{HierarchyIndex, NodeName};
    ///
    /// let names: Vec<NodeName> = ["0_0", "0_1", "0_1_0"]
    ///     .into_iter()
    ///     .map(NodeName::from)
    ///     .collect();
    /// let index = HierarchyIndex::new(&names);
    /// assert_eq!(index.children(&NodeName::from("0")).len(), 2);
    /// assert_eq!(index.descendants(&NodeName::from("0")).len(), 3);
    /// assert!(index.children(&NodeName::from("0_1_0")).is_empty());
    /// ```
    #[must_use]
    pub fn new<'a>(names: impl IntoIterator<Item = &'a NodeName>) -> Self {
        let mut children: HashMap<NodeName, Vec<NodeName>> = HashMap::new();
        let mut descendants: HashMap<NodeName, Vec<NodeName>> = HashMap::new();
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(parent) = name.parent() {
                children.entry(parent).or_default().push(name.clone());
            }
            let mut ancestor = name.parent();
            while let Some(current) = ancestor {
                ancestor = current.parent();
                descendants.entry(current).or_default().push(name.clone());
            }
        }
        for list in children.values_mut().chain(descendants.values_mut()) {
            list.sort();
        }
        Self {
            children,
            descendants,
        }
    }

    /// Direct children of `name`, in hierarchy order.
    #[must_use]
    pub fn children(&self, name: &NodeName) -> &[NodeName] {
        self.children.get(name).map_or(&[], Vec::as_slice)
    }

    /// Strict descendants of `name` at any depth, in hierarchy order.
    #[must_use]
    pub fn descendants(&self, name: &NodeName) -> &[NodeName] {
        self.descendants.get(name).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<NodeName> {
        raw.iter().map(|&name| NodeName::from(name)).collect()
    }

    #[test]
    fn children_are_segment_aware() {
        let index = HierarchyIndex::new(&names(&["0_1", "0_10", "0_1_0", "0_10_0"]));
        assert_eq!(index.children(&NodeName::from("0_1")), names(&["0_1_0"]).as_slice());
        assert_eq!(
            index.descendants(&NodeName::from("0")),
            names(&["0_1", "0_10", "0_1_0", "0_10_0"]).as_slice()
        );
    }

    #[test]
    fn rebuilt_lineage_is_indexed_separately() {
        let index = HierarchyIndex::new(&names(&["0_1", "0_1_0", "0_1u", "0_1u_0"]));
        assert_eq!(index.descendants(&NodeName::from("0_1")), names(&["0_1_0"]).as_slice());
        assert_eq!(index.children(&NodeName::from("0_1u")), names(&["0_1u_0"]).as_slice());
    }
}
