//! Flat, serialisable view of a hierarchy for export.

use serde::{Deserialize, Serialize};

use crate::{
    index::HierarchyIndex,
    naming::NodeName,
    params::ParamTable,
    table::MembershipTable,
};

/// One node of an exported hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node name.
    pub name: NodeName,
    /// Parent node; `None` only for the root.
    pub parent: Option<NodeName>,
    /// Number of samples assigned to the node.
    pub population: usize,
    /// Objective score recorded when the node was split.
    pub score: Option<f64>,
    /// Whether the node has no child columns.
    pub leaf: bool,
}

/// Hierarchy as a node list in hierarchy order, root first.
///
/// # Examples
/// ```
/// use clade_core::{HierarchyTree, MembershipTable, NodeName};
///
/// let table = MembershipTable::from_columns(
///     vec!["a".into(), "b".into(), "c".into()],
///     vec![
///         (NodeName::from("0_0"), vec![1, 1, 0]),
///         (NodeName::from("0_1"), vec![0, 0, 1]),
///         (NodeName::from("0_0_0"), vec![1, 0, 0]),
///     ],
/// )?;
/// let tree = HierarchyTree::from_membership(&table, &NodeName::from("0"), None);
/// assert_eq!(tree.root().map(|node| node.population), Some(3));
/// assert_eq!(tree.leaves().count(), 2);
/// # Ok::<(), clade_core::TableError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyTree {
    nodes: Vec<TreeNode>,
}

impl HierarchyTree {
    /// Derives the tree from a membership table.
    ///
    /// The root is always present; its population is the root column's
    /// population when the table carries one and the sample count otherwise.
    #[must_use]
    pub fn from_membership(
        table: &MembershipTable,
        root: &NodeName,
        params: Option<&ParamTable>,
    ) -> Self {
        let index = HierarchyIndex::new(table.column_names());
        let score = |name: &NodeName| {
            params
                .and_then(|params| params.get(name))
                .map(|record| record.obj_function_score)
                .filter(|score| score.is_finite())
        };
        let root_population = if table.contains_column(root) {
            table.population(root)
        } else {
            table.sample_count()
        };

        let mut nodes = Vec::with_capacity(table.column_count() + 1);
        nodes.push(TreeNode {
            name: root.clone(),
            parent: None,
            population: root_population,
            score: score(root),
            leaf: index.children(root).is_empty(),
        });
        nodes.extend(
            table
                .column_names()
                .iter()
                .filter(|&name| name != root)
                .map(|name| TreeNode {
                    name: name.clone(),
                    parent: name.parent(),
                    population: table.population(name),
                    score: score(name),
                    leaf: index.children(name).is_empty(),
                }),
        );
        Self { nodes }
    }

    /// Every node, root first.
    #[must_use]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.first()
    }

    /// Looks a node up by name.
    #[must_use]
    pub fn get(&self, name: &NodeName) -> Option<&TreeNode> {
        self.nodes.iter().find(|node| &node.name == name)
    }

    /// Nodes without children.
    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter(|node| node.leaf)
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
