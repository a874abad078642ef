//! Merging per-node outputs into one canonical membership table.

use std::{collections::HashSet, sync::Arc};

use crate::{
    naming::NodeName,
    table::{MembershipTable, SampleId, TableError},
};

/// Concatenates `tables` column-wise.
///
/// Rows are the union of every input's samples in first-seen order, absent
/// rows fill with 0, the first column seen under each name wins, and the
/// result is sorted in hierarchy order.
///
/// # Errors
/// Propagates [`TableError`] from table construction; inputs that already
/// satisfy the table invariants cannot trigger it.
///
/// # Examples
/// ```
/// use clade_core::{MembershipTable, NodeName, assemble};
///
/// let left = MembershipTable::from_columns(
///     vec!["a".into()],
///     vec![(NodeName::from("0_10"), vec![1])],
/// )?;
/// let right = MembershipTable::from_columns(
///     vec!["b".into()],
///     vec![(NodeName::from("0_9"), vec![1]), (NodeName::from("0_10"), vec![1])],
/// )?;
/// let merged = assemble([left, right])?;
/// let names: Vec<&str> = merged.column_names().iter().map(NodeName::as_str).collect();
/// assert_eq!(names, ["0_9", "0_10"]);
/// assert_eq!(merged.get("b", &NodeName::from("0_10")), 0);
/// # Ok::<(), clade_core::TableError>(())
/// ```
pub fn assemble(
    tables: impl IntoIterator<Item = MembershipTable>,
) -> Result<MembershipTable, TableError> {
    let tables: Vec<MembershipTable> = tables.into_iter().collect();
    let mut seen: HashSet<SampleId> = HashSet::new();
    let samples: Vec<SampleId> = tables
        .iter()
        .flat_map(MembershipTable::samples)
        .filter(|sample| seen.insert(Arc::clone(sample)))
        .cloned()
        .collect();

    let mut merged = MembershipTable::empty(samples)?;
    for table in &tables {
        let positions: Vec<Option<usize>> = merged
            .samples()
            .iter()
            .map(|sample| table.row_of(sample))
            .collect();
        for (name, values) in table.columns() {
            if merged.contains_column(name) {
                continue;
            }
            let column = positions
                .iter()
                .map(|position| {
                    position
                        .and_then(|row| values.get(row))
                        .copied()
                        .unwrap_or(0)
                })
                .collect();
            merged.insert_column(name.clone(), column)?;
        }
    }
    merged.sort_columns();
    Ok(merged)
}

/// Stacks `bottom`'s rows under `top`'s.
///
/// Columns are the union of both inputs; a cell takes its value from
/// whichever table holds the row, preferring `top`, and is 0 otherwise.
///
/// # Errors
/// Propagates [`TableError`] from table construction.
pub fn concat_rows(
    top: &MembershipTable,
    bottom: &MembershipTable,
) -> Result<MembershipTable, TableError> {
    let samples: Vec<SampleId> = top
        .samples()
        .iter()
        .chain(
            bottom
                .samples()
                .iter()
                .filter(|sample| !top.contains_sample(sample)),
        )
        .cloned()
        .collect();
    let mut names: Vec<NodeName> = top.column_names().to_vec();
    names.extend(
        bottom
            .column_names()
            .iter()
            .filter(|name| !top.contains_column(name))
            .cloned(),
    );
    let mut stacked = MembershipTable::empty(samples)?;
    for name in names {
        let column = stacked
            .samples()
            .iter()
            .map(|sample| {
                if top.contains_sample(sample) {
                    top.get(sample, &name)
                } else {
                    bottom.get(sample, &name)
                }
            })
            .collect();
        stacked.insert_column(name, column)?;
    }
    Ok(stacked)
}

/// Enforces path consistency on a table sorted in hierarchy order.
///
/// Indicators are cleared wherever the parent column is 0, and columns whose
/// parent column is missing are dropped along with their descendants. The
/// root's direct children are exempt when the table carries no root column.
/// Returns the dropped column names.
pub fn enforce_lineage(table: &mut MembershipTable, root: &NodeName) -> Vec<NodeName> {
    table.sort_columns();
    let root_present = table.contains_column(root);
    let mut dropped: HashSet<NodeName> = HashSet::new();
    for name in table.column_names().to_vec() {
        let Some(parent) = name.parent() else {
            continue;
        };
        if &parent == root && !root_present {
            continue;
        }
        let Some(mask) = table
            .column(&parent)
            .filter(|_| !dropped.contains(&parent))
            .map(<[u8]>::to_vec)
        else {
            dropped.insert(name);
            continue;
        };
        if let Some(values) = table.column_mut(&name) {
            for (value, keep) in values.iter_mut().zip(mask) {
                *value &= keep;
            }
        }
    }
    table.retain_columns(|name| !dropped.contains(name));
    let mut dropped: Vec<NodeName> = dropped.into_iter().collect();
    dropped.sort();
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn ids(raw: &[&str]) -> Vec<SampleId> {
        raw.iter().map(|&s| Arc::from(s)).collect()
    }

    #[test]
    fn first_seen_column_wins() {
        let first =
            MembershipTable::from_columns(ids(&["a"]), vec![(NodeName::from("0_0"), vec![1])])
                .expect("valid");
        let second =
            MembershipTable::from_columns(ids(&["a"]), vec![(NodeName::from("0_0"), vec![0])])
                .expect("valid");
        let merged = assemble([first, second]).expect("assembles");
        assert_eq!(merged.get("a", &NodeName::from("0_0")), 1);
    }

    #[test]
    fn lineage_clears_orphans_and_masks_children() {
        let mut table = MembershipTable::from_columns(
            ids(&["a", "b"]),
            vec![
                (NodeName::from("0_0"), vec![1, 0]),
                (NodeName::from("0_0_0"), vec![1, 1]),
                (NodeName::from("0_2_0"), vec![0, 1]),
                (NodeName::from("0_2_0_1"), vec![0, 1]),
            ],
        )
        .expect("valid");
        let dropped = enforce_lineage(&mut table, &NodeName::from("0"));
        assert_eq!(dropped, [NodeName::from("0_2_0"), NodeName::from("0_2_0_1")]);
        assert_eq!(table.column(&NodeName::from("0_0_0")), Some(&[1, 0][..]));
    }

    #[test]
    fn concat_rows_keeps_both_sides_values() {
        let top = MembershipTable::from_columns(ids(&["a"]), vec![(NodeName::from("0_1"), vec![1])])
            .expect("valid");
        let bottom = MembershipTable::from_columns(
            ids(&["b"]),
            vec![(NodeName::from("0_1"), vec![1]), (NodeName::from("0_1_0"), vec![1])],
        )
        .expect("valid");
        let stacked = concat_rows(&top, &bottom).expect("stacks");
        assert_eq!(stacked.column(&NodeName::from("0_1")), Some(&[1, 1][..]));
        assert_eq!(stacked.column(&NodeName::from("0_1_0")), Some(&[0, 1][..]));
    }

    fn column_strategy() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
        prop::collection::vec(
            (
                prop::collection::vec(0_u32..12, 1..4),
                prop::collection::vec(0_u8..=1, 4),
            ),
            1..8,
        )
        .prop_map(|columns| {
            columns
                .into_iter()
                .map(|(segments, values)| {
                    let mut name = String::from("0");
                    for segment in segments {
                        name.push('_');
                        name.push_str(&segment.to_string());
                    }
                    (name, values)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn assembled_columns_are_unique_and_ordered(columns in column_strategy()) {
            let samples = ids(&["a", "b", "c", "d"]);
            let tables: Vec<MembershipTable> = columns
                .into_iter()
                .map(|(name, values)| {
                    let column = vec![(NodeName::from(name), values)];
                    MembershipTable::from_columns(samples.clone(), column)
                        .expect("single column table")
                })
                .collect();
            let merged = assemble(tables).expect("assembles");
            let names = merged.column_names();
            prop_assert!(names.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert_eq!(merged.sample_count(), 4);
        }
    }
}
