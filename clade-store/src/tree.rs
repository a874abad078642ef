//! JSON export of a hierarchy tree.
use std::{fs, io::Write, path::Path};

use clade_core::HierarchyTree;

use crate::{errors::StoreError, layout::write_atomically};

/// Writes `tree` to `path` as pretty-printed JSON.
///
/// # Errors
/// Returns [`StoreError`] when serialisation or writing fails.
pub fn write_tree(path: impl AsRef<Path>, tree: &HierarchyTree) -> Result<(), StoreError> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(tree)?;
    write_atomically(path, |mut file| {
        file.write_all(&json).map_err(StoreError::io(path))
    })
}

/// Loads a tree previously written by [`write_tree`].
///
/// # Errors
/// Returns [`StoreError`] when the file cannot be read or is not a tree.
pub fn read_tree(path: impl AsRef<Path>) -> Result<HierarchyTree, StoreError> {
    let path = path.as_ref();
    let json = fs::read(path).map_err(StoreError::io(path))?;
    Ok(serde_json::from_slice(&json)?)
}
