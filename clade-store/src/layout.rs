//! On-disk layout of a run directory and atomic file replacement.
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use clade_core::NodeName;
use tracing::warn;

use crate::errors::StoreError;

/// Name of the data directory inside a run directory.
pub const DATA_DIR: &str = "clade_data";

const PARAMS_FILE: &str = "paramdata.parquet";
const CHECKPOINT_DIR: &str = "chk";
const PARQUET_EXTENSION: &str = "parquet";
const TEMP_SUFFIX: &str = ".tmp";

/// Paths of the artefacts belonging to one run directory.
///
/// # Examples
/// ```
/// use clade_core::NodeName;
/// use clade_store::RunLayout;
///
/// let layout = RunLayout::new("/runs/a");
/// assert!(layout.checkpoint(&NodeName::from("0_1")).ends_with("clade_data/chk/0_1.parquet"));
/// assert!(layout.tree("demo").ends_with("clade_data/tree_demo_final.json"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    /// Creates the layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The run directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `clade_data` directory holding every artefact.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// The parameter table.
    #[must_use]
    pub fn params(&self) -> PathBuf {
        self.data_dir().join(PARAMS_FILE)
    }

    /// The directory of per-node checkpoints.
    #[must_use]
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.data_dir().join(CHECKPOINT_DIR)
    }

    /// The checkpoint written when `node` finished its local clustering.
    #[must_use]
    pub fn checkpoint(&self, node: &NodeName) -> PathBuf {
        self.checkpoint_dir()
            .join(format!("{node}.{PARQUET_EXTENSION}"))
    }

    /// The scoring projection persisted for `node`.
    #[must_use]
    pub fn projection(&self, node: &NodeName) -> PathBuf {
        self.data_dir()
            .join(format!("{node}_proj.{PARQUET_EXTENSION}"))
    }

    /// The consolidated membership table of run `run`.
    #[must_use]
    pub fn clusters(&self, run: &str) -> PathBuf {
        self.data_dir()
            .join(format!("clusters_{run}_final.{PARQUET_EXTENSION}"))
    }

    /// The tree export of run `run`.
    #[must_use]
    pub fn tree(&self, run: &str) -> PathBuf {
        self.data_dir().join(format!("tree_{run}_final.json"))
    }
}

/// Reports whether `path` is a temporary sibling left by an interrupted write.
pub(crate) fn is_temporary(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(TEMP_SUFFIX))
}

/// Reports whether `path` names a Parquet file.
pub(crate) fn is_parquet(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == PARQUET_EXTENSION)
}

fn temporary_sibling(path: &Path) -> Result<PathBuf, StoreError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StoreError::InvalidPath {
            path: path.to_path_buf(),
        })?;
    Ok(path.with_file_name(format!(".{name}{TEMP_SUFFIX}")))
}

/// Writes `path` through a temporary sibling renamed into place, so a reader
/// never observes a partially written artefact.
pub(crate) fn write_atomically(
    path: &Path,
    write: impl FnOnce(File) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    if let Some(parent) = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
    }
    let temporary = temporary_sibling(path)?;
    let result = File::create(&temporary)
        .map_err(StoreError::io(&temporary))
        .and_then(write)
        .and_then(|()| fs::rename(&temporary, path).map_err(StoreError::io(path)));
    if result.is_err() && temporary.exists() {
        if let Err(error) = fs::remove_file(&temporary) {
            warn!(path = %temporary.display(), %error, "failed to remove temporary file");
        }
    }
    result
}
