//! Clade core library.
//!
//! Maintains divisive cluster hierarchies incrementally: new samples are
//! projected onto an existing hierarchy, each affected node is rescored, and
//! nodes whose split degrades beyond tolerance have their subtree rebuilt.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod assemble;
mod backend;
mod builder;
mod clade;
mod dataset;
mod distance;
mod error;
mod index;
mod labels;
mod naming;
mod node_update;
mod params;
mod projection;
mod projector;
mod reference;
mod resume;
mod score;
mod subtree;
mod table;
mod tree;
mod walker;

pub use crate::{
    assemble::{assemble, concat_rows, enforce_lineage},
    backend::{
        CpuBackend, DistanceMatrix, ExecutionStrategy, FallbackPolicy, NumericBackend,
        select_backend,
    },
    builder::{CladeBuilder, RootPolicy, UnknownRootPolicy},
    clade::{Clade, Clustering},
    dataset::Dataset,
    distance::{
        Distance, DistanceError, Metric, UnknownMetric, VectorKind, cosine_distance,
        euclidean_distance, manhattan_distance,
    },
    error::{CladeError, CladeErrorCode, CollaboratorError, Result},
    index::HierarchyIndex,
    labels::{child_labels, one_hot_encode},
    naming::{DEFAULT_ROOT, NodeName, REBUILD_MARKER, SEPARATOR},
    node_update::{NodeDecision, NodeReport},
    params::{ParamRecord, ParamTable},
    projection::{ProjectionMap, ProjectionSource, RawFeatures},
    projector::{KnnProjector, Projector, apply_probability_cutoff, unique_assignment},
    reference::ReferenceHierarchy,
    resume::{CheckpointStore, ResumeReport},
    score::{Label, ScoreCriterion, ScoreError, ScoreEvaluator, UnknownCriterion},
    subtree::SubtreeBuilder,
    table::{
        Cell, MembershipTable, ProbabilityTable, SampleId, Table, TableError, TableErrorCode,
    },
    tree::{HierarchyTree, TreeNode},
    walker::UpdateReport,
};
