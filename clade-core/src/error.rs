//! Error types for the clade core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{
    backend::ExecutionStrategy,
    naming::NodeName,
    score::ScoreError,
    table::{TableError, TableErrorCode},
};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $pattern:tt => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $pattern => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// Failure reported by an injected collaborator: the subtree builder, the
/// projector, a projection source or a checkpoint store.
///
/// # Examples
/// ```
/// use clade_core::CollaboratorError;
///
/// let err = CollaboratorError::new("disk unavailable");
/// assert_eq!(err.to_string(), "disk unavailable");
/// ```
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{message}")]
pub struct CollaboratorError {
    message: Arc<str>,
}

impl CollaboratorError {
    /// Wraps a human-readable failure description.
    #[must_use]
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error type produced when configuring or running [`crate::Clade`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CladeError {
    /// The rebuild tolerance must be finite and non-negative.
    #[error("tolerance must be finite and non-negative (got {got})")]
    InvalidTolerance {
        /// The rejected tolerance.
        got: f64,
    },
    /// The probability cutoff must lie in `[0, 1]`.
    #[error("probability cutoff must lie in [0, 1] (got {got})")]
    InvalidProbabilityCutoff {
        /// The rejected cutoff.
        got: f32,
    },
    /// Minimum cluster size must be greater than zero.
    #[error("min_cluster_size must be at least 1 (got {got})")]
    InvalidMinClusterSize {
        /// The rejected minimum cluster size.
        got: usize,
    },
    /// An input could not be converted into the typed form the engine needs.
    #[error("unconvertible {input}: {reason}")]
    UnconvertibleInput {
        /// Which input failed conversion.
        input: &'static str,
        /// Why conversion failed.
        reason: Arc<str>,
    },
    /// The parameter table could not be found.
    #[error("parameter table not found at `{location}`; check the checkpoint path")]
    MissingParameterTable {
        /// Where the table was expected.
        location: Arc<str>,
    },
    /// The parameter table exists but holds no rows.
    #[error("parameter table at `{location}` is empty")]
    EmptyParameterTable {
        /// Where the table was read from.
        location: Arc<str>,
    },
    /// No checkpoint files were found; the run must restart from scratch.
    #[error(
        "no checkpoint files found under `{location}`; if no checkpoints were written, rerun from scratch"
    )]
    NoCheckpoints {
        /// The checkpoint directory that was scanned.
        location: Arc<str>,
    },
    /// The root split was invalidated and the run is configured to abort.
    #[error("root `{root}` score dropped by {delta:.3}, beyond tolerance; rerun from scratch")]
    RootInvalidated {
        /// Root node name.
        root: NodeName,
        /// Observed score delta.
        delta: f64,
    },
    /// The requested execution strategy is unavailable in the current build.
    #[error("the requested execution strategy {requested:?} is not available in this build")]
    BackendUnavailable {
        /// Strategy that could not be satisfied.
        requested: ExecutionStrategy,
    },
    /// No scoring projection is available for a node.
    #[error("no projection available for node `{node}`: {source}")]
    Projection {
        /// Node whose projection was requested.
        node: NodeName,
        /// Underlying collaborator failure.
        #[source]
        source: CollaboratorError,
    },
    /// The subtree builder failed.
    #[error("subtree builder failed for node `{node}`: {source}")]
    Builder {
        /// Node being built.
        node: NodeName,
        /// Underlying collaborator failure.
        #[source]
        source: CollaboratorError,
    },
    /// The projector failed to assign new samples.
    #[error("projector failed: {source}")]
    Projector {
        /// Underlying collaborator failure.
        #[source]
        source: CollaboratorError,
    },
    /// The checkpoint store failed while loading run state.
    #[error("checkpoint store failed: {source}")]
    Store {
        /// Underlying collaborator failure.
        #[source]
        source: CollaboratorError,
    },
    /// Scoring failed for a reason other than degenerate labels.
    #[error("scoring node `{node}` failed: {source}")]
    Score {
        /// Node being scored.
        node: NodeName,
        /// Underlying scoring failure.
        #[source]
        source: ScoreError,
    },
    /// A membership or probability table violated its invariants.
    #[error(transparent)]
    Table(#[from] TableError),
}

define_error_codes! {
    /// Stable codes describing [`CladeError`] variants.
    enum CladeErrorCode for CladeError {
        /// The rebuild tolerance must be finite and non-negative.
        InvalidTolerance => InvalidTolerance { .. } => "CLADE_INVALID_TOLERANCE",
        /// The probability cutoff must lie in `[0, 1]`.
        InvalidProbabilityCutoff => InvalidProbabilityCutoff { .. } => "CLADE_INVALID_PROBABILITY_CUTOFF",
        /// Minimum cluster size must be greater than zero.
        InvalidMinClusterSize => InvalidMinClusterSize { .. } => "CLADE_INVALID_MIN_CLUSTER_SIZE",
        /// An input could not be converted.
        UnconvertibleInput => UnconvertibleInput { .. } => "CLADE_UNCONVERTIBLE_INPUT",
        /// The parameter table could not be found.
        MissingParameterTable => MissingParameterTable { .. } => "CLADE_MISSING_PARAMETER_TABLE",
        /// The parameter table holds no rows.
        EmptyParameterTable => EmptyParameterTable { .. } => "CLADE_EMPTY_PARAMETER_TABLE",
        /// No checkpoint files were found.
        NoCheckpoints => NoCheckpoints { .. } => "CLADE_NO_CHECKPOINTS",
        /// The root split was invalidated.
        RootInvalidated => RootInvalidated { .. } => "CLADE_ROOT_INVALIDATED",
        /// The requested execution strategy is unavailable.
        BackendUnavailable => BackendUnavailable { .. } => "CLADE_BACKEND_UNAVAILABLE",
        /// No scoring projection is available.
        ProjectionFailure => Projection { .. } => "CLADE_PROJECTION_FAILURE",
        /// The subtree builder failed.
        BuilderFailure => Builder { .. } => "CLADE_BUILDER_FAILURE",
        /// The projector failed.
        ProjectorFailure => Projector { .. } => "CLADE_PROJECTOR_FAILURE",
        /// The checkpoint store failed.
        StoreFailure => Store { .. } => "CLADE_STORE_FAILURE",
        /// Scoring failed.
        ScoreFailure => Score { .. } => "CLADE_SCORE_FAILURE",
        /// A table violated its invariants.
        TableFailure => Table(..) => "CLADE_TABLE_FAILURE",
    }
}

impl CladeError {
    /// Returns the underlying [`TableErrorCode`] when the error wraps a
    /// table failure.
    #[must_use]
    pub const fn table_code(&self) -> Option<TableErrorCode> {
        match self {
            Self::Table(error) => Some(error.code()),
            _ => None,
        }
    }

    /// Shorthand for [`CladeError::UnconvertibleInput`].
    pub(crate) fn unconvertible(input: &'static str, reason: impl Into<Arc<str>>) -> Self {
        Self::UnconvertibleInput {
            input,
            reason: reason.into(),
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, CladeError>;
