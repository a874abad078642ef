//! Command implementations and argument parsing for the clade CLI.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clade_core::{
    Clade, CladeBuilder, CladeError, CollaboratorError, Dataset, ExecutionStrategy,
    FallbackPolicy, HierarchyTree, KnnProjector, MembershipTable, Metric, NodeName,
    ReferenceHierarchy, RootPolicy, ScoreCriterion, SubtreeBuilder,
};
use clade_store::{
    FEATURE_COLUMN, ParquetCheckpointStore, RunLayout, StoreError, read_dataset,
    read_membership, read_params, write_membership, write_tree,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{Span, field, info, instrument, warn};

const DEFAULT_NEIGHBOURS: &str = "10";
const DEFAULT_REFERENCE_RUN: &str = "reference";

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "clade",
    about = "Maintain divisive cluster hierarchies as new data arrives."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Assign new samples to the reference hierarchy without changing it.
    Classify(ClassifyCommand),
    /// Fold new samples into the reference hierarchy, rebuilding degraded
    /// nodes.
    Update(UpdateCommand),
    /// Reconstruct an interrupted build from its checkpoints.
    Resume(ResumeCommand),
    /// Export the hierarchy of a membership table as JSON.
    Tree(TreeCommand),
}

/// Run options mapped onto [`CladeBuilder`]; unset options keep the
/// library defaults.
#[derive(Debug, Args, Clone, Default)]
pub struct SettingsArgs {
    /// Score drop tolerated before a subtree is rebuilt.
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Minimum assignment probability; weaker assignments become noise.
    #[arg(long = "probcut")]
    pub probability_cutoff: Option<f32>,

    /// Clusters smaller than this become noise.
    #[arg(long = "minclusize")]
    pub min_cluster_size: Option<usize>,

    /// Nodes at or below this population are not resumed.
    #[arg(long = "popcut")]
    pub population_cutoff: Option<usize>,

    /// Nodes at this depth or deeper are not resumed.
    #[arg(long = "maxdepth")]
    pub max_depth: Option<usize>,

    /// Name of the root node.
    #[arg(long)]
    pub root: Option<String>,

    /// Clustering-quality objective (`silhouette` or `dunn`).
    #[arg(long)]
    pub score: Option<ScoreCriterion>,

    /// Distance metric used for scoring.
    #[arg(long = "metric-clu")]
    pub metric: Option<Metric>,

    /// What happens when the root split is invalidated (`continue` or `abort`).
    #[arg(long = "root-policy")]
    pub root_policy: Option<RootPolicy>,

    /// Numeric backend selection.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Fail instead of falling back to the CPU backend.
    #[arg(long)]
    pub strict_backend: bool,
}

/// Execution strategies accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Let the library choose.
    Auto,
    /// CPU only.
    Cpu,
    /// Prefer a GPU backend.
    Gpu,
}

impl From<StrategyArg> for ExecutionStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Auto => Self::Auto,
            StrategyArg::Cpu => Self::CpuOnly,
            StrategyArg::Gpu => Self::GpuPreferred,
        }
    }
}

impl SettingsArgs {
    fn builder(&self) -> CladeBuilder {
        let mut builder = CladeBuilder::new();
        if let Some(tolerance) = self.tolerance {
            builder = builder.with_tolerance(tolerance);
        }
        if let Some(cutoff) = self.probability_cutoff {
            builder = builder.with_probability_cutoff(cutoff);
        }
        if let Some(size) = self.min_cluster_size {
            builder = builder.with_min_cluster_size(size);
        }
        if let Some(cutoff) = self.population_cutoff {
            builder = builder.with_population_cutoff(cutoff);
        }
        if let Some(root) = &self.root {
            builder = builder.with_root(root.as_str());
        }
        if let Some(criterion) = self.score {
            builder = builder.with_score_criterion(criterion);
        }
        if let Some(metric) = self.metric {
            builder = builder.with_metric(metric);
        }
        if let Some(policy) = self.root_policy {
            builder = builder.with_root_policy(policy);
        }
        if let Some(strategy) = self.strategy {
            builder = builder.with_execution_strategy(strategy.into());
        }
        if self.strict_backend {
            builder = builder.with_fallback_policy(FallbackPolicy::Strict);
        }
        builder.with_max_depth(self.max_depth)
    }

    fn build(&self) -> Result<Clade, CliError> {
        Ok(self.builder().build()?)
    }
}

/// Location of a finished reference run.
#[derive(Debug, Args, Clone)]
pub struct ReferenceArgs {
    /// Run directory holding `clade_data/`.
    #[arg(long = "run-dir")]
    pub run_dir: PathBuf,

    /// Name of the reference run whose consolidated membership is loaded.
    #[arg(long = "run", default_value = DEFAULT_REFERENCE_RUN)]
    pub run: String,

    /// Parquet file with the reference features.
    #[arg(long = "reference")]
    pub data: PathBuf,

    /// Column holding `FixedSizeList<Float32, D>` feature rows.
    #[arg(long, default_value = FEATURE_COLUMN)]
    pub column: String,
}

impl ReferenceArgs {
    fn layout(&self) -> RunLayout {
        RunLayout::new(&self.run_dir)
    }

    #[instrument(
        name = "cli.load_reference",
        err,
        skip(self),
        fields(run_dir = %self.run_dir.display(), run = %self.run),
    )]
    fn load(&self) -> Result<ReferenceHierarchy, CliError> {
        let layout = self.layout();
        let data = read_dataset(&self.data, &self.column)?;
        let membership = read_membership(layout.clusters(&self.run))?;
        let params = read_params(layout.params())?;
        info!(
            samples = data.len(),
            clusters = membership.column_count(),
            "reference loaded"
        );
        Ok(ReferenceHierarchy::try_new(data, membership, params)?)
    }
}

/// Options accepted by the `classify` command.
#[derive(Debug, Args, Clone)]
pub struct ClassifyCommand {
    /// Reference run.
    #[command(flatten)]
    pub reference: ReferenceArgs,

    /// Parquet file with the new samples.
    #[arg(long = "new")]
    pub new: PathBuf,

    /// Where to write the assignment table.
    #[arg(long)]
    pub output: PathBuf,

    /// Reference neighbours consulted per new sample.
    #[arg(long, default_value = DEFAULT_NEIGHBOURS)]
    pub neighbours: NonZeroUsize,

    /// Run options.
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Options accepted by the `update` command.
#[derive(Debug, Args, Clone)]
pub struct UpdateCommand {
    /// Reference run.
    #[command(flatten)]
    pub reference: ReferenceArgs,

    /// Parquet file with the new samples.
    #[arg(long = "new")]
    pub new: PathBuf,

    /// Name of the run written next to the reference artefacts.
    #[arg(long = "output-run")]
    pub output_run: String,

    /// Reference neighbours consulted per new sample.
    #[arg(long, default_value = DEFAULT_NEIGHBOURS)]
    pub neighbours: NonZeroUsize,

    /// Run options.
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Options accepted by the `resume` command.
#[derive(Debug, Args, Clone)]
pub struct ResumeCommand {
    /// Run directory holding `clade_data/`.
    #[arg(long = "run-dir")]
    pub run_dir: PathBuf,

    /// Name under which the resumed run is written.
    #[arg(long = "run")]
    pub run: String,

    /// Parquet file with the full dataset.
    #[arg(long)]
    pub data: PathBuf,

    /// Column holding `FixedSizeList<Float32, D>` feature rows.
    #[arg(long, default_value = FEATURE_COLUMN)]
    pub column: String,

    /// Run options.
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Options accepted by the `tree` command.
#[derive(Debug, Args, Clone)]
pub struct TreeCommand {
    /// Membership table to export.
    pub membership: PathBuf,

    /// Parameter table supplying node scores.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Name of the root node.
    #[arg(long, default_value = clade_core::DEFAULT_ROOT)]
    pub root: String,

    /// Where to write the JSON tree.
    #[arg(long)]
    pub output: PathBuf,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading or writing run artefacts failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Core orchestration failed.
    #[error(transparent)]
    Core(#[from] CladeError),
}

impl CliError {
    /// Returns the stable `CLADE_*` code of a core failure and, when a
    /// membership table was malformed, its `TABLE_*` code.
    ///
    /// Store failures carry no code; their message names the offending path.
    #[must_use]
    pub fn error_codes(&self) -> (Option<&'static str>, Option<&'static str>) {
        match self {
            Self::Core(core) => (
                Some(core.code().as_str()),
                core.table_code().map(|code| code.as_str()),
            ),
            Self::Store(_) => (None, None),
        }
    }
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSummary {
    /// Command that produced the summary.
    pub command: &'static str,
    /// Samples in the written membership table.
    pub samples: usize,
    /// Node columns in the written membership table.
    pub clusters: usize,
    /// Nodes whose subtree was rebuilt.
    pub rebuilt: Vec<NodeName>,
    /// Nodes left as leaves because no subtree builder is configured.
    pub deferred: Vec<NodeName>,
    /// Parameter records dropped while reconciling a resumed run.
    pub dropped_params: usize,
    /// Artefacts written by the command.
    pub outputs: Vec<PathBuf>,
}

impl ExecutionSummary {
    fn new(command: &'static str, membership: &MembershipTable) -> Self {
        Self {
            command,
            samples: membership.sample_count(),
            clusters: membership.column_count(),
            ..Self::default()
        }
    }
}

/// Subtree builder for runs without a clustering procedure: every node it is
/// asked to build stays a leaf and is reported in the summary.
#[derive(Debug, Default)]
pub(super) struct DeferredBuilder {
    deferred: Vec<NodeName>,
}

impl SubtreeBuilder for DeferredBuilder {
    fn build(
        &mut self,
        data: &Dataset,
        depth: usize,
        name: &NodeName,
    ) -> Result<Option<MembershipTable>, CollaboratorError> {
        warn!(
            node = %name,
            depth,
            samples = data.len(),
            "no subtree builder configured; node left as a leaf"
        );
        self.deferred.push(name.clone());
        Ok(None)
    }
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading inputs, running the engine or writing
/// outputs fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use clade_cli::cli::{Cli, Command, TreeCommand, run_cli};
/// # use clade_core::{MembershipTable, NodeName};
/// # use tempfile::TempDir;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let dir = TempDir::new()?;
/// let membership = dir.path().join("clusters.parquet");
/// let table = MembershipTable::from_columns(
///     vec!["a".into(), "b".into()],
///     vec![(NodeName::from("0_0"), vec![1, 0]), (NodeName::from("0_1"), vec![0, 1])],
/// )?;
/// clade_store::write_membership(&membership, &table)?;
/// let cli = Cli {
///     command: Command::Tree(TreeCommand {
///         membership,
///         params: None,
///         root: "0".into(),
///         output: dir.path().join("tree.json"),
///     }),
/// };
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.clusters, 2);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    let summary = match cli.command {
        Command::Classify(command) => {
            span.record("command", "classify");
            run_classify(&command)?
        }
        Command::Update(command) => {
            span.record("command", "update");
            run_update(&command)?
        }
        Command::Resume(command) => {
            span.record("command", "resume");
            run_resume(&command)?
        }
        Command::Tree(command) => {
            span.record("command", "tree");
            run_tree(&command)?
        }
    };
    info!(
        samples = summary.samples,
        clusters = summary.clusters,
        "command completed"
    );
    Ok(summary)
}

#[instrument(
    name = "cli.classify",
    err,
    skip(command),
    fields(new = %command.new.display(), output = %command.output.display()),
)]
pub(super) fn run_classify(command: &ClassifyCommand) -> Result<ExecutionSummary, CliError> {
    let clade = command.settings.build()?;
    let reference = command.reference.load()?;
    let new = read_dataset(&command.new, &command.reference.column)?;
    let mut projector = KnnProjector::new(command.neighbours, clade.metric());
    let assigned = clade.classify(&new, &reference, &mut projector)?;
    write_membership(&command.output, &assigned)?;
    Ok(ExecutionSummary {
        outputs: vec![command.output.clone()],
        ..ExecutionSummary::new("classify", &assigned)
    })
}

#[instrument(
    name = "cli.update",
    err,
    skip(command),
    fields(new = %command.new.display(), output_run = %command.output_run),
)]
pub(super) fn run_update(command: &UpdateCommand) -> Result<ExecutionSummary, CliError> {
    let clade = command.settings.build()?;
    let reference = command.reference.load()?;
    let new = read_dataset(&command.new, &command.reference.column)?;
    let store = ParquetCheckpointStore::new(command.reference.layout());
    let mut projector = KnnProjector::new(command.neighbours, clade.metric());
    let mut builder = DeferredBuilder::default();
    let report = clade.update(&new, &reference, &mut projector, &mut builder, &store)?;

    let tree = HierarchyTree::from_membership(
        report.membership(),
        clade.root(),
        Some(reference.params()),
    );
    let outputs = write_run(store.layout(), &command.output_run, report.membership(), &tree)?;
    Ok(ExecutionSummary {
        rebuilt: report.rebuilt().cloned().collect(),
        deferred: builder.deferred,
        outputs,
        ..ExecutionSummary::new("update", report.membership())
    })
}

#[instrument(
    name = "cli.resume",
    err,
    skip(command),
    fields(run_dir = %command.run_dir.display(), run = %command.run),
)]
pub(super) fn run_resume(command: &ResumeCommand) -> Result<ExecutionSummary, CliError> {
    let clade = command.settings.build()?;
    let data = read_dataset(&command.data, &command.column)?;
    let store = ParquetCheckpointStore::new(RunLayout::new(&command.run_dir));
    let mut builder = DeferredBuilder::default();
    let report = clade.resume(&data, &store, &mut builder)?;
    if report.dropped_params() > 0 {
        store.write_params(report.params())?;
    }
    let outputs = write_run(store.layout(), &command.run, report.membership(), report.tree())?;
    Ok(ExecutionSummary {
        deferred: builder.deferred,
        dropped_params: report.dropped_params(),
        outputs,
        ..ExecutionSummary::new("resume", report.membership())
    })
}

#[instrument(
    name = "cli.tree",
    err,
    skip(command),
    fields(membership = %command.membership.display(), output = %command.output.display()),
)]
pub(super) fn run_tree(command: &TreeCommand) -> Result<ExecutionSummary, CliError> {
    let membership = read_membership(&command.membership)?;
    let params = command.params.as_deref().map(read_params).transpose()?;
    let tree = HierarchyTree::from_membership(
        &membership,
        &NodeName::from(command.root.as_str()),
        params.as_ref(),
    );
    write_tree(&command.output, &tree)?;
    Ok(ExecutionSummary {
        outputs: vec![command.output.clone()],
        ..ExecutionSummary::new("tree", &membership)
    })
}

/// Writes the consolidated membership table and tree of run `run`.
fn write_run(
    layout: &RunLayout,
    run: &str,
    membership: &MembershipTable,
    tree: &HierarchyTree,
) -> Result<Vec<PathBuf>, CliError> {
    let clusters = layout.clusters(run);
    let tree_path = layout.tree(run);
    write_membership(&clusters, membership)?;
    write_tree(&tree_path, tree)?;
    Ok(vec![clusters, tree_path])
}

/// Renders `summary` to `writer` as `key: value` lines.
///
/// # Errors
/// Returns [`std::io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use clade_cli::cli::{ExecutionSummary, render_summary};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary {
///     command: "tree",
///     samples: 4,
///     clusters: 3,
///     ..ExecutionSummary::default()
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "command: tree\nsamples: 4\nclusters: 3\n");
/// # Ok(())
/// # }
/// ```
pub fn render_summary(
    summary: &ExecutionSummary,
    mut writer: impl std::io::Write,
) -> std::io::Result<()> {
    writeln!(writer, "command: {}", summary.command)?;
    writeln!(writer, "samples: {}", summary.samples)?;
    writeln!(writer, "clusters: {}", summary.clusters)?;
    if !summary.rebuilt.is_empty() {
        writeln!(writer, "rebuilt: {}", join(&summary.rebuilt))?;
    }
    if !summary.deferred.is_empty() {
        writeln!(writer, "deferred: {}", join(&summary.deferred))?;
    }
    if summary.dropped_params > 0 {
        writeln!(writer, "dropped parameter records: {}", summary.dropped_params)?;
    }
    for output in &summary.outputs {
        writeln!(writer, "wrote {}", output.display())?;
    }
    Ok(())
}

fn join(names: &[NodeName]) -> String {
    names
        .iter()
        .map(NodeName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
