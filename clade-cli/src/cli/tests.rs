//! Unit tests for the CLI commands.

use super::commands::{DeferredBuilder, run_resume};
use super::test_helpers::{REFERENCE_RUN, run_cli_expecting_error, settings, workspace};
use super::{
    ClassifyCommand, Cli, CliError, Command, ExecutionSummary, ResumeCommand, SettingsArgs,
    StrategyArg, TreeCommand, UpdateCommand, render_summary, run_cli,
};

use std::num::NonZeroUsize;

use clade_core::{
    CladeErrorCode, Dataset, ExecutionStrategy, Metric, NodeName, RootPolicy, ScoreCriterion,
    SubtreeBuilder,
};
use clade_store::{FEATURE_COLUMN, StoreError, read_membership, read_tree};
use clade_test_support::tracing::RecordingLayer;
use clap::Parser;
use rstest::rstest;
use tracing::Level;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn neighbours() -> NonZeroUsize {
    NonZeroUsize::new(3).expect("non-zero")
}

#[rstest]
fn classify_assigns_new_samples_without_changing_the_reference() -> TestResult {
    let workspace = workspace();
    let output = workspace.path().join("assigned.parquet");
    let summary = run_cli(Cli {
        command: Command::Classify(ClassifyCommand {
            reference: workspace.reference_args(),
            new: workspace.new.clone(),
            output: output.clone(),
            neighbours: neighbours(),
            settings: settings(),
        }),
    })?;
    assert_eq!(summary.command, "classify");
    assert_eq!(summary.samples, 5);
    let assigned = read_membership(&output)?;
    assert_eq!(assigned.population(&NodeName::from("0_1")), 5);
    assert_eq!(assigned.population(&NodeName::from("0_0")), 0);
    let reference = read_membership(workspace.layout().clusters(REFERENCE_RUN))?;
    assert_eq!(reference.sample_count(), 40);
    Ok(())
}

#[rstest]
fn update_writes_the_consolidated_run() -> TestResult {
    let workspace = workspace();
    let summary = run_cli(Cli {
        command: Command::Update(UpdateCommand {
            reference: workspace.reference_args(),
            new: workspace.new.clone(),
            output_run: "updated".to_owned(),
            neighbours: neighbours(),
            settings: settings(),
        }),
    })?;
    assert_eq!(summary.samples, 45);
    assert!(summary.rebuilt.is_empty());
    let layout = workspace.layout();
    assert_eq!(
        summary.outputs,
        [layout.clusters("updated"), layout.tree("updated")]
    );
    let membership = read_membership(layout.clusters("updated"))?;
    assert_eq!(membership.population(&NodeName::from("0_1")), 25);
    let tree = read_tree(layout.tree("updated"))?;
    assert_eq!(tree.len(), 3);
    Ok(())
}

#[rstest]
fn resume_defers_unfinished_nodes() -> TestResult {
    let workspace = workspace();
    let command = ResumeCommand {
        run_dir: workspace.path().to_path_buf(),
        run: "resumed".to_owned(),
        data: workspace.reference.clone(),
        column: FEATURE_COLUMN.to_owned(),
        settings: SettingsArgs {
            population_cutoff: Some(5),
            ..settings()
        },
    };
    let (summary, recorder) = RecordingLayer::capture(|| run_resume(&command));
    let summary = summary?;
    assert_eq!(
        summary.deferred,
        [NodeName::from("0_0"), NodeName::from("0_1")]
    );
    assert_eq!(summary.clusters, 2);
    assert_eq!(
        recorder
            .events_with_message(Level::WARN, "no subtree builder configured; node left as a leaf")
            .len(),
        2
    );
    assert!(workspace.layout().tree("resumed").exists());
    Ok(())
}

#[rstest]
fn tree_exports_scores_from_the_parameter_table() -> TestResult {
    let workspace = workspace();
    let layout = workspace.layout();
    let output = workspace.path().join("tree.json");
    let summary = run_cli(Cli {
        command: Command::Tree(TreeCommand {
            membership: layout.clusters(REFERENCE_RUN),
            params: Some(layout.params()),
            root: "0".to_owned(),
            output: output.clone(),
        }),
    })?;
    assert_eq!(summary.clusters, 2);
    let tree = read_tree(&output)?;
    let root = tree.root().expect("root node");
    assert_eq!(root.population, 40);
    assert_eq!(root.score, Some(0.0));
    assert_eq!(tree.leaves().count(), 2);
    Ok(())
}

#[rstest]
fn missing_reference_run_is_a_store_error() {
    let workspace = workspace();
    let mut reference = workspace.reference_args();
    reference.run = "absent".to_owned();
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Classify(ClassifyCommand {
                reference,
                new: workspace.new.clone(),
                output: workspace.path().join("out.parquet"),
                neighbours: neighbours(),
                settings: settings(),
            }),
        },
        "missing run must fail",
    );
    assert!(matches!(err, CliError::Store(StoreError::Io { .. })));
    assert_eq!(err.error_codes(), (None, None));
}

#[rstest]
#[case::negative_tolerance(
    SettingsArgs { tolerance: Some(-1.0), ..SettingsArgs::default() },
    CladeErrorCode::InvalidTolerance
)]
#[case::probability_above_one(
    SettingsArgs { probability_cutoff: Some(1.5), ..SettingsArgs::default() },
    CladeErrorCode::InvalidProbabilityCutoff
)]
#[case::zero_min_cluster_size(
    SettingsArgs { min_cluster_size: Some(0), ..SettingsArgs::default() },
    CladeErrorCode::InvalidMinClusterSize
)]
fn invalid_settings_are_core_errors(
    #[case] settings: SettingsArgs,
    #[case] expected: CladeErrorCode,
) {
    let workspace = workspace();
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Update(UpdateCommand {
                reference: workspace.reference_args(),
                new: workspace.new.clone(),
                output_run: "updated".to_owned(),
                neighbours: neighbours(),
                settings,
            }),
        },
        "invalid settings must fail",
    );
    assert!(matches!(err, CliError::Core(ref core) if core.code() == expected));
    assert_eq!(err.error_codes(), (Some(expected.as_str()), None));
}

#[rstest]
fn clap_maps_flags_onto_settings() {
    let cli = Cli::try_parse_from([
        "clade",
        "update",
        "--run-dir",
        "run",
        "--reference",
        "reference.parquet",
        "--new",
        "new.parquet",
        "--output-run",
        "next",
        "--score",
        "dunn",
        "--metric-clu",
        "cosine",
        "--root-policy",
        "abort",
        "--strategy",
        "cpu",
        "--maxdepth",
        "3",
    ])
    .expect("valid arguments");
    let Command::Update(command) = cli.command else {
        panic!("expected the update command");
    };
    assert_eq!(command.reference.run, REFERENCE_RUN);
    assert_eq!(command.neighbours.get(), 10);
    assert_eq!(command.settings.score, Some(ScoreCriterion::Dunn));
    assert_eq!(command.settings.metric, Some(Metric::Cosine));
    assert_eq!(command.settings.root_policy, Some(RootPolicy::Abort));
    assert_eq!(command.settings.strategy, Some(StrategyArg::Cpu));
    assert_eq!(command.settings.max_depth, Some(3));
    assert_eq!(
        ExecutionStrategy::from(StrategyArg::Gpu),
        ExecutionStrategy::GpuPreferred
    );
}

#[rstest]
#[case::unknown_score(&["--score", "inertia"])]
#[case::unknown_policy(&["--root-policy", "retry"])]
#[case::zero_neighbours(&["--neighbours", "0"])]
fn clap_rejects_invalid_values(#[case] extra: &[&str]) {
    let mut args = vec![
        "clade",
        "classify",
        "--run-dir",
        "run",
        "--reference",
        "reference.parquet",
        "--new",
        "new.parquet",
        "--output",
        "out.parquet",
    ];
    args.extend_from_slice(extra);
    assert!(Cli::try_parse_from(args).is_err());
}

#[rstest]
fn deferred_builder_leaves_nodes_unbuilt() -> TestResult {
    let mut builder = DeferredBuilder::default();
    let data = Dataset::try_from(vec![vec![0.0_f32], vec![1.0]])?;
    assert!(builder.build(&data, 1, &NodeName::from("0_1"))?.is_none());
    Ok(())
}

#[rstest]
fn render_summary_lists_outputs() -> TestResult {
    let summary = ExecutionSummary {
        command: "update",
        samples: 45,
        clusters: 3,
        rebuilt: vec![NodeName::from("0_1u")],
        outputs: vec!["clade_data/tree_x_final.json".into()],
        ..ExecutionSummary::default()
    };
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;
    assert!(text.contains("samples: 45"));
    assert!(text.contains("rebuilt: 0_1u"));
    assert!(text.contains("wrote clade_data/tree_x_final.json"));
    assert!(!text.contains("deferred"));
    Ok(())
}
