//! Command-line interface orchestration for clade runs.
//!
//! `classify` assigns new samples to a finished reference run, `update` folds
//! them into it, `resume` completes an interrupted build from its checkpoints,
//! and `tree` exports a membership table as JSON.

mod commands;

pub use commands::{
    ClassifyCommand, Cli, CliError, Command, ExecutionSummary, ReferenceArgs, ResumeCommand,
    SettingsArgs, StrategyArg, TreeCommand, UpdateCommand, render_summary, run_cli,
};

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;
