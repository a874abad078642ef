//! The `clade` binary.
//!
//! Runs one of `classify`, `update`, `resume` or `tree` against a run
//! directory and prints the run summary as `key: value` lines on stdout.
//! A failed command is logged once with its `CLADE_*` code (and `TABLE_*`
//! code for malformed membership tables) and exits non-zero.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use clade_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

/// Runs the parsed command and writes its summary.
fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary = run_cli(cli).context("command failed")?;
    let mut stdout = BufWriter::new(io::stdout().lock());
    render_summary(&summary, &mut stdout).context("failed to write the run summary")?;
    stdout.flush().context("failed to flush stdout")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (code, table_code) = err
                .downcast_ref::<CliError>()
                .map_or((None, None), CliError::error_codes);
            let message = format!("{err:#}");
            error!(
                error = %message,
                code = code.map(field::display),
                table_code = table_code.map(field::display),
                "clade command failed"
            );
            ExitCode::FAILURE
        }
    }
}

#[expect(
    clippy::print_stderr,
    reason = "no subscriber is installed to carry the diagnostic"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("clade: cannot initialise logging: {err}");
}
