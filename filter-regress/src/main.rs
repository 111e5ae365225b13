//! Implements the `regression` command-line runner.

#![deny(missing_docs)]

mod args;
mod events;

use crate::args::CommandLineArgs;
use anyhow::{Context, Result};
use clap::Parser;
use filter_regress_harness::{
    ProcessToolchain, Reporter, RunContext, TestRunner, discover_batch_files,
};
use std::{
    fs::File,
    io::{BufWriter, Write},
    process::ExitCode,
};

/// Main entry point for the `regression` runner.
fn main() -> ExitCode {
    //
    // Set up panic handler. On release builds, it will capture panic details to a
    // temporary .toml file and report a human-readable message to the screen.
    //
    human_panic::setup_panic!(human_panic::Metadata::new(
        env!("CARGO_BIN_NAME"),
        env!("CARGO_PKG_VERSION")
    ));

    let args = CommandLineArgs::parse();

    events::init(&args.enabled_trace_events);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CommandLineArgs) -> Result<()> {
    let batches = discover_batch_files(&args.tests_dir).with_context(|| {
        format!(
            "failed to list batch files in {}",
            args.tests_dir.display()
        )
    })?;

    // The generator rewrites this file for every combination; it is removed
    // when the run ends.
    let filter_file = create_filter_file(args)?;

    let mut context = RunContext::new(args.tests_dir.clone(), filter_file.path().to_path_buf())
        .with_verbose(args.verbose);
    if let Some(arch) = args.arch {
        context = context.with_arch(arch);
    }

    tracing::debug!(
        target: filter_regress_harness::trace_categories::SELECT,
        "host architecture: {}",
        context.arch
    );

    let runner = TestRunner::new(
        context,
        args.selection(),
        ProcessToolchain::new(args.tool_paths()),
    )
    .with_test_types(args.test_types.iter().copied());

    if args.list_tests_only {
        runner.list(&batches, std::io::stdout().lock())?;
        return Ok(());
    }

    let mut reporter = Reporter::new(open_log(args)?, args.verbose);

    runner.run(&batches, &mut reporter)?;
    reporter.report_summary()?;

    reporter.stats().write_pretty(std::io::stderr().lock())?;

    Ok(())
}

fn create_filter_file(args: &CommandLineArgs) -> Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("regression_").suffix(".bpf");

    let file = match &args.temp_dir {
        Some(dir) => builder
            .tempfile_in(dir)
            .with_context(|| format!("failed to create filter file in {}", dir.display()))?,
        None => builder
            .tempfile()
            .context("failed to create filter file")?,
    };

    Ok(file)
}

fn open_log(args: &CommandLineArgs) -> Result<Box<dyn Write>> {
    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}
