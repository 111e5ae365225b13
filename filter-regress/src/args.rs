use clap::{Parser, builder::styling};
use filter_regress_harness::{Arch, SelectionCriteria, TestType, ToolPaths};
use std::path::PathBuf;

use crate::events;

const SHORT_DESCRIPTION: &str = "Regression runner for security-filter generators";

const LONG_DESCRIPTION: &str = r"
Runs the batch files (*.tests) in a tests directory. Basic records are commands that must
exit 0; bpf-sim records build a filter with the generator under test and check the action
the simulator reports for every syscall/argument combination they cover.

Outcomes are written to the log as they happen. The exit status is 0 whenever the run
completes, whatever the outcomes were.
";

/// Parsed command-line arguments for the regression runner.
#[derive(Parser)]
#[clap(name = "regression",
       version,
       about = SHORT_DESCRIPTION,
       long_about = LONG_DESCRIPTION,
       disable_help_flag = true,
       styles = regression_help_styles())]
#[allow(clippy::module_name_repetitions)]
pub struct CommandLineArgs {
    /// Display usage information.
    #[clap(long = "help", action = clap::ArgAction::HelpLong)]
    pub help: Option<bool>,

    /// Run every test (overrides --batch and --single).
    #[clap(short = 'a', long = "all")]
    pub all: bool,

    /// Run only the named batch (file name without extension).
    #[clap(short = 'b', long = "batch", value_name = "NAME")]
    pub batches: Vec<String>,

    /// Run only the record with this sequence number in each selected batch.
    #[clap(short = 's', long = "single", value_name = "NUM")]
    pub single_numbers: Vec<u32>,

    /// Run only records of this test type.
    #[clap(short = 'T', long = "type", value_name = "TYPE")]
    pub test_types: Vec<TestType>,

    /// Run commands under test through the memory checker.
    #[clap(short = 'm', long = "memcheck")]
    pub memcheck: bool,

    /// Memory checker to use with --memcheck.
    #[clap(
        long = "memcheck-path",
        env = "REGRESSION_MEMCHECK",
        default_value = "valgrind"
    )]
    pub memcheck_path: PathBuf,

    /// Write the outcome log to this file instead of stdout.
    #[clap(short = 'l', long = "log", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Directory for temporary files.
    #[clap(short = 't', long = "temp-dir", value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Report data lines, skipped tests and tool diagnostics.
    #[clap(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Directory containing the batch files and generators.
    #[clap(
        long = "tests-dir",
        env = "REGRESSION_TESTS_DIR",
        default_value = "."
    )]
    pub tests_dir: PathBuf,

    /// Filter simulator [default: <tests-dir>/../tools/scmp_bpf_sim].
    #[clap(long = "simulator", env = "REGRESSION_SIMULATOR")]
    pub simulator: Option<PathBuf>,

    /// Syscall name resolver [default: <tests-dir>/../tools/scmp_sys_resolver].
    #[clap(long = "resolver", env = "REGRESSION_RESOLVER")]
    pub resolver: Option<PathBuf>,

    /// Architecture to simulate for instead of the detected one.
    #[clap(long = "arch")]
    pub arch: Option<Arch>,

    /// List the selected records without running them.
    #[clap(long = "list")]
    pub list_tests_only: bool,

    /// Enable debug logging for classes of tracing events.
    #[clap(long = "trace", value_name = "EVENT")]
    pub enabled_trace_events: Vec<events::TraceEvent>,
}

impl CommandLineArgs {
    /// Returns the selection implied by --all, --batch and --single.
    pub fn selection(&self) -> SelectionCriteria {
        SelectionCriteria::new(
            self.all,
            self.batches.iter().cloned(),
            self.single_numbers.iter().copied(),
        )
    }

    /// Returns the tool locations, filling in defaults relative to the
    /// tests directory.
    pub fn tool_paths(&self) -> ToolPaths {
        let mut paths = ToolPaths::relative_to(&self.tests_dir);

        if let Some(simulator) = &self.simulator {
            paths.simulator.clone_from(simulator);
        }
        if let Some(resolver) = &self.resolver {
            paths.resolver.clone_from(resolver);
        }

        paths.with_memcheck(self.memcheck.then(|| self.memcheck_path.clone()))
    }
}

/// Returns clap styling to be used for command-line help.
#[doc(hidden)]
fn regression_help_styles() -> clap::builder::Styles {
    styling::Styles::styled()
        .header(
            styling::AnsiColor::Yellow.on_default()
                | styling::Effects::BOLD
                | styling::Effects::UNDERLINE,
        )
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Magenta.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}
