//! Regression harness for security-filter generators.
//!
//! The harness reads batch files of test records, selects which records to
//! run, and checks each one against the external tools:
//!
//! 1. **Basic** records are command lines; a zero exit status is a pass.
//!
//! 2. **bpf-sim** records name a filter generator, a target architecture, a
//!    syscall and six argument specifications, and the action the filter is
//!    expected to take. Ranges in the syscall or arguments are expanded into
//!    every concrete combination; for each one the generator builds the filter
//!    and the simulator evaluates it.
//!
//! Every outcome is classified as a success, a failure (the filter or command
//! misbehaved), an error (the test could not be evaluated), or a skip (the
//! record targets another architecture), and written to the log as soon as it
//! is known.

mod basic;
mod batch;
mod bpf_sim;
mod config;
mod error;
mod execution;
mod range;
mod reporting;
mod runner;
mod selection;
#[cfg(test)]
mod testing;
pub mod trace_categories;
pub mod util;

pub use batch::{BATCH_FILE_EXTENSION, BatchFile, BatchRecords, DeclaredType, TestRecord};
pub use bpf_sim::{ARCH_SKIP_DETAIL, ARG_COUNT, BpfSimSpec, Combination, FIELD_COUNT};
pub use config::{Arch, RunContext, TargetArch, TestType, ToolPaths};
pub use error::Error;
pub use execution::{
    LAUNCH_FAILURE_EXIT_CODE, ProcessToolchain, RunResult, SimRequest, Toolchain, exit_code_of,
};
pub use range::{
    ABSENT_TOKEN, AxisValues, Range, Resolution, ValueSpec, parse_arg_spec, parse_value_spec,
    resolve_syscall,
};
pub use reporting::{Reporter, RunStats, TestId, TestOutcome, TestStatus};
pub use runner::{TestRunner, discover_batch_files};
pub use selection::SelectionCriteria;

/// Runs a basic record; see [`TestRunner::run_record`] for dispatch.
pub use basic::run as run_basic;
/// Runs a bpf-sim record; see [`TestRunner::run_record`] for dispatch.
pub use bpf_sim::run as run_bpf_sim;
