//! Basic tests: run a command, pass on a zero exit status.

use crate::error::Error;
use crate::execution::Toolchain;
use crate::reporting::{Reporter, TestId, TestOutcome, TestStatus};
use std::{io::Write, path::Path};

/// Runs a basic record's command line in `working_dir` and reports the outcome.
///
/// A command that cannot be started counts as a failure, not an error.
pub fn run<T, W>(
    id: &TestId,
    fields: &[String],
    working_dir: &Path,
    tools: &T,
    reporter: &mut Reporter<W>,
) -> Result<TestOutcome, Error>
where
    T: Toolchain + ?Sized,
    W: Write,
{
    let command_line = fields.join(" ");

    let outcome = match tools.run_command(fields, working_dir) {
        Ok(result) => {
            reporter.report_diagnostics(&result.stderr)?;

            if result.succeeded() {
                TestOutcome::new(id.clone(), TestStatus::Success, "")
            } else {
                TestOutcome::new(
                    id.clone(),
                    TestStatus::Failure,
                    format!("{command_line} rc={}", result.exit_code),
                )
            }
        }
        Err(e) => TestOutcome::new(id.clone(), TestStatus::Error, e.to_string()),
    };

    reporter.report_result(&outcome)?;

    Ok(outcome)
}
