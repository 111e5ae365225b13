//! Reporting of test data and outcomes.

use crate::error::Error;
use colored::Colorize;
use std::{fmt::Display, io::Write};

/// Identifies one outcome: batch, record sequence number and subtest number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestId {
    /// Name of the batch the record came from.
    pub batch: String,
    /// Sequence number of the record within its batch.
    pub sequence: u32,
    /// Subtest number; `0` when the record was not expanded.
    pub subtest: u64,
}

impl TestId {
    /// Creates an id for the unexpanded record.
    pub fn record(batch: &str, sequence: u32) -> Self {
        Self {
            batch: batch.to_owned(),
            sequence,
            subtest: 0,
        }
    }

    /// Returns the id of the given subtest of the same record.
    #[must_use]
    pub fn subtest(&self, subtest: u64) -> Self {
        Self {
            batch: self.batch.clone(),
            sequence: self.sequence,
            subtest,
        }
    }
}

impl Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}%%{:03}-{:05}",
            self.batch, self.sequence, self.subtest
        )
    }
}

/// Classification of a test outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestStatus {
    /// The test doesn't apply to this system.
    Skipped,
    /// The test could not be evaluated.
    Error,
    /// The observed behavior did not match the expectation.
    Failure,
    /// The observed behavior matched the expectation.
    Success,
}

impl TestStatus {
    /// Returns the token used for this status in the log.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Skipped => "INFO",
            Self::Error => "ERROR",
            Self::Failure => "FAILURE",
            Self::Success => "SUCCESS",
        }
    }
}

impl Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Final, reported result of one test record or combination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOutcome {
    /// Identifier of the record/subtest.
    pub id: TestId,
    /// Classification.
    pub status: TestStatus,
    /// Additional detail; may be empty.
    pub detail: String,
}

impl TestOutcome {
    /// Creates a new outcome.
    pub fn new(id: TestId, status: TestStatus, detail: impl Into<String>) -> Self {
        Self {
            id,
            status,
            detail: detail.into(),
        }
    }
}

/// Outcome counters for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Outcomes that were evaluated (everything but skips).
    pub run: u32,
    /// Skipped outcomes.
    pub skipped: u32,
    /// Successful outcomes.
    pub passed: u32,
    /// Failed outcomes.
    pub failed: u32,
    /// Errored outcomes.
    pub errored: u32,
}

impl RunStats {
    fn record(&mut self, status: TestStatus) {
        match status {
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Error => {
                self.run += 1;
                self.errored += 1;
            }
            TestStatus::Failure => {
                self.run += 1;
                self.failed += 1;
            }
            TestStatus::Success => {
                self.run += 1;
                self.passed += 1;
            }
        }
    }

    /// Writes a one-line colored summary, in the style used on the terminal.
    pub fn write_pretty<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let formatted_fail_count = if self.failed > 0 {
            self.failed.to_string().red()
        } else {
            self.failed.to_string().green()
        };

        let formatted_error_count = if self.errored > 0 {
            self.errored.to_string().bright_red()
        } else {
            self.errored.to_string().green()
        };

        let formatted_skip_count = if self.skipped > 0 {
            self.skipped.to_string().cyan()
        } else {
            self.skipped.to_string().green()
        };

        writeln!(
            writer,
            "{} test(s) ran: {} succeeded, {} failed, {} errored, {} skipped.",
            self.run,
            self.passed.to_string().green(),
            formatted_fail_count,
            formatted_error_count,
            formatted_skip_count,
        )?;

        Ok(())
    }
}

/// Writes data and result lines to the run's log destination.
///
/// Every line is flushed as soon as it is written, so the log reflects
/// execution order even if the run is interrupted.
pub struct Reporter<W: Write> {
    writer: W,
    verbose: bool,
    stats: RunStats,
}

impl<W: Write> Reporter<W> {
    /// Creates a reporter writing to the given destination.
    pub const fn new(writer: W, verbose: bool) -> Self {
        Self {
            writer,
            verbose,
            stats: RunStats {
                run: 0,
                skipped: 0,
                passed: 0,
                failed: 0,
                errored: 0,
            },
        }
    }

    /// Reports the concrete data a test runs with. Only emitted when verbose.
    pub fn report_data(&mut self, id: &TestId, data: &str) -> Result<(), Error> {
        if !self.verbose {
            return Ok(());
        }

        writeln!(self.writer, "Test {id} data:     {data}")?;
        self.writer.flush()?;

        Ok(())
    }

    /// Reports an outcome. Skips are only emitted when verbose, but always
    /// counted.
    pub fn report_result(&mut self, outcome: &TestOutcome) -> Result<(), Error> {
        self.stats.record(outcome.status);

        if outcome.status == TestStatus::Skipped && !self.verbose {
            return Ok(());
        }

        if outcome.detail.is_empty() {
            writeln!(
                self.writer,
                "Test {} result:   {}",
                outcome.id, outcome.status
            )?;
        } else {
            writeln!(
                self.writer,
                "Test {} result:   {} {}",
                outcome.id, outcome.status, outcome.detail
            )?;
        }
        self.writer.flush()?;

        Ok(())
    }

    /// Passes through diagnostics from an external tool. Only emitted when
    /// verbose.
    pub fn report_diagnostics(&mut self, text: &str) -> Result<(), Error> {
        if !self.verbose || text.trim().is_empty() {
            return Ok(());
        }

        for line in text.lines() {
            writeln!(self.writer, "{line}")?;
        }
        self.writer.flush()?;

        Ok(())
    }

    /// Appends the run summary.
    pub fn report_summary(&mut self) -> Result<(), Error> {
        let stats = self.stats;

        writeln!(self.writer, "Regression Test Summary")?;
        writeln!(self.writer, " tests run: {}", stats.run)?;
        writeln!(self.writer, " tests skipped: {}", stats.skipped)?;
        writeln!(self.writer, " tests passed: {}", stats.passed)?;
        writeln!(self.writer, " tests failed: {}", stats.failed)?;
        writeln!(self.writer, " tests errored: {}", stats.errored)?;
        self.writer.flush()?;

        Ok(())
    }

    /// Returns the counters accumulated so far.
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Consumes the reporter, returning its destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
