//! Test runner implementation.

use crate::basic;
use crate::batch::{BATCH_FILE_EXTENSION, BatchFile, DeclaredType, TestRecord};
use crate::bpf_sim;
use crate::config::{RunContext, TestType};
use crate::error::Error;
use crate::execution::Toolchain;
use crate::reporting::{Reporter, TestId, TestOutcome, TestStatus};
use crate::selection::SelectionCriteria;
use crate::trace_categories;
use std::{collections::HashSet, io::Write, path::Path};

/// Finds the batch files in a tests directory, in path order.
pub fn discover_batch_files(tests_dir: &Path) -> Result<Vec<BatchFile>, Error> {
    let glob_pattern = tests_dir
        .join(format!("*.{BATCH_FILE_EXTENSION}"))
        .to_string_lossy()
        .to_string();

    tracing::debug!(target: trace_categories::BATCH, "looking for batch files: {glob_pattern}");

    let mut batches = vec![];
    for entry in glob::glob(&glob_pattern)? {
        batches.push(BatchFile::new(entry?));
    }

    Ok(batches)
}

/// The main test runner: walks batches, applies the selection, and
/// dispatches each selected record to its runner.
pub struct TestRunner<T: Toolchain> {
    context: RunContext,
    selection: SelectionCriteria,
    test_types: HashSet<TestType>,
    tools: T,
}

impl<T: Toolchain> TestRunner<T> {
    /// Creates a new runner.
    pub fn new(context: RunContext, selection: SelectionCriteria, tools: T) -> Self {
        Self {
            context,
            selection,
            test_types: HashSet::new(),
            tools,
        }
    }

    /// Restricts the run to records of the given types. An empty set runs
    /// every type.
    #[must_use]
    pub fn with_test_types(mut self, test_types: impl IntoIterator<Item = TestType>) -> Self {
        self.test_types = test_types.into_iter().collect();
        self
    }

    /// Returns the toolchain used to run tests.
    pub const fn tools(&self) -> &T {
        &self.tools
    }

    /// Runs every selected record of every selected batch, in order.
    pub fn run<W: Write>(
        &self,
        batches: &[BatchFile],
        reporter: &mut Reporter<W>,
    ) -> Result<Vec<TestOutcome>, Error> {
        let mut outcomes = vec![];

        for batch in batches {
            if !self.selection.should_run_file(&batch.name) {
                tracing::debug!(target: trace_categories::SELECT, "skipping batch: {}", batch.name);
                continue;
            }

            outcomes.extend(self.run_batch(batch, reporter)?);
        }

        Ok(outcomes)
    }

    /// Runs the selected records of one batch.
    pub fn run_batch<W: Write>(
        &self,
        batch: &BatchFile,
        reporter: &mut Reporter<W>,
    ) -> Result<Vec<TestOutcome>, Error> {
        tracing::debug!(target: trace_categories::BATCH, "running batch: {}", batch.path.display());

        let mut outcomes = vec![];
        for record in batch.records()? {
            let record = record?;
            if self.is_selected(&record) {
                outcomes.extend(self.run_record(batch, &record, reporter)?);
            }
        }

        Ok(outcomes)
    }

    /// Writes the id and line of every selected record without running anything.
    pub fn list<W: Write>(&self, batches: &[BatchFile], mut writer: W) -> Result<(), Error> {
        for batch in batches {
            if !self.selection.should_run_file(&batch.name) {
                continue;
            }

            for record in batch.records()? {
                let record = record?;
                if self.is_selected(&record) {
                    let id = TestId::record(&batch.name, record.sequence);
                    writeln!(writer, "{id}: {}", record.line)?;
                }
            }
        }

        Ok(())
    }

    fn is_selected(&self, record: &TestRecord) -> bool {
        if !self.selection.should_run_record(record.sequence) {
            return false;
        }

        if self.test_types.is_empty() {
            return true;
        }

        matches!(&record.test_type, DeclaredType::Known(t) if self.test_types.contains(t))
    }

    /// Runs a single record, reporting its data line and outcomes.
    pub fn run_record<W: Write>(
        &self,
        batch: &BatchFile,
        record: &TestRecord,
        reporter: &mut Reporter<W>,
    ) -> Result<Vec<TestOutcome>, Error> {
        let id = TestId::record(&batch.name, record.sequence);
        reporter.report_data(&id, &record.line)?;

        match &record.test_type {
            DeclaredType::Known(TestType::Basic) => Ok(vec![basic::run(
                &id,
                &record.fields,
                batch.dir(),
                &self.tools,
                reporter,
            )?]),
            DeclaredType::Known(TestType::BpfSim) => bpf_sim::run(
                &id,
                &record.fields,
                &self.context,
                &self.tools,
                reporter,
            ),
            DeclaredType::Undeclared => {
                let outcome = TestOutcome::new(id, TestStatus::Error, "test type not specified");
                reporter.report_result(&outcome)?;
                Ok(vec![outcome])
            }
            DeclaredType::Unsupported(name) => {
                let outcome = TestOutcome::new(
                    id,
                    TestStatus::Error,
                    format!("test type {name} not supported"),
                );
                reporter.report_result(&outcome)?;
                Ok(vec![outcome])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeToolchain, test_context};
    use anyhow::Result;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;

    const ALLOW_BATCH: &str = "\
# allow checks
test type: bpf-sim
01-sim-allow all 1-2 N N N N N N ALLOW
01-sim-allow x86 3 N N N N N N ALLOW
01-sim-allow all 4 N N N N N N ALLOW
";

    const BASIC_BATCH: &str = "\
test type: basic
./goodfilter
./badfilter
";

    fn write_batches(temp: &assert_fs::TempDir) -> Result<Vec<BatchFile>> {
        temp.child("01-sim-allow.tests").write_str(ALLOW_BATCH)?;
        temp.child("02-basic.tests").write_str(BASIC_BATCH)?;
        temp.child("notes.txt").write_str("not a batch")?;

        Ok(discover_batch_files(temp.path())?)
    }

    fn run_with(
        selection: SelectionCriteria,
        test_types: &[TestType],
        verbose: bool,
    ) -> Result<(Vec<TestOutcome>, String)> {
        let temp = assert_fs::TempDir::new()?;
        let batches = write_batches(&temp)?;

        let tools = FakeToolchain::default().with_command_exit_code("./badfilter", 1);
        let context = test_context().with_verbose(verbose);
        let runner =
            TestRunner::new(context, selection, tools).with_test_types(test_types.iter().copied());

        let mut reporter = Reporter::new(vec![], verbose);
        let outcomes = runner.run(&batches, &mut reporter)?;

        Ok((outcomes, String::from_utf8(reporter.into_inner())?))
    }

    fn ids(outcomes: &[TestOutcome]) -> Vec<String> {
        outcomes.iter().map(|o| o.id.to_string()).collect()
    }

    #[test]
    fn discovery_finds_only_batch_files_in_order() -> Result<()> {
        let temp = assert_fs::TempDir::new()?;
        let batches = write_batches(&temp)?;

        let names: Vec<_> = batches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["01-sim-allow", "02-basic"]);
        Ok(())
    }

    #[test]
    fn runs_everything_in_order() -> Result<()> {
        let (outcomes, log) = run_with(SelectionCriteria::all(), &[], false)?;

        assert_eq!(
            ids(&outcomes),
            vec![
                "01-sim-allow%%001-00001",
                "01-sim-allow%%001-00002",
                "01-sim-allow%%002-00000",
                "01-sim-allow%%003-00000",
                "02-basic%%001-00000",
                "02-basic%%002-00000",
            ]
        );
        assert_eq!(
            log,
            "Test 01-sim-allow%%001-00001 result:   SUCCESS\n\
             Test 01-sim-allow%%001-00002 result:   SUCCESS\n\
             Test 01-sim-allow%%003-00000 result:   SUCCESS\n\
             Test 02-basic%%001-00000 result:   SUCCESS\n\
             Test 02-basic%%002-00000 result:   FAILURE ./badfilter rc=1\n"
        );
        Ok(())
    }

    #[test]
    fn verbose_run_emits_record_data_lines() -> Result<()> {
        let (_, log) = run_with(SelectionCriteria::new(false, [], [3]), &[], true)?;

        assert_eq!(
            log,
            "Test 01-sim-allow%%003-00000 data:     01-sim-allow all 4 N N N N N N ALLOW\n\
             Test 01-sim-allow%%003-00000 result:   SUCCESS\n"
        );
        Ok(())
    }

    #[test]
    fn batch_selection_excludes_other_files() -> Result<()> {
        let (outcomes, _) =
            run_with(SelectionCriteria::new(false, [String::from("02-basic")], []), &[], false)?;

        assert_eq!(
            ids(&outcomes),
            vec!["02-basic%%001-00000", "02-basic%%002-00000"]
        );
        Ok(())
    }

    #[test]
    fn single_numbers_apply_within_selected_files() -> Result<()> {
        let (outcomes, _) = run_with(SelectionCriteria::new(false, [], [2]), &[], false)?;

        assert_eq!(
            ids(&outcomes),
            vec!["01-sim-allow%%002-00000", "02-basic%%002-00000"]
        );
        assert_eq!(outcomes[0].status, TestStatus::Skipped);
        Ok(())
    }

    #[test]
    fn type_filter_skips_other_types() -> Result<()> {
        let (outcomes, _) = run_with(SelectionCriteria::all(), &[TestType::Basic], false)?;

        assert_eq!(
            ids(&outcomes),
            vec!["02-basic%%001-00000", "02-basic%%002-00000"]
        );
        Ok(())
    }

    #[test]
    fn undeclared_and_unsupported_types_are_errors() -> Result<()> {
        let temp = assert_fs::TempDir::new()?;
        temp.child("09-odd.tests")
            .write_str("./orphan\ntest type: live\n./live-test\n")?;
        let batches = discover_batch_files(temp.path())?;

        let runner = TestRunner::new(
            test_context(),
            SelectionCriteria::all(),
            FakeToolchain::default(),
        );
        let mut reporter = Reporter::new(vec![], false);
        let outcomes = runner.run(&batches, &mut reporter)?;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == TestStatus::Error));
        assert_eq!(outcomes[0].detail, "test type not specified");
        assert_eq!(outcomes[1].detail, "test type live not supported");
        assert!(runner.tools().commands().is_empty());
        Ok(())
    }

    #[test]
    fn list_prints_selected_records_only() -> Result<()> {
        let temp = assert_fs::TempDir::new()?;
        let batches = write_batches(&temp)?;

        let runner = TestRunner::new(
            test_context(),
            SelectionCriteria::new(false, [String::from("02-basic")], []),
            FakeToolchain::default(),
        );

        let mut listing = vec![];
        runner.list(&batches, &mut listing)?;

        assert_eq!(
            String::from_utf8(listing)?,
            "02-basic%%001-00000: ./goodfilter\n02-basic%%002-00000: ./badfilter\n"
        );
        assert!(runner.tools().commands().is_empty());
        Ok(())
    }

    #[test]
    fn rerun_is_deterministic() -> Result<()> {
        let first = run_with(SelectionCriteria::all(), &[], true)?;
        let second = run_with(SelectionCriteria::all(), &[], true)?;

        assert_eq!(first, second);
        Ok(())
    }
}
