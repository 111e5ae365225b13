//! Simulated-syscall tests: a generator builds a filter, and the simulator
//! evaluates it across every syscall/argument combination the record covers.

use crate::config::{RunContext, TargetArch};
use crate::error::Error;
use crate::execution::{SimRequest, Toolchain};
use crate::range::{self, Resolution, ValueSpec};
use crate::reporting::{Reporter, TestId, TestOutcome, TestStatus};
use crate::trace_categories;
use itertools::Itertools;
use std::io::Write;

/// Number of syscall arguments a record specifies.
pub const ARG_COUNT: usize = 6;

/// Number of fields in a bpf-sim record.
pub const FIELD_COUNT: usize = ARG_COUNT + 4;

/// Detail reported when a record is skipped for targeting another architecture.
pub const ARCH_SKIP_DETAIL: &str = "Test skipped due to test/system architecture difference";

/// A parsed bpf-sim record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BpfSimSpec {
    /// Name of the generator under test.
    pub test_name: String,
    /// Architecture the record applies to.
    pub target_arch: TargetArch,
    /// Syscall specification; may still be symbolic.
    pub syscall: ValueSpec,
    /// Argument specifications.
    pub args: [ValueSpec; ARG_COUNT],
    /// Action the simulator is expected to return.
    pub expected_action: String,
}

impl BpfSimSpec {
    /// Reads only the target architecture of a record, after checking its
    /// field count. Syscall and argument fields are left unparsed.
    pub fn parse_target_arch(fields: &[String]) -> Result<TargetArch, Error> {
        match fields {
            [_, target_arch, ..] if fields.len() == FIELD_COUNT => target_arch.parse(),
            _ => Err(Error::WrongFieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            }),
        }
    }

    /// Parses the fields of a bpf-sim record:
    /// `name arch syscall arg0 arg1 arg2 arg3 arg4 arg5 action`.
    pub fn parse(fields: &[String]) -> Result<Self, Error> {
        let [
            test_name,
            target_arch,
            syscall,
            arg0,
            arg1,
            arg2,
            arg3,
            arg4,
            arg5,
            expected_action,
        ] = fields
        else {
            return Err(Error::WrongFieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            });
        };

        Ok(Self {
            test_name: test_name.clone(),
            target_arch: target_arch.parse()?,
            syscall: range::parse_value_spec(syscall)?,
            args: [
                range::parse_arg_spec(arg0)?,
                range::parse_arg_spec(arg1)?,
                range::parse_arg_spec(arg2)?,
                range::parse_arg_spec(arg3)?,
                range::parse_arg_spec(arg4)?,
                range::parse_arg_spec(arg5)?,
            ],
            expected_action: expected_action.clone(),
        })
    }

    /// Returns whether any field expands to more than one value.
    pub fn is_range_test(&self) -> bool {
        self.syscall.is_expanding() || self.args.iter().any(ValueSpec::is_expanding)
    }

    /// Returns the number of combinations the record expands to.
    pub fn combination_count(&self) -> u128 {
        self.args
            .iter()
            .fold(self.syscall.cardinality(), |count, arg| {
                count.saturating_mul(arg.cardinality())
            })
    }

    /// Lazily enumerates every combination, syscall outermost and the last
    /// argument varying fastest.
    pub fn combinations(&self) -> impl Iterator<Item = Combination> + '_ {
        std::iter::once(&self.syscall)
            .chain(self.args.iter())
            .map(ValueSpec::values)
            .multi_cartesian_product()
            .map(|mut values| {
                let syscall = values.remove(0).unwrap_or_default();
                let mut args: [Option<String>; ARG_COUNT] = Default::default();
                for (slot, value) in args.iter_mut().zip(values) {
                    *slot = value;
                }
                Combination { syscall, args }
            })
    }
}

/// One concrete syscall/argument tuple drawn from a [`BpfSimSpec`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Combination {
    /// Syscall number.
    pub syscall: String,
    /// Argument values; `None` for absent arguments.
    pub args: [Option<String>; ARG_COUNT],
}

impl Combination {
    /// Formats the combination as a record line for the given spec.
    pub fn describe(&self, spec: &BpfSimSpec) -> String {
        let args = self
            .args
            .iter()
            .map(|a| a.as_deref().unwrap_or(range::ABSENT_TOKEN))
            .join(" ");

        format!(
            "{} {} {} {} {}",
            spec.test_name, spec.target_arch, self.syscall, args, spec.expected_action
        )
    }
}

/// Runs a bpf-sim record, reporting each outcome as it is produced.
pub fn run<T, W>(
    id: &TestId,
    fields: &[String],
    context: &RunContext,
    tools: &T,
    reporter: &mut Reporter<W>,
) -> Result<Vec<TestOutcome>, Error>
where
    T: Toolchain + ?Sized,
    W: Write,
{
    let mut outcomes = vec![];

    // Architecture is checked before any range is parsed, so a record for
    // another architecture is skipped even if its ranges are invalid.
    let parsed = BpfSimSpec::parse_target_arch(fields).and_then(|target_arch| {
        if target_arch.matches(context.arch) {
            BpfSimSpec::parse(fields).map(Some)
        } else {
            Ok(None)
        }
    });

    let mut spec = match parsed {
        Ok(Some(spec)) => spec,
        Ok(None) => {
            emit(
                TestOutcome::new(id.clone(), TestStatus::Skipped, ARCH_SKIP_DETAIL),
                reporter,
                &mut outcomes,
            )?;
            return Ok(outcomes);
        }
        Err(e) => {
            emit(
                TestOutcome::new(id.clone(), TestStatus::Error, e.to_string()),
                reporter,
                &mut outcomes,
            )?;
            return Ok(outcomes);
        }
    };

    match range::resolve_syscall(spec.syscall.clone(), tools) {
        Ok(Resolution::Resolved(syscall)) => spec.syscall = syscall,
        Ok(Resolution::Rejected(detail)) => {
            emit(
                TestOutcome::new(id.clone(), TestStatus::Error, detail),
                reporter,
                &mut outcomes,
            )?;
            return Ok(outcomes);
        }
        Err(e) => {
            emit(
                TestOutcome::new(id.clone(), TestStatus::Error, e.to_string()),
                reporter,
                &mut outcomes,
            )?;
            return Ok(outcomes);
        }
    }

    let is_range_test = spec.is_range_test();
    tracing::debug!(
        target: trace_categories::EXPAND,
        "{id}: {} combination(s)",
        spec.combination_count()
    );

    let generator = context.tests_dir.join(&spec.test_name);
    let mut subtest: u64 = 0;

    for combination in spec.combinations() {
        let combination_id = if is_range_test {
            subtest = match next_subtest(subtest) {
                Ok(next) => next,
                Err(e) => {
                    emit(
                        TestOutcome::new(id.clone(), TestStatus::Error, e.to_string()),
                        reporter,
                        &mut outcomes,
                    )?;
                    break;
                }
            };
            let combination_id = id.subtest(subtest);
            reporter.report_data(&combination_id, &combination.describe(&spec))?;
            combination_id
        } else {
            id.clone()
        };

        let build = match tools.build_filter(&generator, &context.filter_path) {
            Ok(build) => build,
            Err(e) => {
                emit(
                    TestOutcome::new(combination_id, TestStatus::Error, e.to_string()),
                    reporter,
                    &mut outcomes,
                )?;
                break;
            }
        };
        reporter.report_diagnostics(&build.stderr)?;

        if !build.succeeded() {
            let detail = format!("{} rc={}", spec.test_name, build.exit_code);
            emit(
                TestOutcome::new(combination_id, TestStatus::Error, detail),
                reporter,
                &mut outcomes,
            )?;
            break;
        }

        let request = SimRequest {
            arch: context.arch,
            filter_path: &context.filter_path,
            syscall: &combination.syscall,
            args: &combination.args,
        };

        let outcome = match tools.simulate(&request) {
            Ok(sim) if sim.succeeded() => {
                let action = sim.stdout.trim();
                if action == spec.expected_action {
                    TestOutcome::new(combination_id, TestStatus::Success, "")
                } else {
                    let detail = format!("{} simulator={action}", spec.test_name);
                    TestOutcome::new(combination_id, TestStatus::Failure, detail)
                }
            }
            Ok(sim) => TestOutcome::new(
                combination_id,
                TestStatus::Error,
                format!("simulator rc={}", sim.exit_code),
            ),
            Err(e) => TestOutcome::new(combination_id, TestStatus::Error, e.to_string()),
        };

        emit(outcome, reporter, &mut outcomes)?;
    }

    Ok(outcomes)
}

fn next_subtest(current: u64) -> Result<u64, Error> {
    current.checked_add(1).ok_or(Error::SubtestOverflow)
}

fn emit<W: Write>(
    outcome: TestOutcome,
    reporter: &mut Reporter<W>,
    outcomes: &mut Vec<TestOutcome>,
) -> Result<(), Error> {
    reporter.report_result(&outcome)?;
    outcomes.push(outcome);
    Ok(())
}
