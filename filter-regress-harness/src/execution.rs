//! Invocation of the external tools the harness drives: test commands, filter
//! generators, the syscall resolver and the filter simulator.

use crate::config::{Arch, ToolPaths};
use crate::error::Error;
use crate::trace_categories;
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
use std::{
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

/// Exit status reported for a command that could not be started.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

/// Result of running an external tool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Exit status of the tool; signals are folded in as `128 + signal`.
    pub exit_code: i32,
    /// Standard output. Empty when output was redirected elsewhere.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl RunResult {
    /// Returns whether the tool exited successfully.
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// A simulator query: one concrete syscall/argument tuple against a compiled filter.
#[derive(Clone, Debug)]
pub struct SimRequest<'a> {
    /// Architecture the filter is evaluated for.
    pub arch: Arch,
    /// Path to the compiled filter.
    pub filter_path: &'a Path,
    /// Syscall number.
    pub syscall: &'a str,
    /// Argument values; `None` entries are not passed.
    pub args: &'a [Option<String>],
}

/// The external collaborators of the harness.
pub trait Toolchain {
    /// Runs a test command (program followed by its arguments) in the given directory.
    fn run_command(&self, argv: &[String], working_dir: &Path) -> Result<RunResult, Error>;

    /// Runs `generator -b`, writing the compiled filter to `output`.
    fn build_filter(&self, generator: &Path, output: &Path) -> Result<RunResult, Error>;

    /// Maps a symbolic syscall name to its number.
    fn resolve_syscall(&self, name: &str) -> Result<RunResult, Error>;

    /// Evaluates a compiled filter against one syscall/argument tuple.
    fn simulate(&self, request: &SimRequest<'_>) -> Result<RunResult, Error>;
}

/// Memory checker options placed between the checker and the wrapped program.
const MEMCHECK_ARGS: &[&str] = &[
    "--tool=memcheck",
    "--quiet",
    "--error-exitcode=1",
    "--leak-check=full",
];

/// [`Toolchain`] backed by real processes.
#[derive(Clone, Debug)]
pub struct ProcessToolchain {
    paths: ToolPaths,
}

impl ProcessToolchain {
    /// Creates a toolchain that invokes the tools at the given paths.
    pub const fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    /// Returns the configured tool paths.
    pub const fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    /// Builds the command for a program under test, wrapped in the memory
    /// checker when one is configured.
    fn wrapped_command(&self, program: &Path, args: &[String]) -> Command {
        if let Some(memcheck) = &self.paths.memcheck {
            let mut cmd = Command::new(memcheck);
            cmd.args(MEMCHECK_ARGS).arg(program).args(args);
            cmd
        } else {
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
    }
}

impl Toolchain for ProcessToolchain {
    fn run_command(&self, argv: &[String], working_dir: &Path) -> Result<RunResult, Error> {
        let Some((program, args)) = argv.split_first() else {
            return Err(Error::EmptyRecord);
        };

        // Relative programs are looked up next to the batch file, like `./cmd`.
        let program_path = if program.contains('/') {
            std::path::absolute(working_dir.join(program))?
        } else {
            let local = working_dir.join(program);
            if local.is_file() {
                std::path::absolute(local)?
            } else {
                PathBuf::from(program)
            }
        };

        let mut cmd = self.wrapped_command(&program_path, args);
        cmd.current_dir(working_dir);

        match capture(&mut cmd) {
            Ok(result) => Ok(result),
            Err(Error::LaunchFailure(path, inner)) => {
                tracing::debug!(target: trace_categories::EXEC, "failed to launch {}: {inner}", path.display());
                Ok(RunResult {
                    exit_code: LAUNCH_FAILURE_EXIT_CODE,
                    stdout: String::new(),
                    stderr: inner.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn build_filter(&self, generator: &Path, output: &Path) -> Result<RunResult, Error> {
        let filter_file = std::fs::File::create(output)?;

        // The generator runs from its own directory, so the program path must
        // not depend on ours.
        let generator = std::path::absolute(generator)?;
        let mut cmd = self.wrapped_command(&generator, &[String::from("-b")]);
        if let Some(dir) = generator.parent() {
            cmd.current_dir(dir);
        }
        cmd.stdout(Stdio::from(filter_file));

        let program = cmd.get_program().to_owned();
        let output = cmd
            .output()
            .map_err(|e| Error::LaunchFailure(PathBuf::from(program), e))?;

        Ok(RunResult {
            exit_code: exit_code_of(output.status),
            stdout: String::new(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn resolve_syscall(&self, name: &str) -> Result<RunResult, Error> {
        let mut cmd = Command::new(&self.paths.resolver);
        cmd.arg(name);
        capture(&mut cmd)
    }

    fn simulate(&self, request: &SimRequest<'_>) -> Result<RunResult, Error> {
        let mut cmd = Command::new(&self.paths.simulator);
        cmd.arg("-a")
            .arg(request.arch.to_string())
            .arg("-f")
            .arg(request.filter_path)
            .arg("-s")
            .arg(request.syscall);

        for (index, value) in request.args.iter().enumerate() {
            if let Some(value) = value {
                cmd.arg(format!("-{index}")).arg(value);
            }
        }

        capture(&mut cmd)
    }
}

fn capture(cmd: &mut Command) -> Result<RunResult, Error> {
    tracing::debug!(target: trace_categories::EXEC, "running: {cmd:?}");

    let program = PathBuf::from(cmd.get_program());
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::LaunchFailure(program, e))?;

    Ok(RunResult {
        exit_code: exit_code_of(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Folds an exit status into a single shell-style exit code.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    if let Some(signal) = status.signal() {
        return 128 + signal;
    }

    -1
}
