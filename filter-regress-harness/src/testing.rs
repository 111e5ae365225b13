//! In-memory doubles for the external tools, used by unit tests.

use crate::config::{Arch, RunContext};
use crate::error::Error;
use crate::execution::{RunResult, SimRequest, Toolchain};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::{Path, PathBuf},
};

/// Recorded simulator call: syscall and the `(index, value)` arguments passed.
pub(crate) type SimCall = (String, Vec<(usize, String)>);

/// A [`Toolchain`] that answers from tables and records what it was asked.
///
/// Unless configured otherwise, builds succeed, unknown syscall names are
/// rejected with status 1, every simulation returns `ALLOW` and every command
/// exits 0.
#[derive(Default)]
pub(crate) struct FakeToolchain {
    syscalls: HashMap<String, i64>,
    actions: HashMap<String, String>,
    sim_exit_codes: HashMap<String, i32>,
    build_exit_code: i32,
    command_exit_codes: HashMap<String, i32>,
    builds: Cell<u32>,
    sims: RefCell<Vec<SimCall>>,
    commands: RefCell<Vec<Vec<String>>>,
}

impl FakeToolchain {
    pub fn with_syscall(mut self, name: &str, number: i64) -> Self {
        self.syscalls.insert(name.to_owned(), number);
        self
    }

    pub fn with_action_for(mut self, syscall: &str, action: &str) -> Self {
        self.actions.insert(syscall.to_owned(), action.to_owned());
        self
    }

    pub fn with_sim_exit_code_for(mut self, syscall: &str, code: i32) -> Self {
        self.sim_exit_codes.insert(syscall.to_owned(), code);
        self
    }

    pub const fn with_build_exit_code(mut self, code: i32) -> Self {
        self.build_exit_code = code;
        self
    }

    pub fn with_command_exit_code(mut self, program: &str, code: i32) -> Self {
        self.command_exit_codes.insert(program.to_owned(), code);
        self
    }

    pub fn build_count(&self) -> u32 {
        self.builds.get()
    }

    pub fn simulations(&self) -> Vec<SimCall> {
        self.sims.borrow().clone()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.borrow().clone()
    }
}

impl Toolchain for FakeToolchain {
    fn run_command(&self, argv: &[String], _working_dir: &Path) -> Result<RunResult, Error> {
        self.commands.borrow_mut().push(argv.to_vec());

        let exit_code = argv
            .first()
            .and_then(|program| self.command_exit_codes.get(program))
            .copied()
            .unwrap_or(0);

        Ok(RunResult {
            exit_code,
            ..RunResult::default()
        })
    }

    fn build_filter(&self, _generator: &Path, _output: &Path) -> Result<RunResult, Error> {
        self.builds.set(self.builds.get() + 1);

        Ok(RunResult {
            exit_code: self.build_exit_code,
            ..RunResult::default()
        })
    }

    fn resolve_syscall(&self, name: &str) -> Result<RunResult, Error> {
        Ok(match self.syscalls.get(name) {
            Some(number) => RunResult {
                exit_code: 0,
                stdout: format!("{number}\n"),
                stderr: String::new(),
            },
            None => RunResult {
                exit_code: 1,
                ..RunResult::default()
            },
        })
    }

    fn simulate(&self, request: &SimRequest<'_>) -> Result<RunResult, Error> {
        let args = request
            .args
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.clone().map(|v| (index, v)))
            .collect();
        self.sims
            .borrow_mut()
            .push((request.syscall.to_owned(), args));

        if let Some(code) = self.sim_exit_codes.get(request.syscall) {
            return Ok(RunResult {
                exit_code: *code,
                ..RunResult::default()
            });
        }

        let action = self
            .actions
            .get(request.syscall)
            .map_or("ALLOW", String::as_str);

        Ok(RunResult {
            exit_code: 0,
            stdout: format!("{action}\n"),
            stderr: String::new(),
        })
    }
}

/// A quiet context for an x86_64 host with fixed, unused paths.
pub(crate) fn test_context() -> RunContext {
    RunContext {
        verbose: false,
        arch: Arch::X86_64,
        tests_dir: PathBuf::from("/regression/tests"),
        filter_path: PathBuf::from("/regression/tmp/filter.bpf"),
    }
}

/// Splits a record line into fields.
pub(crate) fn fields(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}
