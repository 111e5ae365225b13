//! Configuration types for the regression harness.

use crate::error::Error;
use std::{fmt::Display, path::PathBuf, str::FromStr};

/// Host architecture the filters are simulated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Arch {
    /// 32-bit x86.
    #[clap(name = "x86")]
    X86,
    /// 64-bit x86.
    #[clap(name = "x86_64")]
    X86_64,
}

impl Arch {
    /// Normalizes a machine name (as reported by `uname -m`).
    pub fn from_machine(machine: &str) -> Self {
        if machine == "x86_64" {
            Self::X86_64
        } else {
            Self::X86
        }
    }
}

impl Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X86 => write!(f, "x86"),
            Self::X86_64 => write!(f, "x86_64"),
        }
    }
}

/// Architecture a bpf-sim record targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetArch {
    /// Run on every architecture.
    All,
    /// Run only on the given architecture.
    Only(Arch),
}

impl TargetArch {
    /// Returns whether a record targeting this architecture runs on `host`.
    pub fn matches(self, host: Arch) -> bool {
        match self {
            Self::All => true,
            Self::Only(arch) => arch == host,
        }
    }
}

impl FromStr for TargetArch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "x86" => Ok(Self::Only(Arch::X86)),
            "x86_64" => Ok(Self::Only(Arch::X86_64)),
            _ => Err(Error::UnsupportedArch(s.to_owned())),
        }
    }
}

impl Display for TargetArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(arch) => arch.fmt(f),
        }
    }
}

/// Kind of test a batch record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum TestType {
    /// The record is a command line; success is a zero exit status.
    #[clap(name = "basic")]
    Basic,
    /// The record describes simulated syscalls against a generated filter.
    #[clap(name = "bpf-sim")]
    BpfSim,
}

impl TestType {
    /// Looks up a test type by the name used in `test type:` directives.
    pub fn from_directive(name: &str) -> Option<Self> {
        match name {
            "basic" => Some(Self::Basic),
            "bpf-sim" => Some(Self::BpfSim),
            _ => None,
        }
    }
}

impl Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::BpfSim => write!(f, "bpf-sim"),
        }
    }
}

/// Locations of the external tools.
#[derive(Clone, Debug)]
pub struct ToolPaths {
    /// The filter simulator.
    pub simulator: PathBuf,
    /// The syscall name resolver.
    pub resolver: PathBuf,
    /// The memory checker wrapping commands under test, if enabled.
    pub memcheck: Option<PathBuf>,
}

impl ToolPaths {
    /// Returns the default tool locations relative to a tests directory.
    pub fn relative_to(tests_dir: &std::path::Path) -> Self {
        let tools_dir = tests_dir.join("..").join("tools");
        Self {
            simulator: tools_dir.join("scmp_bpf_sim"),
            resolver: tools_dir.join("scmp_sys_resolver"),
            memcheck: None,
        }
    }

    /// Enables wrapping commands under test in the given memory checker.
    #[must_use]
    pub fn with_memcheck(mut self, memcheck: Option<PathBuf>) -> Self {
        self.memcheck = memcheck;
        self
    }
}

/// Immutable settings shared by every runner and reporter call in one run.
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Whether data lines, skip notices and tool diagnostics are reported.
    pub verbose: bool,
    /// Architecture of the running system.
    pub arch: Arch,
    /// Directory containing the batch files and generators.
    pub tests_dir: PathBuf,
    /// Shared file every generator build writes its filter into.
    pub filter_path: PathBuf,
}

impl RunContext {
    /// Creates a new context for the host architecture.
    pub fn new(tests_dir: PathBuf, filter_path: PathBuf) -> Self {
        Self {
            verbose: false,
            arch: crate::util::get_host_arch(),
            tests_dir,
            filter_path,
        }
    }

    /// Sets verbose reporting.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Overrides the detected architecture.
    #[must_use]
    pub const fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }
}
