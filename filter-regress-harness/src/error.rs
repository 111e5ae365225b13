//! Error type for the regression harness.

use std::path::PathBuf;

/// Monolithic error type for the harness
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A range specification could not be parsed.
    #[error("invalid range: '{0}'")]
    InvalidRange(String),

    /// A range specification had its low bound above its high bound.
    #[error("descending range: '{0}'")]
    DescendingRange(String),

    /// A bpf-sim record named an architecture the harness doesn't know.
    #[error("unsupported architecture: '{0}'")]
    UnsupportedArch(String),

    /// A bpf-sim record didn't have the expected number of fields.
    #[error("expected {expected} fields in bpf-sim record, found {found}")]
    WrongFieldCount {
        /// Number of fields required.
        expected: usize,
        /// Number of fields present.
        found: usize,
    },

    /// A record expanded to more combinations than subtests can be numbered.
    #[error("too many combinations to number")]
    SubtestOverflow,

    /// A record had no fields at all.
    #[error("empty test record")]
    EmptyRecord,

    /// An external tool could not be started.
    #[error("failed to launch {0}: {1}")]
    LaunchFailure(PathBuf, std::io::Error),

    /// A batch file could not be read.
    #[error("failed to read batch file {0}: {1}")]
    BatchRead(PathBuf, std::io::Error),

    /// A glob pattern used to discover batch files was invalid.
    #[error("invalid batch pattern: {0}")]
    BatchPattern(#[from] glob::PatternError),

    /// An entry matched during batch discovery could not be read.
    #[error("failed to list batch files: {0}")]
    BatchListing(#[from] glob::GlobError),

    /// A regular expression failed to compile.
    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    /// An I/O error occurred.
    #[error("i/o error: {0}")]
    IoError(#[from] std::io::Error),
}
