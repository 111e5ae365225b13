//! Batch files: the line-oriented test record format.
//!
//! A batch file holds one record per line. Blank lines and lines starting
//! with `#` are ignored, and a `test type: <name>` directive sets the type of
//! every record that follows it:
//!
//! ```text
//! # syscall filter checks
//! test type: bpf-sim
//! 01-sim-allow all 0-350 N N N N N N ALLOW
//!
//! test type: basic
//! 02-basic-check
//! ```

use crate::config::TestType;
use crate::error::Error;
use crate::trace_categories;
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

/// File extension of batch files.
pub const BATCH_FILE_EXTENSION: &str = "tests";

/// Test type in effect for a record, as declared by the preceding directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclaredType {
    /// No directive preceded the record.
    Undeclared,
    /// A supported test type.
    Known(TestType),
    /// A directive named a type the harness can't run.
    Unsupported(String),
}

/// A single test record from a batch file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestRecord {
    /// 1-based position among the file's records.
    pub sequence: u32,
    /// The record line, trimmed.
    pub line: String,
    /// Whitespace-separated fields of the line.
    pub fields: Vec<String>,
    /// Test type in effect for this record.
    pub test_type: DeclaredType,
}

/// A batch file on disk.
#[derive(Clone, Debug)]
pub struct BatchFile {
    /// Batch name: the file name without its extension.
    pub name: String,
    /// Path to the file.
    pub path: PathBuf,
}

impl BatchFile {
    /// Creates a batch file handle for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self { name, path }
    }

    /// Returns the directory holding the batch file; generators and basic
    /// commands are resolved against it.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Opens the file and returns a lazy iterator over its records.
    pub fn records(&self) -> Result<BatchRecords<BufReader<File>>, Error> {
        let file =
            File::open(&self.path).map_err(|e| Error::BatchRead(self.path.clone(), e))?;
        BatchRecords::new(BufReader::new(file), self.path.clone())
    }
}

/// Lazily parses records from a batch reader.
pub struct BatchRecords<R> {
    lines: Lines<R>,
    path: PathBuf,
    directive: regex::Regex,
    current_type: DeclaredType,
    next_sequence: u32,
}

impl<R: BufRead> BatchRecords<R> {
    /// Creates a record iterator over the given reader; `path` is used for
    /// error reporting.
    pub fn new(reader: R, path: PathBuf) -> Result<Self, Error> {
        Ok(Self {
            lines: reader.lines(),
            path,
            directive: regex::Regex::new(r"^test type:\s*(.+)$")?,
            current_type: DeclaredType::Undeclared,
            next_sequence: 1,
        })
    }

    fn apply_directive(&mut self, name: &str) {
        tracing::debug!(target: trace_categories::BATCH, "{}: test type now '{name}'", self.path.display());

        self.current_type = match TestType::from_directive(name) {
            Some(test_type) => DeclaredType::Known(test_type),
            None => DeclaredType::Unsupported(name.to_owned()),
        };
    }
}

impl<R: BufRead> Iterator for BatchRecords<R> {
    type Item = Result<TestRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(Error::BatchRead(self.path.clone(), e))),
            };

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let directive_name = self
                .directive
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_owned());
            if let Some(name) = directive_name {
                self.apply_directive(&name);
                continue;
            }

            let record = TestRecord {
                sequence: self.next_sequence,
                line: line.to_owned(),
                fields: line.split_whitespace().map(String::from).collect(),
                test_type: self.current_type.clone(),
            };
            self.next_sequence += 1;

            return Some(Ok(record));
        }
    }
}
