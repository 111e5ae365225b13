//! Selection of which batches and records to run.

use std::collections::HashSet;

/// Which tests a run should execute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    run_all: bool,
    batch_names: HashSet<String>,
    single_numbers: HashSet<u32>,
}

impl SelectionCriteria {
    /// Creates selection criteria.
    ///
    /// With no explicit batches or numbers everything runs; asking for
    /// everything discards any explicit selections.
    pub fn new(
        run_all: bool,
        batch_names: impl IntoIterator<Item = String>,
        single_numbers: impl IntoIterator<Item = u32>,
    ) -> Self {
        let mut criteria = Self {
            run_all,
            batch_names: batch_names.into_iter().collect(),
            single_numbers: single_numbers.into_iter().collect(),
        };

        if criteria.batch_names.is_empty() && criteria.single_numbers.is_empty() {
            criteria.run_all = true;
        }

        if criteria.run_all {
            criteria.batch_names.clear();
            criteria.single_numbers.clear();
        }

        criteria
    }

    /// Criteria selecting every test.
    pub fn all() -> Self {
        Self::new(true, [], [])
    }

    /// Returns whether every test is selected.
    pub const fn runs_all(&self) -> bool {
        self.run_all
    }

    /// Returns whether the named batch should run.
    pub fn should_run_file(&self, name: &str) -> bool {
        self.batch_names.is_empty() || self.batch_names.contains(name)
    }

    /// Returns whether the record with the given sequence number should run,
    /// within a batch that was already selected.
    pub fn should_run_record(&self, sequence: u32) -> bool {
        self.single_numbers.is_empty() || self.single_numbers.contains(&sequence)
    }
}
