//! Measure how much of a repository a CODEOWNERS file covers.
//!
//! A rules file is compiled into an [`OwnershipTable`], the repository is
//! walked with a [`Walker`], and every file is looked up in the table to
//! produce a [`CoverageSummary`].

pub mod config;
pub mod coverage;
pub mod discovery;
mod error;
pub mod fs;
pub mod ownership;
pub mod parser;
pub mod pattern;
pub mod report;
pub mod walk;

use std::path::Path;

pub use config::CoverageConfig;
pub use coverage::{compute_coverage, CoverageSummary};
pub use error::{Error, Result};
pub use ownership::{OwnerEntry, OwnershipTable};
pub use pattern::{Pattern, PatternError};
pub use report::{Report, ReportFormat};
pub use walk::{Visit, WalkError, WalkSignal, Walker};

/// Read and parse a rules file from the host filesystem.
pub fn from_path(path: impl AsRef<Path>) -> Result<OwnershipTable> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
    OwnershipTable::parse(&source)
}
