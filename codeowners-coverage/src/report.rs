use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::{
    config::CoverageConfig,
    coverage::{compute_coverage, CoverageSummary},
    discovery,
    error::{Error, Result},
    fs::Filesystem,
    ownership::OwnershipTable,
    walk::Walker,
};

/// The coverage of one repository revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub remote_url: String,
    pub sha: String,
    pub covered_files_count: usize,
    pub total_files_count: usize,
    pub coverage_ratio: f64,
}

impl Report {
    pub fn new(
        remote_url: impl Into<String>,
        sha: impl Into<String>,
        summary: &CoverageSummary,
    ) -> Report {
        Report {
            remote_url: remote_url.into(),
            sha: sha.into(),
            covered_files_count: summary.covered_files(),
            total_files_count: summary.total_files(),
            coverage_ratio: summary.ratio(),
        }
    }

    pub fn to_format(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => Ok(serde_json::to_string(self)?),
            ReportFormat::Text => Ok(format!(
                "remote_url: {}\nsha: {}\ncovered_files_count: {}\ntotal_files_count: {}\ncoverage_ratio: {}",
                self.remote_url,
                self.sha,
                self.covered_files_count,
                self.total_files_count,
                self.coverage_ratio
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ReportFormat::Json),
            "text" => Ok(ReportFormat::Text),
            other => Err(Error::UnsupportedFormat(other.to_owned())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Json => f.write_str("json"),
            ReportFormat::Text => f.write_str("text"),
        }
    }
}

/// Locate and load the rules file in `fs`, then report on every file in it.
/// Rules files, and any path `exclude` rejects, are left out of the totals.
pub fn generate<F, E>(
    fs: &F,
    config: &CoverageConfig,
    exclude: E,
    remote_url: &str,
    sha: &str,
) -> Result<Report>
where
    F: Filesystem + ?Sized,
    E: FnMut(&str) -> bool,
{
    let (_, table) = discovery::load_table(fs, config)?;
    generate_with_table(fs, config, &table, exclude, remote_url, sha)
}

/// Like [`generate`], but with an already loaded table.
pub fn generate_with_table<F, E>(
    fs: &F,
    config: &CoverageConfig,
    table: &OwnershipTable,
    mut exclude: E,
    remote_url: &str,
    sha: &str,
) -> Result<Report>
where
    F: Filesystem + ?Sized,
    E: FnMut(&str) -> bool,
{
    let walker = Walker::new(fs).skip_dir_names(config.skip_dir_names.iter().cloned());
    let summary = compute_coverage(&walker, table, |path| {
        discovery::is_rules_file(path, config) || exclude(path)
    })?;
    Ok(Report::new(remote_url, sha, &summary))
}
