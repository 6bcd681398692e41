use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    fs::Filesystem,
    ownership::OwnershipTable,
    walk::{WalkError, WalkSignal, Walker},
};

/// How many trackable files exist and how many of them have an owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageSummary {
    total_files: usize,
    covered_files: usize,
    ratio: f64,
}

impl CoverageSummary {
    /// The ratio is `covered / total`, or `0.0` when there are no files.
    pub fn new(covered_files: usize, total_files: usize) -> Self {
        debug_assert!(covered_files <= total_files);
        let ratio = if total_files == 0 {
            0.0
        } else {
            covered_files as f64 / total_files as f64
        };
        Self {
            total_files,
            covered_files,
            ratio,
        }
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    pub fn covered_files(&self) -> usize {
        self.covered_files
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

/// Walk the tree and count the files `table` assigns an owner to.
///
/// Directories are never counted, and neither is any file for which
/// `is_excluded` returns true. Any walk error aborts the computation.
pub fn compute_coverage<F, E>(
    walker: &Walker<'_, F>,
    table: &OwnershipTable,
    mut is_excluded: E,
) -> Result<CoverageSummary, WalkError>
where
    F: Filesystem + ?Sized,
    E: FnMut(&str) -> bool,
{
    let mut total_files = 0;
    let mut covered_files = 0;

    walker.walk(|visit| {
        // A directory that cannot be listed would drop its files from the
        // totals, so it ends the walk. Failed stats are fatal in the walker.
        if visit.is_dir() && visit.error().is_some() {
            return WalkSignal::Abort;
        }
        if visit.error().is_some() || visit.is_dir() {
            return WalkSignal::Continue;
        }

        let path = visit.path();
        if is_excluded(path) {
            trace!(path, "excluded from coverage");
            return WalkSignal::Continue;
        }

        total_files += 1;
        if !table.owners(path).is_empty() {
            covered_files += 1;
        }
        WalkSignal::Continue
    })?;

    let summary = CoverageSummary::new(covered_files, total_files);
    debug!(
        total_files = summary.total_files,
        covered_files = summary.covered_files,
        ratio = summary.ratio,
        "computed coverage"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;

    fn populated_fs() -> MemFs {
        let mut fs = MemFs::new();
        fs.write_file("CODEOWNERS", "*.js\t\t@org/team_reviewers").unwrap();
        fs.write_file("README.md", "").unwrap();
        fs.write_file("index.js", "").unwrap();
        fs.write_file("src/app.js", "").unwrap();
        fs.write_file("src/index.html", "").unwrap();
        fs.write_file("src/index.css", "").unwrap();
        fs.write_file(".git/config", "").unwrap();
        fs
    }

    fn walker(fs: &MemFs) -> Walker<'_, MemFs> {
        Walker::new(fs).skip_dir_name(".git")
    }

    #[test]
    fn test_compute_coverage() {
        let fs = populated_fs();
        let table = OwnershipTable::parse("*.js\t\t@org/team_reviewers").unwrap();

        let summary = compute_coverage(&walker(&fs), &table, |p| p == "CODEOWNERS").unwrap();
        assert_eq!(summary.total_files(), 5);
        assert_eq!(summary.covered_files(), 2);
        assert_eq!(summary.ratio(), 0.4);
    }

    #[test]
    fn test_empty_table_covers_nothing() {
        let fs = populated_fs();
        let summary =
            compute_coverage(&walker(&fs), &OwnershipTable::default(), |_| false).unwrap();
        assert_eq!(summary.total_files(), 6);
        assert_eq!(summary.covered_files(), 0);
        assert_eq!(summary.ratio(), 0.0);
    }

    #[test]
    fn test_exclusions() {
        let fs = populated_fs();
        let table = OwnershipTable::parse("* @everyone").unwrap();
        let summary =
            compute_coverage(&walker(&fs), &table, |p| p.starts_with("src/")).unwrap();
        assert_eq!(summary.total_files(), 3);
        assert_eq!(summary.covered_files(), 3);
        assert_eq!(summary.ratio(), 1.0);
    }

    #[test]
    fn test_no_files() {
        let mut fs = MemFs::new();
        fs.create_dir_all("empty/dirs/only").unwrap();
        let table = OwnershipTable::parse("* @everyone").unwrap();

        let summary = compute_coverage(&walker(&fs), &table, |_| false).unwrap();
        assert_eq!(summary, CoverageSummary::new(0, 0));
        assert_eq!(summary.ratio(), 0.0);
        assert!(!summary.ratio().is_nan());
    }

    #[test]
    fn test_walk_error_aborts() {
        let mut fs = populated_fs();
        fs.fail_stat("src/index.html");
        let table = OwnershipTable::parse("* @everyone").unwrap();

        let err = compute_coverage(&walker(&fs), &table, |_| false).unwrap_err();
        assert!(matches!(err, WalkError::Stat { ref path, .. } if path == "src/index.html"));
    }

    #[test]
    fn test_list_error_aborts() {
        let mut fs = MemFs::new();
        fs.write_file("a.js", "").unwrap();
        fs.write_file("secret/b.js", "").unwrap();
        fs.write_file("secret/c.js", "").unwrap();
        fs.fail_list("secret");
        let table = OwnershipTable::parse("*.js @js").unwrap();

        let err = compute_coverage(&walker(&fs), &table, |_| false).unwrap_err();
        assert!(matches!(err, WalkError::ReadDir { ref path, .. } if path == "secret"));
    }

    #[test]
    fn test_idempotent() {
        let fs = populated_fs();
        let table = OwnershipTable::parse("*.js @js\n/src/ @src\n!*.css\n").unwrap();

        let first = compute_coverage(&walker(&fs), &table, |p| p == "CODEOWNERS").unwrap();
        let second = compute_coverage(&walker(&fs), &table, |p| p == "CODEOWNERS").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.ratio().to_bits(), second.ratio().to_bits());
    }
}
