use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use codeowners_coverage::{
    fs::OsFs, report, CoverageConfig, OwnershipTable, Pattern, Report, ReportFormat,
};

#[derive(Parser)]
#[command(version, about = "Report how much of a repository its CODEOWNERS file covers")]
struct Cli {
    /// Repository worktrees to report on. Defaults to the current directory.
    paths: Vec<PathBuf>,

    /// Use this rules file instead of searching each repository for one.
    #[clap(short = 'f', long = "file")]
    codeowners_file: Option<PathBuf>,

    /// Report format: json or text.
    #[arg(
        short = 'F',
        long,
        default_value = "json",
        env = "CODEOWNERS_COVERAGE_FORMAT"
    )]
    format: String,

    /// Directory searched for the rules file, highest priority first. May be
    /// repeated; replaces the default of `.`, `docs` and `.github`.
    #[arg(long = "rules-dir")]
    rules_dirs: Vec<String>,

    /// Leave files matching this CODEOWNERS-style pattern out of the totals,
    /// e.g. generated or untracked files. May be repeated.
    #[arg(long)]
    exclude: Vec<String>,

    /// Remote URL recorded in the report.
    #[arg(long, default_value = "")]
    remote_url: String,

    /// Revision recorded in the report.
    #[arg(long, default_value = "")]
    sha: String,
}

impl Cli {
    fn root_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        }
    }

    fn config(&self) -> CoverageConfig {
        let config = CoverageConfig::default();
        if self.rules_dirs.is_empty() {
            config
        } else {
            config.with_candidate_dirs(self.rules_dirs.iter().cloned())
        }
    }

    fn exclude_patterns(&self) -> Result<Vec<Pattern>> {
        self.exclude
            .iter()
            .map(|p| Pattern::new(p).with_context(|| format!("invalid --exclude pattern `{}`", p)))
            .collect()
    }
}

struct Job<'a> {
    cli: &'a Cli,
    config: CoverageConfig,
    table: Option<OwnershipTable>,
    excludes: Vec<Pattern>,
}

impl<'a> Job<'a> {
    fn new(cli: &'a Cli) -> Result<Self> {
        let table = match &cli.codeowners_file {
            Some(path) => {
                let table = codeowners_coverage::from_path(path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                debug!(path = %path.display(), entries = table.len(), "loaded rules file");
                Some(table)
            }
            None => None,
        };

        Ok(Job {
            cli,
            config: cli.config(),
            table,
            excludes: cli.exclude_patterns()?,
        })
    }

    fn report(&self, root: &Path) -> codeowners_coverage::Result<Report> {
        let fs = OsFs::new(root);
        let exclude = |path: &str| self.excludes.iter().any(|p| p.matches(path));
        match &self.table {
            Some(table) => {
                // An explicit rules file inside the repository is not owned
                // content either.
                let rules_file = self
                    .cli
                    .codeowners_file
                    .as_deref()
                    .and_then(|file| path_within(fs.root(), file));
                report::generate_with_table(
                    &fs,
                    &self.config,
                    table,
                    |path| rules_file.as_deref() == Some(path) || exclude(path),
                    &self.cli.remote_url,
                    &self.cli.sha,
                )
            }
            None => report::generate(
                &fs,
                &self.config,
                exclude,
                &self.cli.remote_url,
                &self.cli.sha,
            ),
        }
    }

    #[cfg(feature = "rayon")]
    fn report_all(&self, roots: &[PathBuf]) -> Vec<codeowners_coverage::Result<Report>> {
        use rayon::prelude::*;

        roots.par_iter().map(|root| self.report(root)).collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn report_all(&self, roots: &[PathBuf]) -> Vec<codeowners_coverage::Result<Report>> {
        roots.iter().map(|root| self.report(root)).collect()
    }
}

/// `file` as a slash-separated path relative to `root`, if it lies inside it.
fn path_within(root: &Path, file: &Path) -> Option<String> {
    let root = root.canonicalize().ok()?;
    let file = file.canonicalize().ok()?;
    let parts = file
        .strip_prefix(&root)
        .ok()?
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format: ReportFormat = cli.format.parse()?;
    let job = Job::new(&cli)?;

    let roots = cli.root_paths();
    for (root, report) in roots.iter().zip(job.report_all(&roots)) {
        let report =
            report.with_context(|| format!("failed to report on {}", root.display()))?;
        println!("{}", report.to_format(format)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{ffi::OsStr, fs};

    use super::*;

    fn write(root: &Path, path: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_path_within() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "config/OWNERS");
        let outside = tempfile::NamedTempFile::new().unwrap();

        assert_eq!(
            path_within(dir.path(), &dir.path().join("config/OWNERS")),
            Some("config/OWNERS".to_owned())
        );
        assert_eq!(path_within(dir.path(), outside.path()), None);
        assert_eq!(path_within(dir.path(), &dir.path().join("missing")), None);
    }

    #[test]
    fn test_explicit_rules_file_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "index.js");
        write(root, "README.md");
        fs::create_dir_all(root.join("config")).unwrap();
        fs::write(root.join("config/OWNERS"), "*.js @js\n").unwrap();

        let rules = root.join("config/OWNERS");
        let cli = Cli::try_parse_from([
            OsStr::new("codeowners-coverage"),
            OsStr::new("-f"),
            rules.as_os_str(),
            root.as_os_str(),
        ])
        .unwrap();

        let report = Job::new(&cli).unwrap().report(root).unwrap();
        assert_eq!(report.total_files_count, 2);
        assert_eq!(report.covered_files_count, 1);
        assert_eq!(report.coverage_ratio, 0.5);
    }
}
