pub const DEFAULT_RULES_FILE_NAME: &str = "CODEOWNERS";

/// Where GitHub looks for a CODEOWNERS file, in priority order.
pub const DEFAULT_CANDIDATE_DIRS: [&str; 3] = [".", "docs", ".github"];

/// Version-control metadata directories the walk never enters.
pub const DEFAULT_SKIP_DIR_NAMES: [&str; 1] = [".git"];

/// Settings for locating the rules file and walking a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageConfig {
    pub rules_file_name: String,
    /// Directories searched for the rules file, in order. The first one
    /// containing it wins; files are never merged.
    pub candidate_dirs: Vec<String>,
    pub skip_dir_names: Vec<String>,
}

impl CoverageConfig {
    pub fn with_rules_file_name(mut self, name: impl Into<String>) -> Self {
        self.rules_file_name = name.into();
        self
    }

    pub fn with_candidate_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_dir_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dir_names = names.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            rules_file_name: DEFAULT_RULES_FILE_NAME.to_owned(),
            candidate_dirs: DEFAULT_CANDIDATE_DIRS.map(str::to_owned).to_vec(),
            skip_dir_names: DEFAULT_SKIP_DIR_NAMES.map(str::to_owned).to_vec(),
        }
    }
}
