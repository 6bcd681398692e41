use std::fmt;

use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    parser,
    pattern::Pattern,
};

/// A single rule: a compiled pattern and the owners it assigns.
#[derive(Debug, Clone)]
pub struct OwnerEntry {
    line: usize,
    pattern: Pattern,
    owners: Vec<String>,
}

impl OwnerEntry {
    /// 1-based line number of the rule in its source file.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The owners declared by the rule. May be empty, which marks matching
    /// paths as deliberately unowned.
    pub fn owners(&self) -> &[String] {
        &self.owners
    }
}

impl fmt::Display for OwnerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {}\t{}",
            self.line,
            self.pattern,
            self.owners.join(", ")
        )
    }
}

/// The ordered rules of a CODEOWNERS file. Later entries take precedence
/// over earlier ones, whatever the shape of their patterns. Read-only once
/// built, so it can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct OwnershipTable {
    entries: Vec<OwnerEntry>,
}

impl OwnershipTable {
    /// Build a table from the full text of a rules file.
    pub fn parse(source: &str) -> Result<OwnershipTable> {
        Self::from_lines(source.lines())
    }

    /// Build a table from raw lines, in file order. Blank and comment lines
    /// are skipped but still counted, so entry line numbers match the file.
    /// The first pattern that fails to compile aborts the whole build.
    pub fn from_lines<I, S>(lines: I) -> Result<OwnershipTable>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = OwnershipTableBuilder::new();
        for (idx, line) in lines.into_iter().enumerate() {
            let Some((pattern, owners)) = parser::split_line(line.as_ref()) else {
                continue;
            };
            let pattern = Pattern::new(pattern).map_err(|err| Error::PatternCompile {
                line: idx + 1,
                pattern: err.pattern,
                source: err.source,
            })?;
            builder.add(
                idx + 1,
                pattern,
                owners.into_iter().map(str::to_owned).collect(),
            );
        }

        let table = builder.build();
        debug!(entries = table.len(), "built ownership table");
        Ok(table)
    }

    pub fn entries(&self) -> &[OwnerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The owners of `path`: those of the last entry whose pattern matches,
    /// or an empty slice if nothing matches.
    pub fn owners(&self, path: &str) -> &[String] {
        self.entry_for(path).map(OwnerEntry::owners).unwrap_or(&[])
    }

    /// The entry that decides ownership of `path`. Scanning from the end
    /// and stopping at the first hit is the same as keeping the last match
    /// of a forward scan.
    pub fn entry_for(&self, path: &str) -> Option<&OwnerEntry> {
        let entry = self
            .entries
            .iter()
            .rev()
            .find(|entry| entry.pattern.matches(path));
        trace!(path, line = ?entry.map(|e| e.line), "resolved owners");
        entry
    }

    /// Every entry matching `path`, in file order.
    pub fn matching_entries(&self, path: &str) -> Vec<&OwnerEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.pattern.matches(path))
            .collect()
    }
}

/// Incrementally assembles an [`OwnershipTable`]. Calling
/// [`OwnershipTableBuilder::build`] consumes the builder.
#[derive(Debug, Default)]
pub struct OwnershipTableBuilder {
    entries: Vec<OwnerEntry>,
}

impl OwnershipTableBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry. Entries must be added in file order.
    pub fn add(&mut self, line: usize, pattern: Pattern, owners: Vec<String>) {
        self.entries.push(OwnerEntry {
            line,
            pattern,
            owners,
        });
    }

    pub fn build(self) -> OwnershipTable {
        OwnershipTable {
            entries: self.entries,
        }
    }
}
