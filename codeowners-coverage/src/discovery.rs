//! Locating the rules file inside a repository.

use std::io;

use tracing::debug;

use crate::{
    config::CoverageConfig,
    error::{Error, Result},
    fs::{join_path, Filesystem},
    ownership::OwnershipTable,
};

/// Find the rules file in the first candidate directory that has one.
/// Missing directories and files are skipped; any other I/O error aborts
/// the search.
pub fn find_rules_file<F: Filesystem + ?Sized>(fs: &F, config: &CoverageConfig) -> Result<String> {
    for dir in &config.candidate_dirs {
        match exists(fs, dir, true) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => return Err(Error::io(dir, err)),
        }

        let path = fs.join(dir, &config.rules_file_name);
        match exists(fs, &path, false) {
            Ok(true) => {
                debug!(path = %path, "found rules file");
                return Ok(path);
            }
            Ok(false) => continue,
            Err(err) => return Err(Error::io(path, err)),
        }
    }

    Err(Error::RulesFileNotFound {
        file_name: config.rules_file_name.clone(),
        candidates: config.candidate_dirs.clone(),
    })
}

fn exists<F: Filesystem + ?Sized>(fs: &F, path: &str, want_dir: bool) -> io::Result<bool> {
    match fs.stat(path) {
        Ok(info) => Ok(info.is_dir() == want_dir),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Whether `path` is a rules file in one of the candidate locations. Such
/// files describe ownership rather than being owned, so they are never
/// counted.
pub fn is_rules_file(path: &str, config: &CoverageConfig) -> bool {
    config
        .candidate_dirs
        .iter()
        .any(|dir| join_path(dir, &config.rules_file_name) == path)
}

/// Locate, read and parse the rules file. Returns its path along with the
/// table.
pub fn load_table<F: Filesystem + ?Sized>(
    fs: &F,
    config: &CoverageConfig,
) -> Result<(String, OwnershipTable)> {
    let path = find_rules_file(fs, config)?;
    let source = fs
        .read_to_string(&path)
        .map_err(|err| Error::io(&path, err))?;
    let table = OwnershipTable::parse(&source)?;
    Ok((path, table))
}
