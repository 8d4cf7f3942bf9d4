use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::accession::classify;
use crate::error::DriverError;

/// Deduplicates `accessions` in first-seen order and rejects container accessions.
///
/// Readable local paths are passed through without classification, as are
/// runs and anything unrecognised. Every container accession is collected
/// before failing so the user sees all of them at once.
pub fn expand<S: AsRef<str>>(accessions: &[S]) -> Result<Vec<String>, DriverError> {
    expand_with(accessions, |acc| is_readable(Path::new(acc)))
}

pub(crate) fn expand_with<S, F>(accessions: &[S], readable: F) -> Result<Vec<String>, DriverError>
where
    S: AsRef<str>,
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    let mut runs = Vec::new();
    let mut containers = Vec::new();

    for acc in accessions.iter().map(AsRef::as_ref) {
        if !seen.insert(acc) {
            continue;
        }
        if !readable(acc) {
            let kind = classify(acc);
            if kind.is_container() {
                debug!("{acc} is a {kind} accession");
                containers.push(acc.to_string());
            }
        }
        runs.push(acc.to_string());
    }

    if !containers.is_empty() {
        return Err(DriverError::ContainerAccessions(containers));
    }
    Ok(runs)
}

pub(crate) fn is_readable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => fs::read_dir(path).is_ok(),
        Ok(_) => fs::File::open(path).is_ok(),
        Err(_) => false,
    }
}
