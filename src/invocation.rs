use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

static VERSIONED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)\.(?P<version>\d+(?:\.\d+)*)$").expect("valid version pattern")
});

/// How the launcher was called: the name decides which tool it acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Passed through unchanged as the child's argv[0].
    pub argv0: String,
    pub self_dir: Option<Utf8PathBuf>,
    pub basename: String,
    pub version: Option<String>,
}

impl Invocation {
    /// Splits `argv0` into directory, tool basename and an optional version
    /// suffix (`/opt/sra/bin/fastq-dump.3.0.1` → `fastq-dump`, `3.0.1`).
    pub fn parse(argv0: &str) -> Self {
        let path = Utf8Path::new(argv0);
        let file_name = path.file_name().unwrap_or(argv0);
        let self_dir = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .map(Utf8Path::to_path_buf);

        let (basename, version) = match VERSIONED_NAME.captures(file_name) {
            Some(caps) => (
                caps["name"].to_string(),
                Some(caps["version"].to_string()),
            ),
            None => (file_name.to_string(), None),
        };

        Self {
            argv0: argv0.to_string(),
            self_dir,
            basename,
            version,
        }
    }

    pub fn with_self_dir(mut self, dir: Utf8PathBuf) -> Self {
        if self.self_dir.is_none() {
            self.self_dir = Some(dir);
        }
        self
    }
}

/// Removes every `--location <value>` / `--location=<value>` from `args`.
///
/// The last occurrence wins. A trailing `--location` without a value is
/// dropped.
pub fn strip_location(args: Vec<String>) -> (Vec<String>, Option<String>) {
    let mut location = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        if arg == "--location" {
            if let Some(value) = iter.next() {
                location = Some(value);
            }
            continue;
        }
        if let Some(value) = arg.strip_prefix("--location=") {
            location = Some(value.to_string());
            continue;
        }
        rest.push(arg);
    }
    (rest, location)
}
