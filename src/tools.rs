use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::invocation::Invocation;
use crate::params::ParamList;
use crate::process::ToolCommand;

/// Whether an option is followed by a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionArg {
    None,
    Required,
    /// Numeric value that may be omitted (`--fasta [width]`).
    OptionalNumber,
}

/// A tool option the argument scanner recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub long: &'static str,
    pub short: Option<char>,
    pub arg: OptionArg,
}

const fn flag(long: &'static str, short: Option<char>) -> OptionSpec {
    OptionSpec {
        long,
        short,
        arg: OptionArg::None,
    }
}

const fn value(long: &'static str, short: Option<char>) -> OptionSpec {
    OptionSpec {
        long,
        short,
        arg: OptionArg::Required,
    }
}

const fn optional_number(long: &'static str, short: Option<char>) -> OptionSpec {
    OptionSpec {
        long,
        short,
        arg: OptionArg::OptionalNumber,
    }
}

/// Who turns an accession into data: the launcher (via the locator) or the tool itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Sdl,
    SelfResolving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    Srapath,
    Prefetch,
    FastqDump,
    FasterqDump,
    SraPileup,
    SamDump,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolInfo {
    pub id: ToolId,
    pub name: &'static str,
    pub resolution: Resolution,
    /// Output-file option that cannot be shared by several runs.
    pub unsafe_output: Option<&'static str>,
    pub extension: &'static str,
    pub options: &'static [OptionSpec],
}

/// Where a tool invocation's output goes when several runs are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPolicy {
    pub unsafe_output: Option<&'static str>,
    pub extension: &'static str,
}

/// The tool this invocation runs as, with its real binary and output policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub id: ToolId,
    pub path: PathBuf,
    pub policy: OutputPolicy,
}

impl ResolvedTool {
    pub fn new(id: ToolId, path: impl Into<PathBuf>, params: &ParamList) -> Self {
        Self {
            id,
            path: path.into(),
            policy: id.output_policy(params),
        }
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// A command for the real binary with just argv[0] filled in.
    pub fn command(&self, argv0: &str) -> ToolCommand {
        ToolCommand::new(self.name(), self.path.clone(), argv0)
    }
}

const COMMON_OPTIONS: &[OptionSpec] = &[
    flag("--help", Some('h')),
    flag("--version", Some('V')),
    flag("--verbose", Some('v')),
    flag("--quiet", Some('q')),
    value("--log-level", Some('L')),
    value("--ngc", None),
    value("--perm", None),
    value("--cart", None),
];

const SRAPATH_OPTIONS: &[OptionSpec] = &[
    value("--function", Some('f')),
    value("--timeout", Some('t')),
    value("--protocol", Some('a')),
    value("--vers", None),
    value("--url", None),
    value("--param", Some('p')),
    flag("--raw", Some('r')),
    flag("--json", Some('j')),
    value("--project", None),
    flag("--cache", Some('c')),
    flag("--path", Some('P')),
];

const PREFETCH_OPTIONS: &[OptionSpec] = &[
    value("--type", Some('T')),
    value("--transport", Some('t')),
    value("--min-size", Some('N')),
    value("--max-size", Some('X')),
    value("--force", Some('f')),
    value("--resume", Some('r')),
    value("--verify", Some('C')),
    flag("--progress", Some('p')),
    value("--heartbeat", Some('H')),
    flag("--eliminate-quals", None),
    flag("--check-all", Some('c')),
    value("--check-rs", Some('S')),
    flag("--list", Some('l')),
    value("--output-file", Some('o')),
    value("--output-directory", Some('O')),
];

const FASTQ_DUMP_OPTIONS: &[OptionSpec] = &[
    value("--outdir", Some('O')),
    flag("--stdout", Some('Z')),
    flag("--gzip", None),
    flag("--bzip2", None),
    flag("--split-files", None),
    flag("--split-3", None),
    flag("--split-spot", None),
    flag("--spot-group", Some('G')),
    flag("--readids", Some('I')),
    flag("--skip-technical", None),
    flag("--clip", Some('W')),
    value("--minReadLen", Some('M')),
    value("--minSpotId", Some('N')),
    value("--maxSpotId", Some('X')),
    value("--spot-groups", None),
    flag("--aligned", None),
    flag("--unaligned", None),
    value("--aligned-region", None),
    value("--matepair-distance", None),
    flag("--origfmt", Some('F')),
    flag("--dumpbase", Some('B')),
    flag("--dumpcs", Some('C')),
    value("--offset", Some('Q')),
    optional_number("--fasta", None),
    value("--defline-seq", None),
    value("--defline-qual", None),
    value("--read-filter", None),
    value("--table", None),
    flag("--keep-empty-files", None),
    value("--accession", Some('A')),
];

const FASTERQ_DUMP_OPTIONS: &[OptionSpec] = &[
    value("--outfile", Some('o')),
    value("--outdir", Some('O')),
    value("--bufsize", Some('b')),
    value("--curcache", Some('c')),
    value("--mem", Some('m')),
    value("--temp", Some('t')),
    value("--threads", Some('e')),
    flag("--progress", Some('p')),
    flag("--details", Some('x')),
    flag("--split-spot", Some('s')),
    flag("--split-files", Some('S')),
    flag("--split-3", Some('3')),
    flag("--concatenate-reads", None),
    flag("--stdout", Some('Z')),
    flag("--force", Some('f')),
    flag("--skip-technical", None),
    flag("--include-technical", None),
    flag("--print-read-nr", Some('P')),
    value("--min-read-len", Some('M')),
    value("--table", None),
    flag("--strict", None),
    value("--bases", Some('B')),
    flag("--append", Some('A')),
    flag("--fasta", None),
    flag("--fasta-unsorted", None),
    value("--seq-defline", None),
    value("--qual-defline", None),
    flag("--only-unaligned", Some('U')),
    flag("--only-aligned", Some('a')),
    value("--disk-limit", None),
    value("--disk-limit-tmp", None),
    value("--size-check", None),
];

const SRA_PILEUP_OPTIONS: &[OptionSpec] = &[
    value("--outfile", Some('o')),
    value("--aligned-region", Some('r')),
    value("--minmapq", None),
    value("--duplicates", Some('d')),
    flag("--noqual", Some('n')),
    flag("--seqname", Some('e')),
    value("--table", None),
    value("--function", None),
    value("--merge-dist", None),
    flag("--spotgroups", Some('p')),
    flag("--depth-per-spotgroup", None),
    flag("--noskip", Some('s')),
    flag("--showid", Some('i')),
];

const SAM_DUMP_OPTIONS: &[OptionSpec] = &[
    value("--output-file", None),
    value("--output-buffer-size", None),
    flag("--gzip", None),
    flag("--bzip2", None),
    flag("--unaligned", Some('u')),
    flag("--primary", Some('1')),
    flag("--cigar-long", Some('c')),
    flag("--cigar-CG", None),
    flag("--header", Some('r')),
    flag("--no-header", Some('n')),
    value("--header-file", None),
    value("--header-comment", None),
    value("--aligned-region", None),
    value("--matepair-distance", None),
    flag("--seqid", Some('s')),
    flag("--hide-identical", Some('=')),
    flag("--spot-group", Some('g')),
    flag("--fastq", None),
    flag("--fasta", None),
    value("--prefix", Some('p')),
    flag("--reverse", None),
    flag("--CG-evidence", None),
    flag("--CG-ev-dnb", None),
    flag("--CG-SAM", None),
    flag("--CG-mappings", None),
    flag("--CG-names", None),
    value("--min-mapq", None),
    flag("--no-mate-cache", None),
    flag("--rna-splicing", None),
    value("--rna-spliced-mode", None),
    flag("--legacy", None),
];

const TOOLS: &[ToolInfo] = &[
    ToolInfo {
        id: ToolId::Srapath,
        name: "srapath",
        resolution: Resolution::SelfResolving,
        unsafe_output: None,
        extension: "",
        options: SRAPATH_OPTIONS,
    },
    ToolInfo {
        id: ToolId::Prefetch,
        name: "prefetch",
        resolution: Resolution::SelfResolving,
        unsafe_output: None,
        extension: ".sra",
        options: PREFETCH_OPTIONS,
    },
    ToolInfo {
        id: ToolId::FastqDump,
        name: "fastq-dump",
        resolution: Resolution::Sdl,
        unsafe_output: None,
        extension: ".fastq",
        options: FASTQ_DUMP_OPTIONS,
    },
    ToolInfo {
        id: ToolId::FasterqDump,
        name: "fasterq-dump",
        resolution: Resolution::Sdl,
        unsafe_output: Some("--outfile"),
        extension: ".fastq",
        options: FASTERQ_DUMP_OPTIONS,
    },
    ToolInfo {
        id: ToolId::SraPileup,
        name: "sra-pileup",
        resolution: Resolution::Sdl,
        unsafe_output: Some("--outfile"),
        extension: ".pileup",
        options: SRA_PILEUP_OPTIONS,
    },
    ToolInfo {
        id: ToolId::SamDump,
        name: "sam-dump",
        resolution: Resolution::Sdl,
        unsafe_output: Some("--output-file"),
        extension: ".sam",
        options: SAM_DUMP_OPTIONS,
    },
];

impl ToolId {
    pub fn all() -> impl Iterator<Item = ToolId> {
        TOOLS.iter().map(|info| info.id)
    }

    /// Maps an invocation basename (version suffix already removed) to a tool.
    pub fn from_basename(basename: &str) -> Option<ToolId> {
        TOOLS
            .iter()
            .find(|info| info.name == basename)
            .map(|info| info.id)
    }

    pub fn info(self) -> &'static ToolInfo {
        // TOOLS is laid out in declaration order of the variants.
        &TOOLS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Recognised options: the tool's own followed by the common ones.
    pub fn options(self) -> impl Iterator<Item = &'static OptionSpec> {
        self.info().options.iter().chain(COMMON_OPTIONS.iter())
    }

    /// sam-dump can emit FASTQ/FASTA, which may share one file; SAM cannot.
    pub fn output_policy(self, params: &ParamList) -> OutputPolicy {
        let info = self.info();
        if self != ToolId::SamDump {
            return OutputPolicy {
                unsafe_output: info.unsafe_output,
                extension: info.extension,
            };
        }
        let format = params
            .iter()
            .find(|param| param.name == "--fastq" || param.name == "--fasta");
        match format.map(|param| param.name.as_str()) {
            Some("--fasta") => OutputPolicy {
                unsafe_output: None,
                extension: ".fasta",
            },
            Some(_) => OutputPolicy {
                unsafe_output: None,
                extension: ".fastq",
            },
            None => OutputPolicy {
                unsafe_output: info.unsafe_output,
                extension: info.extension,
            },
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Finds the real binary behind the launcher, `<name>-orig[.<version>]`.
///
/// Searched next to the launcher first, then in the configured tool
/// directory, then on `PATH`.
pub fn locate_tool(
    tool: ToolId,
    invocation: &Invocation,
    config: &DriverConfig,
) -> Result<PathBuf, DriverError> {
    let names = candidate_names(tool, invocation.version.as_deref());
    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &invocation.self_dir {
        dirs.push(dir.clone().into_std_path_buf());
    }
    if let Some(dir) = &config.tool_directory {
        dirs.push(dir.clone());
    }

    for dir in &dirs {
        for name in &names {
            let path = dir.join(name);
            if is_executable(&path) {
                debug!("using {} for {tool}", path.display());
                return Ok(path);
            }
        }
    }
    for name in &names {
        if let Some(path) = find_in_path(name) {
            debug!("using {} for {tool}", path.display());
            return Ok(path);
        }
    }
    Err(DriverError::ToolNotFound(tool.name().to_string()))
}

fn candidate_names(tool: ToolId, version: Option<&str>) -> Vec<String> {
    let base = format!("{}-orig", tool.name());
    match version {
        Some(version) => vec![format!("{base}.{version}"), base],
        None => vec![base],
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| [dir.join(format!("{name}.exe")), dir.join(name)])
        .find(|candidate| is_executable(candidate))
}
