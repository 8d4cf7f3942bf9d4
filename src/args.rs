use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::DriverError;
use crate::params::{Param, ParamList};
use crate::tools::{OptionArg, OptionSpec, ToolId};

const OPTION_FILE: &str = "--option-file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedArgs {
    Run {
        params: ParamList,
        accessions: Vec<String>,
    },
    /// Hand the whole invocation to the tool with this single flag
    /// (`--help` or `--version`).
    Delegate(&'static str),
}

/// Splits tool arguments into forwarded options (canonical long names, in
/// order) and accessions.
///
/// `--option-file FILE` is replaced in place by the whitespace-separated
/// words of FILE. Unknown options or a missing value make the tool print its
/// own usage instead.
pub fn parse_tool_args(tool: ToolId, args: &[String]) -> Result<ParsedArgs, DriverError> {
    let mut queue: VecDeque<String> = args.iter().cloned().collect();
    let mut loaded: HashSet<PathBuf> = HashSet::new();
    let mut params = ParamList::new();
    let mut accessions = Vec::new();
    let mut positional_only = false;

    while let Some(arg) = queue.pop_front() {
        if positional_only || arg == "-" || !arg.starts_with('-') {
            accessions.push(arg);
            continue;
        }
        if arg == "--" {
            positional_only = true;
            continue;
        }

        if let Some(long) = arg.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, value)) => (format!("--{name}"), Some(value.to_string())),
                None => (format!("--{long}"), None),
            };

            if name == OPTION_FILE {
                let Some(path) = inline.or_else(|| queue.pop_front()) else {
                    return Ok(usage(tool, &arg));
                };
                let path = PathBuf::from(path);
                if !loaded.insert(path.clone()) {
                    warn!("ignoring repeated option file {}", path.display());
                    continue;
                }
                let words = read_option_file(&path)?;
                for word in words.into_iter().rev() {
                    queue.push_front(word);
                }
                continue;
            }

            let Some(spec) = find_long(tool, &name) else {
                return Ok(usage(tool, &arg));
            };
            if let Some(flag) = delegated(spec) {
                return Ok(ParsedArgs::Delegate(flag));
            }
            match (spec.arg, inline) {
                (OptionArg::None, Some(_)) => return Ok(usage(tool, &arg)),
                (OptionArg::None, None) => params.push(Param::flag(spec.long)),
                (OptionArg::Required, inline) => {
                    let Some(value) = inline.or_else(|| queue.pop_front()) else {
                        return Ok(usage(tool, &arg));
                    };
                    params.push(Param::with_value(spec.long, value));
                }
                (OptionArg::OptionalNumber, Some(value)) => {
                    params.push(Param::with_value(spec.long, value));
                }
                (OptionArg::OptionalNumber, None) => params.push(optional_number(spec, &mut queue)),
            }
            continue;
        }

        let cluster = arg[1..].chars().collect::<Vec<_>>();
        for (index, ch) in cluster.iter().enumerate() {
            let Some(spec) = find_short(tool, *ch) else {
                return Ok(usage(tool, &arg));
            };
            if let Some(flag) = delegated(spec) {
                return Ok(ParsedArgs::Delegate(flag));
            }
            let attached = cluster[index + 1..].iter().collect::<String>();
            match spec.arg {
                OptionArg::None => {
                    params.push(Param::flag(spec.long));
                    continue;
                }
                OptionArg::OptionalNumber if attached.is_empty() => {
                    params.push(optional_number(spec, &mut queue));
                    break;
                }
                _ => {}
            }
            let value = if attached.is_empty() {
                match queue.pop_front() {
                    Some(value) => value,
                    None => return Ok(usage(tool, &arg)),
                }
            } else {
                attached
            };
            params.push(Param::with_value(spec.long, value));
            break;
        }
    }

    debug!(
        "{tool}: {} parameter(s), {} accession(s)",
        params.len(),
        accessions.len()
    );
    Ok(ParsedArgs::Run { params, accessions })
}

/// Takes the next word as the value only when it is a number.
fn optional_number(spec: &OptionSpec, queue: &mut VecDeque<String>) -> Param {
    let numeric = queue
        .front()
        .is_some_and(|word| !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()));
    match numeric.then(|| queue.pop_front()).flatten() {
        Some(value) => Param::with_value(spec.long, value),
        None => Param::flag(spec.long),
    }
}

fn read_option_file(path: &Path) -> Result<Vec<String>, DriverError> {
    let content =
        fs::read_to_string(path).map_err(|_| DriverError::OptionFile(path.to_path_buf()))?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

fn find_long(tool: ToolId, name: &str) -> Option<&'static OptionSpec> {
    tool.options().find(|spec| spec.long == name)
}

fn find_short(tool: ToolId, ch: char) -> Option<&'static OptionSpec> {
    tool.options().find(|spec| spec.short == Some(ch))
}

fn delegated(spec: &OptionSpec) -> Option<&'static str> {
    match spec.long {
        "--help" => Some("--help"),
        "--version" => Some("--version"),
        _ => None,
    }
}

fn usage(tool: ToolId, arg: &str) -> ParsedArgs {
    warn!("{tool}: unrecognized or incomplete option '{arg}'");
    ParsedArgs::Delegate("--help")
}
