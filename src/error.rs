use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Exit statuses shared with the wrapped tools (BSD `sysexits.h`).
pub mod exit {
    pub const EX_USAGE: u8 = 64;
    pub const EX_UNAVAILABLE: u8 = 69;
    pub const EX_OSERR: u8 = 71;
    pub const EX_TEMPFAIL: u8 = 75;
    pub const EX_CONFIG: u8 = 78;
}

#[derive(Debug, Error, Diagnostic)]
pub enum DriverError {
    #[error("{}", container_lines(.0))]
    #[diagnostic(
        code(sratools::container_accession),
        help(
            "Automatic expansion of container accessions is not currently available. See the above link(s) for information about the constituent run data accessions. For example, you can download the accession list and then re-run with --option-file=SraAccList.txt"
        )
    )]
    ContainerAccessions(Vec<String>),

    #[error("{}", exhausted_lines(.run, .services))]
    #[diagnostic(
        code(sratools::sources_exhausted),
        help("This may be temporary, you should retry later.")
    )]
    SourcesExhausted { run: String, services: Vec<String> },

    #[error("{tool} (PID {pid}) quit with error code {code}")]
    ToolFailed { tool: String, pid: u32, code: i32 },

    #[error("{tool} (PID {pid}) was killed (signal {signal})")]
    ToolKilled { tool: String, pid: u32, signal: i32 },

    #[error("failed to launch {tool} ({path}): {message}")]
    Spawn {
        tool: String,
        path: PathBuf,
        message: String,
    },

    #[error("could not find the executable for {0}")]
    #[diagnostic(help(
        "the SRA Toolkit binaries (e.g. fasterq-dump-orig) must be installed next to the launcher or in `tool_directory`"
    ))]
    ToolNotFound(String),

    #[error("data source lookup failed: {0}")]
    Locator(String),

    #[error("locator returned status {status}: {message}")]
    LocatorStatus { status: u16, message: String },

    #[error("failed to read option file {0}")]
    OptionFile(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

fn container_lines(accessions: &[String]) -> String {
    accessions
        .iter()
        .map(|acc| {
            format!(
                "{acc} is a container accession. For more information, see https://www.ncbi.nlm.nih.gov/sra/?term={acc}"
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn exhausted_lines(run: &str, services: &[String]) -> String {
    let mut message = format!("Could not get any data for {run}, tried to get data from:");
    for service in services {
        message.push_str("\n\t");
        message.push_str(service);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_message_lists_every_accession() {
        let err = DriverError::ContainerAccessions(vec![
            "SRP000001".to_string(),
            "SRX000002".to_string(),
        ]);
        let text = err.to_string();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("SRP000001 is a container accession."));
        assert!(lines[1].ends_with("?term=SRX000002"));
    }

    #[test]
    fn exhausted_message_lists_services() {
        let err = DriverError::SourcesExhausted {
            run: "SRR000001".to_string(),
            services: vec!["s3".to_string(), "sra-ncbi".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Could not get any data for SRR000001, tried to get data from:\n\ts3\n\tsra-ncbi"
        );
    }
}
