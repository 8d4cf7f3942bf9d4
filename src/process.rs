use std::fmt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use tracing::trace;

use crate::error::DriverError;
use crate::source::{ChildEnv, EnvVar};

/// A fully resolved tool command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub tool: String,
    pub program: PathBuf,
    /// argv[0] seen by the child; the name the launcher was invoked as.
    pub argv0: String,
    pub args: Vec<String>,
    pub env: ChildEnv,
}

impl ToolCommand {
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>, argv0: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            argv0: argv0.into(),
            args: Vec::new(),
            env: ChildEnv::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: ChildEnv) -> Self {
        self.env = env;
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.arg0(&self.argv0);
        }
        cmd.args(&self.args);
        for (var, value) in self.env.iter() {
            match value {
                Some(value) => {
                    cmd.env(var.name(), value);
                }
                None => {
                    cmd.env_remove(var.name());
                }
            }
        }
        cmd
    }

    fn spawn_error(&self, err: std::io::Error) -> DriverError {
        DriverError::Spawn {
            tool: self.tool.clone(),
            path: self.program.clone(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ToolCommand {
    /// The dry-run rendering: command line, then the launcher-controlled environment.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "would exec '{}' as:", self.program.display())?;
        write!(f, "{}", self.argv0)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        writeln!(f)?;
        writeln!(f, "with environment:")?;
        for var in EnvVar::ALL {
            if let Some(value) = self.env.get(var) {
                writeln!(f, " {}='{}'", var.name(), value)?;
            }
        }
        Ok(())
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildResult {
    Exited(i32),
    Signaled(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub pid: u32,
    pub result: ChildResult,
}

impl ChildResult {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ChildResult::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ChildResult::Signaled(signal);
            }
        }
        ChildResult::Exited(1)
    }
}

/// Starts tool processes. The orchestrator only ever runs one child at a time.
pub trait Spawner {
    /// Starts `command` and blocks until it has exited.
    fn spawn_and_wait(&self, command: &ToolCommand) -> Result<ChildExit, DriverError>;

    /// Replaces the current process with `command`.
    ///
    /// Only returns on platforms without `exec`, where the child is run to
    /// completion instead.
    fn exec(&self, command: &ToolCommand) -> Result<ChildExit, DriverError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn_and_wait(&self, command: &ToolCommand) -> Result<ChildExit, DriverError> {
        let mut child = command
            .to_command()
            .spawn()
            .map_err(|err| command.spawn_error(err))?;
        let pid = child.id();
        trace!("started {} (PID {pid})", command.tool);
        let status = child.wait().map_err(|err| command.spawn_error(err))?;
        Ok(ChildExit {
            pid,
            result: ChildResult::from_status(status),
        })
    }

    #[cfg(unix)]
    fn exec(&self, command: &ToolCommand) -> Result<ChildExit, DriverError> {
        use std::os::unix::process::CommandExt;
        trace!("exec {}", command.program.display());
        let err = command.to_command().exec();
        Err(command.spawn_error(err))
    }

    #[cfg(not(unix))]
    fn exec(&self, command: &ToolCommand) -> Result<ChildExit, DriverError> {
        self.spawn_and_wait(command)
    }
}
