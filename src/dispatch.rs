use tracing::debug;

use crate::args::{ParsedArgs, parse_tool_args};
use crate::driver::{Driver, Termination};
use crate::error::DriverError;
use crate::output::Reporter;
use crate::params::ParamList;
use crate::process::Spawner;
use crate::source::Locator;
use crate::tools::{Resolution, ResolvedTool, ToolId, locate_tool};

impl<L: Locator, S: Spawner, R: Reporter> Driver<L, S, R> {
    /// Acts as `tool` on the (already `--location`-stripped) arguments.
    pub fn run_as(&self, tool: ToolId, args: &[String]) -> Result<Termination, DriverError> {
        let path = locate_tool(tool, &self.context.invocation, &self.context.config)?;
        self.run_tool(tool, path, args)
    }

    /// Same as [`Driver::run_as`] with the real binary already known.
    pub fn run_tool(
        &self,
        tool: ToolId,
        path: impl Into<std::path::PathBuf>,
        args: &[String],
    ) -> Result<Termination, DriverError> {
        match parse_tool_args(tool, args)? {
            ParsedArgs::Delegate(flag) => {
                debug!("{tool}: delegating {flag}");
                let resolved = ResolvedTool::new(tool, path, &ParamList::new());
                self.hand_off(&resolved, vec![flag.to_string()])
            }
            ParsedArgs::Run { params, accessions } => {
                let resolved = ResolvedTool::new(tool, path, &params);
                match tool.info().resolution {
                    Resolution::Sdl => self.process_accessions(&resolved, params, &accessions),
                    Resolution::SelfResolving => {
                        self.process_accessions_no_sdl(&resolved, &params, &accessions)
                    }
                }
            }
        }
    }
}
