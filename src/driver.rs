use tracing::{debug, info, trace};

use crate::context::Context;
use crate::error::DriverError;
use crate::expand::expand;
use crate::guard::{guard, unsafe_output_message};
use crate::output::Reporter;
use crate::params::ParamList;
use crate::process::{ChildExit, Spawner, ToolCommand};
use crate::source::{ChildEnv, Locator};
use crate::tools::ResolvedTool;

/// Per-run state. A run leaves `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Pending,
    Succeeded,
    /// The locator had no source for the run; the batch carried on.
    ExhaustedSources,
    FatalAbort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub run: String,
    pub outcome: RunOutcome,
}

impl RunRecord {
    fn pending(run: &str) -> Self {
        Self {
            run: run.to_string(),
            outcome: RunOutcome::Pending,
        }
    }

    fn finish(&mut self, outcome: RunOutcome) {
        debug_assert_eq!(self.outcome, RunOutcome::Pending);
        self.outcome = outcome;
    }
}

/// Why a run stopped the whole batch.
#[derive(Debug)]
pub enum Interrupt {
    /// Dry-run mode: this command would have been run.
    DryRun(ToolCommand),
    Fatal(DriverError),
}

impl From<DriverError> for Interrupt {
    fn from(err: DriverError) -> Self {
        Interrupt::Fatal(err)
    }
}

/// How a successful invocation ended; the binary turns it into an exit status.
#[derive(Debug)]
pub enum Termination {
    Completed(Vec<RunRecord>),
    DryRun(ToolCommand),
    /// Control was passed to the tool itself.
    HandedOff { tool: String, exit: ChildExit },
}

pub struct Driver<L: Locator, S: Spawner, R: Reporter> {
    pub(crate) context: Context,
    pub(crate) locator: L,
    pub(crate) spawner: S,
    pub(crate) reporter: R,
}

impl<L: Locator, S: Spawner, R: Reporter> Driver<L, S, R> {
    pub fn new(context: Context, locator: L, spawner: S, reporter: R) -> Self {
        Self {
            context,
            locator,
            spawner,
            reporter,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Runs `tool` once per expanded accession, retrying each across its sources.
    ///
    /// Stops at the first fatal condition; runs after it are never attempted.
    pub fn process_accessions(
        &self,
        tool: &ResolvedTool,
        mut params: ParamList,
        accessions: &[String],
    ) -> Result<Termination, DriverError> {
        if accessions.is_empty() {
            return self.hand_off(tool, Vec::new());
        }
        let runs = expand(accessions)?;

        let output_slot = guard(&runs, tool.policy.unsafe_output, &params);
        if output_slot.is_some() {
            self.reporter.notice(&unsafe_output_message(
                &runs,
                tool.name(),
                tool.policy.extension,
            ));
        }

        let mut env = ChildEnv::new();
        let mut records = runs
            .iter()
            .map(|run| RunRecord::pending(run))
            .collect::<Vec<_>>();

        for index in 0..records.len() {
            let run = records[index].run.clone();
            trace!("Processing {run} ...");
            match self.resolve_and_run(&run, tool, &mut params, output_slot, &mut env) {
                Ok(outcome) => records[index].finish(outcome),
                Err(Interrupt::DryRun(command)) => return Ok(Termination::DryRun(command)),
                Err(Interrupt::Fatal(err)) => {
                    records[index].finish(RunOutcome::FatalAbort);
                    debug!(
                        "stopping after {} of {} run(s): {run} failed",
                        index + 1,
                        records.len()
                    );
                    return Err(err);
                }
            }
        }

        info!("All runs were processed successfully");
        Ok(Termination::Completed(records))
    }

    /// For tools that resolve accessions themselves: one exec with every run appended.
    pub fn process_accessions_no_sdl(
        &self,
        tool: &ResolvedTool,
        params: &ParamList,
        accessions: &[String],
    ) -> Result<Termination, DriverError> {
        let runs = expand(accessions)?;
        let mut args = params.to_args();
        args.extend(runs);
        self.hand_off(tool, args)
    }

    /// Replaces the launcher with the tool, `argv = [invoked name] + args`.
    pub fn hand_off(
        &self,
        tool: &ResolvedTool,
        args: Vec<String>,
    ) -> Result<Termination, DriverError> {
        let command = tool.command(self.context.tool_argv0()).args(args);
        if self.context.dry_run {
            return Ok(Termination::DryRun(command));
        }
        let exit = self.spawner.exec(&command)?;
        Ok(Termination::HandedOff {
            tool: tool.name().to_string(),
            exit,
        })
    }
}
