use tracing::{debug, info};

use crate::driver::{Driver, Interrupt, RunOutcome};
use crate::error::{DriverError, exit};
use crate::guard::per_run_output;
use crate::output::Reporter;
use crate::params::ParamList;
use crate::process::{ChildResult, Spawner};
use crate::source::{ChildEnv, Locator};
use crate::tools::ResolvedTool;

const TEMPFAIL: i32 = exit::EX_TEMPFAIL as i32;

impl<L: Locator, S: Spawner, R: Reporter> Driver<L, S, R> {
    /// Runs `tool` on `run`, trying the run's sources in locator order until one works.
    ///
    /// A source whose tool exits with `EX_TEMPFAIL` is skipped. Any other
    /// failure, a signal, or running out of sources after trying at least
    /// one stops the batch. A run with no sources at all is only reported.
    pub fn resolve_and_run(
        &self,
        run: &str,
        tool: &ResolvedTool,
        params: &mut ParamList,
        output_slot: Option<usize>,
        env: &mut ChildEnv,
    ) -> Result<RunOutcome, Interrupt> {
        let sources = self.locator.data_sources(&self.context, run)?;
        if sources.is_empty() {
            self.reporter.problem(&format!(
                "Could not get any data for {run}, there is no accessible source."
            ));
            return Ok(RunOutcome::ExhaustedSources);
        }

        sources.install_ce_token(env);
        for source in sources.iter() {
            if let Some(index) = output_slot {
                params.set_value(index, per_run_output(run, tool.policy.extension));
            }
            source.install(env);

            let command = tool
                .command(self.context.tool_argv0())
                .args(params.to_args())
                .args([run])
                .env(env.clone());
            if self.context.dry_run {
                return Err(Interrupt::DryRun(command));
            }

            let child = self.spawner.spawn_and_wait(&command)?;
            match child.result {
                ChildResult::Exited(0) => {
                    debug!("Successfully processed {run}");
                    return Ok(RunOutcome::Succeeded);
                }
                ChildResult::Exited(TEMPFAIL) => {
                    debug!("{} (PID {}) could not reach {}", tool.name(), child.pid, source.service);
                    info!("failed to get data for {run} from {}", source.service);
                }
                ChildResult::Exited(code) => {
                    return Err(DriverError::ToolFailed {
                        tool: tool.name().to_string(),
                        pid: child.pid,
                        code,
                    }
                    .into());
                }
                ChildResult::Signaled(signal) => {
                    return Err(DriverError::ToolKilled {
                        tool: tool.name().to_string(),
                        pid: child.pid,
                        signal,
                    }
                    .into());
                }
            }
        }

        Err(DriverError::SourcesExhausted {
            run: run.to_string(),
            services: sources.services(),
        }
        .into())
    }
}
