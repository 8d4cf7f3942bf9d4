use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sratools_driver::config::ConfigLoader;
use sratools_driver::context::{CONFIG_ENV, Context, VERBOSE_ENV};
use sratools_driver::driver::{Driver, Termination};
use sratools_driver::error::{DriverError, exit};
use sratools_driver::invocation::strip_location;
use sratools_driver::output::ConsoleReporter;
use sratools_driver::process::{ChildExit, ChildResult, SystemSpawner};
use sratools_driver::sdl::SdlLocator;
use sratools_driver::tools::ToolId;

/// Options understood when the launcher is run under its own name.
#[derive(Parser)]
#[command(name = "sratools")]
#[command(about = "SRA Toolkit launcher; install it as fastq-dump, fasterq-dump, sam-dump, ...")]
#[command(version)]
struct SelfCli {
    /// Print the tool names this launcher can act as
    #[arg(long)]
    list_tools: bool,
}

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(termination) => exit_for(termination),
        Err(report) => {
            eprintln!("{report:?}");
            match report.downcast_ref::<DriverError>() {
                Some(DriverError::ToolKilled { .. }) => std::process::abort(),
                Some(err) => ExitCode::from(map_exit_code(err)),
                None => ExitCode::from(1),
            }
        }
    }
}

fn init_tracing() {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(verbosity_filter(std::env::var(VERBOSE_ENV).ok().as_deref()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn verbosity_filter(value: Option<&str>) -> &'static str {
    match value.and_then(|value| value.trim().parse::<u8>().ok()) {
        None | Some(0) => "warn",
        Some(1) => "info",
        Some(2) => "debug",
        Some(_) => "trace",
    }
}

fn run() -> miette::Result<Termination> {
    let mut argv = std::env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    let real_argv0 = argv.next().unwrap_or_else(|| "sratools".to_string());
    let (args, location) = strip_location(argv.collect());

    let config_path = std::env::var(CONFIG_ENV).ok();
    let config = ConfigLoader::resolve(config_path.as_deref())?;
    let mut context = Context::from_env(&real_argv0, config);
    context.location = location;

    let Some(tool) = ToolId::from_basename(&context.invocation.basename) else {
        return run_self(&context, args);
    };

    let locator = SdlLocator::new(context.config.timeout_secs)?;
    let driver = Driver::new(context, locator, SystemSpawner, ConsoleReporter);
    Ok(driver.run_as(tool, &args)?)
}

fn run_self(context: &Context, args: Vec<String>) -> miette::Result<Termination> {
    let cli = SelfCli::parse_from(std::iter::once(context.invocation.argv0.clone()).chain(args));
    if cli.list_tools {
        for tool in ToolId::all() {
            println!("{tool}");
        }
    }
    Ok(Termination::Completed(Vec::new()))
}

fn exit_for(termination: Termination) -> ExitCode {
    match termination {
        Termination::Completed(_) => ExitCode::SUCCESS,
        Termination::DryRun(command) => {
            eprintln!("{command}");
            ExitCode::SUCCESS
        }
        Termination::HandedOff { tool, exit } => match hand_off_status(&tool, exit) {
            Ok(code) => ExitCode::from(code),
            Err(err) => {
                eprintln!("{err}");
                std::process::abort()
            }
        },
    }
}

/// Only reached where the tool could not replace the launcher and ran as a child.
fn hand_off_status(tool: &str, exit: ChildExit) -> Result<u8, DriverError> {
    match exit.result {
        ChildResult::Exited(code) => Ok(clamp_code(code)),
        ChildResult::Signaled(signal) => Err(DriverError::ToolKilled {
            tool: tool.to_string(),
            pid: exit.pid,
            signal,
        }),
    }
}

fn map_exit_code(error: &DriverError) -> u8 {
    match error {
        DriverError::ContainerAccessions(_) => exit::EX_UNAVAILABLE,
        DriverError::SourcesExhausted { .. }
        | DriverError::Locator(_)
        | DriverError::LocatorStatus { .. } => exit::EX_TEMPFAIL,
        DriverError::ToolFailed { code, .. } => clamp_code(*code),
        DriverError::Spawn { .. } | DriverError::ToolKilled { .. } => exit::EX_OSERR,
        DriverError::OptionFile(_) => exit::EX_USAGE,
        DriverError::ToolNotFound(_)
        | DriverError::ConfigRead(_)
        | DriverError::ConfigParse(_) => exit::EX_CONFIG,
    }
}

fn clamp_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
