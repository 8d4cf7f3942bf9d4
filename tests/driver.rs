use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use assert_matches::assert_matches;

use sratools_driver::config::DriverConfig;
use sratools_driver::context::Context;
use sratools_driver::driver::{Driver, RunOutcome, Termination};
use sratools_driver::error::DriverError;
use sratools_driver::invocation::{Invocation, strip_location};
use sratools_driver::output::Reporter;
use sratools_driver::params::{Param, ParamList};
use sratools_driver::process::{ChildExit, ChildResult, Spawner, ToolCommand};
use sratools_driver::source::{DataSource, EnvVar, Locator, SourceList};
use sratools_driver::tools::{ResolvedTool, ToolId};

#[derive(Default)]
struct MockLocator {
    sources: HashMap<String, SourceList>,
    calls: Mutex<Vec<String>>,
    locations: Mutex<Vec<Option<String>>>,
}

impl MockLocator {
    fn with(mut self, run: &str, services: &[&str]) -> Self {
        let sources = services
            .iter()
            .map(|service| {
                DataSource::new(*service)
                    .with_env(EnvVar::RemoteUrl, format!("https://{service}/{run}"))
            })
            .collect();
        self.sources.insert(run.to_string(), SourceList::new(sources));
        self
    }
}

impl Locator for MockLocator {
    fn data_sources(&self, context: &Context, run: &str) -> Result<SourceList, DriverError> {
        self.calls.lock().unwrap().push(run.to_string());
        self.locations.lock().unwrap().push(context.location.clone());
        Ok(self.sources.get(run).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct MockSpawner {
    results: Mutex<VecDeque<ChildResult>>,
    spawned: Mutex<Vec<ToolCommand>>,
    execed: Mutex<Vec<ToolCommand>>,
}

impl MockSpawner {
    fn returning(results: &[ChildResult]) -> Self {
        Self {
            results: Mutex::new(results.iter().copied().collect()),
            ..Self::default()
        }
    }

    fn spawned(&self) -> Vec<ToolCommand> {
        self.spawned.lock().unwrap().clone()
    }

    fn execed(&self) -> Vec<ToolCommand> {
        self.execed.lock().unwrap().clone()
    }
}

impl Spawner for MockSpawner {
    fn spawn_and_wait(&self, command: &ToolCommand) -> Result<ChildExit, DriverError> {
        let mut spawned = self.spawned.lock().unwrap();
        spawned.push(command.clone());
        let result = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ChildResult::Exited(0));
        Ok(ChildExit {
            pid: 1000 + spawned.len() as u32,
            result,
        })
    }

    fn exec(&self, command: &ToolCommand) -> Result<ChildExit, DriverError> {
        self.execed.lock().unwrap().push(command.clone());
        Ok(ChildExit {
            pid: 1,
            result: ChildResult::Exited(0),
        })
    }
}

#[derive(Default)]
struct RecordingReporter {
    notices: Mutex<Vec<String>>,
    problems: Mutex<Vec<String>>,
}

impl Reporter for RecordingReporter {
    fn notice(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }

    fn problem(&self, message: &str) {
        self.problems.lock().unwrap().push(message.to_string());
    }
}

const ARGV0: &str = "/opt/sra/bin/fasterq-dump";

fn context() -> Context {
    Context::new(Invocation::parse(ARGV0), DriverConfig::default())
}

fn driver(
    locator: MockLocator,
    spawner: MockSpawner,
) -> Driver<MockLocator, MockSpawner, RecordingReporter> {
    Driver::new(context(), locator, spawner, RecordingReporter::default())
}

fn fasterq(params: &ParamList) -> ResolvedTool {
    ResolvedTool::new(ToolId::FasterqDump, "/opt/sra/bin/fasterq-dump-orig", params)
}

fn accessions(runs: &[&str]) -> Vec<String> {
    runs.iter().map(|run| run.to_string()).collect()
}

fn outcomes(termination: Termination) -> Vec<(String, RunOutcome)> {
    match termination {
        Termination::Completed(records) => records
            .into_iter()
            .map(|record| (record.run, record.outcome))
            .collect(),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn retries_temporary_failures_until_a_source_works() {
    let locator = MockLocator::default().with("SRR000001", &["s3", "gs", "sra-ncbi"]);
    let spawner = MockSpawner::returning(&[
        ChildResult::Exited(75),
        ChildResult::Exited(75),
        ChildResult::Exited(0),
    ]);
    let driver = driver(locator, spawner);
    let params = ParamList::new();

    let termination = driver
        .process_accessions(&fasterq(&params), params.clone(), &accessions(&["SRR000001"]))
        .unwrap();

    assert_eq!(
        outcomes(termination),
        vec![("SRR000001".to_string(), RunOutcome::Succeeded)]
    );
    let spawned = driver.spawner().spawned();
    assert_eq!(spawned.len(), 3);
    let urls = spawned
        .iter()
        .map(|command| command.env.get(EnvVar::RemoteUrl).unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        urls,
        vec![
            "https://s3/SRR000001",
            "https://gs/SRR000001",
            "https://sra-ncbi/SRR000001"
        ]
    );
}

#[test]
fn tool_failure_stops_the_batch_with_its_code() {
    let locator = MockLocator::default()
        .with("SRR000001", &["s3", "sra-ncbi"])
        .with("SRR000002", &["s3"]);
    let spawner = MockSpawner::returning(&[ChildResult::Exited(17)]);
    let driver = driver(locator, spawner);
    let params = ParamList::new();

    let err = driver
        .process_accessions(
            &fasterq(&params),
            params.clone(),
            &accessions(&["SRR000001", "SRR000002"]),
        )
        .unwrap_err();

    assert_matches!(err, DriverError::ToolFailed { code: 17, ref tool, .. } if tool == "fasterq-dump");
    assert_eq!(driver.spawner().spawned().len(), 1);
    assert_eq!(*driver.locator().calls.lock().unwrap(), vec!["SRR000001"]);
}

#[test]
fn killed_tool_is_fatal() {
    let locator = MockLocator::default().with("SRR000001", &["s3", "gs"]);
    let spawner = MockSpawner::returning(&[ChildResult::Signaled(9)]);
    let driver = driver(locator, spawner);
    let params = ParamList::new();

    let err = driver
        .process_accessions(&fasterq(&params), params.clone(), &accessions(&["SRR000001"]))
        .unwrap_err();

    assert_matches!(err, DriverError::ToolKilled { signal: 9, .. });
    assert_eq!(driver.spawner().spawned().len(), 1);
}

#[test]
fn run_without_sources_is_reported_and_the_batch_continues() {
    let locator = MockLocator::default().with("SRR000002", &["s3"]);
    let driver = driver(locator, MockSpawner::default());
    let params = ParamList::new();

    let termination = driver
        .process_accessions(
            &fasterq(&params),
            params.clone(),
            &accessions(&["SRR000001", "SRR000002"]),
        )
        .unwrap();

    assert_eq!(
        outcomes(termination),
        vec![
            ("SRR000001".to_string(), RunOutcome::ExhaustedSources),
            ("SRR000002".to_string(), RunOutcome::Succeeded),
        ]
    );
    let problems = driver.reporter().problems.lock().unwrap().clone();
    assert_eq!(
        problems,
        vec!["Could not get any data for SRR000001, there is no accessible source."]
    );
    assert_eq!(driver.spawner().spawned().len(), 1);
}

#[test]
fn exhausting_tried_sources_is_fatal() {
    let locator = MockLocator::default()
        .with("SRR000001", &["s3", "sra-ncbi"])
        .with("SRR000002", &["s3"]);
    let spawner = MockSpawner::returning(&[ChildResult::Exited(75), ChildResult::Exited(75)]);
    let driver = driver(locator, spawner);
    let params = ParamList::new();

    let err = driver
        .process_accessions(
            &fasterq(&params),
            params.clone(),
            &accessions(&["SRR000001", "SRR000002"]),
        )
        .unwrap_err();

    assert_matches!(
        err,
        DriverError::SourcesExhausted { ref run, ref services }
            if run == "SRR000001" && services == &vec!["s3".to_string(), "sra-ncbi".to_string()]
    );
    assert_eq!(driver.spawner().spawned().len(), 2);
    assert_eq!(*driver.locator().calls.lock().unwrap(), vec!["SRR000001"]);
}

#[test]
fn container_accession_processes_nothing() {
    let locator = MockLocator::default().with("SRR000001", &["s3"]);
    let driver = driver(locator, MockSpawner::default());
    let params = ParamList::new();

    let err = driver
        .process_accessions(
            &fasterq(&params),
            params.clone(),
            &accessions(&["SRR000001", "SRP000001"]),
        )
        .unwrap_err();

    assert_matches!(err, DriverError::ContainerAccessions(ref accs) if accs == &vec!["SRP000001".to_string()]);
    assert!(driver.spawner().spawned().is_empty());
    assert!(driver.locator().calls.lock().unwrap().is_empty());
}

#[test]
fn duplicate_runs_are_processed_once() {
    let locator = MockLocator::default()
        .with("SRR000001", &["s3"])
        .with("SRR000002", &["s3"]);
    let driver = driver(locator, MockSpawner::default());
    let params = ParamList::new();

    let termination = driver
        .process_accessions(
            &fasterq(&params),
            params.clone(),
            &accessions(&["SRR000002", "SRR000001", "SRR000002"]),
        )
        .unwrap();

    let runs = outcomes(termination)
        .into_iter()
        .map(|(run, _)| run)
        .collect::<Vec<_>>();
    assert_eq!(runs, vec!["SRR000002", "SRR000001"]);
}

#[test]
fn child_argv_is_name_params_run() {
    let locator = MockLocator::default().with("SRR000001", &["s3"]);
    let driver = driver(locator, MockSpawner::default());
    let params: ParamList = vec![
        Param::flag("--split-3"),
        Param::with_value("--threads", "4"),
    ]
    .into_iter()
    .collect();

    driver
        .process_accessions(&fasterq(&params), params.clone(), &accessions(&["SRR000001"]))
        .unwrap();

    let spawned = driver.spawner().spawned();
    assert_eq!(spawned[0].argv0, ARGV0);
    assert_eq!(
        spawned[0].program,
        std::path::PathBuf::from("/opt/sra/bin/fasterq-dump-orig")
    );
    assert_eq!(spawned[0].args, vec!["--split-3", "--threads", "4", "SRR000001"]);
}

#[test]
fn shared_output_file_is_split_per_run() {
    let locator = MockLocator::default()
        .with("SRR000001", &["s3"])
        .with("SRR000002", &["s3"]);
    let driver = driver(locator, MockSpawner::default());
    let params: ParamList = vec![Param::with_value("--outfile", "all.fastq")]
        .into_iter()
        .collect();

    driver
        .process_accessions(
            &fasterq(&params),
            params.clone(),
            &accessions(&["SRR000001", "SRR000002"]),
        )
        .unwrap();

    let args = driver
        .spawner()
        .spawned()
        .into_iter()
        .map(|command| command.args)
        .collect::<Vec<_>>();
    assert_eq!(
        args,
        vec![
            vec!["--outfile", "SRR000001.fastq", "SRR000001"],
            vec!["--outfile", "SRR000002.fastq", "SRR000002"],
        ]
    );
    let notices = driver.reporter().notices.lock().unwrap().clone();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("\tSRR000002.fastq"));
}

#[test]
fn single_run_keeps_the_requested_output_file() {
    let locator = MockLocator::default().with("SRR000001", &["s3"]);
    let driver = driver(locator, MockSpawner::default());
    let params: ParamList = vec![Param::with_value("--outfile", "all.fastq")]
        .into_iter()
        .collect();

    driver
        .process_accessions(&fasterq(&params), params.clone(), &accessions(&["SRR000001"]))
        .unwrap();

    assert_eq!(
        driver.spawner().spawned()[0].args,
        vec!["--outfile", "all.fastq", "SRR000001"]
    );
    assert!(driver.reporter().notices.lock().unwrap().is_empty());
}

#[test]
fn dry_run_prints_instead_of_spawning() {
    let locator = MockLocator::default().with("SRR000001", &["s3"]);
    let mut context = context();
    context.dry_run = true;
    let driver = Driver::new(
        context,
        locator,
        MockSpawner::default(),
        RecordingReporter::default(),
    );
    let params = ParamList::new();

    let termination = driver
        .process_accessions(
            &fasterq(&params),
            params.clone(),
            &accessions(&["SRR000001", "SRR000002"]),
        )
        .unwrap();

    let command = match termination {
        Termination::DryRun(command) => command,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(command.args, vec!["SRR000001"]);
    let rendered = command.to_string();
    assert!(rendered.starts_with("would exec '/opt/sra/bin/fasterq-dump-orig' as:\n"));
    assert!(rendered.contains(" VDB_REMOTE_URL='https://s3/SRR000001'"));
    assert!(driver.spawner().spawned().is_empty());
}

#[test]
fn no_accessions_hands_off_to_the_tool() {
    let driver = driver(MockLocator::default(), MockSpawner::default());
    let params = ParamList::new();

    let termination = driver
        .process_accessions(&fasterq(&params), params.clone(), &[])
        .unwrap();

    assert_matches!(termination, Termination::HandedOff { ref tool, .. } if tool == "fasterq-dump");
    let execed = driver.spawner().execed();
    assert_eq!(execed.len(), 1);
    assert!(execed[0].args.is_empty());
    assert_eq!(execed[0].argv0, ARGV0);
}

#[test]
fn self_resolving_tool_gets_every_run_at_once() {
    let driver = driver(MockLocator::default(), MockSpawner::default());

    let termination = driver
        .run_tool(
            ToolId::Srapath,
            "/opt/sra/bin/srapath-orig",
            &accessions(&["--json", "SRR000001", "SRR000002", "SRR000001"]),
        )
        .unwrap();

    assert_matches!(termination, Termination::HandedOff { ref tool, .. } if tool == "srapath");
    let execed = driver.spawner().execed();
    assert_eq!(execed.len(), 1);
    assert_eq!(execed[0].args, vec!["--json", "SRR000001", "SRR000002"]);
    assert!(driver.locator().calls.lock().unwrap().is_empty());
}

#[test]
fn help_is_delegated_to_the_tool() {
    let driver = driver(MockLocator::default(), MockSpawner::default());

    driver
        .run_tool(
            ToolId::FasterqDump,
            "/opt/sra/bin/fasterq-dump-orig",
            &accessions(&["SRR000001", "--help"]),
        )
        .unwrap();

    assert_eq!(driver.spawner().execed()[0].args, vec!["--help"]);
    assert!(driver.spawner().spawned().is_empty());
}

#[test]
fn sam_dump_fastq_output_may_be_shared() {
    let locator = MockLocator::default()
        .with("SRR000001", &["s3"])
        .with("SRR000002", &["s3"]);
    let driver = driver(locator, MockSpawner::default());

    driver
        .run_tool(
            ToolId::SamDump,
            "/opt/sra/bin/sam-dump-orig",
            &accessions(&["--fastq", "--output-file", "all.fastq", "SRR000001", "SRR000002"]),
        )
        .unwrap();

    let spawned = driver.spawner().spawned();
    assert_eq!(spawned.len(), 2);
    for command in spawned {
        assert_eq!(command.args[..3], ["--fastq", "--output-file", "all.fastq"]);
    }
    assert!(driver.reporter().notices.lock().unwrap().is_empty());
}

#[test]
fn sam_dump_sam_output_is_split() {
    let locator = MockLocator::default()
        .with("SRR000001", &["s3"])
        .with("SRR000002", &["s3"]);
    let driver = driver(locator, MockSpawner::default());

    driver
        .run_tool(
            ToolId::SamDump,
            "/opt/sra/bin/sam-dump-orig",
            &accessions(&["--output-file", "all.sam", "SRR000001", "SRR000002"]),
        )
        .unwrap();

    let spawned = driver.spawner().spawned();
    assert_eq!(spawned[1].args, vec!["--output-file", "SRR000002.sam", "SRR000002"]);
}

#[test]
fn location_argument_reaches_the_locator() {
    let (args, location) = strip_location(accessions(&[
        "--split-3",
        "--location",
        "s3.us-east-1",
        "SRR000001",
        "SRR000002",
    ]));
    let mut context = context();
    context.location = location;
    let locator = MockLocator::default()
        .with("SRR000001", &["s3"])
        .with("SRR000002", &["s3"]);
    let driver = Driver::new(
        context,
        locator,
        MockSpawner::default(),
        RecordingReporter::default(),
    );

    driver
        .run_tool(ToolId::FasterqDump, "/opt/sra/bin/fasterq-dump-orig", &args)
        .unwrap();

    let locations = driver.locator().locations.lock().unwrap().clone();
    assert_eq!(
        locations,
        vec![
            Some("s3.us-east-1".to_string()),
            Some("s3.us-east-1".to_string())
        ]
    );
    let spawned = driver.spawner().spawned();
    assert_eq!(spawned[0].args, vec!["--split-3", "SRR000001"]);
}
