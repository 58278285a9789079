//! Test setup and in-memory doubles for the I/O boundary traits

use std::collections::{HashMap, HashSet, VecDeque};
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Mutex, MutexGuard, Once, PoisonError};

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{ErrorRecord, MetaTriple, StorageConfig};
use crate::infrastructure::session::GridSession;
use crate::infrastructure::traits::{
    CommandRunner, EnvReader, FileSystem, RealFileSystem, SecretsClient, StorageGrid,
};
use crate::infrastructure::InfraResult;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a process `Output` with the given exit code.
pub fn output(code: i32, stdout: &[u8], stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.to_vec(),
        stderr: stderr.to_vec(),
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

// ============================================================
// COMMAND RUNNER
// ============================================================

/// One recorded command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// Command runner that records calls and replays queued results.
///
/// With an empty queue every command succeeds with no output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    responses: Mutex<VecDeque<io::Result<Output>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_output(&self, output: Output) {
        lock(&self.responses).push_back(Ok(output));
    }

    /// Queue a "program not found" failure.
    pub fn push_spawn_error(&self) {
        lock(&self.responses).push_back(Err(io::Error::new(
            io::ErrorKind::NotFound,
            "No such file or directory",
        )));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run_with_env(&self, cmd: &str, args: &[&str], env: &[(&str, &str)]) -> io::Result<Output> {
        lock(&self.calls).push(RecordedCall {
            program: cmd.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(output(0, b"", b"")))
    }
}

// ============================================================
// FILESYSTEM
// ============================================================

/// Real filesystem that refuses writes to every directory.
#[derive(Debug, Default)]
pub struct ReadOnlyFileSystem(RealFileSystem);

impl FileSystem for ReadOnlyFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.0.read(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.0.read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.0.exists(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_writable(&self, _dir: &Path) -> bool {
        false
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.0.walk_files(dir)
    }
}

// ============================================================
// ENVIRONMENT
// ============================================================

/// Fixed environment.
#[derive(Debug, Default, Clone)]
pub struct StaticEnv(HashMap<String, String>);

impl StaticEnv {
    pub fn new(vars: &[(&str, &str)]) -> Self {
        Self(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl EnvReader for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

// ============================================================
// SECRETS
// ============================================================

/// Credentials a secrets client was called with.
pub type SecretsRequest = (Option<String>, Option<String>, Option<String>);

/// Secrets client returning a fixed configuration, or a fixed failure.
#[derive(Debug)]
pub struct FakeSecrets {
    result: Result<StorageConfig, ErrorRecord>,
    requests: Mutex<Vec<SecretsRequest>>,
}

impl FakeSecrets {
    pub fn new(config: impl Into<Vec<u8>>) -> Self {
        Self {
            result: Ok(StorageConfig::new(config)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(record: ErrorRecord) -> Self {
        Self {
            result: Err(record),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(addr, token, job)` of every call, in order.
    pub fn requests(&self) -> Vec<SecretsRequest> {
        lock(&self.requests).clone()
    }
}

impl SecretsClient for FakeSecrets {
    fn fetch_config(
        &self,
        vault_addr: Option<&str>,
        vault_token: Option<&str>,
        job_uuid: Option<&str>,
    ) -> InfraResult<StorageConfig> {
        lock(&self.requests).push((
            vault_addr.map(String::from),
            vault_token.map(String::from),
            job_uuid.map(String::from),
        ));
        self.result.clone().map_err(Into::into)
    }
}

// ============================================================
// STORAGE GRID
// ============================================================

/// One recorded grid operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCall {
    OpenSession(Vec<u8>),
    Exists(String),
    Mkdir(String),
    Download { source: String, destination: PathBuf },
    Upload { source: PathBuf, destination: String },
    AddMeta { path: String, is_collection: bool, triple: MetaTriple },
    GrantOwn { user: String, path: String },
}

/// In-memory grid: a set of existing remote paths plus a call log.
///
/// Uploads and `mkdir` add their target to the existing paths.
#[derive(Debug, Default)]
pub struct FakeGrid {
    existing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<GridCall>>,
    failure: Mutex<Option<(&'static str, ErrorRecord)>>,
}

impl FakeGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(paths: &[&str]) -> Self {
        let grid = Self::default();
        lock(&grid.existing).extend(paths.iter().map(|p| p.to_string()));
        grid
    }

    /// Make every call of `operation` (`"upload"`, `"download"`, ...) fail.
    pub fn fail_on(self, operation: &'static str, record: ErrorRecord) -> Self {
        *lock(&self.failure) = Some((operation, record));
        self
    }

    pub fn calls(&self) -> Vec<GridCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, operation: &'static str, call: GridCall) -> InfraResult<()> {
        lock(&self.calls).push(call);
        match &*lock(&self.failure) {
            Some((failing, record)) if *failing == operation => Err(record.clone().into()),
            _ => Ok(()),
        }
    }
}

impl StorageGrid for FakeGrid {
    fn open_session(&self, config: &StorageConfig) -> InfraResult<GridSession> {
        self.record("open_session", GridCall::OpenSession(config.as_bytes().to_vec()))?;
        Ok(GridSession::detached())
    }

    fn exists(&self, _session: &GridSession, path: &str) -> InfraResult<bool> {
        self.record("exists", GridCall::Exists(path.to_string()))?;
        Ok(lock(&self.existing).contains(path))
    }

    fn mkdir(&self, _session: &GridSession, path: &str) -> InfraResult<()> {
        self.record("mkdir", GridCall::Mkdir(path.to_string()))?;
        lock(&self.existing).insert(path.to_string());
        Ok(())
    }

    fn download(&self, _session: &GridSession, source: &str, destination: &Path) -> InfraResult<()> {
        self.record(
            "download",
            GridCall::Download {
                source: source.to_string(),
                destination: destination.to_path_buf(),
            },
        )
    }

    fn upload(&self, _session: &GridSession, source: &Path, destination: &str) -> InfraResult<()> {
        self.record(
            "upload",
            GridCall::Upload {
                source: source.to_path_buf(),
                destination: destination.to_string(),
            },
        )?;
        lock(&self.existing).insert(destination.to_string());
        Ok(())
    }

    fn add_meta(
        &self,
        _session: &GridSession,
        path: &str,
        is_collection: bool,
        triple: &MetaTriple,
    ) -> InfraResult<()> {
        self.record(
            "add_meta",
            GridCall::AddMeta {
                path: path.to_string(),
                is_collection,
                triple: triple.clone(),
            },
        )
    }

    fn grant_own(&self, _session: &GridSession, user: &str, path: &str) -> InfraResult<()> {
        self.record(
            "grant_own",
            GridCall::GrantOwn {
                user: user.to_string(),
                path: path.to_string(),
            },
        )
    }
}

// test
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_empty_queue_when_run_then_succeeds_and_records() {
        let runner = RecordingRunner::new();

        let out = runner.run_with_env("ils", &["/zone"], &[("A", "1")]).unwrap();

        assert!(out.status.success());
        let calls = runner.calls();
        assert_eq!(calls[0].program, "ils");
        assert_eq!(calls[0].env, vec![("A".to_string(), "1".to_string())]);
    }

    #[test]
    fn given_exit_code_when_output_built_then_status_matches() {
        assert_eq!(output(4, b"", b"").status.code(), Some(4));
    }
}
