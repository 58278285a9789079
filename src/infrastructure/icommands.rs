//! Storage grid backed by the iRODS icommands
//!
//! Every command runs with the session environment so the icommands pick up
//! the fetched configuration instead of the user's `~/.irods`.

use std::path::Path;
use std::process::Output;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::config::GridConfig;
use crate::domain::{ErrorRecord, MetaTriple, StorageConfig};
use crate::infrastructure::session::GridSession;
use crate::infrastructure::traits::{CommandRunner, StorageGrid};
use crate::infrastructure::{InfraError, InfraResult};

static PERMISSION_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(CAT_NO_ACCESS_PERMISSION|SYS_NO_API_PRIV|CAT_INSUFFICIENT_PRIVILEGE_LEVEL)\b")
        .expect("valid regex")
});

static MISSING_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(does not exist|USER_FILE_DOES_NOT_EXIST|CAT_NO_ROWS_FOUND)")
        .expect("valid regex")
});

/// icommands-backed [`StorageGrid`].
pub struct IcommandsGrid {
    cmd: Arc<dyn CommandRunner>,
    config: GridConfig,
}

impl IcommandsGrid {
    pub fn new(cmd: Arc<dyn CommandRunner>, config: GridConfig) -> Self {
        Self { cmd, config }
    }

    fn run(&self, session: &GridSession, name: &str, args: &[&str]) -> InfraResult<Output> {
        let program = self.config.program(name);
        debug!("run: {} {}", program, args.join(" "));
        self.cmd
            .run_with_env(&program, args, &session.env())
            .map_err(|e| InfraError::spawn(program, e))
    }

    fn run_checked(&self, session: &GridSession, name: &str, args: &[&str]) -> InfraResult<()> {
        let output = self.run(session, name, args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(classify_failure(name, &output).into())
        }
    }
}

/// Map a failed icommand to its error record.
fn classify_failure(name: &str, output: &Output) -> ErrorRecord {
    let stderr = String::from_utf8_lossy(&output.stderr);
    warn!("{} exited with {}: {}", name, output.status, stderr.trim());
    if PERMISSION_ERROR.is_match(&stderr) {
        ErrorRecord::access_denied()
    } else {
        ErrorRecord::bad_exit_code(output.status.code().unwrap_or(-1))
    }
}

impl StorageGrid for IcommandsGrid {
    fn open_session(&self, config: &StorageConfig) -> InfraResult<GridSession> {
        let session = GridSession::from_config(config, &self.config.environment_file)?;
        debug!("open_session: environment file {:?}", session.environment_file());
        Ok(session)
    }

    fn exists(&self, session: &GridSession, path: &str) -> InfraResult<bool> {
        let output = self.run(session, "ils", &[path])?;
        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if MISSING_PATH.is_match(&stderr) && !PERMISSION_ERROR.is_match(&stderr) {
            debug!("exists: {} not found", path);
            return Ok(false);
        }
        Err(classify_failure("ils", &output).into())
    }

    fn mkdir(&self, session: &GridSession, path: &str) -> InfraResult<()> {
        self.run_checked(session, "imkdir", &["-p", path])
    }

    fn download(&self, session: &GridSession, source: &str, destination: &Path) -> InfraResult<()> {
        let destination = destination.to_string_lossy();
        self.run_checked(session, "iget", &["-r", "-f", source, &destination])
    }

    fn upload(&self, session: &GridSession, source: &Path, destination: &str) -> InfraResult<()> {
        let source = source.to_string_lossy();
        self.run_checked(session, "iput", &["-f", &source, destination])
    }

    fn add_meta(
        &self,
        session: &GridSession,
        path: &str,
        is_collection: bool,
        triple: &MetaTriple,
    ) -> InfraResult<()> {
        let kind = if is_collection { "-C" } else { "-d" };
        let mut args = vec!["add", kind, path, triple.attribute.as_str(), triple.value.as_str()];
        if !triple.unit.is_empty() {
            args.push(triple.unit.as_str());
        }
        self.run_checked(session, "imeta", &args)
    }

    fn grant_own(&self, session: &GridSession, user: &str, path: &str) -> InfraResult<()> {
        self.run_checked(session, "ichmod", &["-r", "own", user, path])
    }
}
