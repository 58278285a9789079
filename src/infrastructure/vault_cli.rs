//! Secrets client backed by the `vault` command-line client

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::VaultConfig;
use crate::domain::{ErrorRecord, StorageConfig};
use crate::infrastructure::traits::{CommandRunner, SecretsClient};
use crate::infrastructure::{InfraError, InfraResult};

pub const VAULT_ADDR_VAR: &str = "VAULT_ADDR";
pub const VAULT_TOKEN_VAR: &str = "VAULT_TOKEN";
pub const JOB_UUID_VAR: &str = "JOB_UUID";

/// Reads a job's storage configuration with `vault kv get -field=<field>`.
pub struct VaultCliClient {
    cmd: Arc<dyn CommandRunner>,
    config: VaultConfig,
}

impl VaultCliClient {
    pub fn new(cmd: Arc<dyn CommandRunner>, config: VaultConfig) -> Self {
        Self { cmd, config }
    }
}

/// Non-empty value of a credential, or `MISSING_OPTION` naming its variable.
fn required<'a>(value: Option<&'a str>, var: &str) -> InfraResult<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ErrorRecord::missing_option(var).into()),
    }
}

impl SecretsClient for VaultCliClient {
    #[instrument(skip(self, vault_token))]
    fn fetch_config(
        &self,
        vault_addr: Option<&str>,
        vault_token: Option<&str>,
        job_uuid: Option<&str>,
    ) -> InfraResult<StorageConfig> {
        let addr = required(vault_addr, VAULT_ADDR_VAR)?;
        let token = required(vault_token, VAULT_TOKEN_VAR)?;
        let job = required(job_uuid, JOB_UUID_VAR)?;

        let field = format!("-field={}", self.config.field);
        let path = self.config.secret_path(job);
        debug!("fetch_config: {} kv get {} {}", self.config.program, field, path);

        let output = self
            .cmd
            .run_with_env(
                &self.config.program,
                &["kv", "get", &field, &path],
                &[(VAULT_ADDR_VAR, addr), (VAULT_TOKEN_VAR, token)],
            )
            .map_err(|e| InfraError::spawn(&self.config.program, e))?;

        if output.status.success() {
            debug!("fetch_config: received {} bytes", output.stdout.len());
            return Ok(StorageConfig::new(output.stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("vault exited with {}: {}", output.status, stderr.trim());
        if stderr.contains("permission denied") {
            return Err(ErrorRecord::access_denied().into());
        }
        Err(ErrorRecord::bad_exit_code(output.status.code().unwrap_or(-1)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::util::testing::{output, RecordingRunner};

    fn client(runner: Arc<RecordingRunner>) -> VaultCliClient {
        VaultCliClient::new(runner, VaultConfig::default())
    }

    #[test]
    fn given_credentials_when_fetch_then_runs_vault_with_env_and_returns_stdout() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_output(output(0, b"{\"irods_host\":\"grid\"}", b""));

        let config = client(runner.clone())
            .fetch_config(Some("https://vault:8200"), Some("s.token"), Some("job-1"))
            .unwrap();

        assert_eq!(config.as_bytes(), b"{\"irods_host\":\"grid\"}");
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "vault");
        assert_eq!(
            calls[0].args,
            vec!["kv", "get", "-field=irods_environment", "secret/jobs/job-1"]
        );
        assert!(calls[0]
            .env
            .contains(&("VAULT_TOKEN".to_string(), "s.token".to_string())));
        assert!(calls[0]
            .env
            .contains(&("VAULT_ADDR".to_string(), "https://vault:8200".to_string())));
    }

    #[test]
    fn given_empty_token_when_fetch_then_missing_option_without_running_vault() {
        let runner = Arc::new(RecordingRunner::new());

        let err = client(runner.clone())
            .fetch_config(Some("https://vault:8200"), Some(""), Some("job-1"))
            .unwrap_err();

        let record = err.record().expect("classified");
        assert_eq!(record.error_code, ErrorCode::MissingOption);
        assert_eq!(record.option.as_deref(), Some("VAULT_TOKEN"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn given_absent_job_uuid_when_fetch_then_missing_option() {
        let runner = Arc::new(RecordingRunner::new());

        let err = client(runner)
            .fetch_config(Some("addr"), Some("token"), None)
            .unwrap_err();

        assert_eq!(err.record().unwrap().option.as_deref(), Some("JOB_UUID"));
    }

    #[test]
    fn given_vault_failure_when_fetch_then_bad_exit_code() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_output(output(2, b"", b"No value found at secret/jobs/job-1"));

        let err = client(runner)
            .fetch_config(Some("addr"), Some("token"), Some("job-1"))
            .unwrap_err();

        let record = err.record().unwrap();
        assert_eq!(record.error_code, ErrorCode::BadExitCode);
        assert_eq!(record.exit_code, Some(2));
    }

    #[test]
    fn given_forbidden_token_when_fetch_then_access_denied() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_output(output(2, b"", b"Code: 403. Errors:\n* permission denied"));

        let err = client(runner)
            .fetch_config(Some("addr"), Some("token"), Some("job-1"))
            .unwrap_err();

        assert_eq!(err.record().unwrap().error_code, ErrorCode::AccessDenied);
    }

    #[test]
    fn given_missing_vault_binary_when_fetch_then_unclassified() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_spawn_error();

        let err = client(runner)
            .fetch_config(Some("addr"), Some("token"), Some("job-1"))
            .unwrap_err();

        assert!(err.record().is_none());
        assert!(matches!(err, InfraError::Spawn { .. }));
    }
}
