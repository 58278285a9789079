//! Scoped grid session
//!
//! The storage configuration is written to a private temporary directory that
//! lives exactly as long as the session value.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::domain::StorageConfig;
use crate::infrastructure::{InfraError, InfraResult};

/// Environment variable pointing the icommands at their environment file.
pub const ENVIRONMENT_FILE_VAR: &str = "IRODS_ENVIRONMENT_FILE";

/// Environment variable pointing the icommands at their scrambled-password file.
pub const AUTHENTICATION_FILE_VAR: &str = "IRODS_AUTHENTICATION_FILE";

/// An authenticated grid session.
///
/// Dropping the session removes the temporary configuration on every exit path.
#[derive(Debug)]
pub struct GridSession {
    _dir: Option<TempDir>,
    env: Vec<(String, String)>,
}

impl GridSession {
    /// Materialize `config` as `<tempdir>/<file_name>` and point the session
    /// environment at it.
    pub fn from_config(config: &StorageConfig, file_name: &str) -> InfraResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("gridstage-")
            .tempdir()
            .map_err(|e| InfraError::io("create session directory", e))?;
        let env_file = dir.path().join(file_name);
        write_private(&env_file, config.as_bytes())
            .map_err(|e| InfraError::io(format!("write {}", env_file.display()), e))?;
        debug!("from_config: wrote {} bytes to {}", config.len(), env_file.display());

        let auth_file = dir.path().join(".irodsA");
        let env = vec![
            (ENVIRONMENT_FILE_VAR.to_string(), path_string(&env_file)),
            (AUTHENTICATION_FILE_VAR.to_string(), path_string(&auth_file)),
        ];
        Ok(Self {
            _dir: Some(dir),
            env,
        })
    }

    /// A session without backing files, for grids that need no configuration.
    pub fn detached() -> Self {
        Self {
            _dir: None,
            env: Vec::new(),
        }
    }

    /// Environment variables to pass to grid commands.
    pub fn env(&self) -> Vec<(&str, &str)> {
        self.env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Path of the materialized environment file, if any.
    pub fn environment_file(&self) -> Option<PathBuf> {
        self.env
            .iter()
            .find(|(k, _)| k == ENVIRONMENT_FILE_VAR)
            .map(|(_, v)| PathBuf::from(v))
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_config_when_session_opened_then_file_holds_exact_bytes() {
        let config = StorageConfig::new(b"{\"irods_host\": \"grid\"}\n".to_vec());

        let session = GridSession::from_config(&config, "irods_environment.json").unwrap();

        let path = session.environment_file().expect("environment file");
        assert!(path.ends_with("irods_environment.json"));
        assert_eq!(std::fs::read(&path).unwrap(), config.as_bytes());
    }

    #[test]
    fn given_open_session_when_dropped_then_removes_config() {
        let config = StorageConfig::new("secret");
        let session = GridSession::from_config(&config, "env.json").unwrap();
        let path = session.environment_file().unwrap();
        assert!(path.exists());

        drop(session);

        assert!(!path.exists());
    }

    #[test]
    fn given_detached_session_when_env_requested_then_empty() {
        assert!(GridSession::detached().env().is_empty());
        assert!(GridSession::detached().environment_file().is_none());
    }
}
