//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{SecretResolver, TransferService, ValidationService};
use crate::config::Settings;
use crate::infrastructure::icommands::IcommandsGrid;
use crate::infrastructure::traits::{
    CommandRunner, EnvReader, FileSystem, ProcessEnv, RealCommandRunner, RealFileSystem,
    SecretsClient, StorageGrid,
};
use crate::infrastructure::vault_cli::VaultCliClient;

/// Container holding the collaborators every command run needs.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Process environment
    pub env: Arc<dyn EnvReader>,

    /// Secrets service client
    pub secrets: Arc<dyn SecretsClient>,

    /// Storage grid
    pub grid: Arc<dyn StorageGrid>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let cmd: Arc<dyn CommandRunner> = Arc::new(RealCommandRunner);
        let secrets = Arc::new(VaultCliClient::new(cmd.clone(), settings.vault.clone()));
        let grid = Arc::new(IcommandsGrid::new(cmd, settings.grid.clone()));
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(ProcessEnv),
            secrets,
            grid,
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        env: Arc<dyn EnvReader>,
        secrets: Arc<dyn SecretsClient>,
        grid: Arc<dyn StorageGrid>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            env,
            secrets,
            grid,
        }
    }

    pub fn secret_resolver(&self) -> SecretResolver {
        SecretResolver::new(
            self.fs.clone(),
            self.env.clone(),
            self.secrets.clone(),
            self.settings.clone(),
        )
    }

    pub fn validation(&self) -> ValidationService {
        ValidationService::new(self.fs.clone(), self.grid.clone())
    }

    pub fn transfer(&self) -> TransferService {
        TransferService::new(self.fs.clone(), self.grid.clone(), self.settings.clone())
    }
}
