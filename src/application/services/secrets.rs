//! Secret resolution: vault credentials and the storage configuration
//!
//! Two ordered passes, each returning a new value:
//! 1. [`vault_settings`] copies the vault variables from the environment.
//! 2. [`SecretResolver::read_vault_config`] fetches the storage configuration.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::options::{Enriched, Resolved, VerbOptions};
use crate::application::{ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{Credentials, ErrorRecord, StorageConfig};
use crate::infrastructure::traits::{EnvReader, FileSystem, SecretsClient};
use crate::infrastructure::vault_cli::{JOB_UUID_VAR, VAULT_ADDR_VAR, VAULT_TOKEN_VAR};

/// Copy `VAULT_TOKEN`, `VAULT_ADDR` and `JOB_UUID` verbatim.
///
/// Never fails: absent stays absent and empty stays empty. Rejecting missing
/// credentials is left to the secrets client.
pub fn vault_settings<O>(options: O, env: &dyn EnvReader) -> Enriched<O> {
    let credentials = Credentials {
        vault_token: env.var(VAULT_TOKEN_VAR),
        vault_addr: env.var(VAULT_ADDR_VAR),
        job_uuid: env.var(JOB_UUID_VAR),
    };
    debug!(
        "vault_settings: token={} addr={:?} job_uuid={:?}",
        if credentials.vault_token.is_some() { "<set>" } else { "<absent>" },
        credentials.vault_addr,
        credentials.job_uuid
    );
    Enriched {
        options,
        credentials,
    }
}

/// Enriches parsed options with credentials and the storage configuration.
pub struct SecretResolver {
    fs: Arc<dyn FileSystem>,
    env: Arc<dyn EnvReader>,
    secrets: Arc<dyn SecretsClient>,
    settings: Arc<Settings>,
}

impl SecretResolver {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        env: Arc<dyn EnvReader>,
        secrets: Arc<dyn SecretsClient>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            fs,
            env,
            secrets,
            settings,
        }
    }

    /// Run both enrichment passes.
    pub fn enrich<O: VerbOptions>(&self, options: O) -> ApplicationResult<Resolved<O>> {
        self.read_vault_config(vault_settings(options, self.env.as_ref()))
    }

    /// Attach the storage configuration.
    ///
    /// With `--debug-config` the file's bytes are used verbatim and the secrets
    /// service is never called; this needs `allow_debug_config` in settings.
    #[instrument(skip_all)]
    pub fn read_vault_config<O: VerbOptions>(
        &self,
        enriched: Enriched<O>,
    ) -> ApplicationResult<Resolved<O>> {
        let Enriched {
            options,
            credentials,
        } = enriched;

        let config = match options.debug_config() {
            Some(path) => {
                if !self.settings.allow_debug_config {
                    warn!(
                        "refusing --debug-config {}: allow_debug_config is off",
                        path.display()
                    );
                    return Err(ErrorRecord::access_denied().into());
                }
                warn!("reading storage configuration from {}", path.display());
                let bytes = self
                    .fs
                    .read(path)
                    .with_path_context("read debug config", path)?;
                StorageConfig::new(bytes)
            }
            None => self.secrets.fetch_config(
                credentials.vault_addr.as_deref(),
                credentials.vault_token.as_deref(),
                credentials.job_uuid.as_deref(),
            )?,
        };
        if config.is_empty() {
            warn!("storage configuration is empty; grid commands fall back to their own defaults");
        }
        debug!("read_vault_config: {:?}", config);

        Ok(Resolved {
            options,
            credentials,
            config,
        })
    }
}
