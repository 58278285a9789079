//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/gridstage/gridstage.toml`
//! 3. Environment variables: `GRIDSTAGE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::expand_env_vars;

/// Secrets service (vault CLI) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VaultConfig {
    /// Vault client executable
    pub program: String,
    /// KV secrets engine mount
    pub mount: String,
    /// Path below the mount; the job id is appended
    pub path_prefix: String,
    /// Field of the secret holding the storage configuration
    pub field: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            program: "vault".into(),
            mount: "secret".into(),
            path_prefix: "jobs".into(),
            field: "irods_environment".into(),
        }
    }
}

impl VaultConfig {
    /// Secret path for a job: `<mount>/<path_prefix>/<job_uuid>`.
    pub fn secret_path(&self, job_uuid: &str) -> String {
        [self.mount.as_str(), self.path_prefix.as_str(), job_uuid]
            .iter()
            .map(|s| s.trim_matches('/'))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Storage grid (icommands) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GridConfig {
    /// Directory holding the icommands (default: resolve via PATH)
    pub bin_dir: Option<PathBuf>,
    /// File name the storage configuration is materialized as
    pub environment_file: String,
    /// Metadata attribute tagging uploads with the job id
    pub job_uuid_attribute: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bin_dir: None,
            environment_file: "irods_environment.json".into(),
            job_uuid_attribute: "ipc-uuid".into(),
        }
    }
}

impl GridConfig {
    /// Full program path for an icommand.
    pub fn program(&self, name: &str) -> String {
        match &self.bin_dir {
            Some(dir) => dir.join(name).to_string_lossy().into_owned(),
            None => name.to_string(),
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, keep base).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub allow_debug_config: Option<bool>,
    pub vault: RawVaultConfig,
    pub grid: RawGridConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawVaultConfig {
    pub program: Option<String>,
    pub mount: Option<String>,
    pub path_prefix: Option<String>,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawGridConfig {
    pub bin_dir: Option<PathBuf>,
    pub environment_file: Option<String>,
    pub job_uuid_attribute: Option<String>,
}

/// Unified configuration for gridstage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Honor `--debug-config` (operator opt-in, off by default)
    pub allow_debug_config: bool,
    /// Secrets service settings
    pub vault: VaultConfig,
    /// Storage grid settings
    pub grid: GridConfig,
}

/// Get the XDG config directory for gridstage.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gridstage").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("gridstage.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(dir) = &self.grid.bin_dir {
            self.grid.bin_dir = Some(PathBuf::from(expand_env_vars(&dir.to_string_lossy())));
        }
        self.vault.program = expand_env_vars(&self.vault.program);
    }

    /// Overlay a raw config: scalars win when specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            allow_debug_config: overlay
                .allow_debug_config
                .unwrap_or(self.allow_debug_config),
            vault: VaultConfig {
                program: overlay
                    .vault
                    .program
                    .clone()
                    .unwrap_or_else(|| self.vault.program.clone()),
                mount: overlay
                    .vault
                    .mount
                    .clone()
                    .unwrap_or_else(|| self.vault.mount.clone()),
                path_prefix: overlay
                    .vault
                    .path_prefix
                    .clone()
                    .unwrap_or_else(|| self.vault.path_prefix.clone()),
                field: overlay
                    .vault
                    .field
                    .clone()
                    .unwrap_or_else(|| self.vault.field.clone()),
            },
            grid: GridConfig {
                bin_dir: overlay
                    .grid
                    .bin_dir
                    .clone()
                    .or_else(|| self.grid.bin_dir.clone()),
                environment_file: overlay
                    .grid
                    .environment_file
                    .clone()
                    .unwrap_or_else(|| self.grid.environment_file.clone()),
                job_uuid_attribute: overlay
                    .grid
                    .job_uuid_attribute
                    .clone()
                    .unwrap_or_else(|| self.grid.job_uuid_attribute.clone()),
            },
        }
    }

    /// Load settings with layered precedence from the XDG global config.
    pub fn load() -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref())
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional TOML file layered over the defaults; ignored if missing
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. `config_file`
    /// 3. Environment variables: `GRIDSTAGE_*` prefix
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(path) = config_file {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply GRIDSTAGE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("GRIDSTAGE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_bool("allow_debug_config") {
            settings.allow_debug_config = val;
        }
        if let Ok(val) = config.get_string("vault.program") {
            settings.vault.program = val;
        }
        if let Ok(val) = config.get_string("vault.mount") {
            settings.vault.mount = val;
        }
        if let Ok(val) = config.get_string("vault.path_prefix") {
            settings.vault.path_prefix = val;
        }
        if let Ok(val) = config.get_string("vault.field") {
            settings.vault.field = val;
        }
        if let Ok(val) = config.get_string("grid.bin_dir") {
            settings.grid.bin_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("grid.environment_file") {
            settings.grid.environment_file = val;
        }
        if let Ok(val) = config.get_string("grid.job_uuid_attribute") {
            settings.grid.job_uuid_attribute = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# gridstage configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/gridstage/gridstage.toml
#   Env:    GRIDSTAGE_* environment variables, e.g. GRIDSTAGE_VAULT__MOUNT

# Honor --debug-config (reads the storage configuration from a local file
# instead of the secrets service). Leave off on shared job hosts.
# allow_debug_config = false

[vault]
# program = "vault"
# mount = "secret"
# path_prefix = "jobs"
# field = "irods_environment"

[grid]
# bin_dir = "/usr/bin"
# environment_file = "irods_environment.json"
# job_uuid_attribute = "ipc-uuid"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_settings_then_debug_config_is_disabled() {
        let settings = Settings::default();
        assert!(!settings.allow_debug_config);
        assert_eq!(settings.vault.program, "vault");
        assert_eq!(settings.grid.job_uuid_attribute, "ipc-uuid");
    }

    #[test]
    fn given_job_uuid_when_secret_path_then_joins_segments() {
        let vault = VaultConfig {
            mount: "/secret/".into(),
            path_prefix: "jobs/".into(),
            ..VaultConfig::default()
        };
        assert_eq!(vault.secret_path("abc-123"), "secret/jobs/abc-123");
    }

    #[test]
    fn given_empty_prefix_when_secret_path_then_skips_segment() {
        let vault = VaultConfig {
            path_prefix: "".into(),
            ..VaultConfig::default()
        };
        assert_eq!(vault.secret_path("abc"), "secret/abc");
    }

    #[test]
    fn given_bin_dir_when_program_then_joins_name() {
        let grid = GridConfig {
            bin_dir: Some(PathBuf::from("/opt/irods/bin")),
            ..GridConfig::default()
        };
        assert_eq!(grid.program("iput"), "/opt/irods/bin/iput");
        assert_eq!(GridConfig::default().program("iput"), "iput");
    }

    #[test]
    fn given_partial_overlay_when_merged_then_keeps_unspecified_base_values() {
        let overlay = RawSettings {
            allow_debug_config: Some(true),
            vault: RawVaultConfig {
                mount: Some("kv".into()),
                ..RawVaultConfig::default()
            },
            grid: RawGridConfig::default(),
        };

        let result = Settings::default().merge_with(&overlay);

        assert!(result.allow_debug_config);
        assert_eq!(result.vault.mount, "kv");
        assert_eq!(result.vault.program, "vault");
        assert_eq!(result.grid, GridConfig::default());
    }

    #[test]
    fn given_tilde_in_bin_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            grid: GridConfig {
                bin_dir: Some(PathBuf::from("~/irods/bin")),
                ..GridConfig::default()
            },
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let bin_dir = settings.grid.bin_dir.unwrap();
        assert!(
            bin_dir.to_string_lossy().starts_with(&home),
            "bin_dir should start with home dir: {}",
            bin_dir.display()
        );
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.allow_debug_config.is_none());
    }
}
