//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

/// Top-level verb selecting the transfer direction and flag schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Get,
    Put,
    Version,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Get => "get",
            Command::Put => "put",
            Command::Version => "--version",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Command::Get),
            "put" => Ok(Command::Put),
            "--version" => Ok(Command::Version),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// One attribute/value/unit metadata triple, as given to `--meta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTriple {
    pub attribute: String,
    pub value: String,
    pub unit: String,
}

impl MetaTriple {
    pub fn new(
        attribute: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
            unit: unit.into(),
        }
    }

    /// Fields in tagging order: attribute, value, unit.
    pub fn as_array(&self) -> [&str; 3] {
        [&self.attribute, &self.value, &self.unit]
    }
}

impl FromStr for MetaTriple {
    type Err = String;

    /// Parse `attr,value[,unit]`. Empty fields are kept; a missing unit is empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        match parts.as_slice() {
            [attribute, value] => Ok(Self::new(*attribute, *value, "")),
            [attribute, value, unit] => Ok(Self::new(*attribute, *value, *unit)),
            _ => Err(format!(
                "expected attribute,value[,unit] but got {} field(s) in '{}'",
                parts.len(),
                s
            )),
        }
    }
}

/// Raw vault credentials copied from the process environment.
///
/// `None` means the variable was absent; an empty string is kept as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub vault_token: Option<String>,
    pub vault_addr: Option<String>,
    pub job_uuid: Option<String>,
}

/// Opaque storage-access configuration, either fetched from the secrets
/// service or read verbatim from a debug file.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StorageConfig(Vec<u8>);

impl StorageConfig {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Contents may hold credentials.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageConfig(<{} bytes>)", self.0.len())
    }
}

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}` and `~`. Unresolvable input is returned unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
