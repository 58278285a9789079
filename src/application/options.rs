//! Per-verb option schemas and the enrichment stages they pass through
//!
//! `get` and `put` have separate, total schemas. Each enrichment stage wraps
//! the previous value in a new one; nothing is mutated after parsing.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueHint};

use crate::domain::{Command, Credentials, MetaTriple, StorageConfig};

/// Download from the storage grid into a local directory.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "gridstage get", about = "Download files from the storage grid")]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct GetOptions {
    /// The user the transfer runs for
    #[arg(short, long)]
    pub user: Option<String>,

    /// Read the storage configuration from this local file (debugging only)
    #[arg(short = 'z', long, value_hint = ValueHint::FilePath)]
    pub debug_config: Option<PathBuf>,

    /// Remote path to download
    #[arg(short, long)]
    pub source: Option<String>,

    /// Local file listing remote paths to download, one per line
    #[arg(short = 'l', long, value_hint = ValueHint::FilePath)]
    pub source_list: Option<PathBuf>,

    /// Local directory to download into
    #[arg(short, long, default_value = ".", value_hint = ValueHint::DirPath)]
    pub destination: PathBuf,

    /// Metadata triple, repeatable
    #[arg(short, long, value_name = "ATTR,VALUE,UNIT")]
    pub meta: Vec<MetaTriple>,

    /// Show this help
    #[arg(short, long)]
    pub help: bool,

    #[arg(hide = true)]
    pub remnants: Vec<String>,
}

/// Upload a local directory to the storage grid.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "gridstage put", about = "Upload files to the storage grid")]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct PutOptions {
    /// The user granted ownership of the uploaded files
    #[arg(short, long)]
    pub user: Option<String>,

    /// Read the storage configuration from this local file (debugging only)
    #[arg(short = 'z', long, value_hint = ValueHint::FilePath)]
    pub debug_config: Option<PathBuf>,

    /// Local file listing files to leave out of the upload
    #[arg(short, long, default_value = "", hide_default_value = true)]
    pub exclude: String,

    /// Delimiter of the exclusion list [default: newline]
    #[arg(short = 'x', long, default_value = "\n", hide_default_value = true)]
    pub exclude_delimiter: String,

    /// Files to upload even when excluded
    #[arg(short, long, default_value = "", hide_default_value = true)]
    pub include: String,

    /// Delimiter of the include list
    #[arg(short = 'n', long, default_value = ",")]
    pub include_delimiter: String,

    /// Local directory to upload
    #[arg(short, long, default_value = ".", value_hint = ValueHint::DirPath)]
    pub source: PathBuf,

    /// Remote collection to upload into
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Metadata triple, repeatable
    #[arg(short, long, value_name = "ATTR,VALUE,UNIT")]
    pub meta: Vec<MetaTriple>,

    /// Do not tag the destination collection itself
    #[arg(short = 'p', long)]
    pub skip_parent_meta: bool,

    /// Show this help
    #[arg(short, long)]
    pub help: bool,

    #[arg(hide = true)]
    pub remnants: Vec<String>,
}

/// What the dispatcher needs from either verb schema.
pub trait VerbOptions: Parser + fmt::Debug {
    const COMMAND: Command;

    fn debug_config(&self) -> Option<&Path>;

    fn help(&self) -> bool;

    /// Move the unrecognized positional arguments out of the options.
    fn take_remnants(&mut self) -> Vec<String>;
}

impl VerbOptions for GetOptions {
    const COMMAND: Command = Command::Get;

    fn debug_config(&self) -> Option<&Path> {
        self.debug_config.as_deref()
    }

    fn help(&self) -> bool {
        self.help
    }

    fn take_remnants(&mut self) -> Vec<String> {
        std::mem::take(&mut self.remnants)
    }
}

impl VerbOptions for PutOptions {
    const COMMAND: Command = Command::Put;

    fn debug_config(&self) -> Option<&Path> {
        self.debug_config.as_deref()
    }

    fn help(&self) -> bool {
        self.help
    }

    fn take_remnants(&mut self) -> Vec<String> {
        std::mem::take(&mut self.remnants)
    }
}

/// Options plus the credentials copied from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enriched<O> {
    pub options: O,
    pub credentials: Credentials,
}

/// Fully resolved options: credentials plus the storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<O> {
    pub options: O,
    pub credentials: Credentials,
    pub config: StorageConfig,
}
