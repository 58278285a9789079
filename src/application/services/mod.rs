//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, StorageGrid, etc.)
//! but are themselves concrete structs, not traits.

mod secrets;
mod transfer;
mod validation;

pub use secrets::{vault_settings, SecretResolver};
pub use transfer::{
    plan_upload, read_source_list, remote_join, split_list, TransferService, TransferSummary,
    UploadItem,
};
pub use validation::{is_absolute_remote, ValidationService};
