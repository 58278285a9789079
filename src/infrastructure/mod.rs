//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod di;
pub mod error;
pub mod icommands;
pub mod session;
pub mod traits;
pub mod vault_cli;

pub use error::{InfraError, InfraResult};
