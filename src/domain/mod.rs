//! Domain layer: entities, failure records and their translation
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod translate;

pub use entities::*;
pub use error::{ErrorCode, ErrorRecord};
pub use translate::translate;
