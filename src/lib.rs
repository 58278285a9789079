//! gridstage: stage job data between a local filesystem and an iRODS grid

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
