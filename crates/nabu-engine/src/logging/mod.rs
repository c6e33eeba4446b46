//! Logger initialization for hosts and tools.
//!
//! The engine itself only talks to the `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
