//! Logging utilities.
//!
//! This module centralizes logger initialization. Everything else in the
//! crate logs through the `log` facade only.

mod init;

pub use init::{init_logging, LoggingConfig};

#[cfg(test)]
pub(crate) use init::init_test_logging;
