//! bloom-cli: command-line front end for persisted Bloom filters
//!
//! Argument parsing lives in [`cli`], environment defaults in [`config`],
//! file handling in [`storage`] and the commands themselves in [`commands`].
//! The `bloom` binary only wires these together and maps the result to an
//! exit status: 0 success or possibly present, 1 definitely absent or not
//! removable, 2 any error.

pub mod cli;
pub mod commands;
pub mod config;
pub mod storage;

pub use cli::Cli;
pub use commands::{run, Outcome};

/// Exit status for any error: bad input, unreadable or corrupt files
pub const EXIT_ERROR: u8 = 2;
