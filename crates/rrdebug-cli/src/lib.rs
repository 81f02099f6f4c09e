#![forbid(unsafe_code)]

//! `rrdebug`: terminal companion for the rrweb replay debugger.
//!
//! Uses the same version table, query contract and remote loaders as the
//! browser pages, so a link or a fetch checked here behaves the same way in
//! the playback page.

pub mod check;
pub mod cli;
pub mod error;
pub mod fetch;
pub mod link;
pub mod listing;
pub mod logging;

pub use cli::{Cli, Commands, run, run_from_env};
pub use error::{CliError, Result};
