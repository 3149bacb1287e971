//! printguard library.
//!
//! Pre-commit guard that scans staged content for debug print statements.

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod scanner;

pub use error::Error;
