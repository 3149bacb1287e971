//! CLI commands for printguard.

pub mod check;
pub mod config;
pub mod hooks;
pub mod prompt;
pub mod setup;

use clap::{Parser, Subcommand};

/// printguard - block debug print statements at commit time
#[derive(Parser)]
#[command(name = "printguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Block the commit when the content search itself fails
    #[arg(long, global = true)]
    pub strict_scan: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check staged files (default; run by the pre-commit hook)
    Check,

    /// Create a config interactively and install the pre-commit hook
    Init,

    /// Install the pre-commit hook only
    Install,

    /// Show or change the config
    Config {
        /// Config key (fileExtensions, warnOnly, searchTerms, hasLineDetails, filesToExclude)
        key: Option<String>,

        /// New value, in the same format as the setup answers
        value: Option<String>,
    },
}
