//! First-run setup wizard.

use std::path::Path;

use tracing::warn;

use crate::cli::hooks::{self, InstallOutcome};
use crate::cli::prompt::Prompt;
use crate::config::{normalize_answers, ConfigStore, ScanPolicy, SetupAnswers};
use crate::error::Error;
use crate::git::Workspace;

const EXTENSIONS_QUESTION: &str =
    "Enter file extensions with the . in the beginning (comma-separated): ";
const WARN_ONLY_QUESTION: &str = "Warn only without blocking? (y/n): ";
const SEARCH_TERMS_QUESTION: &str = "Enter patterns to search (comma-separated): ";
const LINE_DETAILS_QUESTION: &str = "Show line details for each print statement? (y/n): ";
const EXCLUDE_QUESTION: &str = "Paths to exclude from scanning (comma-separated, blank for none): ";

/// Collect a new policy from the operator.
pub fn prompt_new_policy<P: Prompt>(prompt: &mut P) -> Result<ScanPolicy, Error> {
    let answers = SetupAnswers {
        file_extensions: required(prompt, EXTENSIONS_QUESTION)?,
        warn_only: required(prompt, WARN_ONLY_QUESTION)?,
        search_terms: required(prompt, SEARCH_TERMS_QUESTION)?,
        has_line_details: required(prompt, LINE_DETAILS_QUESTION)?,
        files_to_exclude: prompt.ask(EXCLUDE_QUESTION)?.unwrap_or_default(),
    };
    normalize_answers(&answers)
}

fn required<P: Prompt>(prompt: &mut P, question: &str) -> Result<String, Error> {
    prompt.ask(question)?.ok_or(Error::NoTerminal)
}

/// Run the init command: write a policy and install the hook.
pub async fn run<W: Workspace, P: Prompt>(
    workspace: &W,
    store: &ConfigStore,
    prompt: &mut P,
    binary: &Path,
) -> Result<(), Error> {
    if !workspace.is_version_controlled().await {
        return Err(Error::NotARepository);
    }

    if store.load().is_some() {
        println!("Config already exists at {}.", store.path().display());
        println!("Use 'printguard config <key> <value>' to change it.");
        return Ok(());
    }

    let policy = prompt_new_policy(prompt)?;
    store.save(&policy)?;
    println!("Successfully created config file");

    if let Err(e) = install_and_report(workspace, binary).await {
        warn!(error = %e, "Failed to install pre-commit hook");
        eprintln!("Warning: Could not install pre-commit hook: {}", e);
    }

    Ok(())
}

/// Run the install command.
pub async fn install_command<W: Workspace>(
    workspace: &W,
    binary: &Path,
) -> Result<(), Error> {
    if !workspace.is_version_controlled().await {
        return Err(Error::NotARepository);
    }
    install_and_report(workspace, binary).await
}

async fn install_and_report<W: Workspace>(
    workspace: &W,
    binary: &Path,
) -> Result<(), Error> {
    match install_hook(workspace, binary).await? {
        InstallOutcome::AlreadyInstalled => println!("Pre-commit hook already installed."),
        InstallOutcome::Installed { backup } => {
            if let Some(backup) = backup {
                println!("Existing pre-commit hook renamed to {}", backup);
            }
            println!("Created pre-commit hook");
        }
    }
    Ok(())
}

/// Resolve the hooks directory and install the gate script there.
pub async fn install_hook<W: Workspace>(
    workspace: &W,
    binary: &Path,
) -> Result<InstallOutcome, Error> {
    let hooks_dir = workspace.hooks_dir().await?;
    hooks::install(&hooks_dir, binary)
}
