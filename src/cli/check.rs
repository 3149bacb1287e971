//! Pre-commit check: the command the installed hook runs.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::cli::prompt::Prompt;
use crate::cli::setup;
use crate::config::{ConfigStore, ScanPolicy};
use crate::error::Error;
use crate::git::{filter_by_extension, Workspace};
use crate::scanner::{Match, Scanner};

const CONFIRM_QUESTION: &str = "Print statements detected. Continue anyway? (y/n): ";

/// Final outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No matches.
    Pass,
    /// Matches found, operator chose to continue.
    Proceed,
    /// Matches found, operator declined or could not answer.
    Abort,
    /// Matches found in blocking mode.
    Block,
}

impl Decision {
    /// Exit status for the hook: 0 lets the commit through.
    pub fn exit_code(&self) -> u8 {
        match self {
            Decision::Pass | Decision::Proceed => 0,
            Decision::Abort | Decision::Block => 1,
        }
    }
}

/// Drives one check from repository detection to the decision.
pub struct Guard<'a, W, P> {
    workspace: &'a W,
    store: &'a ConfigStore,
    prompt: &'a mut P,
    scanner: Scanner,
    binary: &'a Path,
}

impl<'a, W: Workspace, P: Prompt> Guard<'a, W, P> {
    pub fn new(
        workspace: &'a W,
        store: &'a ConfigStore,
        prompt: &'a mut P,
        scanner: Scanner,
        binary: &'a Path,
    ) -> Self {
        Self {
            workspace,
            store,
            prompt,
            scanner,
            binary,
        }
    }

    /// Run the check.
    ///
    /// Errors are fatal to the commit; the caller exits with status 1.
    pub async fn run(&mut self) -> Result<Decision, Error> {
        if !self.workspace.is_version_controlled().await {
            return Err(Error::NotARepository);
        }

        let policy = self.obtain_policy().await?;

        let root = self.workspace.resolve_root().await?;
        let changes = self.workspace.list_staged_changes(&root).await?;
        let with_content: Vec<_> = changes.into_iter().filter(|c| c.has_content()).collect();
        let files = filter_by_extension(&with_content, &policy.file_extensions);
        debug!(staged = with_content.len(), candidates = files.len(), "Filtered staged files");

        let matches = self.scanner.scan(self.workspace, &root, &files, &policy).await?;
        self.decide(&policy, &matches)
    }

    /// Load the policy, or set one up on first run.
    async fn obtain_policy(&mut self) -> Result<ScanPolicy, Error> {
        if let Some(policy) = self.store.load() {
            return Ok(policy);
        }

        info!("No config found, running first-time setup");
        match setup::install_hook(self.workspace, self.binary).await {
            Ok(outcome) => debug!(?outcome, "Hook install finished"),
            Err(e) => warn!(error = %e, "Failed to install pre-commit hook"),
        }

        let policy = setup::prompt_new_policy(&mut *self.prompt)?;
        match self.store.save(&policy) {
            Ok(()) => eprintln!("Successfully created config file"),
            Err(e) => {
                warn!(error = %e, "Failed to save config file");
                eprintln!("Failed to create config file: {}", e);
            }
        }
        Ok(policy)
    }

    fn decide(&mut self, policy: &ScanPolicy, matches: &[Match]) -> Result<Decision, Error> {
        if matches.is_empty() {
            return Ok(Decision::Pass);
        }

        for found in matches {
            eprintln!("WARNING: print statement detected at {}", found);
        }

        if !policy.warn_only {
            eprintln!("Commit blocked due to print statements.");
            return Ok(Decision::Block);
        }

        let answer = self.prompt.ask(CONFIRM_QUESTION)?;
        if answer.is_some_and(|a| a.eq_ignore_ascii_case("y")) {
            Ok(Decision::Proceed)
        } else {
            eprintln!("Commit aborted.");
            Ok(Decision::Abort)
        }
    }
}
