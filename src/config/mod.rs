//! Scan policy configuration.
//!
//! Handles loading, validating and saving `print_check_config.json` in the
//! invocation directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Error;

/// Policy file name, relative to the invocation directory.
pub const CONFIG_FILE: &str = "print_check_config.json";

/// Scan policy stored in `print_check_config.json`.
///
/// `hasLineDetails` and `filesToExclude` were added after the first file
/// shape shipped, so both default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPolicy {
    /// Suffixes of files to scan, each starting with `.`.
    pub file_extensions: Vec<String>,

    /// Ask for confirmation instead of blocking.
    pub warn_only: bool,

    /// Patterns searched for in staged content.
    pub search_terms: Vec<String>,

    /// Report matches per line instead of per file.
    #[serde(default)]
    pub has_line_details: bool,

    /// Path fragments excluded from scanning.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_to_exclude: Vec<String>,
}

impl ScanPolicy {
    /// Check the invariants a loaded or patched policy must hold.
    pub fn validate(&self) -> Result<(), Error> {
        if self.file_extensions.is_empty() {
            return Err(Error::validation("at least one file extension is required"));
        }
        let invalid = invalid_extensions(&self.file_extensions);
        if !invalid.is_empty() {
            return Err(invalid_extensions_error(&invalid));
        }
        if self.search_terms.is_empty() {
            return Err(Error::validation("at least one search term is required"));
        }
        if self.search_terms.iter().any(|t| t.is_empty()) {
            return Err(Error::validation("search terms must not be empty"));
        }
        Ok(())
    }
}

/// Policy fields addressable by `printguard config <key> <value>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKey {
    FileExtensions,
    WarnOnly,
    SearchTerms,
    HasLineDetails,
    FilesToExclude,
}

impl PolicyKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKey::FileExtensions => "fileExtensions",
            PolicyKey::WarnOnly => "warnOnly",
            PolicyKey::SearchTerms => "searchTerms",
            PolicyKey::HasLineDetails => "hasLineDetails",
            PolicyKey::FilesToExclude => "filesToExclude",
        }
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fileExtensions" => Ok(PolicyKey::FileExtensions),
            "warnOnly" => Ok(PolicyKey::WarnOnly),
            "searchTerms" => Ok(PolicyKey::SearchTerms),
            "hasLineDetails" => Ok(PolicyKey::HasLineDetails),
            "filesToExclude" => Ok(PolicyKey::FilesToExclude),
            other => Err(Error::UnknownKey(other.to_string())),
        }
    }
}

/// Raw answers collected by interactive setup.
#[derive(Debug, Clone, Default)]
pub struct SetupAnswers {
    pub file_extensions: String,
    pub warn_only: String,
    pub search_terms: String,
    pub has_line_details: String,
    pub files_to_exclude: String,
}

/// Turn raw setup answers into a validated policy.
pub fn normalize_answers(answers: &SetupAnswers) -> Result<ScanPolicy, Error> {
    let policy = ScanPolicy {
        file_extensions: parse_extensions(&answers.file_extensions)?,
        warn_only: parse_yes_no(&answers.warn_only)?,
        search_terms: split_list(&answers.search_terms),
        has_line_details: parse_yes_no(&answers.has_line_details)?,
        files_to_exclude: split_list(&answers.files_to_exclude),
    };
    policy.validate()?;
    Ok(policy)
}

/// Parse a comma-separated extension list.
///
/// The whole string is trimmed but tokens are not, so `".ts, .js"` fails on
/// `" .js"`. Blank tokens are dropped.
pub fn parse_extensions(input: &str) -> Result<Vec<String>, Error> {
    let extensions: Vec<String> = input
        .trim()
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(str::to_string)
        .collect();

    let invalid = invalid_extensions(&extensions);
    if !invalid.is_empty() {
        return Err(invalid_extensions_error(&invalid));
    }
    Ok(extensions)
}

/// Parse a `y`/`n` answer. Case-insensitive, not trimmed.
pub fn parse_yes_no(input: &str) -> Result<bool, Error> {
    match input.to_lowercase().as_str() {
        "y" => Ok(true),
        "n" => Ok(false),
        _ => Err(Error::validation(format!(
            "please answer y or n (got {:?})",
            input
        ))),
    }
}

/// Split a comma-separated list, trimming tokens and dropping blanks.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid_extensions(extensions: &[String]) -> Vec<&str> {
    extensions
        .iter()
        .filter(|ext| !ext.starts_with('.'))
        .map(String::as_str)
        .collect()
}

fn invalid_extensions_error(invalid: &[&str]) -> Error {
    let listed: Vec<String> = invalid.iter().map(|ext| format!("{:?}", ext)).collect();
    Error::validation(format!(
        "extensions must start with '.', invalid extensions: {}",
        listed.join(", ")
    ))
}

/// Reads and writes the policy file of one invocation directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the policy file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the policy file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Load the policy.
    ///
    /// Missing, unparsable and invalid files all come back as `None`; the
    /// caller treats every one of them as "no config yet".
    pub fn load(&self) -> Option<ScanPolicy> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No readable config file");
                return None;
            }
        };

        let policy: ScanPolicy = match serde_json::from_str(&content) {
            Ok(policy) => policy,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config file, creating new one");
                return None;
            }
        };

        if let Err(e) = policy.validate() {
            warn!(path = %path.display(), error = %e, "Invalid config file, creating new one");
            return None;
        }

        Some(policy)
    }

    /// Write the policy, replacing any existing file.
    pub fn save(&self, policy: &ScanPolicy) -> Result<(), Error> {
        let path = self.path();
        let content = serde_json::to_string_pretty(policy)?;
        fs::write(&path, content)?;
        info!(path = %path.display(), "Saved config file");
        Ok(())
    }

    /// Replace a single field of the stored policy and write it back.
    pub fn patch(&self, key: PolicyKey, value: &str) -> Result<ScanPolicy, Error> {
        let mut policy = self
            .load()
            .ok_or_else(|| Error::NoExistingConfig(self.path()))?;

        match key {
            PolicyKey::FileExtensions => policy.file_extensions = parse_extensions(value)?,
            PolicyKey::WarnOnly => policy.warn_only = parse_yes_no(value)?,
            PolicyKey::SearchTerms => policy.search_terms = split_list(value),
            PolicyKey::HasLineDetails => policy.has_line_details = parse_yes_no(value)?,
            PolicyKey::FilesToExclude => policy.files_to_exclude = split_list(value),
        }
        policy.validate()?;

        self.save(&policy)?;
        info!(key = %key, "Patched config");
        Ok(policy)
    }
}
