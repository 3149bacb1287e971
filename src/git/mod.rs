//! Git working tree inspection.
//!
//! Every query runs `git` in an explicit directory; nothing here reads the
//! process working directory.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::Error;
use crate::scanner::{GrepOutput, GrepRequest};

/// Kind of a staged change, from `git diff --name-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Unmerged,
    Untracked,
    Unknown(char),
}

impl ChangeKind {
    fn from_status(status: &str) -> Self {
        match status.chars().next() {
            Some('A') => ChangeKind::Added,
            Some('M') => ChangeKind::Modified,
            Some('D') => ChangeKind::Deleted,
            Some('R') => ChangeKind::Renamed,
            Some('C') => ChangeKind::Copied,
            Some('T') => ChangeKind::TypeChanged,
            Some('U') => ChangeKind::Unmerged,
            Some('?') => ChangeKind::Untracked,
            Some(other) => ChangeKind::Unknown(other),
            None => ChangeKind::Unknown(' '),
        }
    }

    /// Rename and copy records carry a source and a destination path.
    fn has_two_paths(&self) -> bool {
        matches!(self, ChangeKind::Renamed | ChangeKind::Copied)
    }
}

/// A staged entry with its absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl StagedChange {
    /// Whether the index holds content for this path.
    pub fn has_content(&self) -> bool {
        self.kind != ChangeKind::Deleted
    }
}

/// Access to a version-controlled working tree.
#[allow(async_fn_in_trait)]
pub trait Workspace {
    /// True iff the directory is inside a working tree. Never fails.
    async fn is_version_controlled(&self) -> bool;

    /// Top-level directory of the working tree.
    async fn resolve_root(&self) -> Result<PathBuf, Error>;

    /// Directory git reads hooks from.
    async fn hooks_dir(&self) -> Result<PathBuf, Error>;

    /// Staged entries, renames excluded.
    async fn list_staged_changes(&self, root: &Path) -> Result<Vec<StagedChange>, Error>;

    /// Search the index. Spawn failures are errors; exit status is left to
    /// the caller.
    async fn grep_cached(&self, root: &Path, request: &GrepRequest) -> Result<GrepOutput, Error>;
}

/// [`Workspace`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    dir: PathBuf,
}

impl GitWorkspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn git(&self, cwd: &Path, args: &[&str]) -> std::io::Result<Output> {
        debug!(cwd = %cwd.display(), ?args, "Running git");
        Command::new("git").args(args).current_dir(cwd).output().await
    }
}

impl Workspace for GitWorkspace {
    async fn is_version_controlled(&self) -> bool {
        match self.git(&self.dir, &["rev-parse", "--is-inside-work-tree"]).await {
            Ok(output) => {
                output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true"
            }
            Err(e) => {
                debug!(error = %e, "Failed to run git");
                false
            }
        }
    }

    async fn resolve_root(&self) -> Result<PathBuf, Error> {
        let output = self
            .git(&self.dir, &["rev-parse", "--show-toplevel"])
            .await
            .map_err(|e| Error::RootResolution(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::RootResolution(stderr.trim().to_string()));
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(PathBuf::from(root).components().collect())
    }

    async fn hooks_dir(&self) -> Result<PathBuf, Error> {
        let root = self.resolve_root().await?;
        let output = self
            .git(&root, &["rev-parse", "--git-path", "hooks"])
            .await
            .map_err(|e| Error::HookInstall(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::HookInstall(stderr.trim().to_string()));
        }

        let hooks = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        Ok(root.join(hooks))
    }

    async fn list_staged_changes(&self, root: &Path) -> Result<Vec<StagedChange>, Error> {
        let output = self
            .git(root, &["diff", "--cached", "--name-status", "-M", "-z"])
            .await
            .map_err(|e| Error::ChangeListing(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            return Err(Error::ChangeListing(format!(
                "git diff failed with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_name_status(&decode_paths(&output.stdout, "git diff"), root)
    }

    async fn grep_cached(&self, root: &Path, request: &GrepRequest) -> Result<GrepOutput, Error> {
        let args = request.to_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .git(root, &args)
            .await
            .map_err(|e| Error::ScanExecution(format!("failed to run git grep: {}", e)))?;

        Ok(GrepOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Decode path-bearing git output.
///
/// Paths that are not UTF-8 come back with U+FFFD in place of the bad
/// bytes and no longer name their index entry, so they cannot be scanned.
pub fn decode_paths<'a>(raw: &'a [u8], source: &str) -> Cow<'a, str> {
    let decoded = String::from_utf8_lossy(raw);
    if let Cow::Owned(_) = decoded {
        warn!(source, "Output holds non-UTF-8 paths; those files will not be scanned");
    }
    decoded
}

/// Parse `git diff --name-status -z` output.
///
/// Records are `STATUS\0PATH\0`, or `STATUS\0SRC\0DST\0` for renames and
/// copies. Renames are dropped; copies keep their destination.
pub fn parse_name_status(raw: &str, root: &Path) -> Result<Vec<StagedChange>, Error> {
    let mut fields = raw.split('\0').filter(|field| !field.is_empty());
    let mut changes = Vec::new();

    while let Some(status) = fields.next() {
        let kind = ChangeKind::from_status(status);
        let mut path = fields
            .next()
            .ok_or_else(|| Error::ChangeListing(format!("missing path for status {}", status)))?;

        if kind.has_two_paths() {
            path = fields.next().ok_or_else(|| {
                Error::ChangeListing(format!("missing destination for status {}", status))
            })?;
        }

        if kind == ChangeKind::Renamed {
            debug!(path, "Skipping renamed entry");
            continue;
        }

        changes.push(StagedChange {
            path: root.join(path),
            kind,
        });
    }

    Ok(changes)
}

/// Keep paths ending with one of `extensions`. Case-sensitive; order kept.
pub fn filter_by_extension(changes: &[StagedChange], extensions: &[String]) -> Vec<PathBuf> {
    changes
        .iter()
        .filter(|change| {
            let name = change.path.to_string_lossy();
            extensions.iter().any(|ext| name.ends_with(ext.as_str()))
        })
        .map(|change| change.path.clone())
        .collect()
}
