//! Pattern scanning over staged content.
//!
//! Searches the index (not the working copy) with `git grep --cached`, so
//! unstaged edits never affect the outcome.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ScanPolicy;
use crate::error::Error;
use crate::git::{decode_paths, Workspace};

/// A configured pattern found in a staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub file: PathBuf,
    /// 1-based, only set in line-detail mode.
    pub line: Option<u64>,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file.display(), line),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// One `git grep` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepRequest {
    /// Paths relative to the repository root.
    pub paths: Vec<String>,
    pub terms: Vec<String>,
    pub line_detail: bool,
}

impl GrepRequest {
    /// Full argument list for `git`.
    ///
    /// Paths are literal pathspecs: a staged `:name` or `a[12].ts` names
    /// exactly that file.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--literal-pathspecs",
            "grep",
            "--cached",
            "--no-color",
            "-I",
            "--full-name",
            "-z",
            "-F",
            if self.line_detail { "-n" } else { "-l" },
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        for term in &self.terms {
            args.push("-e".to_string());
            args.push(term.clone());
        }
        args.push("--".to_string());
        args.extend(self.paths.iter().cloned());
        args
    }
}

/// Raw result of a search process.
#[derive(Debug, Clone, Default)]
pub struct GrepOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Finds configured patterns in staged files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    /// Propagate search failures instead of reporting no matches.
    pub strict: bool,
}

impl Scanner {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Scan `files` (absolute, under `root`) for the policy's terms.
    ///
    /// A search that cannot run is fail-open by default: it logs a warning
    /// and reports no matches, so a broken `git grep` lets the commit
    /// through. With `strict` set the failure is returned instead.
    pub async fn scan<W: Workspace>(
        &self,
        workspace: &W,
        root: &Path,
        files: &[PathBuf],
        policy: &ScanPolicy,
    ) -> Result<Vec<Match>, Error> {
        let paths = relative_paths(root, files, &policy.files_to_exclude);
        if paths.is_empty() {
            debug!("No files to scan");
            return Ok(Vec::new());
        }

        let request = GrepRequest {
            paths,
            terms: policy.search_terms.clone(),
            line_detail: policy.has_line_details,
        };

        match search(workspace, root, &request).await {
            Ok(matches) => Ok(matches),
            Err(e) if !self.strict => {
                warn!(error = %e, "Scan failed, allowing commit without scanning (fail-open)");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

async fn search<W: Workspace>(
    workspace: &W,
    root: &Path,
    request: &GrepRequest,
) -> Result<Vec<Match>, Error> {
    let output = workspace.grep_cached(root, request).await?;
    match output.code {
        Some(0) => Ok(parse_grep_output(
            &decode_paths(&output.stdout, "git grep"),
            root,
            request.line_detail,
        )),
        Some(1) => Ok(Vec::new()),
        Some(code) => Err(Error::ScanExecution(format!(
            "git grep exited with {}: {}",
            code,
            output.stderr.trim()
        ))),
        None => Err(Error::ScanExecution(
            "git grep terminated by signal".to_string(),
        )),
    }
}

/// Root-relative paths with `/` separators, minus excluded ones.
fn relative_paths(root: &Path, files: &[PathBuf], exclusions: &[String]) -> Vec<String> {
    files
        .iter()
        .map(|file| {
            let relative = file.strip_prefix(root).unwrap_or(file);
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .filter(|relative| {
            let excluded = exclusions
                .iter()
                .any(|fragment| relative.contains(fragment.as_str()));
            if excluded {
                debug!(path = %relative, "Excluded from scan");
            }
            !excluded
        })
        .collect()
}

/// Parse `git grep -z` output.
///
/// With `-l` each record is `PATH\0`; with `-n` each line is
/// `PATH\0LINE\0TEXT\n`.
pub fn parse_grep_output(raw: &str, root: &Path, line_detail: bool) -> Vec<Match> {
    if !line_detail {
        let mut matches: Vec<Match> = Vec::new();
        for path in raw.split('\0').map(|p| p.trim_start_matches('\n')) {
            if path.is_empty() {
                continue;
            }
            let file = root.join(path);
            if !matches.iter().any(|m| m.file == file) {
                matches.push(Match { file, line: None });
            }
        }
        return matches;
    }

    raw.lines()
        .filter_map(|record| {
            let mut parts = record.splitn(3, '\0');
            let path = parts.next()?;
            let line = parts.next()?.parse().ok()?;
            Some(Match {
                file: root.join(path),
                line: Some(line),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::git::StagedChange;

    /// Workspace serving canned grep results and recording requests.
    struct CannedGrep {
        result: Result<GrepOutput, String>,
        requests: RefCell<Vec<GrepRequest>>,
    }

    impl CannedGrep {
        fn new(result: Result<GrepOutput, String>) -> Self {
            Self {
                result,
                requests: RefCell::new(Vec::new()),
            }
        }

        fn ok(code: i32, stdout: &str) -> Self {
            Self::new(Ok(GrepOutput {
                code: Some(code),
                stdout: stdout.as_bytes().to_vec(),
                stderr: String::new(),
            }))
        }
    }

    impl Workspace for CannedGrep {
        async fn is_version_controlled(&self) -> bool {
            true
        }

        async fn resolve_root(&self) -> Result<PathBuf, Error> {
            Ok(PathBuf::from("/repo"))
        }

        async fn hooks_dir(&self) -> Result<PathBuf, Error> {
            Ok(PathBuf::from("/repo/.git/hooks"))
        }

        async fn list_staged_changes(&self, _root: &Path) -> Result<Vec<StagedChange>, Error> {
            Ok(Vec::new())
        }

        async fn grep_cached(
            &self,
            _root: &Path,
            request: &GrepRequest,
        ) -> Result<GrepOutput, Error> {
            self.requests.borrow_mut().push(request.clone());
            self.result.clone().map_err(Error::ScanExecution)
        }
    }

    fn policy(line_detail: bool, exclude: &[&str]) -> ScanPolicy {
        ScanPolicy {
            file_extensions: vec![".ts".to_string()],
            warn_only: false,
            search_terms: vec!["console.log".to_string(), "debugger".to_string()],
            has_line_details: line_detail,
            files_to_exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn files(paths: &[&str]) -> Vec<PathBuf> {
        paths.iter().map(|p| Path::new("/repo").join(p)).collect()
    }

    #[tokio::test]
    async fn test_empty_file_list_skips_search() {
        let ws = CannedGrep::ok(0, "x.ts\0");
        let matches = Scanner::default()
            .scan(&ws, Path::new("/repo"), &[], &policy(false, &[]))
            .await
            .unwrap();

        assert!(matches.is_empty());
        assert!(ws.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_file_level_matches() {
        let ws = CannedGrep::ok(0, "src/x.ts\0y.ts\0");
        let matches = Scanner::default()
            .scan(&ws, Path::new("/repo"), &files(&["src/x.ts", "y.ts", "z.ts"]), &policy(false, &[]))
            .await
            .unwrap();

        assert_eq!(
            matches,
            vec![
                Match { file: PathBuf::from("/repo/src/x.ts"), line: None },
                Match { file: PathBuf::from("/repo/y.ts"), line: None },
            ]
        );

        let requests = ws.requests.borrow();
        assert_eq!(requests[0].paths, vec!["src/x.ts", "y.ts", "z.ts"]);
        assert!(!requests[0].line_detail);
    }

    #[tokio::test]
    async fn test_line_level_matches() {
        let ws = CannedGrep::ok(
            0,
            "x.ts\x003\0  console.log(a)\nx.ts\x009\0debugger;\ny.ts\x001\0console.log('a:b')\n",
        );
        let matches = Scanner::default()
            .scan(&ws, Path::new("/repo"), &files(&["x.ts", "y.ts"]), &policy(true, &[]))
            .await
            .unwrap();

        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0], Match { file: PathBuf::from("/repo/x.ts"), line: Some(3) });
        assert_eq!(matches[1].line, Some(9));
        assert_eq!(matches[2].to_string(), "/repo/y.ts:1");
    }

    #[tokio::test]
    async fn test_not_found_status_is_empty() {
        let ws = CannedGrep::ok(1, "");
        let matches = Scanner::new(true)
            .scan(&ws, Path::new("/repo"), &files(&["x.ts"]), &policy(false, &[]))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_fail_open_by_default() {
        let ws = CannedGrep::ok(128, "");
        let matches = Scanner::default()
            .scan(&ws, Path::new("/repo"), &files(&["x.ts"]), &policy(false, &[]))
            .await
            .unwrap();
        assert!(matches.is_empty());

        let ws = CannedGrep::new(Err("git not found".to_string()));
        let matches = Scanner::default()
            .scan(&ws, Path::new("/repo"), &files(&["x.ts"]), &policy(false, &[]))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_failure_propagates_when_strict() {
        let ws = CannedGrep::ok(128, "");
        let err = Scanner::new(true)
            .scan(&ws, Path::new("/repo"), &files(&["x.ts"]), &policy(false, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScanExecution(_)));
    }

    #[tokio::test]
    async fn test_exclusions_filter_paths() {
        let ws = CannedGrep::ok(1, "");
        Scanner::default()
            .scan(
                &ws,
                Path::new("/repo"),
                &files(&["src/a.ts", "vendor/b.ts", "src/fixtures/c.ts"]),
                &policy(false, &["vendor/", "fixtures"]),
            )
            .await
            .unwrap();

        assert_eq!(ws.requests.borrow()[0].paths, vec!["src/a.ts"]);
    }

    #[tokio::test]
    async fn test_everything_excluded_skips_search() {
        let ws = CannedGrep::ok(0, "vendor/b.ts\0");
        let matches = Scanner::default()
            .scan(&ws, Path::new("/repo"), &files(&["vendor/b.ts"]), &policy(false, &["vendor"]))
            .await
            .unwrap();

        assert!(matches.is_empty());
        assert!(ws.requests.borrow().is_empty());
    }

    #[test]
    fn test_grep_args() {
        let request = GrepRequest {
            paths: vec!["a b.ts".to_string()],
            terms: vec!["console.log".to_string(), "-x".to_string()],
            line_detail: true,
        };
        let args = request.to_args();

        assert_eq!(&args[..3], &["--literal-pathspecs", "grep", "--cached"]);
        assert!(args.contains(&"-F".to_string()));
        assert!(args.contains(&"-n".to_string()));
        assert!(!args.contains(&"-l".to_string()));
        let tail: Vec<&str> = args[args.len() - 6..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["-e", "console.log", "-e", "-x", "--", "a b.ts"]);
    }

    #[test]
    fn test_file_mode_reports_each_file_once() {
        let parsed = parse_grep_output("a.ts\0b.ts\0a.ts\0", Path::new("/r"), false);
        assert_eq!(
            parsed,
            vec![
                Match { file: PathBuf::from("/r/a.ts"), line: None },
                Match { file: PathBuf::from("/r/b.ts"), line: None },
            ]
        );
    }

    #[test]
    fn test_line_mode_skips_malformed_records() {
        let parsed = parse_grep_output("a.ts\0x\0text\nb.ts\n", Path::new("/r"), true);
        assert!(parsed.is_empty());
    }
}
