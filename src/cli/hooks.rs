//! Pre-commit hook installation.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use regex::Regex;
use tracing::info;

use crate::error::Error;

/// Hook file name.
const HOOK_NAME: &str = "pre-commit";

/// Marker identifying a hook written by printguard.
const HOOK_MARKER: &str = "printguard pre-commit gate";

/// Result of an install attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A new hook was written; `backup` names the renamed previous hook.
    Installed { backup: Option<String> },
    /// The existing hook is already ours and was left untouched.
    AlreadyInstalled,
}

/// Install the pre-commit gate into `hooks_dir`.
///
/// An existing foreign hook is renamed to a numbered `.old` backup and
/// chained from the new script.
pub fn install(hooks_dir: &Path, binary: &Path) -> Result<InstallOutcome, Error> {
    fs::create_dir_all(hooks_dir)?;
    let hook_path = hooks_dir.join(HOOK_NAME);

    let backup = if hook_path.is_file() {
        let existing = match fs::read_to_string(&hook_path) {
            Ok(content) => content,
            // A binary hook cannot carry our marker
            Err(e) if e.kind() == ErrorKind::InvalidData => String::new(),
            Err(e) => return Err(e.into()),
        };
        if existing.contains(HOOK_MARKER) {
            info!(path = %hook_path.display(), "Pre-commit hook already installed");
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let backup_name = next_backup_name(hooks_dir)?;
        fs::rename(&hook_path, hooks_dir.join(&backup_name))?;
        info!(backup = %backup_name, "Existing pre-commit hook renamed");
        Some(backup_name)
    } else {
        None
    };

    fs::write(&hook_path, hook_script(binary, backup.as_deref()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&hook_path, fs::Permissions::from_mode(0o755))?;
    }

    info!(path = %hook_path.display(), "Installed pre-commit hook");
    Ok(InstallOutcome::Installed { backup })
}

/// Pick `pre-commit.old` or `pre-commit<N>.old`, `N` being the number of
/// existing backups, skipping names already taken.
fn next_backup_name(hooks_dir: &Path) -> Result<String, Error> {
    let pattern = Regex::new(&format!(r"^{}\d*\.old$", regex::escape(HOOK_NAME)))
        .map_err(|e| Error::HookInstall(e.to_string()))?;

    let existing = fs::read_dir(hooks_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| pattern.is_match(&entry.file_name().to_string_lossy()))
        .count();

    let mut index = existing;
    loop {
        let name = if index == 0 {
            format!("{}.old", HOOK_NAME)
        } else {
            format!("{}{}.old", HOOK_NAME, index)
        };
        if !hooks_dir.join(&name).exists() {
            return Ok(name);
        }
        index += 1;
    }
}

/// Generate the hook script.
///
/// stdin comes from `/dev/tty` so the confirmation prompt works inside
/// `git commit`; without a terminal the redirect fails and so does the
/// commit.
fn hook_script(binary: &Path, backup: Option<&str>) -> String {
    let mut script = format!(
        "#!/bin/sh\n# {marker} (auto-installed)\n\nHOOK_DIR=$(dirname \"$0\")\n",
        marker = HOOK_MARKER
    );

    if let Some(backup) = backup {
        script.push_str(&format!(
            r#"
# Run the previous pre-commit hook first
if [ -x "$HOOK_DIR/{backup}" ]; then
    "$HOOK_DIR/{backup}" "$@" || exit $?
elif [ -f "$HOOK_DIR/{backup}" ]; then
    sh "$HOOK_DIR/{backup}" "$@" || exit $?
fi
"#
        ));
    }

    script.push_str(&format!(
        "\nexec {} < /dev/tty\n",
        shell_quote(&binary.to_string_lossy())
    ));
    script
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
