use std::path::PathBuf;
use std::process::Command;

use crate::error::{HookError, Result};

/// Read-only view of the repository's staged changes.
pub trait GitInspector {
    /// `git diff --cached` output.
    fn staged_diff(&self) -> Result<String>;

    /// `git diff --cached --name-only`, one path per entry, relative to
    /// the repository top level.
    fn staged_files(&self) -> Result<Vec<String>>;

    /// Repository top level, the base of `staged_files` paths. `None` when
    /// unknown, in which case callers fall back to the project root.
    fn toplevel(&self) -> Result<Option<PathBuf>>;
}

/// Shells out to `git` in the project root.
pub struct CommandGit {
    root: PathBuf,
}

impl CommandGit {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| HookError::Git {
                command: args.join(" "),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(HookError::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl GitInspector for CommandGit {
    fn staged_diff(&self) -> Result<String> {
        self.run(&["diff", "--cached"])
    }

    fn staged_files(&self) -> Result<Vec<String>> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn toplevel(&self) -> Result<Option<PathBuf>> {
        let out = self.run(&["rev-parse", "--show-toplevel"])?;
        let top = out.trim();
        Ok((!top.is_empty()).then(|| PathBuf::from(top)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_command_git_outside_repo_is_error() {
        let dir = TempDir::new().unwrap();
        let git = CommandGit::new(dir.path());
        // Either git is missing or the directory is not a repository.
        assert!(git.staged_files().is_err());
    }

    #[test]
    fn test_staged_files_are_relative_to_toplevel() {
        let dir = TempDir::new().unwrap();
        let top = CommandGit::new(dir.path());
        if top.run(&["init", "-q"]).is_err() {
            // git unavailable
            return;
        }
        fs::create_dir_all(dir.path().join("app/skills")).unwrap();
        fs::write(dir.path().join("app/skills/SKILL.md"), "# Skill\n").unwrap();
        top.run(&["add", "app/skills/SKILL.md"]).unwrap();

        let sub = CommandGit::new(dir.path().join("app"));
        assert_eq!(sub.staged_files().unwrap(), vec!["app/skills/SKILL.md".to_string()]);
        let toplevel = sub.toplevel().unwrap().unwrap();
        assert_eq!(
            fs::canonicalize(toplevel).unwrap(),
            fs::canonicalize(dir.path()).unwrap()
        );
    }
}
