use std::fs;

use super::git_hygiene::git_invocations;
use super::memory::{is_memory_path, resolve};
use super::patterns::{ABSOLUTE_PATH_MARKERS, staged_secret_file_re};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;

const PREFIX: &str = "🛡️ Pre-commit Quality Gate BLOCKED:";

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// PreToolUse on `git commit`: classify the staged file list.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if input.tool() != "Bash" {
        return Ok(Verdict::Allow);
    }
    let Some(command) = input.command() else {
        return Ok(Verdict::Allow);
    };
    if !git_invocations(command).iter().any(|g| g.subcommand == "commit") {
        return Ok(Verdict::Allow);
    }

    let staged = match ctx.git.staged_files() {
        Ok(files) => files,
        Err(e) => {
            tracing::debug!(error = %e, "staged file list unavailable");
            return Ok(Verdict::Allow);
        }
    };

    if let Some(secret) = staged.iter().find(|f| staged_secret_file_re().is_match(file_name(f))) {
        return Ok(Verdict::Deny(format!(
            "{} staged file {} looks like a secret or credential file. Unstage it (git reset HEAD {}) and add it to .gitignore.",
            PREFIX, secret, secret
        )));
    }

    let mut notes: Vec<String> = Vec::new();

    let claudedocs: Vec<&String> = staged
        .iter()
        .filter(|f| f.starts_with("claudedocs/") || f.contains("/claudedocs/"))
        .collect();
    if !claudedocs.is_empty() {
        notes.push(format!(
            "claudedocs/ output is staged ({}). Generated analysis usually stays out of version control.",
            join(&claudedocs)
        ));
    }

    // Staged paths are relative to the repository top level, which may sit
    // above the project root.
    let base = match ctx.git.toplevel() {
        Ok(Some(top)) => top,
        Ok(None) => ctx.root().to_path_buf(),
        Err(e) => {
            tracing::debug!(error = %e, "repository top level unavailable");
            ctx.root().to_path_buf()
        }
    };

    let mut skills_missing_history = Vec::new();
    let mut memory_with_paths = Vec::new();
    for f in &staged {
        let is_skill = file_name(f) == "SKILL.md";
        let is_memory = is_memory_path(f);
        if !is_skill && !is_memory {
            continue;
        }
        let Ok(content) = fs::read_to_string(resolve(&base, f)) else {
            continue;
        };
        if is_skill && !content.contains("Version History") {
            skills_missing_history.push(f);
        }
        if is_memory && ABSOLUTE_PATH_MARKERS.iter().any(|m| content.contains(m)) {
            memory_with_paths.push(f);
        }
    }

    if !skills_missing_history.is_empty() {
        notes.push(format!(
            "SKILL.md without a Version History section: {}.",
            join(&skills_missing_history)
        ));
    }
    if !memory_with_paths.is_empty() {
        notes.push(format!(
            "memory files contain absolute filesystem paths (/home/, /Users/): {}. Use project-relative paths.",
            join(&memory_with_paths)
        ));
    }

    if notes.is_empty() {
        Ok(Verdict::Allow)
    } else {
        Ok(Verdict::Warn(format!(
            "⚠️ Pre-commit Quality Gate:\n- {}",
            notes.join("\n- ")
        )))
    }
}

fn join(files: &[&String]) -> String {
    files.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForgeConfig;
    use crate::hooks::registry::testing::{Fixture, StaticGit, input};
    use serde_json::json;

    fn commit(fx: &Fixture) -> Verdict {
        let ev = input(json!({
            "tool_name": "Bash",
            "tool_input": {"command": "git commit -m \"feat: add feature\""},
        }));
        evaluate(&fx.ctx(), &ev).unwrap()
    }

    #[test]
    fn test_non_commit_commands_pass() {
        let mut fx = Fixture::new();
        fx.git = StaticGit::with_files(&[".env"]);
        for cmd in ["ls -la", "git push origin develop", "git status", ""] {
            let ev = input(json!({"tool_name": "Bash", "tool_input": {"command": cmd}}));
            assert_eq!(evaluate(&fx.ctx(), &ev).unwrap(), Verdict::Allow, "{cmd}");
        }
    }

    #[test]
    fn test_clean_commit_allowed() {
        let mut fx = Fixture::new();
        assert_eq!(commit(&fx), Verdict::Allow);
        fx.git = StaticGit::with_files(&["src/app.py"]);
        assert_eq!(commit(&fx), Verdict::Allow);
    }

    #[test]
    fn test_staged_secret_files_denied() {
        let mut fx = Fixture::new();
        for f in [".env", "config/.env.local", "credentials.json", "secrets.json", "certs/server.pem", "private.key", "id_rsa"] {
            fx.git = StaticGit::with_files(&["src/app.py", f]);
            let Verdict::Deny(reason) = commit(&fx) else { panic!("{f} should be denied") };
            assert!(reason.contains(f));
            assert!(reason.contains("BLOCKED"));
        }
    }

    #[test]
    fn test_claudedocs_warns() {
        let mut fx = Fixture::new();
        fx.git = StaticGit::with_files(&["claudedocs/analysis.md"]);
        let Verdict::Warn(msg) = commit(&fx) else { panic!() };
        assert!(msg.to_lowercase().contains("claudedocs"));
    }

    #[test]
    fn test_skill_without_version_history_warns() {
        let mut fx = Fixture::new();
        fx.file("skills/analyze/SKILL.md", "# Analyze\n\nSteps.\n");
        fx.git = StaticGit::with_files(&["skills/analyze/SKILL.md"]);
        let Verdict::Warn(msg) = commit(&fx) else { panic!() };
        assert!(msg.to_lowercase().contains("version history"));

        fx.file("skills/analyze/SKILL.md", "# Analyze\n\n## Version History\n- 1.0.0\n");
        assert_eq!(commit(&fx), Verdict::Allow);
    }

    #[test]
    fn test_memory_absolute_path_warns() {
        let mut fx = Fixture::new();
        fx.file("memory/projects/p/notes.md", "Repo lives at /Users/dev/p\n");
        fx.git = StaticGit::with_files(&["memory/projects/p/notes.md"]);
        let Verdict::Warn(msg) = commit(&fx) else { panic!() };
        assert!(msg.contains("absolute"));
    }

    #[test]
    fn test_staged_paths_resolve_against_toplevel() {
        let mut fx = Fixture::new();
        // Project root is `web/` inside the repository.
        fx.file("web/skills/analyze/SKILL.md", "# Analyze\n\nSteps.\n");
        fx.file("web/memory/projects/p/notes.md", "Built at /home/ci/p\n");
        fx.config = ForgeConfig::load_with(&fx.root().join("web"), None);
        fx.git = StaticGit {
            files: vec!["web/skills/analyze/SKILL.md".into(), "web/memory/projects/p/notes.md".into()],
            toplevel: Some(fx.root().to_path_buf()),
            ..StaticGit::default()
        };

        let Verdict::Warn(msg) = commit(&fx) else { panic!("nested project files should be read") };
        assert!(msg.contains("Version History"));
        assert!(msg.contains("absolute"));
    }
}
