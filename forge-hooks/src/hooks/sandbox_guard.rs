use std::path::Path;

use super::memory::resolve;
use super::patterns::{
    dangerous_path_re, rm_rf_root_re, sensitive_filename_re, sensitive_in_command_re,
};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;

const PREFIX: &str = "🛡️ Sandbox Boundary:";

/// PreToolUse: keep file tools inside the project and away from
/// credentials; scan Bash text for dangerous paths.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    match input.tool() {
        "Read" | "Write" | "Edit" | "MultiEdit" | "NotebookEdit" => {
            let Some(path) = input.file_path() else {
                return Ok(Verdict::Allow);
            };
            Ok(check_path(ctx, path))
        }
        "Bash" => {
            let Some(command) = input.command() else {
                return Ok(Verdict::Allow);
            };
            Ok(check_command(command))
        }
        _ => Ok(Verdict::Allow),
    }
}

fn check_path(ctx: &GuardContext, raw: &str) -> Verdict {
    let root = ctx.root();
    let resolved = resolve(root, raw);

    if !is_contained(&resolved, root, &ctx.config.settings.allowed_path_prefixes) {
        return Verdict::Deny(format!(
            "{} {} is outside the project directory ({}). File access is restricted to the project tree.",
            PREFIX,
            raw,
            root.display()
        ));
    }

    let name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if sensitive_filename_re().is_match(&name) {
        return Verdict::Deny(format!(
            "{} {} may contain secrets or credentials. Access to credential files is blocked.",
            PREFIX, raw
        ));
    }

    Verdict::Allow
}

fn is_contained(path: &Path, root: &Path, allowed: &[String]) -> bool {
    if path.starts_with(root) {
        return true;
    }
    // Roots reached through a symlink (e.g. /tmp on macOS) compare by
    // their canonical form.
    if let Ok(canonical_root) = root.canonicalize()
        && path.starts_with(&canonical_root)
    {
        return true;
    }
    allowed.iter().any(|prefix| path.starts_with(prefix))
}

fn check_command(command: &str) -> Verdict {
    if rm_rf_root_re().is_match(command) {
        return Verdict::Deny(format!(
            "{} destructive command `rm -rf /` is blocked.",
            PREFIX
        ));
    }
    if let Some(m) = dangerous_path_re().find(command) {
        return Verdict::Deny(format!(
            "{} command references protected path {}. Home dotfiles and system files are outside the project sandbox.",
            PREFIX,
            m.as_str()
        ));
    }
    if let Some(m) = sensitive_in_command_re().find(command) {
        return Verdict::Deny(format!(
            "{} command references a file that may contain secrets or credentials ({}).",
            PREFIX,
            m.as_str().trim()
        ));
    }
    Verdict::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::registry::testing::{Fixture, input};
    use serde_json::json;

    fn read(fx: &Fixture, path: &str) -> Verdict {
        let ev = input(json!({"tool_name": "Read", "tool_input": {"file_path": path}}));
        evaluate(&fx.ctx(), &ev).unwrap()
    }

    fn bash(fx: &Fixture, cmd: &str) -> Verdict {
        let ev = input(json!({"tool_name": "Bash", "tool_input": {"command": cmd}}));
        evaluate(&fx.ctx(), &ev).unwrap()
    }

    #[test]
    fn test_project_paths_allowed() {
        let fx = Fixture::new();
        assert_eq!(read(&fx, "src/main.rs"), Verdict::Allow);
        let abs = fx.root().join("README.md");
        assert_eq!(read(&fx, &abs.to_string_lossy()), Verdict::Allow);
        assert_eq!(read(&fx, "/tmp/scratch.txt"), Verdict::Allow);
        assert_eq!(read(&fx, "/var/tmp/x"), Verdict::Allow);
        assert_eq!(read(&fx, "/dev/null"), Verdict::Allow);
    }

    #[test]
    fn test_outside_paths_denied() {
        let fx = Fixture::new();
        for p in ["/etc/passwd", "/home/user/.bashrc", "/home/user/other-project/secrets.py"] {
            let Verdict::Deny(reason) = read(&fx, p) else { panic!("{p} should be denied") };
            assert!(reason.contains("outside the project directory"));
        }
        assert!(read(&fx, "../../../../etc/hosts").is_deny());
    }

    #[test]
    fn test_sensitive_files_denied_inside_project() {
        let fx = Fixture::new();
        let Verdict::Deny(reason) = read(&fx, ".env") else { panic!() };
        assert!(reason.contains("secrets"));
        for p in [
            ".env.local",
            "certs/server.pem",
            "ssl/private.key",
            ".npmrc",
            ".pypirc",
            "credentials.json",
            "service-account-key.json",
            ".netrc",
            ".git-credentials",
        ] {
            assert!(read(&fx, p).is_deny(), "{p} should be denied");
        }
    }

    #[test]
    fn test_missing_path_and_other_tools_allowed() {
        let fx = Fixture::new();
        let ev = input(json!({"tool_name": "Read", "tool_input": {}}));
        assert_eq!(evaluate(&fx.ctx(), &ev).unwrap(), Verdict::Allow);
        let ev = input(json!({"tool_name": "Search", "tool_input": {"query": "x"}}));
        assert_eq!(evaluate(&fx.ctx(), &ev).unwrap(), Verdict::Allow);
    }

    #[test]
    fn test_bash_safe_commands() {
        let fx = Fixture::new();
        for cmd in ["ls -la src/", "python3 -c 'print(1+1)'", "echo hello", "grep -r 'TODO' src/", ""] {
            assert_eq!(bash(&fx, cmd), Verdict::Allow, "{cmd}");
        }
    }

    #[test]
    fn test_bash_dangerous_commands() {
        let fx = Fixture::new();
        for cmd in [
            "cat ~/.ssh/config",
            "cat $HOME/.gnupg/config",
            "cat ~/.kube/config",
            "cat /etc/passwd",
            "cat /etc/sudoers",
            "cat project/.env",
            "cat project/.netrc",
            "cat project/credentials.json",
            "rm -rf /",
        ] {
            assert!(bash(&fx, cmd).is_deny(), "{cmd} should be denied");
        }
    }
}
