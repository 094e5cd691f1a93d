use super::command::{all_commands, program_name, program_words};
use super::patterns::{CONVENTIONAL_TYPES, conventional_commit_re, secret_patterns};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;

const PREFIX: &str = "🛡️ Git Hygiene:";

/// One `git <subcommand> args...` found in a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInvocation {
    pub subcommand: String,
    pub args: Vec<String>,
}

/// Every git invocation in `command`, wherever it sits in a chain, pipe,
/// `sh -c` script or command substitution.
pub fn git_invocations(command: &str) -> Vec<GitInvocation> {
    let mut out = Vec::new();
    for words in all_commands(command) {
        let words = program_words(&words);
        let Some(first) = words.first() else { continue };
        if program_name(first) != "git" {
            continue;
        }

        // Skip global options (`-C dir`, `-c key=val`, `--no-pager`).
        let mut i = 1;
        while let Some(w) = words.get(i) {
            match w.as_str() {
                "-C" | "-c" | "--git-dir" | "--work-tree" => i += 2,
                w if w.starts_with('-') => i += 1,
                _ => break,
            }
        }
        if let Some(sub) = words.get(i) {
            out.push(GitInvocation {
                subcommand: sub.clone(),
                args: words[i + 1..].to_vec(),
            });
        }
    }
    out
}

fn is_force_flag(arg: &str) -> bool {
    arg == "-f"
        || arg == "--force"
        || arg.starts_with("--force-with-lease")
        || arg == "--force-if-includes"
        || (arg.starts_with('-') && !arg.starts_with("--") && arg[1..].contains('f'))
}

/// Destination branch of a refspec: `HEAD:main` → `main`, `+dev` → `dev`.
fn refspec_target(spec: &str) -> &str {
    let spec = spec.trim_start_matches('+');
    let dst = spec.rsplit(':').next().unwrap_or(spec);
    dst.trim_start_matches("refs/heads/")
}

fn check_push(args: &[String], protected: &[String]) -> Option<Verdict> {
    if let Some(flag) = args.iter().find(|a| is_force_flag(a)) {
        return Some(Verdict::Deny(format!(
            "{} force push ({}) is not allowed. Rewrite history on a feature branch and open a pull request instead.",
            PREFIX, flag
        )));
    }

    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();
    // First positional is the remote; the rest are refspecs.
    for spec in positional.iter().skip(1) {
        if spec.starts_with('+') {
            return Some(Verdict::Deny(format!(
                "{} force push (refspec {}) is not allowed.",
                PREFIX, spec
            )));
        }
        let target = refspec_target(spec);
        if protected.iter().any(|b| b == target) {
            return Some(Verdict::Deny(format!(
                "{} direct push to protected branch '{}' is blocked. Push a feature branch and open a pull request.",
                PREFIX, target
            )));
        }
    }
    None
}

/// The `-m`/`--message` value of a `git commit`, if any.
pub fn commit_message(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-m" || arg == "--message" {
            return iter.next().cloned();
        }
        if let Some(v) = arg.strip_prefix("--message=") {
            return Some(v.to_string());
        }
        if let Some(v) = arg.strip_prefix("-m")
            && !v.is_empty()
            && !arg.starts_with("--")
        {
            return Some(v.to_string());
        }
        // Combined short flags ending in m, e.g. `-am`.
        if arg.starts_with('-') && !arg.starts_with("--") && arg.len() > 2 && arg.ends_with('m') {
            return iter.next().cloned();
        }
    }
    None
}

/// Subject line of a commit message. For `"$(cat <<'EOF' ... EOF)"` the
/// subject is the first non-empty line of the heredoc body.
pub fn commit_subject(message: &str) -> &str {
    let trimmed = message.trim_start();
    let Some(rest) = trimmed
        .strip_prefix("$(cat <<")
        .or_else(|| trimmed.strip_prefix("$(cat<<"))
    else {
        return trimmed.lines().next().unwrap_or("").trim();
    };

    let mut lines = rest.lines();
    let delimiter = lines
        .next()
        .unwrap_or("")
        .trim()
        .trim_start_matches('-')
        .trim_matches(|c| c == '\'' || c == '"')
        .trim();
    lines
        .map(str::trim)
        .take_while(|l| *l != delimiter)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

fn check_commit_message(args: &[String]) -> Option<Verdict> {
    let message = commit_message(args)?;
    let subject = commit_subject(&message);
    if conventional_commit_re().is_match(subject) {
        return None;
    }
    Some(Verdict::Warn(format!(
        "⚠️ Git Hygiene: commit message \"{}\" does not follow the Conventional Commits format `type(scope): description`. Allowed types: {}.",
        subject,
        CONVENTIONAL_TYPES.join(", ")
    )))
}

/// First secret found on an added line of a unified diff.
pub fn find_secret(diff: &str) -> Option<&'static str> {
    let added: String = diff
        .lines()
        .filter(|l| l.starts_with('+') && !l.starts_with("+++"))
        .map(|l| &l[1..])
        .collect::<Vec<_>>()
        .join("\n");
    secret_patterns()
        .iter()
        .find(|(_, re)| re.is_match(&added))
        .map(|(label, _)| *label)
}

/// PreToolUse on Bash: protected branches, force pushes, staged secrets,
/// and commit message convention.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if input.tool() != "Bash" {
        return Ok(Verdict::Allow);
    }
    let Some(command) = input.command() else {
        return Ok(Verdict::Allow);
    };

    let mut warning: Option<Verdict> = None;
    for inv in git_invocations(command) {
        match inv.subcommand.as_str() {
            "push" => {
                if let Some(deny) = check_push(&inv.args, &ctx.config.settings.protected_branches) {
                    return Ok(deny);
                }
            }
            "commit" => {
                match ctx.git.staged_diff() {
                    Ok(diff) => {
                        if let Some(label) = find_secret(&diff) {
                            return Ok(Verdict::Deny(format!(
                                "{} staged changes contain a secret ({}). Remove it from the diff and rotate the credential before committing.",
                                PREFIX, label
                            )));
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "staged diff unavailable"),
                }
                if warning.is_none() {
                    warning = check_commit_message(&inv.args);
                }
            }
            _ => {}
        }
    }
    Ok(warning.unwrap_or(Verdict::Allow))
}
