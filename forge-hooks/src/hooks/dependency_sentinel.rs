use std::fs;
use std::path::Path;

use super::command::{all_commands, program_name, program_words};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;

const PREFIX: &str = "🛡️ Dependency Sentinel:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    Pip,
    Npm,
}

/// Flags whose following word is a value, not a package.
const VALUE_FLAGS: &[&str] = &[
    "-r",
    "--requirement",
    "-c",
    "--constraint",
    "-e",
    "--editable",
    "-i",
    "--index-url",
    "--extra-index-url",
    "-f",
    "--find-links",
    "-t",
    "--target",
    "--prefix",
    "--root",
    "--platform",
    "--python-version",
    "--registry",
    "--cache",
    "--tag",
    "-w",
    "--workspace",
];

/// Options placed before the subcommand (`pip --proxy host install`)
/// whose following word is a value.
const GLOBAL_VALUE_FLAGS: &[&str] = &[
    "--log",
    "--log-file",
    "--proxy",
    "--cache-dir",
    "--python",
    "--timeout",
    "--retries",
    "--exists-action",
    "--trusted-host",
    "--cert",
    "--client-cert",
    "--use-feature",
    "--use-deprecated",
    "--keyring-provider",
    "--prefix",
    "--registry",
    "--cache",
    "--userconfig",
    "--loglevel",
    "--cwd",
    "-C",
    "--dir",
    "--filter",
];

/// Index of the first non-option word at or after `from`.
fn subcommand_index(words: &[String], from: usize) -> Option<usize> {
    let mut i = from;
    while let Some(w) = words.get(i) {
        if !w.starts_with('-') {
            return Some(i);
        }
        i += if GLOBAL_VALUE_FLAGS.contains(&w.as_str()) { 2 } else { 1 };
    }
    None
}

/// Arguments following `subcommand` when it is the first non-option word
/// at or after `from`.
fn args_after<'a>(words: &'a [String], from: usize, subcommands: &[&str]) -> Option<&'a [String]> {
    let i = subcommand_index(words, from)?;
    if subcommands.contains(&words[i].as_str()) {
        words.get(i + 1..)
    } else {
        None
    }
}

/// Deny-list entry. An entry without a prefix applies to every ecosystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyEntry {
    pub ecosystem: Option<Ecosystem>,
    pub name: String,
}

/// Parse `security/deny_list.txt`: one name per line, `#` comments,
/// optional `pip:`/`npm:` prefix, case-insensitive.
pub fn parse_deny_list(text: &str) -> Vec<DenyEntry> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            let lower = l.to_lowercase();
            if let Some(rest) = lower.strip_prefix("pip:") {
                DenyEntry { ecosystem: Some(Ecosystem::Pip), name: rest.trim().to_string() }
            } else if let Some(rest) = lower.strip_prefix("npm:") {
                DenyEntry { ecosystem: Some(Ecosystem::Npm), name: rest.trim().to_string() }
            } else {
                DenyEntry { ecosystem: None, name: lower }
            }
        })
        .filter(|e| !e.name.is_empty())
        .collect()
}

fn load_deny_list(path: &Path) -> Vec<DenyEntry> {
    match fs::read_to_string(path) {
        Ok(text) => parse_deny_list(&text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "deny list unreadable, skipping");
            Vec::new()
        }
    }
}

/// Package arguments of every install invocation in `command`.
pub fn install_targets(command: &str) -> Vec<(Ecosystem, String)> {
    let mut out = Vec::new();
    for words in all_commands(command) {
        let words = program_words(&words);
        let Some(first) = words.first() else { continue };
        let prog = program_name(first);

        let found = match prog {
            "pip" | "pip3" => args_after(words, 1, &["install"]).map(|a| (Ecosystem::Pip, a)),
            p if p == "python" || p.starts_with("python3") => {
                let Some(m) = words.iter().position(|w| w == "-m") else { continue };
                let is_pip = matches!(words.get(m + 1).map(String::as_str), Some("pip" | "pip3"));
                if is_pip {
                    args_after(words, m + 2, &["install"]).map(|a| (Ecosystem::Pip, a))
                } else {
                    None
                }
            }
            "npm" => args_after(words, 1, &["install", "i", "add"]).map(|a| (Ecosystem::Npm, a)),
            "yarn" | "pnpm" => args_after(words, 1, &["add"]).map(|a| (Ecosystem::Npm, a)),
            _ => None,
        };
        let Some((eco, args)) = found else { continue };

        let mut skip_next = false;
        for arg in args {
            if skip_next {
                skip_next = false;
                continue;
            }
            if arg.starts_with('-') {
                skip_next = VALUE_FLAGS.contains(&arg.as_str());
                continue;
            }
            let name = package_name(eco, arg);
            if !name.is_empty() {
                out.push((eco, name));
            }
        }
    }
    out
}

/// Strip version specifiers and extras, lowercase.
fn package_name(eco: Ecosystem, arg: &str) -> String {
    let name = match eco {
        Ecosystem::Pip => arg
            .split(['=', '<', '>', '!', '~', '[', ';', '@', ' '])
            .next()
            .unwrap_or(""),
        Ecosystem::Npm => {
            // `@scope/pkg@1.2` keeps its leading `@`.
            let (scope_at, rest) = match arg.strip_prefix('@') {
                Some(rest) => ("@", rest),
                None => ("", arg),
            };
            let base = rest.split('@').next().unwrap_or("");
            return format!("{}{}", scope_at, base).to_lowercase();
        }
    };
    name.trim().to_lowercase()
}

/// PreToolUse on Bash: deny installs of deny-listed packages.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if input.tool() != "Bash" {
        return Ok(Verdict::Allow);
    }
    let Some(command) = input.command() else {
        return Ok(Verdict::Allow);
    };

    let targets = install_targets(command);
    if targets.is_empty() {
        return Ok(Verdict::Allow);
    }

    let Some(path) = ctx.config.deny_list_path() else {
        tracing::debug!("no deny list found, dependency sentinel inactive");
        return Ok(Verdict::Allow);
    };
    let deny = load_deny_list(&path);

    for (eco, name) in &targets {
        let hit = deny
            .iter()
            .any(|e| e.name == *name && e.ecosystem.is_none_or(|x| x == *eco));
        if hit {
            return Ok(Verdict::Deny(format!(
                "{} package '{}' is on the deny list of known typosquatted or malicious packages. Install blocked; check the package name.",
                PREFIX, name
            )));
        }
    }
    Ok(Verdict::Allow)
}
