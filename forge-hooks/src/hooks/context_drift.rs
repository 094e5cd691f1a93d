//! PostToolUse: framework drift after a dependency file changes.
//!
//! Rules come from `context/framework_conflicts.json`:
//!
//! ```json
//! {"conflicts": [{"name": "python-web", "frameworks": ["django", "flask", "fastapi"],
//!                 "note": "Pick one web framework per service."}]}
//! ```
//!
//! A dependency file drifts when it declares two frameworks of one group,
//! or when the session loaded context for a framework of a group while the
//! file now declares a different one.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::memory::resolve;
use super::patterns::dependency_token_re;
use super::registry::GuardContext;
use super::transcript;
use super::types::{HookInput, Verdict};
use crate::error::Result;

pub const CONFLICTS_FILE: &str = "framework_conflicts.json";

const DEPENDENCY_FILES: &[&str] = &[
    "package.json",
    "pyproject.toml",
    "Pipfile",
    "setup.py",
    "setup.cfg",
    "go.mod",
    "Cargo.toml",
    "Gemfile",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "composer.json",
];

const PACKAGE_JSON_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConflictRules {
    pub conflicts: Vec<ConflictGroup>,
}

/// Frameworks that should not be used side by side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConflictGroup {
    pub name: String,
    pub frameworks: Vec<String>,
    pub note: Option<String>,
}

pub fn is_dependency_file(name: &str) -> bool {
    DEPENDENCY_FILES.contains(&name)
        || (name.starts_with("requirements") && name.ends_with(".txt"))
        || name.ends_with(".csproj")
}

fn conflicts_path(ctx: &GuardContext) -> Option<PathBuf> {
    [
        ctx.config.plugin_root.join("context"),
        ctx.root().join("forge-plugin").join("context"),
        ctx.root().join("context"),
    ]
    .into_iter()
    .map(|dir| dir.join(CONFLICTS_FILE))
    .find(|p| p.is_file())
}

fn load_rules(path: &Path) -> Option<ConflictRules> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(rules) => Some(rules),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed framework conflicts");
            None
        }
    }
}

fn tokens(content: &str) -> BTreeSet<String> {
    dependency_token_re()
        .find_iter(content)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Lowercased dependency names declared by a dependency file. Formats
/// without a dedicated reader yield every identifier-like token.
pub fn declared_dependencies(file_name: &str, content: &str) -> BTreeSet<String> {
    if file_name == "package.json" {
        if let Ok(doc) = serde_json::from_str::<serde_json::Value>(content) {
            return PACKAGE_JSON_SECTIONS
                .iter()
                .filter_map(|section| doc.get(section)?.as_object())
                .flat_map(|deps| deps.keys().map(|k| k.to_lowercase()))
                .collect();
        }
        return tokens(content);
    }
    if file_name.starts_with("requirements") {
        return content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('-'))
            .filter_map(|l| l.split(['=', '<', '>', '!', '~', '[', ';', '@', ' ']).next())
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
    }
    tokens(content)
}

/// True when a context path names `framework` as its file stem or a
/// directory, e.g. `context/python/flask.md`.
fn context_covers(path: &str, framework: &str) -> bool {
    path.split('/')
        .map(|seg| seg.trim_end_matches(".md").to_lowercase())
        .any(|seg| seg == framework)
}

/// Drift findings for one dependency file.
pub fn drift_findings(
    file_name: &str,
    declared: &BTreeSet<String>,
    rules: &ConflictRules,
    loaded_context: &[String],
) -> Vec<String> {
    let mut out = Vec::new();
    for group in &rules.conflicts {
        let frameworks: Vec<String> = group.frameworks.iter().map(|f| f.to_lowercase()).collect();
        let in_use: Vec<&String> = frameworks.iter().filter(|f| declared.contains(*f)).collect();
        if in_use.is_empty() {
            continue;
        }

        if in_use.len() > 1 {
            let mut line = format!(
                "{} declares conflicting {} frameworks: {}.",
                file_name,
                group.name,
                join(&in_use)
            );
            if let Some(note) = &group.note {
                line.push(' ');
                line.push_str(note);
            }
            out.push(line);
        }

        for fw in frameworks.iter().filter(|f| !in_use.contains(f)) {
            if let Some(ctx_path) = loaded_context.iter().find(|p| context_covers(p, fw)) {
                out.push(format!(
                    "context for {} ({}) is loaded, but {} now declares {}. Load the matching context before continuing.",
                    fw,
                    ctx_path,
                    file_name,
                    join(&in_use)
                ));
            }
        }
    }
    out
}

fn join(items: &[&String]) -> String {
    items.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

/// PostToolUse on Write/Edit of a dependency file. Advisory only.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if !matches!(input.tool(), "Write" | "Edit" | "MultiEdit") {
        return Ok(Verdict::Allow);
    }
    let Some(path) = input.file_path() else {
        return Ok(Verdict::Allow);
    };
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    if !is_dependency_file(file_name) {
        return Ok(Verdict::Allow);
    }

    let Some(rules) = conflicts_path(ctx).and_then(|p| load_rules(&p)) else {
        tracing::debug!("no framework conflict rules, drift check skipped");
        return Ok(Verdict::Allow);
    };
    let content = match fs::read_to_string(resolve(ctx.root(), path)) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Verdict::Allow),
        Err(e) => return Err(e.into()),
    };

    let declared = declared_dependencies(file_name, &content);
    let loaded = transcript::read(input.transcript_path())
        .map(|text| transcript::context_files(&text))
        .unwrap_or_default();

    let findings = drift_findings(file_name, &declared, &rules, &loaded);
    if findings.is_empty() {
        return Ok(Verdict::Allow);
    }
    Ok(Verdict::Warn(format!(
        "🧭 Context Drift: {}\n- {}",
        path,
        findings.join("\n- ")
    )))
}
