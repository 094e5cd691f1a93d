//! PostToolUse: share critical skill findings with the whole project.
//!
//! Sections headed Critical, Security, Breaking or Performance in
//! `memory/skills/<skill>/<project>/*.md` are copied into
//! `memory/projects/<project>/cross_skill_insights.md` so other skills see
//! them on their next memory load.

use std::fs;
use std::io::ErrorKind;

use chrono::NaiveDate;

use super::memory::{refresh_timestamp, resolve, timestamp_line};
use super::patterns::{INSIGHT_CATEGORIES, markdown_heading_re};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;
use crate::state::atomic_io::atomic_write;

pub const INSIGHTS_FILE: &str = "cross_skill_insights.md";

const SKILL_MEMORY: &str = "memory/skills/";

/// Location of a skill memory file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillMemoryPath<'a> {
    /// Everything before `memory/`, kept so the insights file lands in the
    /// same memory tree.
    pub prefix: &'a str,
    pub skill: &'a str,
    pub project: &'a str,
}

impl SkillMemoryPath<'_> {
    pub fn insights_path(&self) -> String {
        format!("{}memory/projects/{}/{}", self.prefix, self.project, INSIGHTS_FILE)
    }
}

/// `.../memory/skills/<skill>/<project>/<file>.md`; shallower paths are
/// not project-scoped and yield `None`.
pub fn parse_skill_memory_path(path: &str) -> Option<SkillMemoryPath<'_>> {
    let idx = path
        .match_indices(SKILL_MEMORY)
        .map(|(i, _)| i)
        .find(|&i| i == 0 || path[..i].ends_with('/'))?;
    let parts: Vec<&str> = path[idx + SKILL_MEMORY.len()..].split('/').collect();
    if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    if !parts.last()?.ends_with(".md") {
        return None;
    }
    Some(SkillMemoryPath {
        prefix: &path[..idx],
        skill: parts[0],
        project: parts[1],
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub category: &'static str,
    pub body: String,
}

fn category(title: &str) -> Option<&'static str> {
    let lower = title.trim().to_lowercase();
    INSIGHT_CATEGORIES
        .iter()
        .find(|c| lower.starts_with(&c.to_lowercase()))
        .copied()
}

/// Non-empty sections under level-2+ Critical/Security/Breaking/Performance
/// headings. Deeper headings stay inside their section.
pub fn insights(content: &str) -> Vec<Insight> {
    let mut out = Vec::new();
    let mut current: Option<(&'static str, usize, Vec<&str>)> = None;

    fn flush(current: &mut Option<(&'static str, usize, Vec<&str>)>, out: &mut Vec<Insight>) {
        if let Some((category, _, lines)) = current.take() {
            let body = lines.join("\n").trim().to_string();
            if !body.is_empty() {
                out.push(Insight { category, body });
            }
        }
    }

    for line in content.lines() {
        if let Some(caps) = markdown_heading_re().captures(line) {
            let level = caps[1].len();
            let nested = current.as_ref().is_some_and(|(_, lvl, _)| level > *lvl);
            if !nested {
                flush(&mut current, &mut out);
                current = if level >= 2 {
                    category(&caps[2]).map(|c| (c, level, Vec::new()))
                } else {
                    None
                };
                continue;
            }
        }
        if let Some((_, _, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    flush(&mut current, &mut out);
    out
}

/// Append insights not already present. Returns the new file content and
/// the number of entries added, or `None` when nothing is new.
pub fn merge(
    existing: Option<&str>,
    target: &SkillMemoryPath,
    found: &[Insight],
    today: NaiveDate,
) -> Option<(String, usize)> {
    let mut content = match existing {
        Some(text) => text.to_string(),
        None => format!(
            "{}\n# Cross-Skill Insights: {}\n\nCritical findings shared between skills.\n",
            timestamp_line(today),
            target.project
        ),
    };

    let mut added = 0;
    for insight in found {
        if content.contains(&insight.body) {
            continue;
        }
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&format!(
            "\n## {} (from {}, {})\n\n{}\n",
            insight.category, target.skill, today, insight.body
        ));
        added += 1;
    }

    (added > 0).then(|| (refresh_timestamp(&content, today), added))
}

/// PostToolUse on Write/Edit of a skill memory file. Never denies.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if !matches!(input.tool(), "Write" | "Edit" | "MultiEdit") {
        return Ok(Verdict::Allow);
    }
    let Some(path) = input.file_path() else {
        return Ok(Verdict::Allow);
    };
    let Some(location) = parse_skill_memory_path(path) else {
        return Ok(Verdict::Allow);
    };

    let content = match fs::read_to_string(resolve(ctx.root(), path)) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Verdict::Allow),
        Err(e) => return Err(e.into()),
    };
    let found = insights(&content);
    if found.is_empty() {
        return Ok(Verdict::Allow);
    }

    let target = resolve(ctx.root(), &location.insights_path());
    let existing = fs::read_to_string(&target).ok();
    let Some((merged, added)) = merge(existing.as_deref(), &location, &found, ctx.today) else {
        return Ok(Verdict::Allow);
    };
    atomic_write(&target, merged.as_bytes())?;
    tracing::debug!(skill = location.skill, project = location.project, added, "insights shared");

    ctx.health.append(&format!(
        "🔗 Shared {} insight(s) from {} with memory/projects/{}/{}",
        added, location.skill, location.project, INSIGHTS_FILE
    ))?;
    Ok(Verdict::Allow)
}
