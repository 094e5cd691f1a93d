use std::fs;
use std::io::ErrorKind;

use super::memory::{is_managed_memory, line_budget, refresh_timestamp, resolve};
use super::patterns::{ABSOLUTE_PATH_MARKERS, VAGUE_LINE_THRESHOLD, VAGUE_PHRASES};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;
use crate::state::atomic_io::atomic_write;

/// Lines containing at least one vague phrase.
pub fn vague_lines(content: &str) -> usize {
    content
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            VAGUE_PHRASES.iter().any(|p| lower.contains(p))
        })
        .count()
}

/// Quality findings for a memory file's content, without side effects.
pub fn findings(path: &str, content: &str) -> Vec<String> {
    let mut out = Vec::new();

    let budget = line_budget(path);
    let lines = content.lines().count();
    if lines > budget {
        out.push(format!(
            "{} lines exceeds the {}-line limit for this memory file; condense older entries (the pruning pass trims it at session end).",
            lines, budget
        ));
    }

    let vague = vague_lines(content);
    if vague >= VAGUE_LINE_THRESHOLD {
        out.push(format!(
            "{} lines use vague phrasing (\"some\", \"various\", \"stuff\", ...). Replace generic entries with specific names, versions and paths.",
            vague
        ));
    }

    if let Some(marker) = ABSOLUTE_PATH_MARKERS.iter().find(|m| content.contains(*m)) {
        out.push(format!(
            "absolute filesystem path ({}...) found. Store project-relative paths so memory stays portable.",
            marker
        ));
    }
    out
}

/// PostToolUse on Write/Edit of a memory file: keep the timestamp current
/// and report quality issues. Never denies.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if !matches!(input.tool(), "Write" | "Edit" | "MultiEdit") {
        return Ok(Verdict::Allow);
    }
    let Some(path) = input.file_path() else {
        return Ok(Verdict::Allow);
    };
    if !is_managed_memory(path) {
        return Ok(Verdict::Allow);
    }

    let full = resolve(ctx.root(), path);
    let content = match fs::read_to_string(&full) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Verdict::Allow),
        Err(e) => return Err(e.into()),
    };

    let refreshed = refresh_timestamp(&content, ctx.today);
    if refreshed != content {
        atomic_write(&full, refreshed.as_bytes())?;
    }

    // Measured as written; the injected timestamp does not count.
    let issues = findings(path, &content);
    if issues.is_empty() {
        return Ok(Verdict::Allow);
    }
    Ok(Verdict::Warn(format!(
        "📝 Memory Quality: {}\n- {}",
        path,
        issues.join("\n- ")
    )))
}
