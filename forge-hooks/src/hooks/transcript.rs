use std::collections::BTreeMap;
use std::fs;

use super::patterns::{
    context_mention_re, memory_mention_re, skill_mention_re, slash_command_re, tool_name_re,
};

/// Read the transcript named by the event. Missing, empty or unreadable
/// transcripts all resolve to `None`.
pub fn read(path: Option<&str>) -> Option<String> {
    let path = path?;
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::debug!(path, error = %e, "transcript unavailable");
            None
        }
    }
}

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !out.iter().any(|v| v == value) {
        out.push(value.to_string());
    }
}

/// Context-file mentions, first occurrence order, deduplicated.
pub fn context_files(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for m in context_mention_re().find_iter(text) {
        push_unique(&mut out, m.as_str());
    }
    out
}

/// Memory-file mentions, deduplicated.
pub fn memory_files(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for m in memory_mention_re().find_iter(text) {
        push_unique(&mut out, m.as_str());
    }
    out
}

/// Total memory-file mentions, duplicates included.
pub fn memory_operations(text: &str) -> usize {
    memory_mention_re().find_iter(text).count()
}

/// Skill names from `skills/<name>/SKILL.md` reads.
pub fn skills(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for caps in skill_mention_re().captures_iter(text) {
        push_unique(&mut out, &caps[1]);
    }
    out
}

/// Slash commands issued at the start of a line. Absolute paths such as
/// `/home/...` are not commands.
pub fn slash_commands(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for caps in slash_command_re().captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        if text[m.end()..].starts_with('/') {
            continue;
        }
        out.push(m.as_str().to_string());
    }
    out
}

/// Tool-call counts keyed by lowercased tool name.
pub fn tool_counts(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for caps in tool_name_re().captures_iter(text) {
        *counts.entry(caps[1].to_lowercase()).or_insert(0) += 1;
    }
    counts
}
