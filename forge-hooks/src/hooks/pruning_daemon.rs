//! End-of-session truncation of oversized memory files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::memory::{
    find_memory_files, is_managed_memory, line_budget, prune, recently_modified, resolve,
};
use super::registry::GuardContext;
use super::transcript;
use super::types::{HookInput, Verdict};
use crate::error::Result;
use crate::state::atomic_io::atomic_write;

/// Files to check this session. Transcript mentions win; without a
/// transcript, anything modified inside the recent window.
pub fn candidates(ctx: &GuardContext, input: &HookInput) -> Vec<PathBuf> {
    let root = ctx.root();
    let mentions = transcript::read(input.transcript_path())
        .map(|text| transcript::memory_files(&text))
        .unwrap_or_default();

    if mentions.is_empty() {
        let window = Duration::from_secs(ctx.config.settings.recent_window_minutes * 60);
        return recently_modified(&find_memory_files(root), window);
    }

    let known = find_memory_files(root);
    let mut out: Vec<PathBuf> = Vec::new();
    for mention in mentions {
        if !is_managed_memory(&mention) {
            continue;
        }
        let direct = resolve(root, &mention);
        let path = if direct.is_file() {
            Some(direct)
        } else {
            // Transcripts often name paths relative to a plugin subdirectory.
            known.iter().find(|p| p.ends_with(Path::new(&mention))).cloned()
        };
        if let Some(p) = path
            && !out.contains(&p)
        {
            out.push(p);
        }
    }
    out
}

/// Prune one file in place. Returns lines removed, or 0 when untouched.
pub fn prune_file(path: &Path, today: chrono::NaiveDate) -> Result<usize> {
    let display = path.to_string_lossy();
    if !is_managed_memory(&display) {
        return Ok(0);
    }
    let content = fs::read_to_string(path)?;
    let budget = line_budget(&display);
    let Some(pruned) = prune(&content, budget, today) else {
        return Ok(0);
    };
    let removed = content.lines().count().saturating_sub(budget - 1);
    atomic_write(path, pruned.as_bytes())?;
    Ok(removed)
}

/// SessionEnd: trim every selected memory file to its line budget. Silent.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if !ctx.anchored {
        tracing::debug!("no event cwd, skipping memory pruning");
        return Ok(Verdict::Allow);
    }

    for path in candidates(ctx, input) {
        match prune_file(&path, ctx.today) {
            Ok(0) => {}
            Ok(removed) => {
                tracing::debug!(path = %path.display(), removed, "pruned memory file");
                ctx.health.append(&format!(
                    "Pruned {} lines from {}",
                    removed,
                    path.strip_prefix(ctx.root()).unwrap_or(&path).display()
                ))?;
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "pruning failed"),
        }
    }
    Ok(Verdict::Allow)
}
