//! Memory-tree rules shared by the freshness, quality-gate and pruning guards.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;

use super::patterns::last_updated_re;

/// Bookkeeping files exempt from freshness and line-limit checks.
pub const OPERATIONAL_FILES: &[&str] = &[
    "index.md",
    "lifecycle.md",
    "quality_guidance.md",
    "README.md",
    "sync_log.md",
    ".gitkeep",
];

/// Context files that carry no frontmatter.
pub const CONTEXT_SKIP_FILES: &[&str] = &["index.md", "cross_domain.md", "loading_protocol.md"];

pub const FRESH_MAX_DAYS: i64 = 30;
pub const STALE_MIN_DAYS: i64 = 90;

pub const HEADER_LINES: usize = 5;

/// Directories never descended into when searching for memory files.
const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target", ".forge", ".venv", "venv"];

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

fn file_name(path: &str) -> &str {
    segments(path).last().copied().unwrap_or("")
}

/// True when `path` is a `.md` file somewhere below a `dir` segment.
fn is_under_segment(path: &str, dir: &str) -> bool {
    let segs = segments(path);
    match segs.split_last() {
        Some((last, parents)) => last.ends_with(".md") && parents.contains(&dir),
        None => false,
    }
}

pub fn is_memory_path(path: &str) -> bool {
    is_under_segment(path, "memory")
}

pub fn is_context_path(path: &str) -> bool {
    is_under_segment(path, "context")
}

pub fn is_operational(path: &str) -> bool {
    OPERATIONAL_FILES.contains(&file_name(path))
}

/// A memory file subject to freshness and line-limit rules.
pub fn is_managed_memory(path: &str) -> bool {
    is_memory_path(path) && !is_operational(path)
}

pub fn is_context_skip(path: &str) -> bool {
    CONTEXT_SKIP_FILES.contains(&file_name(path))
}

/// Line budget by file type.
pub fn line_budget(path: &str) -> usize {
    match file_name(path) {
        "project_overview.md" => 200,
        "review_history.md" => 300,
        _ => 500,
    }
}

/// Parse the line-1 timestamp. Any other form, or an impossible date,
/// counts as missing.
pub fn parse_timestamp(content: &str) -> Option<NaiveDate> {
    let first = content.trim_start_matches('\u{feff}').lines().next()?;
    let caps = last_updated_re().captures(first.trim_end())?;
    NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()
}

pub fn timestamp_line(date: NaiveDate) -> String {
    format!("<!-- Last Updated: {} -->", date.format("%Y-%m-%d"))
}

fn has_timestamp_line(line: &str) -> bool {
    last_updated_re().is_match(line.trim_end())
}

/// Set line 1 to today's timestamp, replacing an existing marker or
/// inserting a new one.
pub fn refresh_timestamp(content: &str, today: NaiveDate) -> String {
    let stamp = timestamp_line(today);
    let body = content.trim_start_matches('\u{feff}');
    match body.split_once('\n') {
        Some((first, rest)) if has_timestamp_line(first) => format!("{}\n{}", stamp, rest),
        None if has_timestamp_line(body) => stamp,
        _ => format!("{}\n{}", stamp, body),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Aging(i64),
    Stale(i64),
}

/// Band an age in days. Negative ages (future dates) are fresh.
pub fn classify(age_days: i64) -> Freshness {
    if age_days <= FRESH_MAX_DAYS {
        Freshness::Fresh
    } else if age_days < STALE_MIN_DAYS {
        Freshness::Aging(age_days)
    } else {
        Freshness::Stale(age_days)
    }
}

pub fn age_days(updated: NaiveDate, today: NaiveDate) -> i64 {
    (today - updated).num_days()
}

pub fn pruning_marker(removed: usize, today: NaiveDate) -> String {
    format!(
        "<!-- Pruned: {} lines removed on {} -->",
        removed,
        today.format("%Y-%m-%d")
    )
}

/// Truncate `content` to `budget` lines: the first five lines (timestamp
/// refreshed), a marker, then the most recent `budget - 6` lines.
/// Returns `None` when the content is already within budget.
pub fn prune(content: &str, budget: usize, today: NaiveDate) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= budget || budget <= HEADER_LINES + 1 {
        return None;
    }

    let tail_len = budget - HEADER_LINES - 1;
    let removed = lines.len() - HEADER_LINES - tail_len;

    let mut out: Vec<String> = Vec::with_capacity(budget);
    for (i, line) in lines[..HEADER_LINES].iter().enumerate() {
        if i == 0 && has_timestamp_line(line) {
            out.push(timestamp_line(today));
        } else {
            out.push((*line).to_string());
        }
    }
    out.push(pruning_marker(removed, today));
    out.extend(lines[lines.len() - tail_len..].iter().map(|l| l.to_string()));

    let mut pruned = out.join("\n");
    if content.ends_with('\n') {
        pruned.push('\n');
    }
    Some(pruned)
}

/// Resolve a possibly-relative tool path against the project root,
/// collapsing `.` and `..` lexically.
pub fn resolve(root: &Path, path: &str) -> PathBuf {
    let raw = Path::new(path);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        root.join(raw)
    };

    let mut out = PathBuf::new();
    for comp in joined.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Every managed memory file under `root`.
pub fn find_memory_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(root, &mut found);
    found.sort();
    found
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(ft) = entry.file_type() else { continue };
        if ft.is_dir() {
            let name = entry.file_name();
            if !SKIP_DIRS.iter().any(|s| name == *s) {
                walk(&path, found);
            }
        } else if ft.is_file() && is_managed_memory(&path.to_string_lossy()) {
            found.push(path);
        }
    }
}

/// Memory files modified within `window`.
pub fn recently_modified(files: &[PathBuf], window: Duration) -> Vec<PathBuf> {
    let now = SystemTime::now();
    files
        .iter()
        .filter(|p| {
            fs::metadata(p)
                .and_then(|m| m.modified())
                .ok()
                .map(|t| now.duration_since(t).unwrap_or_default())
                .is_some_and(|age| age <= window)
        })
        .cloned()
        .collect()
}
