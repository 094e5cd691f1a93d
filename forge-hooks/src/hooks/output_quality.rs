//! PostToolUse: score generated `claudedocs/` reports.
//!
//! Four criteria, 100 points: completeness 30, actionability 30,
//! formatting 25, naming 15. The score is appended to the report as an
//! HTML comment block and replaced on every rescore.

use std::fs;
use std::io::ErrorKind;

use chrono::NaiveDate;

use super::memory::resolve;
use super::patterns::{kebab_case_md_re, list_item_re, markdown_heading_re};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;
use crate::state::atomic_io::atomic_write;

pub const QUALITY_MARKER: &str = "<!-- forge:quality";

/// Reports at or above this score get no improvement hints.
const HINT_BELOW: u32 = 80;

const SUMMARY_WORDS: &[&str] = &["summary", "overview", "executive"];
const FINDINGS_WORDS: &[&str] = &["finding", "analysis", "result", "issue", "detail"];
const ACTION_WORDS: &[&str] = &["action", "recommendation", "next step", "todo"];
const DIRECTIVE_WORDS: &[&str] = &["recommend", "should", "must", "[ ]"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QualityScore {
    pub completeness: u32,
    pub actionability: u32,
    pub formatting: u32,
    pub naming: u32,
}

impl QualityScore {
    pub fn total(&self) -> u32 {
        self.completeness + self.actionability + self.formatting + self.naming
    }

    pub fn grade(&self) -> char {
        match self.total() {
            90.. => 'A',
            80..=89 => 'B',
            70..=79 => 'C',
            60..=69 => 'D',
            _ => 'F',
        }
    }

    fn block(&self, today: NaiveDate) -> String {
        format!(
            "{}\nscore: {}/100\ngrade: {}\ncompleteness: {}/30\nactionability: {}/30\nformatting: {}/25\nnaming: {}/15\nscored: {}\n-->\n",
            QUALITY_MARKER,
            self.total(),
            self.grade(),
            self.completeness,
            self.actionability,
            self.formatting,
            self.naming,
            today
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub score: QualityScore,
    pub hints: Vec<&'static str>,
}

impl QualityReport {
    fn check(&mut self, passed: bool, points: u32, hint: &'static str) -> u32 {
        if passed {
            points
        } else {
            self.hints.push(hint);
            0
        }
    }
}

fn mentions_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Report content without a previously appended quality block.
pub fn strip_quality_block(content: &str) -> &str {
    match content.find(QUALITY_MARKER) {
        Some(i) => content[..i].trim_end(),
        None => content,
    }
}

/// Score a report. `file_name` is the bare file name.
pub fn score(file_name: &str, content: &str) -> QualityReport {
    // (level, lowercased title)
    let mut headings: Vec<(usize, String)> = Vec::new();
    let mut list_items = 0;
    let mut action_items = 0;
    let mut content_lines = 0;
    let mut in_action_section = false;
    let mut in_fence = false;

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || line.trim().is_empty() {
            continue;
        }
        content_lines += 1;
        if let Some(caps) = markdown_heading_re().captures(line) {
            let level = caps[1].len();
            let title = caps[2].to_lowercase();
            if level <= 2 {
                in_action_section = mentions_any(&title, ACTION_WORDS);
            }
            headings.push((level, title));
            continue;
        }
        if list_item_re().is_match(line) {
            list_items += 1;
            if in_action_section {
                action_items += 1;
            }
        }
    }

    let lower = content.to_lowercase();
    let has_heading = |words: &[&str]| headings.iter().any(|(_, t)| mentions_any(t, words));
    let first_is_title = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| markdown_heading_re().captures(l).is_some_and(|c| c[1].len() == 1));
    let sections = headings.iter().filter(|(level, _)| *level == 2).count();
    let no_skipped_levels = !headings.is_empty()
        && headings.windows(2).all(|w| w[1].0 <= w[0].0 + 1);

    let mut report = QualityReport::default();

    let completeness = report.check(has_heading(SUMMARY_WORDS), 10, "Add a Summary section.")
        + report.check(has_heading(FINDINGS_WORDS), 10, "Add a Findings section.")
        + match content_lines {
            15.. => 10,
            5..=14 => 5,
            _ => {
                report.hints.push("Expand the report; it is too short to stand alone.");
                0
            }
        };

    let actionability = report.check(
        has_heading(ACTION_WORDS),
        10,
        "Add an Action Items or Recommendations section.",
    ) + match action_items {
        3.. => 10,
        1..=2 => 5,
        _ => {
            report.hints.push("List concrete action items under the actions section.");
            0
        }
    } + report.check(
        mentions_any(&lower, DIRECTIVE_WORDS),
        10,
        "State recommendations explicitly (\"Recommendation: ...\").",
    );

    let formatting = report.check(first_is_title, 5, "Open with a `# Title` heading.")
        + report.check(sections >= 2, 5, "Split the report into `##` sections.")
        + report.check(list_items > 0, 5, "Use lists for findings and steps.")
        + report.check(
            content.contains("**") || content.contains('`'),
            5,
            "Highlight key terms with bold or code spans.",
        )
        + report.check(no_skipped_levels, 5, "Keep heading levels sequential.");

    let naming = report.check(
        kebab_case_md_re().is_match(file_name),
        10,
        "Name reports in kebab-case, e.g. `analysis-my-project.md`.",
    ) + report.check(
        file_name.contains('-'),
        5,
        "Use a descriptive `<type>-<subject>.md` file name.",
    );

    report.score = QualityScore {
        completeness,
        actionability,
        formatting,
        naming,
    };
    report
}

/// A scored report under `claudedocs/`, excluding `manifest.md` and
/// `claudedocs/archive/`.
pub fn is_scored_output(path: &str) -> bool {
    let segments: Vec<&str> = path.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
    let Some((name, parents)) = segments.split_last() else {
        return false;
    };
    let Some(docs) = parents.iter().rposition(|s| *s == "claudedocs") else {
        return false;
    };
    name.ends_with(".md") && *name != "manifest.md" && !parents[docs + 1..].contains(&"archive")
}

/// PostToolUse on Write/Edit of a report: score it, record the score in
/// the file, and report the grade. Never denies.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if !matches!(input.tool(), "Write" | "Edit" | "MultiEdit") {
        return Ok(Verdict::Allow);
    }
    let Some(path) = input.file_path() else {
        return Ok(Verdict::Allow);
    };
    if !is_scored_output(path) {
        return Ok(Verdict::Allow);
    }

    let full = resolve(ctx.root(), path);
    let content = match fs::read_to_string(&full) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Verdict::Allow),
        Err(e) => return Err(e.into()),
    };

    let body = strip_quality_block(&content);
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let report = score(file_name, body);
    let s = report.score;

    let updated = format!("{}\n\n{}", body.trim_end(), s.block(ctx.today));
    if updated != content {
        atomic_write(&full, updated.as_bytes())?;
    }

    let mut message = format!(
        "📝 Output Quality: {} scored {}/100 (grade {}). Completeness {}/30, actionability {}/30, formatting {}/25, naming {}/15.",
        path,
        s.total(),
        s.grade(),
        s.completeness,
        s.actionability,
        s.formatting,
        s.naming
    );
    if s.total() < HINT_BELOW {
        for hint in &report.hints {
            message.push_str("\n- ");
            message.push_str(hint);
        }
    }
    Ok(Verdict::Warn(message))
}
