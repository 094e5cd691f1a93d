//! Stop: did each skill run follow the mandatory workflow?

use super::patterns::{
    claudedocs_mention_re, context_mention_re, memory_mention_re, skill_mention_re, write_tool_re,
};
use super::registry::GuardContext;
use super::transcript;
use super::types::{HookInput, Verdict};
use crate::error::Result;

/// The six workflow steps, in order.
pub const STEPS: [&str; 6] = [
    "Initial Analysis",
    "Load Memory",
    "Load Context",
    "Perform Analysis",
    "Generate Output",
    "Update Memory",
];

/// Transcript text belonging to each skill, in first-use order. A skill's
/// span runs from its `SKILL.md` read to the next other skill's read.
pub fn skill_segments(text: &str) -> Vec<(String, String)> {
    let starts: Vec<(usize, String)> = skill_mention_re()
        .captures_iter(text)
        .filter_map(|c| Some((c.get(0)?.start(), c.get(1)?.as_str().to_string())))
        .collect();

    let mut out: Vec<(String, String)> = Vec::new();
    let mut i = 0;
    while i < starts.len() {
        let (start, skill) = &starts[i];
        let mut j = i + 1;
        while j < starts.len() && starts[j].1 == *skill {
            j += 1;
        }
        let end = starts.get(j).map_or(text.len(), |(s, _)| *s);
        let span = &text[*start..end];
        match out.iter_mut().find(|(s, _)| s == skill) {
            Some((_, body)) => {
                body.push('\n');
                body.push_str(span);
            }
            None => out.push((skill.clone(), span.to_string())),
        }
        i = j;
    }
    out
}

/// Completion flags for `STEPS`, read from one skill's transcript span.
pub fn completed_steps(segment: &str) -> [bool; 6] {
    let mut load_memory = false;
    let mut load_context = false;
    let mut output = false;
    let mut update_memory = false;

    for line in segment.lines() {
        let writes = write_tool_re().is_match(line);
        if memory_mention_re().is_match(line) {
            if writes {
                update_memory = true;
            } else {
                load_memory = true;
            }
        }
        if context_mention_re().is_match(line) && !writes {
            load_context = true;
        }
        if claudedocs_mention_re().is_match(line) && writes {
            output = true;
        }
    }

    // The SKILL.md read opens the span; analysis shows up as its products.
    [true, load_memory, load_context, output || update_memory, output, update_memory]
}

pub fn missing_steps(segment: &str) -> Vec<String> {
    completed_steps(segment)
        .iter()
        .zip(STEPS.iter())
        .enumerate()
        .filter(|(_, (done, _))| !**done)
        .map(|(i, (_, name))| format!("{}. {}", i + 1, name))
        .collect()
}

/// Stop: warn about skills that skipped workflow steps. Never denies.
pub fn evaluate(_ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if input.is_stop_hook_active() {
        return Ok(Verdict::Allow);
    }
    let Some(text) = transcript::read(input.transcript_path()) else {
        return Ok(Verdict::Allow);
    };

    let notes: Vec<String> = skill_segments(&text)
        .into_iter()
        .filter_map(|(skill, segment)| {
            let missing = missing_steps(&segment);
            (!missing.is_empty()).then(|| {
                format!(
                    "/{} skipped {} of {} workflow steps: {}",
                    skill,
                    missing.len(),
                    STEPS.len(),
                    missing.join(", ")
                )
            })
        })
        .collect();

    if notes.is_empty() {
        return Ok(Verdict::Allow);
    }
    Ok(Verdict::Warn(format!(
        "🔍 Skill Compliance:\n- {}\nSkills load memory and context before analysis, write to claudedocs/, then update memory.",
        notes.join("\n- ")
    )))
}
