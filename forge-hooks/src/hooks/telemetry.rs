use std::fs::{self, OpenOptions};
use std::io::Write;

use chrono::Utc;

use super::registry::GuardContext;
use super::transcript;
use super::types::{HookInput, Verdict};
use crate::error::Result;

/// Per-session counters pulled from a transcript.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    pub tools: Vec<(String, usize)>,
    pub skills: Vec<String>,
    pub memory_ops: usize,
    pub context_loads: usize,
    pub commands: Vec<String>,
}

impl SessionMetrics {
    pub fn from_transcript(text: &str) -> Self {
        Self {
            tools: transcript::tool_counts(text).into_iter().collect(),
            skills: transcript::skills(text),
            memory_ops: transcript::memory_operations(text),
            context_loads: transcript::context_files(text).len(),
            commands: transcript::slash_commands(text),
        }
    }

    pub fn tool_calls(&self) -> usize {
        self.tools.iter().map(|(_, n)| n).sum()
    }

    fn tools_line(&self) -> String {
        self.tools
            .iter()
            .map(|(name, n)| format!("{}:{}", name, n))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One log block, terminated by a blank line.
    pub fn render(&self, timestamp: &str, session: &str) -> String {
        format!(
            "timestamp: {}\nsession: {}\ntools: {}\nskills: {}\nmemory: {}\ncontext: {}\ncommands: {}\n\n",
            timestamp,
            session,
            self.tools_line(),
            self.skills.join(","),
            self.memory_ops,
            self.context_loads,
            self.commands.join(","),
        )
    }
}

/// Append one block to `.forge/telemetry.log`.
pub fn append_log(ctx: &GuardContext, block: &str) -> Result<()> {
    let path = ctx.config.telemetry_log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(block.as_bytes())?;
    Ok(())
}

/// UTC timestamp used in telemetry blocks.
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Stop: append a metrics block for the session. Silent on stdout.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if input.is_stop_hook_active() {
        return Ok(Verdict::Allow);
    }
    let Some(text) = transcript::read(input.transcript_path()) else {
        return Ok(Verdict::Allow);
    };

    let metrics = SessionMetrics::from_transcript(&text);
    let session = input.session_id().unwrap_or("unknown");
    let timestamp = timestamp();

    append_log(ctx, &metrics.render(&timestamp, session))?;

    ctx.health.append(&format!(
        "📊 Telemetry: session {} used {} tool call(s), {} skill(s), {} memory op(s), {} context load(s)",
        session,
        metrics.tool_calls(),
        metrics.skills.len(),
        metrics.memory_ops,
        metrics.context_loads
    ))?;
    Ok(Verdict::Allow)
}
