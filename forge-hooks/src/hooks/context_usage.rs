//! PreCompact: which loaded context files the session actually used.

use std::fs;
use std::path::PathBuf;

use serde_yaml::Value;

use super::frontmatter_validator::extract_frontmatter;
use super::memory::resolve;
use super::registry::GuardContext;
use super::telemetry;
use super::transcript;
use super::types::{HookInput, Verdict};
use crate::error::Result;

/// Token estimate for a context file that cannot be found.
pub const DEFAULT_CONTEXT_TOKENS: u64 = 500;

/// A file whose topic is mentioned at least this often (the load included)
/// counts as used.
const ACTIVE_MENTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUse {
    pub path: String,
    pub mentions: usize,
    pub tokens: u64,
}

impl ContextUse {
    pub fn is_active(&self) -> bool {
        self.mentions >= ACTIVE_MENTIONS
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UsageReport {
    pub files: Vec<ContextUse>,
}

impl UsageReport {
    pub fn active(&self) -> impl Iterator<Item = &ContextUse> {
        self.files.iter().filter(|f| f.is_active())
    }

    pub fn unused(&self) -> impl Iterator<Item = &ContextUse> {
        self.files.iter().filter(|f| !f.is_active())
    }

    /// Share of loaded files that were used, in percent.
    pub fn utilization(&self) -> usize {
        if self.files.is_empty() {
            return 0;
        }
        self.active().count() * 100 / self.files.len()
    }

    pub fn wasted_tokens(&self) -> u64 {
        self.unused().map(|f| f.tokens).sum()
    }

    fn telemetry_block(&self, timestamp: &str, trigger: &str) -> String {
        format!(
            "timestamp: {}\nevent: context_usage_report\ntrigger: {}\nloaded: {}\nactive: {}\nunused: {}\nutilization: {}%\nwasted_tokens: {}\n\n",
            timestamp,
            trigger,
            self.files.len(),
            self.active().count(),
            self.unused().count(),
            self.utilization(),
            self.wasted_tokens(),
        )
    }

    fn message(&self, trigger: &str) -> String {
        let mut lines = vec![format!(
            "📊 Context Usage before {} compaction: {} of {} loaded context file(s) used ({}% utilization).",
            trigger,
            self.active().count(),
            self.files.len(),
            self.utilization()
        )];
        for f in self.active() {
            lines.push(format!("✅ Active: {} ({} mentions)", f.path, f.mentions));
        }
        for f in self.unused() {
            lines.push(format!("❌ Unused: {} (~{} tokens)", f.path, f.tokens));
        }
        let wasted = self.wasted_tokens();
        if wasted > 0 {
            lines.push(format!(
                "Estimated wasted tokens: {}. Load these files on demand instead of up front.",
                wasted
            ));
        }
        lines.join("\n")
    }
}

/// Topic word of a context file: `context/python/frameworks.md` → `frameworks`.
fn topic(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.trim_end_matches(".md").to_lowercase()
}

/// Case-insensitive mentions of a file's topic; `best_practices` also
/// matches "best practices".
pub fn topic_mentions(transcript_lower: &str, path: &str) -> usize {
    let topic = topic(path);
    if topic.is_empty() {
        return 0;
    }
    let mut n = transcript_lower.matches(topic.as_str()).count();
    if topic.contains('_') {
        n += transcript_lower.matches(topic.replace('_', " ").as_str()).count();
    }
    n
}

/// `estimatedTokens` from a context file's frontmatter.
pub fn declared_tokens(content: &str) -> Option<u64> {
    let block = extract_frontmatter(content)?;
    let doc: Value = serde_yaml::from_str(&block).ok()?;
    doc.get("estimatedTokens")?.as_u64()
}

/// Places a transcript mention may point at: as written, then relative to
/// the plugin directory.
fn candidates(ctx: &GuardContext, mention: &str) -> Vec<PathBuf> {
    let rel = mention.find("context/").map_or(mention, |i| &mention[i..]);
    vec![
        resolve(ctx.root(), mention),
        ctx.config.plugin_root.join(rel),
        ctx.root().join("forge-plugin").join(rel),
    ]
}

fn estimate_tokens(ctx: &GuardContext, mention: &str) -> u64 {
    for path in candidates(ctx, mention) {
        let Ok(content) = fs::read_to_string(&path) else { continue };
        return declared_tokens(&content).unwrap_or(content.len() as u64 / 4);
    }
    DEFAULT_CONTEXT_TOKENS
}

pub fn analyze(ctx: &GuardContext, text: &str) -> UsageReport {
    let lower = text.to_lowercase();
    let files = transcript::context_files(text)
        .into_iter()
        .map(|path| ContextUse {
            mentions: topic_mentions(&lower, &path),
            tokens: estimate_tokens(ctx, &path),
            path,
        })
        .collect();
    UsageReport { files }
}

/// PreCompact: report active and unused context files, log the numbers to
/// telemetry. Never denies.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    let Some(text) = transcript::read(input.transcript_path()) else {
        return Ok(Verdict::Allow);
    };
    let report = analyze(ctx, &text);
    if report.files.is_empty() {
        return Ok(Verdict::Allow);
    }

    let trigger = input.trigger.as_deref().filter(|t| !t.is_empty()).unwrap_or("auto");
    telemetry::append_log(ctx, &report.telemetry_block(&telemetry::timestamp(), trigger))?;
    Ok(Verdict::Warn(report.message(trigger)))
}
