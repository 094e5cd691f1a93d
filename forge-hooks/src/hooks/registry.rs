use std::path::Path;

use chrono::NaiveDate;

use super::git::GitInspector;
use super::types::{HookEvent, HookInput, Verdict};
use super::{
    chain_context, context_drift, context_usage, cross_pollinator, dependency_sentinel,
    frontmatter_validator, git_hygiene, health_emitter, memory_freshness, memory_quality_gate,
    output_quality, pii_redactor, pre_commit_quality, pruning_daemon, sandbox_guard,
    skill_compliance, telemetry, utils,
};
use crate::config::ForgeConfig;
use crate::error::Result;
use crate::state::{ChainStore, HealthStore};

/// Everything a guard may read or write besides the event itself.
pub struct GuardContext<'a> {
    pub config: &'a ForgeConfig,
    pub today: NaiveDate,
    /// True when the project root came from `--root` or the event's `cwd`
    /// rather than the process working directory.
    pub anchored: bool,
    pub health: &'a dyn HealthStore,
    pub chain: &'a dyn ChainStore,
    pub git: &'a dyn GitInspector,
}

impl GuardContext<'_> {
    pub fn root(&self) -> &Path {
        &self.config.project_root
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardId {
    SandboxBoundary,
    DependencySentinel,
    GitHygiene,
    PreCommitQuality,
    PiiRedactor,
    MemoryFreshness,
    FrontmatterValidator,
    MemoryQualityGate,
    CrossPollinator,
    OutputQuality,
    ContextDrift,
    HealthEmitter,
    ChainContext,
    MemoryPruning,
    Telemetry,
    SkillCompliance,
    ContextUsage,
}

impl GuardId {
    pub const ALL: [GuardId; 17] = [
        GuardId::SandboxBoundary,
        GuardId::DependencySentinel,
        GuardId::GitHygiene,
        GuardId::PreCommitQuality,
        GuardId::PiiRedactor,
        GuardId::MemoryFreshness,
        GuardId::FrontmatterValidator,
        GuardId::MemoryQualityGate,
        GuardId::CrossPollinator,
        GuardId::OutputQuality,
        GuardId::ContextDrift,
        GuardId::HealthEmitter,
        GuardId::ChainContext,
        GuardId::MemoryPruning,
        GuardId::Telemetry,
        GuardId::SkillCompliance,
        GuardId::ContextUsage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GuardId::SandboxBoundary => "sandbox-boundary",
            GuardId::DependencySentinel => "dependency-sentinel",
            GuardId::GitHygiene => "git-hygiene",
            GuardId::PreCommitQuality => "pre-commit-quality",
            GuardId::PiiRedactor => "pii-redactor",
            GuardId::MemoryFreshness => "memory-freshness",
            GuardId::FrontmatterValidator => "frontmatter-validator",
            GuardId::MemoryQualityGate => "memory-quality-gate",
            GuardId::CrossPollinator => "cross-pollinator",
            GuardId::OutputQuality => "output-quality",
            GuardId::ContextDrift => "context-drift",
            GuardId::HealthEmitter => "health-emitter",
            GuardId::ChainContext => "chain-context",
            GuardId::MemoryPruning => "memory-pruning",
            GuardId::Telemetry => "telemetry",
            GuardId::SkillCompliance => "skill-compliance",
            GuardId::ContextUsage => "context-usage",
        }
    }

    /// Parse a guard name; kebab-case and snake_case both accepted.
    pub fn from_arg(s: &str) -> Option<GuardId> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        GuardId::ALL.into_iter().find(|g| g.name() == normalized)
    }

    pub fn evaluate(self, ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
        match self {
            GuardId::SandboxBoundary => sandbox_guard::evaluate(ctx, input),
            GuardId::DependencySentinel => dependency_sentinel::evaluate(ctx, input),
            GuardId::GitHygiene => git_hygiene::evaluate(ctx, input),
            GuardId::PreCommitQuality => pre_commit_quality::evaluate(ctx, input),
            GuardId::PiiRedactor => pii_redactor::evaluate(ctx, input),
            GuardId::MemoryFreshness => memory_freshness::evaluate(ctx, input),
            GuardId::FrontmatterValidator => frontmatter_validator::evaluate(ctx, input),
            GuardId::MemoryQualityGate => memory_quality_gate::evaluate(ctx, input),
            GuardId::CrossPollinator => cross_pollinator::evaluate(ctx, input),
            GuardId::OutputQuality => output_quality::evaluate(ctx, input),
            GuardId::ContextDrift => context_drift::evaluate(ctx, input),
            GuardId::HealthEmitter => health_emitter::evaluate(ctx, input),
            GuardId::ChainContext => chain_context::evaluate(ctx, input),
            GuardId::MemoryPruning => pruning_daemon::evaluate(ctx, input),
            GuardId::Telemetry => telemetry::evaluate(ctx, input),
            GuardId::SkillCompliance => skill_compliance::evaluate(ctx, input),
            GuardId::ContextUsage => context_usage::evaluate(ctx, input),
        }
    }
}

/// Ordered guard chain for an event. Each guard filters on tool name
/// itself, so a chain may hold guards that ignore a given tool.
pub fn chain_for(event: HookEvent) -> &'static [GuardId] {
    match event {
        HookEvent::PreToolUse => &[
            GuardId::SandboxBoundary,
            GuardId::DependencySentinel,
            GuardId::GitHygiene,
            GuardId::PreCommitQuality,
            GuardId::MemoryFreshness,
            GuardId::FrontmatterValidator,
        ],
        // Health last, so notes queued by earlier guards surface this turn.
        HookEvent::PostToolUse => &[
            GuardId::MemoryQualityGate,
            GuardId::CrossPollinator,
            GuardId::OutputQuality,
            GuardId::ContextDrift,
            GuardId::HealthEmitter,
        ],
        HookEvent::SessionStart => &[GuardId::HealthEmitter],
        HookEvent::UserPromptSubmit => &[GuardId::PiiRedactor],
        HookEvent::TaskCompleted => &[GuardId::ChainContext],
        HookEvent::SessionEnd => &[GuardId::MemoryPruning],
        HookEvent::Stop => &[GuardId::Telemetry, GuardId::SkillCompliance],
        HookEvent::PreCompact => &[GuardId::ContextUsage],
        HookEvent::SubagentStart | HookEvent::SubagentStop | HookEvent::Notification => &[],
    }
}

/// Run `guards` in order. The first deny wins and stops the chain;
/// warnings accumulate into one message. A failing guard is logged and
/// treated as allow.
pub fn evaluate_chain(ctx: &GuardContext, input: &HookInput, guards: &[GuardId]) -> Verdict {
    let mut warnings: Vec<String> = Vec::new();

    for guard in guards {
        match guard.evaluate(ctx, input) {
            Ok(Verdict::Allow) => {}
            Ok(Verdict::Deny(reason)) => {
                tracing::debug!(guard = guard.name(), %reason, "deny");
                return Verdict::Deny(reason);
            }
            Ok(Verdict::Warn(message)) => {
                tracing::debug!(guard = guard.name(), "warn");
                warnings.push(message);
            }
            Err(e) => {
                tracing::warn!(guard = guard.name(), error = %e, "guard failed, allowing");
                utils::log_hook_error(&ctx.config.forge_dir(), guard.name(), &e.to_string());
            }
        }
    }

    if warnings.is_empty() {
        Verdict::Allow
    } else {
        Verdict::Warn(warnings.join("\n\n"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixture for guard unit tests.

    use std::path::PathBuf;

    use super::*;
    use crate::state::{MemoryChainStore, MemoryHealthBuffer};
    use tempfile::TempDir;

    /// Fixed staged state.
    #[derive(Default)]
    pub struct StaticGit {
        pub diff: String,
        pub files: Vec<String>,
        pub toplevel: Option<PathBuf>,
    }

    impl StaticGit {
        pub fn with_diff(diff: &str) -> Self {
            Self {
                diff: diff.to_string(),
                ..Self::default()
            }
        }

        pub fn with_files(files: &[&str]) -> Self {
            Self {
                files: files.iter().map(|f| f.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    impl GitInspector for StaticGit {
        fn staged_diff(&self) -> Result<String> {
            Ok(self.diff.clone())
        }

        fn staged_files(&self) -> Result<Vec<String>> {
            Ok(self.files.clone())
        }

        fn toplevel(&self) -> Result<Option<PathBuf>> {
            Ok(self.toplevel.clone())
        }
    }

    pub struct Fixture {
        pub dir: TempDir,
        pub config: ForgeConfig,
        pub today: NaiveDate,
        pub health: MemoryHealthBuffer,
        pub chain: MemoryChainStore,
        pub git: StaticGit,
    }

    impl Fixture {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = ForgeConfig::load_with(dir.path(), None);
            Self {
                dir,
                config,
                today: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                health: MemoryHealthBuffer::default(),
                chain: MemoryChainStore::default(),
                git: StaticGit::default(),
            }
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        /// Write `content` to `rel` under the fixture root.
        pub fn file(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        pub fn ctx(&self) -> GuardContext<'_> {
            GuardContext {
                config: &self.config,
                today: self.today,
                anchored: true,
                health: &self.health,
                chain: &self.chain,
                git: &self.git,
            }
        }

        /// Reload config after writing `.forge/config.json` or `security/`.
        pub fn reload(&mut self) {
            self.config = ForgeConfig::load_with(self.dir.path(), None);
        }
    }

    pub fn input(json: serde_json::Value) -> HookInput {
        serde_json::from_value(json).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Fixture, input};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_guard_names_roundtrip() {
        for g in GuardId::ALL {
            assert_eq!(GuardId::from_arg(g.name()), Some(g));
        }
        assert_eq!(GuardId::from_arg("git_hygiene"), Some(GuardId::GitHygiene));
        assert_eq!(GuardId::from_arg("nope"), None);
    }

    #[test]
    fn test_deny_short_circuits_chain() {
        let fx = Fixture::new();
        // Sandbox denies the .env read before anything else runs.
        let ev = input(json!({"tool_name": "Read", "tool_input": {"file_path": ".env"}}));
        let v = evaluate_chain(&fx.ctx(), &ev, chain_for(HookEvent::PreToolUse));
        assert!(v.is_deny());
    }

    #[test]
    fn test_warnings_accumulate_with_blank_line() {
        let fx = Fixture::new();
        fx.health.append("Memory file x is aging").unwrap();
        let path = fx.file(
            "memory/projects/p/notes.md",
            "# Notes\nsee /home/alice/project\n",
        );
        let ev = input(json!({
            "tool_name": "Write",
            "tool_input": {"file_path": path.to_string_lossy()},
        }));
        let v = evaluate_chain(&fx.ctx(), &ev, chain_for(HookEvent::PostToolUse));
        let Verdict::Warn(msg) = v else { panic!("expected warn, got {:?}", v) };
        assert!(msg.contains("absolute"));
        assert!(msg.contains("Forge Health Report"));
        assert!(msg.contains("\n\n"));
    }

    #[test]
    fn test_silent_events_allow() {
        let fx = Fixture::new();
        let ev = input(json!({}));
        for event in [
            HookEvent::PreCompact,
            HookEvent::Notification,
            HookEvent::SubagentStart,
            HookEvent::SubagentStop,
            HookEvent::Stop,
        ] {
            assert_eq!(evaluate_chain(&fx.ctx(), &ev, chain_for(event)), Verdict::Allow);
        }
    }

    #[test]
    fn test_post_tool_use_surfaces_notes_from_same_turn() {
        let fx = Fixture::new();
        let path = fx.file(
            "memory/skills/analyze/proj/findings.md",
            "## Security

Token logged in plain text.
",
        );
        let ev = input(json!({
            "tool_name": "Write",
            "tool_input": {"file_path": path.to_string_lossy()},
        }));
        let Verdict::Warn(msg) = evaluate_chain(&fx.ctx(), &ev, chain_for(HookEvent::PostToolUse)) else {
            panic!("expected health report")
        };
        assert!(msg.contains("Forge Health Report"));
        assert!(msg.contains("cross_skill_insights.md"));
    }

    #[test]
    fn test_every_guard_is_chained() {
        let events = [
            HookEvent::SessionStart,
            HookEvent::PreToolUse,
            HookEvent::PostToolUse,
            HookEvent::PreCompact,
            HookEvent::TaskCompleted,
            HookEvent::UserPromptSubmit,
            HookEvent::Stop,
            HookEvent::SessionEnd,
        ];
        for g in GuardId::ALL {
            assert!(
                events.iter().any(|e| chain_for(*e).contains(&g)),
                "{} is not in any chain",
                g.name()
            );
        }
    }
}
