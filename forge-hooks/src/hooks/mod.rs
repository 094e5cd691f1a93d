//! Policy guards for Claude Code hook events.
//!
//! Event chains (see `registry::chain_for`):
//!   - **PreToolUse**: `sandbox_guard`, `dependency_sentinel`, `git_hygiene`,
//!     `pre_commit_quality`, `memory_freshness`, `frontmatter_validator`
//!   - **PostToolUse**: `memory_quality_gate`, `cross_pollinator`,
//!     `output_quality`, `context_drift`, `health_emitter`
//!   - **SessionStart**: `health_emitter`
//!   - **UserPromptSubmit**: `pii_redactor`
//!   - **TaskCompleted**: `chain_context`
//!   - **PreCompact**: `context_usage`
//!   - **SessionEnd**: `pruning_daemon`
//!   - **Stop**: `telemetry`, `skill_compliance`
//!
//! All events are dispatched via `dispatcher::dispatch()`.
//! Entry point: `forge-hooks hook <event-name>` (reads JSON from stdin).

// Infrastructure
pub mod dispatcher;
pub mod emit;
pub mod registry;
pub mod types;
pub mod utils;

// Shared rules and parsers
pub mod command;
pub mod git;
pub mod memory;
pub mod patterns;
pub mod transcript;

// Security guards
pub mod dependency_sentinel;
pub mod git_hygiene;
pub mod pii_redactor;
pub mod pre_commit_quality;
pub mod sandbox_guard;

// Memory and catalog lifecycle
pub mod chain_context;
pub mod cross_pollinator;
pub mod frontmatter_validator;
pub mod health_emitter;
pub mod memory_freshness;
pub mod memory_quality_gate;
pub mod pruning_daemon;

// Session analytics
pub mod context_drift;
pub mod context_usage;
pub mod output_quality;
pub mod skill_compliance;
pub mod telemetry;
