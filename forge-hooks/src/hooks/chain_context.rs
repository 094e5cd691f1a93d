use chrono::{SecondsFormat, Utc};

use super::registry::GuardContext;
use super::transcript;
use super::types::{HookInput, Verdict};
use crate::error::Result;
use crate::state::{ChainState, CommandRecord};

/// `/analyze my-project` gives `analyze`; anything else is a plain `task`.
pub fn command_name(subject: Option<&str>) -> String {
    subject
        .map(str::trim)
        .and_then(|s| s.strip_prefix('/'))
        .and_then(|rest| rest.split_whitespace().next())
        .filter(|name| !name.is_empty())
        .unwrap_or("task")
        .to_string()
}

/// TaskCompleted: record the finished command in the session's chain state.
/// Silent regardless of outcome.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if !ctx.anchored {
        tracing::debug!("no event cwd, skipping chain state");
        return Ok(Verdict::Allow);
    }

    let mut record = CommandRecord::new(command_name(input.task_subject.as_deref()));
    record.task_id = input.task_id();
    record.completed_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

    if let Some(text) = transcript::read(input.transcript_path()) {
        record.context_loaded = transcript::context_files(&text);
        record.memory_loaded = transcript::memory_files(&text);
        record.skills_invoked = transcript::skills(&text);
    }

    let session = input.session_id().unwrap_or("unknown");
    let state = ChainState::advance(ctx.chain.load()?, session, record);
    ctx.chain.save(&state)?;
    Ok(Verdict::Allow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::registry::testing::{Fixture, input};
    use crate::state::ChainStore;
    use serde_json::json;

    fn complete(fx: &Fixture, session: &str, subject: &str) {
        let ev = input(json!({
            "hook_event_name": "TaskCompleted",
            "session_id": session,
            "task_subject": subject,
            "cwd": fx.root().to_string_lossy(),
        }));
        assert_eq!(evaluate(&fx.ctx(), &ev).unwrap(), Verdict::Allow);
    }

    #[test]
    fn test_command_name() {
        assert_eq!(command_name(Some("/analyze my-project")), "analyze");
        assert_eq!(command_name(Some("  /implement")), "implement");
        assert_eq!(command_name(Some("Fix the login bug")), "task");
        assert_eq!(command_name(Some("/")), "task");
        assert_eq!(command_name(None), "task");
    }

    #[test]
    fn test_same_session_appends_new_session_resets() {
        let fx = Fixture::new();
        complete(&fx, "s1", "/analyze p");
        complete(&fx, "s1", "/implement f");

        let state = fx.chain.load().unwrap().unwrap();
        let commands: Vec<&str> = state.command_history.iter().map(|r| r.command.as_str()).collect();
        assert_eq!(state.session_id, "s1");
        assert_eq!(commands, vec!["analyze", "implement"]);

        complete(&fx, "s2", "/test x");
        let state = fx.chain.load().unwrap().unwrap();
        assert_eq!(state.session_id, "s2");
        assert_eq!(state.command_history.len(), 1);
        assert_eq!(state.command_history[0].command, "test");
    }

    #[test]
    fn test_transcript_populates_record() {
        let fx = Fixture::new();
        let transcript = fx.file(
            "transcript.txt",
            "Tool: Read context/python/frameworks.md\n\
             Tool: Read forge-plugin/memory/projects/p/overview.md\n\
             Tool: Read skills/analyze/SKILL.md\n",
        );
        let ev = input(json!({
            "session_id": "s1",
            "task_subject": "/analyze p",
            "task_id": 7,
            "transcript_path": transcript.to_string_lossy(),
        }));
        evaluate(&fx.ctx(), &ev).unwrap();

        let record = &fx.chain.load().unwrap().unwrap().command_history[0];
        assert_eq!(record.context_loaded, vec!["context/python/frameworks.md"]);
        assert_eq!(record.skills_invoked, vec!["analyze"]);
        assert_eq!(record.memory_loaded.len(), 1);
        assert_eq!(record.task_id.as_deref(), Some("7"));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_unanchored_is_noop() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        ctx.anchored = false;
        let ev = input(json!({"session_id": "s1", "task_subject": "/analyze p"}));
        assert_eq!(evaluate(&ctx, &ev).unwrap(), Verdict::Allow);
        assert!(fx.chain.load().unwrap().is_none());
    }
}
