use std::fs;
use std::io::ErrorKind;

use super::memory::{Freshness, age_days, classify, is_managed_memory, parse_timestamp, resolve};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;

const PREFIX: &str = "📜 Memory Freshness:";

/// PreToolUse on Read of a memory file: deny ghost and stale memory,
/// buffer a note for aging memory.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    if input.tool() != "Read" {
        return Ok(Verdict::Allow);
    }
    let Some(path) = input.file_path() else {
        return Ok(Verdict::Allow);
    };
    if !is_managed_memory(path) {
        return Ok(Verdict::Allow);
    }

    let content = match fs::read_to_string(resolve(ctx.root(), path)) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Verdict::Allow),
        Err(e) => return Err(e.into()),
    };

    let Some(updated) = parse_timestamp(&content) else {
        return Ok(Verdict::Deny(format!(
            "{} {} has no `<!-- Last Updated: YYYY-MM-DD -->` timestamp on line 1 (ghost memory). Refresh or regenerate it before relying on its contents.",
            PREFIX, path
        )));
    };

    let age = age_days(updated, ctx.today);
    match classify(age) {
        Freshness::Fresh => Ok(Verdict::Allow),
        Freshness::Aging(days) => {
            ctx.health.append(&format!(
                "Memory file {} is aging ({} days since last update); refresh soon.",
                path, days
            ))?;
            Ok(Verdict::Allow)
        }
        Freshness::Stale(days) => Ok(Verdict::Deny(format!(
            "{} {} is stale ({} days since last update, limit 90). Refresh it before relying on its contents.",
            PREFIX, path, days
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HealthStore;
    use crate::hooks::registry::testing::{Fixture, input};
    use chrono::Duration;
    use serde_json::json;

    const PATH: &str = "forge-plugin/memory/projects/p/overview.md";

    fn read_with_age(fx: &Fixture, days: i64) -> Verdict {
        let date = fx.today - Duration::days(days);
        fx.file(
            PATH,
            &format!("<!-- Last Updated: {} -->\n# Overview\n", date.format("%Y-%m-%d")),
        );
        let ev = input(json!({"tool_name": "Read", "tool_input": {"file_path": PATH}}));
        evaluate(&fx.ctx(), &ev).unwrap()
    }

    #[test]
    fn test_fresh_boundary() {
        let fx = Fixture::new();
        assert_eq!(read_with_age(&fx, 0), Verdict::Allow);
        assert_eq!(read_with_age(&fx, 30), Verdict::Allow);
        assert!(fx.health.read().unwrap().is_empty());
    }

    #[test]
    fn test_aging_buffers_note() {
        let fx = Fixture::new();
        assert_eq!(read_with_age(&fx, 31), Verdict::Allow);
        assert_eq!(read_with_age(&fx, 89), Verdict::Allow);
        let lines = fx.health.read().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Memory file"));
        assert!(lines[0].contains("31 days"));
    }

    #[test]
    fn test_stale_denied() {
        let fx = Fixture::new();
        let Verdict::Deny(reason) = read_with_age(&fx, 90) else { panic!() };
        assert!(reason.contains("stale"));
        assert!(reason.contains("90"));
        assert!(read_with_age(&fx, 400).is_deny());
    }

    #[test]
    fn test_future_date_is_fresh() {
        let fx = Fixture::new();
        assert_eq!(read_with_age(&fx, -10), Verdict::Allow);
    }

    #[test]
    fn test_ghost_memory_denied() {
        let fx = Fixture::new();
        for content in ["# No timestamp\n", "**Last Updated**: 2026-02-01\n", "# T\n<!-- Last Updated: 2026-02-01 -->\n"] {
            fx.file(PATH, content);
            let ev = input(json!({"tool_name": "Read", "tool_input": {"file_path": PATH}}));
            let Verdict::Deny(reason) = evaluate(&fx.ctx(), &ev).unwrap() else { panic!() };
            assert!(reason.contains("ghost"));
        }
    }

    #[test]
    fn test_operational_and_non_memory_ignored() {
        let fx = Fixture::new();
        fx.file("forge-plugin/memory/index.md", "# Index without timestamp\n");
        fx.file("src/notes.md", "# no timestamp\n");
        for p in ["forge-plugin/memory/index.md", "src/notes.md", "forge-plugin/memory/missing.md"] {
            let ev = input(json!({"tool_name": "Read", "tool_input": {"file_path": p}}));
            assert_eq!(evaluate(&fx.ctx(), &ev).unwrap(), Verdict::Allow, "{p}");
        }
        assert!(fx.health.read().unwrap().is_empty());
    }
}
