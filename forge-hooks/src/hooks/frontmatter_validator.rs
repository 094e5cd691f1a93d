use std::fs;
use std::io::ErrorKind;

use serde_yaml::Value;

use super::memory::{is_context_path, is_context_skip, resolve};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;

const PREFIX: &str = "📐 Frontmatter Validator:";

pub const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "domain",
    "title",
    "type",
    "estimatedTokens",
    "loadingStrategy",
];

pub const DOMAINS: &[&str] = &[
    "engineering",
    "angular",
    "azure",
    "commands",
    "dotnet",
    "git",
    "python",
    "schema",
    "security",
];

pub const TYPES: &[&str] = &["always", "framework", "reference", "pattern", "index", "detection"];

pub const LOADING_STRATEGIES: &[&str] = &["always", "onDemand", "lazy"];

/// Extract frontmatter block between first and second `---` lines.
pub fn extract_frontmatter(content: &str) -> Option<String> {
    let mut lines = content.trim_start_matches('\u{feff}').lines();

    // First line must be `---`
    if lines.next().map(str::trim_end) != Some("---") {
        return None;
    }

    let mut block = Vec::new();
    for line in lines {
        if line.trim_end() == "---" {
            return Some(block.join("\n"));
        }
        block.push(line);
    }
    None
}

/// First schema violation in `content`, or `None` when valid.
pub fn first_violation(content: &str) -> Option<String> {
    let Some(block) = extract_frontmatter(content) else {
        return Some("missing YAML frontmatter (expected a `---` block on line 1)".to_string());
    };

    let doc: Value = match serde_yaml::from_str(&block) {
        Ok(v) => v,
        Err(e) => return Some(format!("invalid YAML frontmatter: {}", e)),
    };
    let Some(map) = doc.as_mapping() else {
        return Some("frontmatter must be a YAML mapping".to_string());
    };

    for field in REQUIRED_FIELDS {
        match map.get(*field) {
            None | Some(Value::Null) => {
                return Some(format!("missing required field '{}'", field));
            }
            Some(_) => {}
        }
    }

    let enums: [(&str, &[&str]); 3] = [
        ("domain", DOMAINS),
        ("type", TYPES),
        ("loadingStrategy", LOADING_STRATEGIES),
    ];
    for (field, allowed) in enums {
        let value = map.get(field).and_then(Value::as_str).unwrap_or("");
        if !allowed.contains(&value) {
            return Some(format!(
                "invalid {} '{}' (allowed: {})",
                field,
                scalar_text(map.get(field)),
                allowed.join(", ")
            ));
        }
    }
    None
}

fn scalar_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// PreToolUse on Write/Edit of a context file: deny frontmatter that does
/// not match the catalog schema.
pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    let tool = input.tool();
    if tool != "Write" && tool != "Edit" {
        return Ok(Verdict::Allow);
    }
    let Some(path) = input.file_path() else {
        return Ok(Verdict::Allow);
    };
    if !is_context_path(path) || is_context_skip(path) {
        return Ok(Verdict::Allow);
    }

    let content = if tool == "Write" {
        match input.content() {
            Some(c) => c.to_string(),
            None => return Ok(Verdict::Allow),
        }
    } else {
        match fs::read_to_string(resolve(ctx.root(), path)) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Verdict::Allow),
            Err(e) => return Err(e.into()),
        }
    };

    match first_violation(&content) {
        None => Ok(Verdict::Allow),
        Some(problem) => Ok(Verdict::Deny(format!("{} {}: {}", PREFIX, path, problem))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::registry::testing::{Fixture, input};
    use serde_json::json;

    const VALID: &str = "---
id: test-context-file
domain: python
title: Test Context File
type: reference
estimatedTokens: 500
loadingStrategy: onDemand
tags: [python, testing]
---

# Test Context
";

    fn write(path: &str, content: &str) -> Verdict {
        let fx = Fixture::new();
        let ev = input(json!({
            "tool_name": "Write",
            "tool_input": {"file_path": path, "content": content},
        }));
        evaluate(&fx.ctx(), &ev).unwrap()
    }

    const CTX: &str = "forge-plugin/context/python/test.md";

    #[test]
    fn test_valid_frontmatter_allowed() {
        assert_eq!(write(CTX, VALID), Verdict::Allow);
        for d in DOMAINS {
            let c = VALID.replace("domain: python", &format!("domain: {d}"));
            assert_eq!(write(CTX, &c), Verdict::Allow, "{d}");
        }
        for t in TYPES {
            let c = VALID.replace("type: reference", &format!("type: {t}"));
            assert_eq!(write(CTX, &c), Verdict::Allow, "{t}");
        }
        for s in LOADING_STRATEGIES {
            let c = VALID.replace("loadingStrategy: onDemand", &format!("loadingStrategy: {s}"));
            assert_eq!(write(CTX, &c), Verdict::Allow, "{s}");
        }
    }

    #[test]
    fn test_violations_denied_with_reason() {
        let Verdict::Deny(r) = write(CTX, "# No frontmatter\n") else { panic!() };
        assert!(r.contains("missing YAML frontmatter"));

        let Verdict::Deny(r) = write(CTX, "---\nid: incomplete\ndomain: python\n---\n") else {
            panic!()
        };
        assert!(r.contains("'title'"));

        let Verdict::Deny(r) = write(CTX, &VALID.replace("domain: python", "domain: cobol")) else {
            panic!()
        };
        assert!(r.contains("invalid domain 'cobol'"));

        assert!(write(CTX, &VALID.replace("type: reference", "type: tutorial")).is_deny());
        assert!(write(CTX, &VALID.replace("loadingStrategy: onDemand", "loadingStrategy: eager")).is_deny());
        assert!(write(CTX, "---\nid: [unclosed\n---\n").is_deny());
    }

    #[test]
    fn test_skipped_and_non_context_paths() {
        for p in [
            "forge-plugin/context/index.md",
            "forge-plugin/context/cross_domain.md",
            "forge-plugin/context/loading_protocol.md",
            "forge-plugin/memory/projects/test/overview.md",
            "forge-plugin/skills/analyze/SKILL.md",
            "src/main.py",
        ] {
            assert_eq!(write(p, "# No frontmatter\n"), Verdict::Allow, "{p}");
        }
    }

    #[test]
    fn test_edit_reads_existing_file() {
        let fx = Fixture::new();
        let ev = input(json!({"tool_name": "Edit", "tool_input": {"file_path": CTX}}));

        assert_eq!(evaluate(&fx.ctx(), &ev).unwrap(), Verdict::Allow, "missing file");

        fx.file(CTX, VALID);
        assert_eq!(evaluate(&fx.ctx(), &ev).unwrap(), Verdict::Allow);

        fx.file(CTX, "# Context without frontmatter\n");
        assert!(evaluate(&fx.ctx(), &ev).unwrap().is_deny());
    }
}
