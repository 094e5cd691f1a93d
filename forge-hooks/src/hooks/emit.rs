use serde_json::json;

use super::types::{HookOutput, Verdict};

/// Serialize a deny into the host's `hookSpecificOutput` shape.
pub fn deny_json(reason: &str) -> String {
    json!({
        "hookSpecificOutput": {
            "permissionDecision": "deny",
            "permissionDecisionReason": reason,
        }
    })
    .to_string()
}

/// Serialize a warning as `additionalContext`.
pub fn warn_json(message: &str) -> String {
    json!({ "additionalContext": message }).to_string()
}

/// Turn a final verdict into stdout. Allow is the empty string.
pub fn emit(verdict: &Verdict) -> HookOutput {
    match verdict {
        Verdict::Allow => HookOutput::empty(),
        Verdict::Deny(reason) => HookOutput::ok(deny_json(reason)),
        Verdict::Warn(message) => HookOutput::ok(warn_json(message)),
    }
}
