use super::patterns::{pii_patterns, private_ip_re};
use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;

/// Category keywords detected in `text`, in pattern order.
pub fn detect(text: &str) -> Vec<&'static str> {
    // Local addresses are never reported, and must not feed other patterns.
    let masked = private_ip_re().replace_all(text, "<local-ip>");
    pii_patterns()
        .iter()
        .filter(|(_, re)| re.is_match(&masked))
        .map(|(label, _)| *label)
        .collect()
}

/// UserPromptSubmit: warn when the prompt carries PII or secrets. Never denies.
pub fn evaluate(_ctx: &GuardContext, input: &HookInput) -> Result<Verdict> {
    let Some(prompt) = input.prompt.as_deref().filter(|p| !p.trim().is_empty()) else {
        return Ok(Verdict::Allow);
    };

    let found = detect(prompt);
    if found.is_empty() {
        return Ok(Verdict::Allow);
    }

    tracing::debug!(categories = ?found, "pii detected in prompt");
    Ok(Verdict::Warn(format!(
        "⚠️ PII Detection Warning: the prompt appears to contain {}. Avoid sending personal data or credentials; redact them and use placeholders.",
        found.join(", ")
    )))
}
