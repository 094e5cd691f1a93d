use super::registry::GuardContext;
use super::types::{HookInput, Verdict};
use crate::error::Result;

/// Drain the health buffer into one advisory message.
pub fn evaluate(ctx: &GuardContext, _input: &HookInput) -> Result<Verdict> {
    let Some(lines) = ctx.health.flush()? else {
        return Ok(Verdict::Allow);
    };
    Ok(Verdict::Warn(format!(
        "🩺 Forge Health Report ({} event(s)):\n{}",
        lines.len(),
        lines.join("\n")
    )))
}
