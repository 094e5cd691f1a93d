use std::env;
use std::path::{Path, PathBuf};

use chrono::Local;

use super::emit::emit;
use super::git::CommandGit;
use super::registry::{GuardContext, GuardId, chain_for, evaluate_chain};
use super::types::{HookEvent, HookInput, HookOutput};
use super::utils;
use crate::config::ForgeConfig;
use crate::error::{HookError, Result};
use crate::state::{FileChainStore, FileHealthBuffer};

/// Dispatch a hook event to its guard chain.
///
/// - Parses `stdin_json` into a `HookInput`
/// - Resolves the project root (`root_override`, then event `cwd`, then
///   the process working directory)
/// - Runs the chain registered for `event`
/// - On bad input: logs and returns empty stdout (allow)
/// - Never panics; the caller always exits 0
pub fn dispatch(event: HookEvent, stdin_json: &str, root_override: Option<&Path>) -> HookOutput {
    run(&format!("{:?}", event), chain_for(event), stdin_json, root_override)
}

/// Run a single guard, for hosts that register one command per guard.
pub fn dispatch_guard(guard: GuardId, stdin_json: &str, root_override: Option<&Path>) -> HookOutput {
    run(guard.name(), &[guard], stdin_json, root_override)
}

fn run(label: &str, guards: &[GuardId], stdin_json: &str, root_override: Option<&Path>) -> HookOutput {
    let input = match HookInput::parse(stdin_json) {
        Ok(input) => input,
        Err(e) => {
            // Bad JSON: log and degrade gracefully
            tracing::warn!(hook = label, error = %e, "failed to parse hook stdin");
            let (root, _) = resolve_root(root_override, None);
            utils::log_hook_error(
                &ForgeConfig::load(&root).forge_dir(),
                label,
                &format!("failed to parse hook stdin: {}", e),
            );
            return HookOutput::empty();
        }
    };

    if guards.is_empty() {
        return HookOutput::empty();
    }

    let (root, anchored) = resolve_root(root_override, input.cwd());
    let config = ForgeConfig::load(&root);
    let health = FileHealthBuffer::new(
        config.health_buffer_path(),
        config.settings.health_buffer_max_lines,
    );
    let chain = FileChainStore::new(config.chain_state_path());
    let git = CommandGit::new(root.clone());

    let ctx = GuardContext {
        config: &config,
        today: Local::now().date_naive(),
        anchored,
        health: &health,
        chain: &chain,
        git: &git,
    };

    let verdict = evaluate_chain(&ctx, &input, guards);
    tracing::debug!(hook = label, ?verdict, "hook evaluated");
    emit(&verdict)
}

/// Project root and whether it was anchored by the caller or the event.
fn resolve_root(root_override: Option<&Path>, cwd: Option<&str>) -> (PathBuf, bool) {
    if let Some(root) = root_override {
        return (root.to_path_buf(), true);
    }
    if let Some(cwd) = cwd {
        return (PathBuf::from(cwd), true);
    }
    let fallback = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    (fallback, false)
}

/// Convenience: dispatch from raw CLI args.
pub fn dispatch_from_cli(
    event_name: &str,
    stdin_json: &str,
    root_override: Option<&Path>,
) -> Result<HookOutput> {
    let event = HookEvent::from_arg(event_name)
        .ok_or_else(|| HookError::UnknownEvent(event_name.to_string()))?;
    Ok(dispatch(event, stdin_json, root_override))
}

pub fn guard_from_cli(
    guard_name: &str,
    stdin_json: &str,
    root_override: Option<&Path>,
) -> Result<HookOutput> {
    let guard = GuardId::from_arg(guard_name)
        .ok_or_else(|| HookError::UnknownGuard(guard_name.to_string()))?;
    Ok(dispatch_guard(guard, stdin_json, root_override))
}
