use serde::{Deserialize, Serialize};
use serde_json::Value;

/// All host hook events the dispatcher can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEvent {
    SessionStart,
    PreToolUse,
    PostToolUse,
    PreCompact,
    SubagentStart,
    SubagentStop,
    TaskCompleted,
    UserPromptSubmit,
    Notification,
    Stop,
    SessionEnd,
}

impl HookEvent {
    /// Parse an event name from CLI argument (case-insensitive).
    pub fn from_arg(s: &str) -> Option<HookEvent> {
        match s.to_lowercase().as_str() {
            "sessionstart" | "session-start" | "session_start" => Some(HookEvent::SessionStart),
            "pretooluse" | "pre-tool-use" | "pre_tool_use" => Some(HookEvent::PreToolUse),
            "posttooluse" | "post-tool-use" | "post_tool_use" => Some(HookEvent::PostToolUse),
            "precompact" | "pre-compact" | "pre_compact" => Some(HookEvent::PreCompact),
            "subagentstart" | "subagent-start" | "subagent_start" => Some(HookEvent::SubagentStart),
            "subagentstop" | "subagent-stop" | "subagent_stop" => Some(HookEvent::SubagentStop),
            "taskcompleted" | "task-completed" | "task_completed" => Some(HookEvent::TaskCompleted),
            "userpromptsubmit" | "user-prompt-submit" | "user_prompt_submit" => {
                Some(HookEvent::UserPromptSubmit)
            }
            "notification" => Some(HookEvent::Notification),
            "stop" => Some(HookEvent::Stop),
            "sessionend" | "session-end" | "session_end" => Some(HookEvent::SessionEnd),
            _ => None,
        }
    }
}

/// Tool-specific fields carried under `tool_input`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolInput {
    pub command: Option<String>,
    #[serde(alias = "path")]
    pub file_path: Option<String>,
    pub content: Option<String>,
}

/// Decoded hook event from stdin.
///
/// Every field is optional: the host sends a different subset per event,
/// and a missing field always resolves to the permissive outcome.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HookInput {
    #[serde(alias = "hookEventName")]
    pub hook_event_name: Option<String>,
    #[serde(alias = "toolName")]
    pub tool_name: Option<String>,
    #[serde(alias = "toolInput")]
    pub tool_input: Option<ToolInput>,
    pub cwd: Option<String>,
    #[serde(alias = "transcriptPath")]
    pub transcript_path: Option<String>,
    #[serde(alias = "sessionId")]
    pub session_id: Option<String>,
    pub prompt: Option<String>,
    #[serde(alias = "taskSubject")]
    pub task_subject: Option<String>,
    #[serde(alias = "taskId")]
    pub task_id: Option<Value>,
    #[serde(alias = "stopHookActive")]
    pub stop_hook_active: Option<bool>,
    pub trigger: Option<String>,
    pub reason: Option<String>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl HookInput {
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }

    pub fn tool(&self) -> &str {
        self.tool_name.as_deref().unwrap_or("")
    }

    pub fn command(&self) -> Option<&str> {
        self.tool_input.as_ref().and_then(|ti| non_empty(&ti.command))
    }

    pub fn file_path(&self) -> Option<&str> {
        self.tool_input.as_ref().and_then(|ti| non_empty(&ti.file_path))
    }

    /// Proposed file content (Write only).
    pub fn content(&self) -> Option<&str> {
        self.tool_input.as_ref().and_then(|ti| ti.content.as_deref())
    }

    pub fn cwd(&self) -> Option<&str> {
        non_empty(&self.cwd)
    }

    pub fn transcript_path(&self) -> Option<&str> {
        non_empty(&self.transcript_path)
    }

    pub fn session_id(&self) -> Option<&str> {
        non_empty(&self.session_id)
    }

    /// `task_id` arrives as either a string or a number.
    pub fn task_id(&self) -> Option<String> {
        match self.task_id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn is_stop_hook_active(&self) -> bool {
        self.stop_hook_active.unwrap_or(false)
    }
}

/// A single guard's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(String),
    Warn(String),
}

impl Verdict {
    pub fn is_deny(&self) -> bool {
        matches!(self, Verdict::Deny(_))
    }
}

/// Result returned by the dispatcher. Exit code is always 0; a deny is
/// carried in the JSON payload.
#[derive(Debug, Clone, Default)]
pub struct HookOutput {
    /// Text to write to stdout (may be empty).
    pub stdout: String,
}

impl HookOutput {
    pub fn ok(stdout: String) -> Self {
        Self { stdout }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }
}
