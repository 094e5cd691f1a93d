use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("invalid hook input: {0}")]
    InvalidInput(String),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("unknown hook event: {0}")]
    UnknownEvent(String),

    #[error("unknown guard: {0}")]
    UnknownGuard(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, HookError>;
