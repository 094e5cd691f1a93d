use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::atomic_io::atomic_write;
use crate::error::Result;

/// One completed command and the catalog files it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub context_loaded: Vec<String>,
    #[serde(default)]
    pub memory_loaded: Vec<String>,
    #[serde(default)]
    pub skills_invoked: Vec<String>,
}

impl CommandRecord {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            task_id: None,
            completed_at: None,
            context_loaded: Vec::new(),
            memory_loaded: Vec::new(),
            skills_invoked: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    pub session_id: String,
    #[serde(default)]
    pub command_history: Vec<CommandRecord>,
}

impl ChainState {
    /// Fold `record` into the previous state: same session appends, a new
    /// session starts over with just this record.
    pub fn advance(previous: Option<ChainState>, session_id: &str, record: CommandRecord) -> Self {
        match previous {
            Some(mut state) if state.session_id == session_id => {
                state.command_history.push(record);
                state
            }
            _ => ChainState {
                session_id: session_id.to_string(),
                command_history: vec![record],
            },
        }
    }
}

pub trait ChainStore {
    fn load(&self) -> Result<Option<ChainState>>;
    fn save(&self, state: &ChainState) -> Result<()>;
}

/// `.forge/chain_state.json`; last writer wins.
pub struct FileChainStore {
    path: PathBuf,
}

impl FileChainStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChainStore for FileChainStore {
    fn load(&self) -> Result<Option<ChainState>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(r) => r,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // A corrupt file is treated as no prior state; the next save replaces it.
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable chain state");
                Ok(None)
            }
        }
    }

    fn save(&self, state: &ChainState) -> Result<()> {
        let mut json = serde_json::to_string_pretty(state)?;
        json.push('\n');
        atomic_write(&self.path, json.as_bytes())
    }
}

#[derive(Default)]
pub struct MemoryChainStore {
    state: RefCell<Option<ChainState>>,
}

impl ChainStore for MemoryChainStore {
    fn load(&self) -> Result<Option<ChainState>> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &ChainState) -> Result<()> {
        *self.state.borrow_mut() = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_advance_same_session_appends() {
        let s1 = ChainState::advance(None, "s1", CommandRecord::new("analyze"));
        let s2 = ChainState::advance(Some(s1), "s1", CommandRecord::new("implement"));
        let names: Vec<_> = s2.command_history.iter().map(|r| r.command.as_str()).collect();
        assert_eq!(names, vec!["analyze", "implement"]);
    }

    #[test]
    fn test_advance_new_session_resets() {
        let s1 = ChainState::advance(None, "s1", CommandRecord::new("analyze"));
        let s1 = ChainState::advance(Some(s1), "s1", CommandRecord::new("implement"));
        let s2 = ChainState::advance(Some(s1), "s2", CommandRecord::new("test"));
        assert_eq!(s2.session_id, "s2");
        assert_eq!(s2.command_history.len(), 1);
        assert_eq!(s2.command_history[0].command, "test");
    }

    #[test]
    fn test_file_store_roundtrip_uses_camel_case() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".forge/chain_state.json");
        let store = FileChainStore::new(&path);
        assert!(store.load().unwrap().is_none());

        let mut record = CommandRecord::new("analyze");
        record.context_loaded.push("context/python/frameworks.md".into());
        let state = ChainState::advance(None, "session-001", record);
        store.save(&state).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"sessionId\""));
        assert!(raw.contains("\"commandHistory\""));
        assert!(raw.contains("\"contextLoaded\""));
        assert_eq!(store.load().unwrap().unwrap(), state);
    }

    #[test]
    fn test_file_store_corrupt_file_is_no_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain_state.json");
        fs::write(&path, "{ broken").unwrap();
        assert!(FileChainStore::new(&path).load().unwrap().is_none());
    }
}
