use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Runtime state directory, relative to the project root.
pub const FORGE_DIR: &str = ".forge";

/// Optional per-project overrides, read from `.forge/config.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub protected_branches: Vec<String>,
    pub allowed_path_prefixes: Vec<String>,
    pub deny_list_path: Option<PathBuf>,
    pub recent_window_minutes: u64,
    pub health_buffer_max_lines: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            protected_branches: vec!["main".to_string(), "master".to_string()],
            allowed_path_prefixes: vec![
                "/tmp".to_string(),
                "/var/tmp".to_string(),
                "/dev/null".to_string(),
            ],
            deny_list_path: None,
            recent_window_minutes: 60,
            health_buffer_max_lines: 200,
        }
    }
}

/// Resolved configuration for one hook invocation.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    pub project_root: PathBuf,
    pub plugin_root: PathBuf,
    pub settings: FileConfig,
}

impl ForgeConfig {
    /// Resolve config for `project_root`, taking the plugin root from
    /// `CLAUDE_PLUGIN_ROOT` when set.
    pub fn load(project_root: &Path) -> Self {
        let plugin_root = env::var("CLAUDE_PLUGIN_ROOT")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::load_with(project_root, plugin_root)
    }

    pub fn load_with(project_root: &Path, plugin_root: Option<PathBuf>) -> Self {
        let settings = read_file_config(&project_root.join(FORGE_DIR).join("config.json"));
        Self {
            project_root: project_root.to_path_buf(),
            plugin_root: plugin_root.unwrap_or_else(|| project_root.to_path_buf()),
            settings,
        }
    }

    pub fn forge_dir(&self) -> PathBuf {
        self.project_root.join(FORGE_DIR)
    }

    pub fn health_buffer_path(&self) -> PathBuf {
        self.forge_dir().join("health_buffer")
    }

    pub fn chain_state_path(&self) -> PathBuf {
        self.forge_dir().join("chain_state.json")
    }

    pub fn telemetry_log_path(&self) -> PathBuf {
        self.forge_dir().join("telemetry.log")
    }

    /// First existing deny list among: explicit override, plugin root, project root.
    pub fn deny_list_path(&self) -> Option<PathBuf> {
        if let Some(ref p) = self.settings.deny_list_path {
            let resolved = if p.is_absolute() {
                p.clone()
            } else {
                self.project_root.join(p)
            };
            return resolved.is_file().then_some(resolved);
        }

        [&self.plugin_root, &self.project_root]
            .iter()
            .map(|root| root.join("security").join("deny_list.txt"))
            .find(|p| p.is_file())
    }
}

fn read_file_config(path: &Path) -> FileConfig {
    let Ok(raw) = fs::read_to_string(path) else {
        return FileConfig::default();
    };
    match serde_json::from_str::<FileConfig>(&raw) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed forge config");
            FileConfig::default()
        }
    }
}
