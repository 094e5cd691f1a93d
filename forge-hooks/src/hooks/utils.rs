use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::Utc;

const ERROR_LOG: &str = "hook-errors.log";
const ERROR_LOG_MAX_LINES: usize = 50;
const ERROR_LOG_KEEP_LINES: usize = 30;

/// Log a guard failure to `.forge/hook-errors.log`.
/// Trims to 50 entries (keeps last 30) to prevent unbounded growth.
/// Does nothing when the runtime directory does not exist yet.
pub fn log_hook_error(forge_dir: &Path, source: &str, message: &str) {
    if !forge_dir.is_dir() {
        return;
    }
    let log_path = forge_dir.join(ERROR_LOG);
    let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let entry = format!("[{}] {}: {}\n", ts, source, message.replace('\n', " "));

    if let Ok(mut f) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = f.write_all(entry.as_bytes());
    }

    trim_log_file(&log_path, ERROR_LOG_MAX_LINES, ERROR_LOG_KEEP_LINES);
}

/// Trim a log file: if it exceeds `max_lines`, keep only the last `keep_lines`.
fn trim_log_file(path: &Path, max_lines: usize, keep_lines: usize) {
    if let Ok(content) = fs::read_to_string(path) {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() > max_lines {
            let trimmed: Vec<&str> = lines[lines.len() - keep_lines..].to_vec();
            let mut output = trimmed.join("\n");
            output.push('\n');
            let _ = fs::write(path, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_hook_error_appends() {
        let dir = TempDir::new().unwrap();
        log_hook_error(dir.path(), "git-hygiene", "git diff --cached failed");
        let content = fs::read_to_string(dir.path().join(ERROR_LOG)).unwrap();
        assert!(content.contains("git-hygiene: git diff --cached failed"));
        assert!(content.starts_with('['));
    }

    #[test]
    fn test_log_hook_error_skips_missing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join(".forge");
        log_hook_error(&missing, "x", "y");
        assert!(!missing.exists());
    }

    #[test]
    fn test_log_trims_to_last_30() {
        let dir = TempDir::new().unwrap();
        for i in 0..51 {
            log_hook_error(dir.path(), "guard", &format!("failure {}", i));
        }
        let content = fs::read_to_string(dir.path().join(ERROR_LOG)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 30);
        assert!(lines[29].ends_with("failure 50"));
    }
}
