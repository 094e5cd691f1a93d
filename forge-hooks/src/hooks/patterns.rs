//! Pattern sets used by the guards.
//!
//! Guards treat commands and file content as opaque text. Every regex,
//! filename list and keyword table lives here so it can change without
//! touching guard logic.

use regex::Regex;
use std::sync::OnceLock;

macro_rules! lazy_regex {
    ($name:ident, $pattern:expr) => {
        pub fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

// ── Sandbox boundary ────────────────────────────────────────────────────

/// Credential-bearing filenames, matched against the final path component.
const SENSITIVE_FILENAME: &str = r"(?i)^(?:\.env(?:\..+)?|.+\.(?:pem|key|p12|pfx)|\.npmrc|\.pypirc|\.netrc|\.htpasswd|\.git-credentials|credentials.*\.(?:json|ya?ml)|service-account.*\.json|id_rsa.*|id_ed25519.*)$";

/// The same filenames as they appear inside free-form shell text.
const SENSITIVE_IN_COMMAND: &str = r#"(?i)(?:^|[\s/'"=:<>(])(?:\.env(?:\.[\w.-]+)?|[\w.-]*\.(?:pem|key|p12|pfx)|\.npmrc|\.pypirc|\.netrc|\.htpasswd|\.git-credentials|credentials[\w.-]*\.(?:json|ya?ml)|id_rsa|id_ed25519)(?:$|[\s'";|&)<>])|service-account"#;

/// Home dotfiles and system files no command should touch.
const DANGEROUS_PATH: &str = r"(?:~|\$HOME|\$\{HOME\})/\.(?:ssh|aws|gnupg|config|bashrc|bash_profile|zshrc|profile|kube|docker)\b|/etc/(?:passwd|shadow|sudoers|hosts)\b";

/// `rm` with a recursive flag aimed at `/` or `/*`.
const RM_RF_ROOT: &str = r"\brm\s+(?:-[A-Za-z]+\s+)*-[A-Za-z]*[rR][A-Za-z]*\s+(?:-[A-Za-z]+\s+)*/\*?(?:\s|$|[;&|])";

lazy_regex!(sensitive_filename_re, SENSITIVE_FILENAME);
lazy_regex!(sensitive_in_command_re, SENSITIVE_IN_COMMAND);
lazy_regex!(dangerous_path_re, DANGEROUS_PATH);
lazy_regex!(rm_rf_root_re, RM_RF_ROOT);

// ── Secrets ─────────────────────────────────────────────────────────────

/// Secret token shapes, with the label used in deny reasons.
pub const SECRET_PATTERNS: &[(&str, &str)] = &[
    ("AWS access key (AKIA...)", r"\bAKIA[0-9A-Z]{16}\b"),
    ("GitHub token (ghp_...)", r"\bgh[pousr]_[A-Za-z0-9]{20,}"),
    ("GitHub token (github_pat_...)", r"\bgithub_pat_[A-Za-z0-9_]{20,}"),
    ("private key", r"-----BEGIN (?:[A-Z0-9]+ )*PRIVATE KEY-----"),
];

pub fn secret_patterns() -> &'static [(&'static str, Regex)] {
    static SET: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    SET.get_or_init(|| {
        SECRET_PATTERNS
            .iter()
            .map(|(label, pat)| (*label, Regex::new(pat).unwrap()))
            .collect()
    })
}

/// Staged filenames that must never be committed.
const STAGED_SECRET_FILE: &str = r"(?i)^(?:\.env(?:\..+)?|credentials.*\.json|secrets.*\.json|.+\.pem|.+\.key|id_rsa|id_dsa|id_ecdsa|id_ed25519|\.npmrc|\.pypirc)$";

lazy_regex!(staged_secret_file_re, STAGED_SECRET_FILE);

// ── PII ─────────────────────────────────────────────────────────────────

/// Category keyword and detector. Keywords appear verbatim in warnings.
pub const PII_PATTERNS: &[(&str, &str)] = &[
    ("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
    ("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
    ("aws", r"\bAKIA[0-9A-Z]{16}\b"),
    ("github", r"\bgh[pousr]_[A-Za-z0-9]{20,}|\bgithub_pat_[A-Za-z0-9_]{20,}"),
    ("private key", r"-----BEGIN (?:[A-Z0-9]+ )*PRIVATE KEY-----"),
    ("phone", r"(?:\+1[-.\s]?)?(?:\(\d{3}\)\s?|\b\d{3}[-.\s])\d{3}[-.\s]\d{4}\b"),
];

pub fn pii_patterns() -> &'static [(&'static str, Regex)] {
    static SET: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    SET.get_or_init(|| {
        PII_PATTERNS
            .iter()
            .map(|(label, pat)| (*label, Regex::new(pat).unwrap()))
            .collect()
    })
}

/// Loopback and RFC 1918 addresses, masked before PII scanning.
const PRIVATE_IP: &str = r"\b(?:10\.\d{1,3}|127\.\d{1,3}|192\.168|172\.(?:1[6-9]|2\d|3[01]))\.\d{1,3}\.\d{1,3}\b";

lazy_regex!(private_ip_re, PRIVATE_IP);

// ── Git ─────────────────────────────────────────────────────────────────

pub const CONVENTIONAL_TYPES: &[&str] = &[
    "feat", "fix", "docs", "chore", "refactor", "test", "ci", "perf", "build", "style",
];

const CONVENTIONAL_COMMIT: &str =
    r"^(?:feat|fix|docs|chore|refactor|test|ci|perf|build|style)(?:\([^()\s][^()]*\))?!?: \S";

lazy_regex!(conventional_commit_re, CONVENTIONAL_COMMIT);

// ── Memory ──────────────────────────────────────────────────────────────

/// `<!-- Last Updated: YYYY-MM-DD -->`, the only accepted timestamp form.
const LAST_UPDATED: &str = r"^<!--\s*Last Updated:\s*(\d{4}-\d{2}-\d{2})\s*-->\s*$";

lazy_regex!(last_updated_re, LAST_UPDATED);

pub const VAGUE_PHRASES: &[&str] = &[
    "some ",
    "various ",
    "custom ",
    "interesting ",
    "etc.",
    "stuff",
    "things",
];

pub const VAGUE_LINE_THRESHOLD: usize = 3;

pub const ABSOLUTE_PATH_MARKERS: &[&str] = &["/home/", "/Users/", "C:\\Users\\"];

// ── Transcript mentions ─────────────────────────────────────────────────

lazy_regex!(context_mention_re, r"[\w.~/-]*\bcontext/[\w./-]+\.md");
lazy_regex!(memory_mention_re, r"[\w.~/-]*\bmemory/[\w./-]+\.md");
lazy_regex!(skill_mention_re, r"\bskills/([\w-]+)/SKILL\.md");
lazy_regex!(slash_command_re, r"(?m)^\s*/([A-Za-z][\w:-]*)");
lazy_regex!(tool_name_re, r#""tool_name"\s*:?\s*"([A-Za-z_]\w*)""#);
lazy_regex!(claudedocs_mention_re, r"[\w.~/-]*\bclaudedocs/[\w./-]+\.md");
lazy_regex!(write_tool_re, r"\b(?:Write|Edit|MultiEdit)\b");

// ── Skill output ────────────────────────────────────────────────────────

/// Memory sections copied into the project's cross-skill insights.
pub const INSIGHT_CATEGORIES: &[&str] = &["Critical", "Security", "Breaking", "Performance"];

lazy_regex!(markdown_heading_re, r"^(#{1,6})\s+(.+?)\s*#*\s*$");
lazy_regex!(kebab_case_md_re, r"^[a-z0-9]+(?:-[a-z0-9]+)*\.md$");
lazy_regex!(list_item_re, r"^\s*(?:[-*+]|\d+[.)])\s+\S");
lazy_regex!(dependency_token_re, r"[A-Za-z0-9@][A-Za-z0-9_./@-]*");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_filenames() {
        for name in [
            ".env",
            ".env.local",
            "server.pem",
            "private.key",
            ".npmrc",
            ".pypirc",
            ".netrc",
            ".git-credentials",
            "credentials.json",
            "credentials-prod.yaml",
            "service-account-key.json",
            "id_rsa",
            "id_ed25519.pub",
        ] {
            assert!(sensitive_filename_re().is_match(name), "{name} should be sensitive");
        }
        for name in ["main.rs", "environment.md", "keys.rs", "README.md", ".envrc"] {
            assert!(!sensitive_filename_re().is_match(name), "{name} should not be sensitive");
        }
    }

    #[test]
    fn test_sensitive_in_command() {
        for cmd in [
            "cat project/.env",
            "cat project/.pem",
            "cat project/.key",
            "cat project/.p12",
            "cat project/.pfx",
            "cat project/.htpasswd",
            "cat project/credentials.yaml",
            "cat project/service-account",
            "cp server.pem /tmp",
        ] {
            assert!(sensitive_in_command_re().is_match(cmd), "{cmd} should match");
        }
        for cmd in [
            "ls -la src/",
            "python3 -c 'print(1+1)'",
            "python -m venv .venv",
            "grep -r 'TODO' src/",
        ] {
            assert!(!sensitive_in_command_re().is_match(cmd), "{cmd} should not match");
        }
    }

    #[test]
    fn test_dangerous_paths_and_rm() {
        assert!(dangerous_path_re().is_match("cat ~/.ssh/config"));
        assert!(dangerous_path_re().is_match("cat $HOME/.aws/credentials"));
        assert!(dangerous_path_re().is_match("cat /etc/shadow"));
        assert!(!dangerous_path_re().is_match("cat ./config/app.toml"));

        assert!(rm_rf_root_re().is_match("rm -rf /"));
        assert!(rm_rf_root_re().is_match("sudo rm -fr /*"));
        assert!(rm_rf_root_re().is_match("rm -r -f / && echo"));
        assert!(!rm_rf_root_re().is_match("rm -rf /tmp/build"));
        assert!(!rm_rf_root_re().is_match("rm -rf ./target"));
    }

    #[test]
    fn test_staged_secret_files() {
        for name in [".env", ".env.production", "secrets.json", "credentials.json", "id_rsa", "ca.pem"] {
            assert!(staged_secret_file_re().is_match(name), "{name}");
        }
        assert!(!staged_secret_file_re().is_match("app.py"));
        assert!(!staged_secret_file_re().is_match("id_rsa.pub"));
    }

    #[test]
    fn test_conventional_commit() {
        for msg in [
            "feat: add login page",
            "refactor(auth): simplify token validation",
            "feat!: breaking change in API",
            "perf(db): optimize query performance",
        ] {
            assert!(conventional_commit_re().is_match(msg), "{msg}");
        }
        for msg in ["updated stuff", "fix bug", "WIP", "feat:missing space", "feature: x"] {
            assert!(!conventional_commit_re().is_match(msg), "{msg}");
        }
    }

    #[test]
    fn test_phone_does_not_match_ssn_or_ips() {
        let phone = &pii_patterns()[5].1;
        assert!(phone.is_match("Call me at 555-123-4567."));
        assert!(phone.is_match("Reach us at +1-555-123-4567."));
        assert!(phone.is_match("(555) 123-4567"));
        assert!(!phone.is_match("123-45-6789"));
        assert!(!phone.is_match("Connect to 192.168.1.1"));
        assert!(!phone.is_match("The array has 1234 elements"));
    }

    #[test]
    fn test_tool_name_mentions() {
        let text = "\"tool_name\" \"Read\"\n{\"tool_name\":\"Bash\"}";
        let names: Vec<_> = tool_name_re()
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(names, vec!["Read", "Bash"]);
    }

    #[test]
    fn test_markdown_headings() {
        let caps = markdown_heading_re().captures("### Finding 1: Database ##").unwrap();
        assert_eq!(&caps[1], "###");
        assert_eq!(&caps[2], "Finding 1: Database");
        assert!(markdown_heading_re().captures("#hashtag").is_none());
        assert!(markdown_heading_re().captures("- **Issue**: x").is_none());
    }

    #[test]
    fn test_write_tool_lines() {
        assert!(write_tool_re().is_match("Tool: Write claudedocs/a.md"));
        assert!(write_tool_re().is_match("{\"tool_name\":\"Edit\"}"));
        assert!(!write_tool_re().is_match("Tool: Read memory/a/b.md"));
        assert!(!write_tool_re().is_match("Rewrite the intro"));
    }
}
