use crate::error::{HoldfastError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HOLDFAST_DIR: &str = ".holdfast";
pub const CONFIG_FILE: &str = ".holdfast/config.yaml";

/// Marker suffix shared by all state files. Files carrying it are
/// machine-managed and belong in .gitignore.
pub const LOCAL_MD_SUFFIX: &str = ".local.md";

/// Base name of the standby state file (before scope segment and suffix).
pub const STANDBY_BASE: &str = "standby-state";

/// Hub directory under $HOME, shared across all projects on the machine.
pub const HUB_DIR_NAME: &str = ".holdfast-mission-control";
pub const HUB_ENV: &str = "HOLDFAST_HUB_DIR";

/// Timestamp cache for the reporter's artifact sync.
pub const SYNC_STAMP_FILE: &str = ".holdfast/.mc-last-sync";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn holdfast_dir(root: &Path) -> PathBuf {
    root.join(HOLDFAST_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn sync_stamp_path(root: &Path) -> PathBuf {
    root.join(SYNC_STAMP_FILE)
}

/// Resolve the machine-wide hub directory.
///
/// Priority: `HOLDFAST_HUB_DIR` env var, then `$HOME/.holdfast-mission-control`.
pub fn hub_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(HUB_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    home::home_dir()
        .map(|h| h.join(HUB_DIR_NAME))
        .ok_or(HoldfastError::HomeNotFound)
}

pub fn inbox_dir(hub: &Path) -> PathBuf {
    hub.join("inbox")
}

// ---------------------------------------------------------------------------
// Session scoping
// ---------------------------------------------------------------------------

/// The short session identifier used in file names: the first 8 characters
/// of the full session id. Session ids are UUIDs, so this prefix is hex.
pub fn session_short(session_id: &str) -> &str {
    match session_id.char_indices().nth(8) {
        Some((idx, _)) => &session_id[..idx],
        None => session_id,
    }
}

static SESSION_SEGMENT_RE: OnceLock<Regex> = OnceLock::new();

fn session_segment_re() -> &'static Regex {
    SESSION_SEGMENT_RE.get_or_init(|| Regex::new(r"^[0-9a-f]{8}$").unwrap())
}

/// Whether a filename token looks like a short session identifier.
pub fn is_session_segment(token: &str) -> bool {
    session_segment_re().is_match(token)
}

/// Split a state-file stem (suffix already removed) into its base name and
/// optional session segment. `relentless-build.1a2b3c4d` yields
/// `("relentless-build", Some("1a2b3c4d"))`; a trailing token that does not
/// look like a session id stays part of the base.
pub fn split_session_segment(stem: &str) -> (&str, Option<&str>) {
    if let Some((base, token)) = stem.rsplit_once('.') {
        if is_session_segment(token) {
            return (base, Some(token));
        }
    }
    (stem, None)
}

/// Build a state-file name from its base and optional session scope:
/// `standby-state` + `1a2b3c4d` → `standby-state.1a2b3c4d.local.md`.
pub fn state_file_name(base: &str, session_id: Option<&str>) -> String {
    match session_id {
        Some(id) => format!("{base}.{}{LOCAL_MD_SUFFIX}", session_short(id)),
        None => format!("{base}{LOCAL_MD_SUFFIX}"),
    }
}

pub fn relentless_base(skill: &str) -> String {
    format!("relentless-{skill}")
}

pub fn loop_base(name: &str) -> String {
    format!("{name}-loop")
}

/// Session ids become file and directory names; refuse anything that could
/// escape the inbox directory.
pub fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty()
        || session_id == "."
        || session_id == ".."
        || session_id.contains('/')
        || session_id.contains('\\')
    {
        return Err(HoldfastError::InvalidSessionId(session_id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_short_truncates() {
        assert_eq!(session_short("1a2b3c4d-5e6f-7890"), "1a2b3c4d");
        assert_eq!(session_short("short"), "short");
        assert_eq!(session_short(""), "");
    }

    #[test]
    fn session_segment_detection() {
        assert!(is_session_segment("1a2b3c4d"));
        assert!(is_session_segment("00000000"));
        assert!(!is_session_segment("1a2b3c4"));
        assert!(!is_session_segment("1a2b3c4d5"));
        assert!(!is_session_segment("1A2B3C4D"));
        assert!(!is_session_segment("build"));
    }

    #[test]
    fn split_segment_variants() {
        assert_eq!(
            split_session_segment("relentless-build.1a2b3c4d"),
            ("relentless-build", Some("1a2b3c4d"))
        );
        assert_eq!(
            split_session_segment("relentless-build"),
            ("relentless-build", None)
        );
        // A dotted skill name that is not a session id stays intact.
        assert_eq!(
            split_session_segment("relentless-build.release"),
            ("relentless-build.release", None)
        );
    }

    #[test]
    fn state_file_names() {
        assert_eq!(
            state_file_name(&relentless_base("build"), Some("1a2b3c4d-5e6f")),
            "relentless-build.1a2b3c4d.local.md"
        );
        assert_eq!(
            state_file_name(STANDBY_BASE, None),
            "standby-state.local.md"
        );
        assert_eq!(
            state_file_name(&loop_base("refactor"), None),
            "refactor-loop.local.md"
        );
    }

    #[test]
    fn session_id_validation() {
        validate_session_id("1a2b3c4d-5e6f-7890").unwrap();
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(validate_session_id(bad).is_err(), "expected invalid: {bad}");
        }
    }

    #[test]
    fn hub_dir_env_override() {
        // Serialize via a scoped env var name unlikely to collide.
        std::env::set_var(HUB_ENV, "/tmp/holdfast-test-hub");
        assert_eq!(hub_dir().unwrap(), PathBuf::from("/tmp/holdfast-test-hub"));
        std::env::remove_var(HUB_ENV);
    }
}
