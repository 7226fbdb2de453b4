//! Best-effort telemetry push to the mission-control server.
//!
//! Strictly passive: the server is only talked to when it is already up, and
//! every network failure is swallowed. Telemetry is advisory. An event lost
//! during an outage is simply lost, with no retry and no queueing, because a
//! hook that waits on the network would stall the assistant's turn.

use crate::hook::HookInput;
use crate::paths;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_millis(500);
const EVENT_TIMEOUT: Duration = Duration::from_secs(1);

/// Artifact files attached per event, at most.
const MAX_ARTIFACTS: usize = 10;

/// Schema-tag prefix that marks a local JSON file as ours to sync.
const ARTIFACT_SCHEMA_PREFIX: &str = "holdfast/";

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub session_id: String,
    pub project: String,
    pub project_path: String,
    pub event: String,
    pub tool: String,
    /// Seconds since the epoch, fractional.
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<serde_json::Value>,
}

impl Event {
    /// Build the payload for a hook invocation. The project name is the
    /// basename of the working directory.
    pub fn from_hook(input: &HookInput) -> Self {
        let project = Path::new(&input.cwd)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            session_id: input.session_id_or_unknown().to_string(),
            project,
            project_path: input.cwd.clone(),
            event: input.hook_event_name.clone(),
            tool: input.tool_name.clone(),
            timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            skill: input.skill_name(),
            artifacts: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

pub struct Reporter {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl Reporter {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Short liveness probe. Any failure (timeout, refused connection, DNS)
    /// reads as "down", never as an error.
    pub fn is_server_up(&self) -> bool {
        self.client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Fire one event. Returns whether the server acknowledged it; callers
    /// are free to ignore the answer.
    pub fn send_event(&self, event: &Event) -> bool {
        self.client
            .post(format!("{}/api/events", self.base_url))
            .timeout(EVENT_TIMEOUT)
            .json(event)
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Artifact sync
// ---------------------------------------------------------------------------

/// Local JSON artifacts not yet pushed to the server.
///
/// Scans `.holdfast/*.local.json` for files carrying a recognized `schema`
/// tag and a modification time newer than the last successful sync, so
/// unchanged data is not re-sent on every event.
pub fn unsynced_artifacts(root: &Path) -> Vec<serde_json::Value> {
    let last_sync = read_sync_stamp(root);
    let dir = paths::holdfast_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.ends_with(".local.json"))
        .collect();
    names.sort();

    let mut artifacts = Vec::new();
    for name in names {
        if artifacts.len() >= MAX_ARTIFACTS {
            break;
        }
        let path = dir.join(&name);
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if modified <= last_sync {
            continue;
        }
        let Ok(raw) = std::fs::read(&path) else {
            continue;
        };
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(&raw) else {
            continue;
        };
        let recognized = value
            .get("schema")
            .and_then(|s| s.as_str())
            .is_some_and(|s| s.starts_with(ARTIFACT_SCHEMA_PREFIX));
        if recognized {
            artifacts.push(serde_json::json!({ "file": name, "data": value }));
        }
    }
    artifacts
}

/// Record that everything on disk as of now has been pushed.
pub fn record_sync(root: &Path) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let _ = crate::io::atomic_write(&paths::sync_stamp_path(root), now.to_string().as_bytes());
}

fn read_sync_stamp(root: &Path) -> u64 {
    std::fs::read_to_string(paths::sync_stamp_path(root))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
