//! Per-session command inbox with a three-state item lifecycle.
//!
//! An external controller (the mission-control server, or `holdfast send`)
//! drops JSON items into `<inbox>/<session_id>/`. Items move
//! `.json` (pending) → `.inflight` (claimed) → `.processed` (done), and the
//! pending→claimed transition is an atomic `rename`: two concurrent readers
//! can never claim the same item, because exactly one rename succeeds.
//!
//! A deprecated single-file format (`<inbox>/<session_id>.json`) predates the
//! queue directory; it is consumed and deleted in one step since only one
//! such command can exist at a time.

use crate::error::{HoldfastError, Result};
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

pub const PENDING_EXT: &str = "json";
pub const INFLIGHT_EXT: &str = "inflight";
pub const PROCESSED_EXT: &str = "processed";

// ---------------------------------------------------------------------------
// InboxItem
// ---------------------------------------------------------------------------

/// One externally-submitted instruction.
///
/// `timestamp` is kept loose: the dashboard writes epoch millis, `holdfast
/// send` writes RFC 3339, and neither matters beyond audit display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxItem {
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
}

fn default_source() -> String {
    "Mission Control".to_string()
}

impl InboxItem {
    pub fn new(prompt: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source: source.into(),
            timestamp: Some(serde_json::Value::String(
                chrono::Utc::now().to_rfc3339(),
            )),
        }
    }
}

/// A successfully claimed item plus the path of its `.inflight` file, which
/// doubles as the token needed to mark it processed.
#[derive(Debug, Clone)]
pub struct ClaimedItem {
    pub item: InboxItem,
    pub claim_path: PathBuf,
}

/// Queue occupancy for one session, for status displays.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueSummary {
    pub pending: usize,
    pub inflight: usize,
    pub processed: usize,
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Inbox {
    root: PathBuf,
}

impl Inbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The machine-wide inbox under the hub directory.
    pub fn at_hub() -> Result<Self> {
        Ok(Self::new(paths::inbox_dir(&paths::hub_dir()?)))
    }

    pub fn queue_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    fn legacy_path(&self, session_id: &str) -> PathBuf {
        self.root.join(format!("{session_id}.{PENDING_EXT}"))
    }

    // -----------------------------------------------------------------------
    // Producer side
    // -----------------------------------------------------------------------

    /// Write a new pending item into the session's queue directory.
    ///
    /// File names start with the creation time in millis so that name order
    /// matches arrival order; a uuid fragment keeps same-millisecond writers
    /// from colliding.
    pub fn enqueue(&self, session_id: &str, item: &InboxItem) -> Result<PathBuf> {
        paths::validate_session_id(session_id)?;
        let millis = chrono::Utc::now().timestamp_millis().max(0);
        let tag = Uuid::new_v4().simple().to_string();
        let name = format!("{millis:013}-{}.{PENDING_EXT}", &tag[..8]);
        let path = self.queue_dir(session_id).join(name);
        io::atomic_write(&path, serde_json::to_string_pretty(item)?.as_bytes())?;
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Consumer side
    // -----------------------------------------------------------------------

    /// Whether a claimed-but-unprocessed item exists for this session.
    pub fn has_inflight(&self, session_id: &str) -> bool {
        !self.list_with_ext(session_id, INFLIGHT_EXT).is_empty()
    }

    /// Claim the oldest pending item, or return `None` when the queue is
    /// empty or a command is already mid-execution.
    ///
    /// The claim is the rename itself: a racing claimer loses the rename and
    /// moves on to the next-oldest item. Corrupt items are skipped in place
    /// rather than claimed, so one bad write never wedges the queue.
    pub fn claim_next(&self, session_id: &str) -> Option<ClaimedItem> {
        if paths::validate_session_id(session_id).is_err() {
            return None;
        }
        if self.has_inflight(session_id) {
            return None;
        }

        for pending in self.pending(session_id) {
            let Ok(raw) = std::fs::read(&pending) else {
                continue;
            };
            let Ok(item) = serde_json::from_slice::<InboxItem>(&raw) else {
                continue;
            };
            let claim_path = pending.with_extension(INFLIGHT_EXT);
            if std::fs::rename(&pending, &claim_path).is_err() {
                // Lost the race; another claimer owns this item now.
                continue;
            }
            // Refresh the file's mtime so staleness is measured from the
            // claim, not from when the item was first enqueued.
            let _ = std::fs::write(&claim_path, &raw);
            return Some(ClaimedItem { item, claim_path });
        }
        None
    }

    /// Oldest-first pending items (creation time, then name).
    pub fn pending(&self, session_id: &str) -> Vec<PathBuf> {
        let mut items = self.list_with_ext(session_id, PENDING_EXT);
        items.sort_by_cached_key(|p| fifo_key(p));
        items
    }

    /// Return claimed items older than `older_than` to the pending state.
    /// Covers actors that died mid-command; the recovered item keeps its
    /// position at the front of the queue. Returns how many were recovered.
    pub fn recover_stale(&self, session_id: &str, older_than: Duration) -> usize {
        let now = SystemTime::now();
        let mut recovered = 0;
        for inflight in self.list_with_ext(session_id, INFLIGHT_EXT) {
            let stale = std::fs::metadata(&inflight)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| now.duration_since(mtime).ok())
                .is_some_and(|age| age >= older_than);
            if stale && std::fs::rename(&inflight, inflight.with_extension(PENDING_EXT)).is_ok() {
                recovered += 1;
            }
        }
        recovered
    }

    /// Move a claimed item to the processed state. The file is retained for
    /// audit, not deleted.
    pub fn mark_processed(claim_path: &Path) -> Result<PathBuf> {
        if claim_path.extension().and_then(|e| e.to_str()) != Some(INFLIGHT_EXT) {
            return Err(HoldfastError::NotClaimed(
                claim_path.display().to_string(),
            ));
        }
        if !claim_path.exists() {
            return Err(HoldfastError::ClaimNotFound(
                claim_path.display().to_string(),
            ));
        }
        let done = claim_path.with_extension(PROCESSED_EXT);
        std::fs::rename(claim_path, &done)?;
        Ok(done)
    }

    /// Consume the deprecated single-file inbox for this session, if present.
    /// No intermediate claimed state exists in this format: parse, delete,
    /// deliver. A corrupt file is left alone rather than destroyed.
    pub fn take_legacy(&self, session_id: &str) -> Option<InboxItem> {
        if paths::validate_session_id(session_id).is_err() {
            return None;
        }
        let path = self.legacy_path(session_id);
        let raw = std::fs::read(&path).ok()?;
        let item = serde_json::from_slice::<InboxItem>(&raw).ok()?;
        let _ = std::fs::remove_file(&path);
        Some(item)
    }

    pub fn summary(&self, session_id: &str) -> QueueSummary {
        QueueSummary {
            pending: self.list_with_ext(session_id, PENDING_EXT).len(),
            inflight: self.list_with_ext(session_id, INFLIGHT_EXT).len(),
            processed: self.list_with_ext(session_id, PROCESSED_EXT).len(),
        }
    }

    fn list_with_ext(&self, session_id: &str, ext: &str) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(self.queue_dir(session_id)) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ext))
            .collect()
    }
}

/// FIFO ordering key: creation time where the filesystem reports one,
/// modification time otherwise, file name as the tie-break.
fn fifo_key(path: &Path) -> (SystemTime, String) {
    let time = std::fs::metadata(path)
        .map(|m| m.created().or_else(|_| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH))
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (time, name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
