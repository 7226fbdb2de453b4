//! Discovery of the single state record governing a stop decision.
//!
//! Mode families are a strict priority order: explicit one-shot work
//! (relentless build/test/lint/verify) outranks long-running standby, which
//! outranks generic dev-loop modes. Within a family, files scoped to the
//! current session win over legacy unscoped files, and a file scoped to a
//! *different* session is never selected.

use crate::paths;
use crate::record::{self, StateRecord};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ModeFamily
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModeFamily {
    Relentless,
    Standby,
    Loop,
}

impl ModeFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeFamily::Relentless => "relentless",
            ModeFamily::Standby => "standby",
            ModeFamily::Loop => "loop",
        }
    }
}

impl fmt::Display for ModeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Governing
// ---------------------------------------------------------------------------

/// The record that governs the current stop decision.
#[derive(Debug, Clone)]
pub struct Governing {
    pub family: ModeFamily,
    pub path: PathBuf,
    pub record: StateRecord,
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFile {
    pub family: ModeFamily,
    pub file_name: String,
    pub session_segment: Option<String>,
}

/// Classify a `.holdfast/` file name into a mode family, or `None` for files
/// that are not state records.
pub fn classify(file_name: &str) -> Option<StateFile> {
    let stem = file_name.strip_suffix(paths::LOCAL_MD_SUFFIX)?;
    let (base, segment) = paths::split_session_segment(stem);

    let family = if base == paths::STANDBY_BASE {
        ModeFamily::Standby
    } else if base.strip_prefix("relentless-").is_some_and(|s| !s.is_empty()) {
        ModeFamily::Relentless
    } else if base.strip_suffix("-loop").is_some_and(|s| !s.is_empty()) {
        ModeFamily::Loop
    } else {
        return None;
    };

    Some(StateFile {
        family,
        file_name: file_name.to_string(),
        session_segment: segment.map(str::to_string),
    })
}

/// All state files under `.holdfast/`, sorted by file name for deterministic
/// tie-breaks. Missing directory yields an empty list.
pub fn scan(root: &Path) -> Vec<StateFile> {
    let dir = paths::holdfast_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut files: Vec<StateFile> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter_map(|name| classify(&name))
        .collect();
    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    files
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

/// Find the governing record for this session, if any.
///
/// Within each family the session-scoped candidates are tried first (in file
/// name order), then the legacy unscoped ones; the first candidate whose file
/// actually parses wins. An unreadable candidate is skipped rather than
/// aborting resolution: a damaged state file must degrade to "no governing
/// mode", never to a wedged session.
pub fn resolve(root: &Path, session_id: &str) -> Option<Governing> {
    let files = scan(root);
    let short = paths::session_short(session_id);

    for family in [ModeFamily::Relentless, ModeFamily::Standby, ModeFamily::Loop] {
        let scoped: Vec<&StateFile> = files
            .iter()
            .filter(|f| f.family == family && f.session_segment.as_deref() == Some(short))
            .collect();
        // Never fall through to legacy when a session-scoped match exists.
        let candidates: Vec<&StateFile> = if scoped.is_empty() {
            files
                .iter()
                .filter(|f| f.family == family && f.session_segment.is_none())
                .collect()
        } else {
            scoped
        };

        for candidate in candidates {
            let path = paths::holdfast_dir(root).join(&candidate.file_name);
            if let Some(rec) = record::read(&path) {
                return Some(Governing {
                    family,
                    path,
                    record: rec,
                });
            }
        }
    }
    None
}

/// Whether a standby record (scoped to this session, or legacy) exists.
///
/// Used by the passive pre-action hook: when the standby actor is polling the
/// inbox itself, the hook must not also claim items, or the two would race.
pub fn standby_active(root: &Path, session_id: &str) -> bool {
    let short = paths::session_short(session_id);
    scan(root).iter().any(|f| {
        f.family == ModeFamily::Standby
            && (f.session_segment.is_none() || f.session_segment.as_deref() == Some(short))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
