//! On-disk representation of a "keep working until X" session.
//!
//! A state record is a markdown file with a `---`-fenced key:value header and
//! a free-text body. The header is hand-edited by humans and by the assistant
//! itself, so parsing is deliberately permissive: unknown keys and malformed
//! lines are skipped, numeric fields fall back to defaults, and a file that
//! cannot be read at all simply yields no record. Every failure here must
//! leave the caller free to allow a normal stop.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

// ---------------------------------------------------------------------------
// StateRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub skill: String,
    pub iteration: u32,
    pub max_iterations: u32,
    pub enabled: bool,
    pub completion_promise: Option<String>,
    /// Standby only: consecutive polls that found nothing pending.
    pub idle_count: u32,
    /// Free-text body: task description and progress log.
    pub task: String,
}

impl Default for StateRecord {
    fn default() -> Self {
        Self {
            skill: String::new(),
            iteration: 1,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            enabled: true,
            completion_promise: None,
            idle_count: 0,
            task: String::new(),
        }
    }
}

impl StateRecord {
    /// Human label for the record's skill: `build` → `Build`,
    /// `fix-the-tests` → `Fix The Tests`.
    pub fn skill_display(&self) -> String {
        if self.skill.is_empty() {
            return "Relentless".to_string();
        }
        self.skill
            .split('-')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// read
// ---------------------------------------------------------------------------

/// Read a state record, or `None` for a missing, unreadable, or structurally
/// invalid file (no frontmatter fence).
pub fn read(path: &Path) -> Option<StateRecord> {
    let content = std::fs::read_to_string(path).ok()?;
    parse(&content)
}

fn parse(content: &str) -> Option<StateRecord> {
    let rest = content.strip_prefix("---")?;
    let (header, body) = rest.split_once("---")?;

    let mut record = StateRecord {
        task: body.trim().to_string(),
        ..StateRecord::default()
    };

    for line in header.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key {
            "skill" => record.skill = value.to_string(),
            "iteration" => {
                if let Ok(n) = value.parse() {
                    record.iteration = n;
                }
            }
            "max_iterations" => {
                if let Ok(n) = value.parse() {
                    record.max_iterations = n;
                }
            }
            "idle_count" => {
                if let Ok(n) = value.parse() {
                    record.idle_count = n;
                }
            }
            "enabled" => match value.to_ascii_lowercase().as_str() {
                "false" | "no" | "0" => record.enabled = false,
                _ => record.enabled = true,
            },
            "completion_promise" => {
                if !value.is_empty() {
                    record.completion_promise = Some(value.to_string());
                }
            }
            // Unknown keys are someone else's business.
            _ => {}
        }
    }

    Some(record)
}

// ---------------------------------------------------------------------------
// write_iteration
// ---------------------------------------------------------------------------

static ITERATION_LINE_RE: OnceLock<Regex> = OnceLock::new();

fn iteration_line_re() -> &'static Regex {
    ITERATION_LINE_RE.get_or_init(|| Regex::new(r"(?m)^iteration:\s*\d+").unwrap())
}

/// Update only the `iteration:` header line, leaving every other byte of the
/// file alone. A targeted substitution rather than a full rewrite: the body
/// is a progress log the assistant may be appending to concurrently, and
/// losing its edits is worse than losing one counter bump.
///
/// Best-effort: returns false (and changes nothing) when the file is missing,
/// unreadable, or has no iteration line.
pub fn write_iteration(path: &Path, iteration: u32) -> bool {
    let Ok(content) = std::fs::read_to_string(path) else {
        return false;
    };
    let replacement = format!("iteration: {iteration}");
    match iteration_line_re().replace(&content, replacement.as_str()) {
        std::borrow::Cow::Borrowed(_) => false,
        std::borrow::Cow::Owned(updated) => std::fs::write(path, updated.as_bytes()).is_ok(),
    }
}

// ---------------------------------------------------------------------------
// delete
// ---------------------------------------------------------------------------

/// Best-effort removal. "Already gone" is the expected outcome of a racing
/// cleanup, not an error.
pub fn delete(path: &Path) {
    let _ = std::fs::remove_file(path);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
