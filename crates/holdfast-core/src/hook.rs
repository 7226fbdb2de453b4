//! Wire contract between the assistant runtime and a hook process.
//!
//! Every hook reads one JSON object from stdin describing the triggering
//! event and writes one JSON object to stdout with its decision. A hook that
//! has nothing to say prints `{}`. Hooks always exit 0; blocking is expressed
//! in the output payload, never through the exit code.

use serde::{Deserialize, Serialize};
use std::io::Read;

// ---------------------------------------------------------------------------
// HookInput
// ---------------------------------------------------------------------------

/// The event object the runtime feeds a hook on stdin.
///
/// Only `session_id` is common to every trigger; the rest varies by event
/// type, so every field defaults rather than failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub hook_event_name: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub tool_input: Option<serde_json::Value>,
}

impl HookInput {
    /// Best-effort parse. Unreadable or malformed input yields the default
    /// (all-empty) event; a hook must never crash on its trigger payload.
    pub fn from_reader(mut reader: impl Read) -> Self {
        let mut buf = String::new();
        if reader.read_to_string(&mut buf).is_err() {
            return Self::default();
        }
        serde_json::from_str(&buf).unwrap_or_default()
    }

    /// The session id, or `"unknown"` when the runtime omitted it.
    pub fn session_id_or_unknown(&self) -> &str {
        if self.session_id.is_empty() {
            "unknown"
        } else {
            &self.session_id
        }
    }

    /// For `Skill` tool events, the name of the invoked skill.
    pub fn skill_name(&self) -> Option<String> {
        if self.tool_name != "Skill" {
            return None;
        }
        self.tool_input
            .as_ref()?
            .get("skill")?
            .as_str()
            .map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// HookOutput
// ---------------------------------------------------------------------------

/// The decision object a hook prints to stdout.
///
/// Serializes to `{}` when every field is unset, which is the "no opinion"
/// response the runtime expects from a pass-through hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HookOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(
        rename = "additionalContext",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_context: Option<String>,
}

impl HookOutput {
    pub fn none() -> Self {
        Self::default()
    }

    /// Block the pending stop; `reason` becomes the assistant's next turn.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Some("block".to_string()),
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Allow the action and surface a short message to the user.
    pub fn system_message(message: impl Into<String>) -> Self {
        Self {
            system_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Inject context into the assistant's next turn without blocking.
    pub fn context(context: impl Into<String>) -> Self {
        Self {
            additional_context: Some(context.into()),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> String {
        // Serialization of this struct cannot fail; fall back to the no-op
        // object rather than panicking inside a hook.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
