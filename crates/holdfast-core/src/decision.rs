//! The per-invocation stop decision.
//!
//! Invoked every time the assistant tries to end its turn. The machine never
//! runs a build, test, or lint command itself: it counts iterations and
//! relays instructions, and the actor performs the actual work and verifies
//! its own completion promise. (An earlier design executed the check command
//! inside the hook and matched its output against a success pattern; that
//! variant couples the hook to the project's shell environment and was
//! rejected in favor of delegating execution to the actor.)

use crate::config::Config;
use crate::hook::HookOutput;
use crate::record::{self, StateRecord};
use crate::resolver::{self, Governing, ModeFamily};
use std::path::Path;

// ---------------------------------------------------------------------------
// StopDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopDecision {
    /// No governing mode: normal exit, no output.
    Allow,
    /// Terminal exit with a short user-visible summary (mode exhausted or
    /// explicitly disabled).
    AllowWithSummary(String),
    /// Keep working; the payload becomes the assistant's next instruction.
    Block(String),
}

impl StopDecision {
    pub fn into_output(self) -> HookOutput {
        match self {
            StopDecision::Allow => HookOutput::none(),
            StopDecision::AllowWithSummary(msg) => HookOutput::system_message(msg),
            StopDecision::Block(reason) => HookOutput::block(reason),
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, StopDecision::Block(_))
    }
}

// ---------------------------------------------------------------------------
// decide
// ---------------------------------------------------------------------------

/// Run one stop decision for `session_id` against the project at `root`.
///
/// Side effects: an ACTIVE decision increments the governing record's
/// iteration counter in place; an exhausted record is deleted. A disabled
/// record is left untouched so it can be re-enabled later.
pub fn decide(root: &Path, session_id: &str, config: &Config) -> StopDecision {
    let Some(gov) = resolver::resolve(root, session_id) else {
        return StopDecision::Allow;
    };

    let display = mode_display(&gov);

    if !gov.record.enabled {
        return StopDecision::AllowWithSummary(format!(
            "{display} mode is disabled. Stopping; `{}` was kept so it can be re-enabled.",
            gov.path.display()
        ));
    }

    if gov.record.iteration >= gov.record.max_iterations {
        record::delete(&gov.path);
        return StopDecision::AllowWithSummary(format!(
            "{display} mode: reached max iterations ({}). Stopping. Review remaining issues and decide next steps.",
            gov.record.max_iterations
        ));
    }

    let iteration = gov.record.iteration + 1;
    // Best-effort: a lost counter bump costs one extra blocked turn at worst.
    record::write_iteration(&gov.path, iteration);

    let reason = match gov.family {
        ModeFamily::Relentless => relentless_message(&gov, iteration, config),
        ModeFamily::Standby => standby_message(&gov, iteration, session_id, config),
        ModeFamily::Loop => loop_message(&gov, iteration, config),
    };
    StopDecision::Block(reason)
}

fn mode_display(gov: &Governing) -> String {
    match gov.family {
        ModeFamily::Relentless => format!("Relentless {}", gov.record.skill_display()),
        ModeFamily::Standby => "Standby".to_string(),
        ModeFamily::Loop => "Loop".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Continuation messages
// ---------------------------------------------------------------------------

fn relentless_message(gov: &Governing, iteration: u32, config: &Config) -> String {
    let rec = &gov.record;
    let promise = rec
        .completion_promise
        .as_deref()
        .unwrap_or("the task's success criteria");
    let task = task_excerpt(rec, config);

    format!(
        "**Relentless Mode: {skill} — Iteration {iteration}/{max}**\n\n\
         The completion promise has not been verified yet: {promise}\n\n\
         **Your task:**\n{task}\n\n\
         Re-run the check, analyze any failures, fix them, and check again.\n\
         This hook does not run the check for you — it only counts iterations.\n\
         Once the promise above genuinely holds, delete `{path}` yourself and stop.",
        skill = rec.skill_display(),
        max = rec.max_iterations,
        path = gov.path.display(),
    )
}

fn standby_message(gov: &Governing, iteration: u32, session_id: &str, config: &Config) -> String {
    let rec = &gov.record;
    let sleep = backoff_secs(
        config.backoff_base_secs,
        config.backoff_cap_secs,
        rec.idle_count,
    );

    format!(
        "**Standby Mode — Iteration {iteration}/{max}**\n\n\
         You are on standby for operator commands. In order:\n\n\
         1. Poll the inbox (this also recovers stale claimed items):\n   \
            `holdfast poll --session {session_id}`\n\
         2. If a command is delivered, execute it, mark it processed with the\n   \
            `holdfast done <path>` line that poll printed, and reset\n   \
            `idle_count: 0` in `{path}`.\n\
         3. If nothing is pending, set `idle_count: {next_idle}` in `{path}`,\n   \
            wait {sleep} seconds (min({base} * 2^idle_count, {cap})), and try\n   \
            to stop again.\n\n\
         Stay on standby until `{path}` is deleted or disabled.",
        max = rec.max_iterations,
        path = gov.path.display(),
        next_idle = rec.idle_count + 1,
        base = config.backoff_base_secs,
        cap = config.backoff_cap_secs,
    )
}

fn loop_message(gov: &Governing, iteration: u32, config: &Config) -> String {
    let rec = &gov.record;
    let task = task_excerpt(rec, config);

    format!(
        "**Loop Mode — Iteration {iteration}/{max}**\n\n\
         Re-read the progress log below, re-run your check, fix the next\n\
         issue, and update the progress section of `{path}` with what changed.\n\n\
         {task}\n\n\
         When a full run is clean — zero errors, zero warnings — delete\n\
         `{path}` and stop.",
        max = rec.max_iterations,
        path = gov.path.display(),
    )
}

fn task_excerpt(rec: &StateRecord, config: &Config) -> String {
    if rec.task.is_empty() {
        "Complete the task described when this mode was started.".to_string()
    } else {
        truncate_middle(&rec.task, config.max_task_excerpt)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Idle backoff: `min(base * 2^idle_count, cap)` seconds, saturating.
pub fn backoff_secs(base: u64, cap: u64, idle_count: u32) -> u64 {
    let factor = 1u64.checked_shl(idle_count).unwrap_or(u64::MAX);
    base.saturating_mul(factor).min(cap)
}

/// Keep the head and tail of an over-long text, eliding the middle. Long task
/// bodies would otherwise crowd the real instructions out of the message.
pub fn truncate_middle(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let half = max_len / 2;
    let head_end = floor_char_boundary(text, half);
    let tail_start = ceil_char_boundary(text, text.len() - half);
    format!(
        "{}\n\n... (truncated) ...\n\n{}",
        &text[..head_end],
        &text[tail_start..]
    )
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
