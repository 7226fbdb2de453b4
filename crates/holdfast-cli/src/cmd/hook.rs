//! Hook entry points.
//!
//! Each subcommand is wired to one assistant lifecycle event and speaks the
//! stdin/stdout JSON contract. Hooks always exit 0 and always print exactly
//! one JSON object: an internal failure degrades to `{}` (no opinion), never
//! to a broken turn. Diagnostics go to stderr via tracing only.

use crate::root;
use anyhow::Result;
use clap::Subcommand;
use holdfast_core::config::Config;
use holdfast_core::decision;
use holdfast_core::hook::{HookInput, HookOutput};
use holdfast_core::inbox::{ClaimedItem, Inbox, InboxItem};
use holdfast_core::reporter::{self, Event, Reporter};
use holdfast_core::resolver;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum HookSubcommand {
    /// Stop hook: decide whether the session may end its turn
    Stop,
    /// PreToolUse hook: deliver pending operator instructions
    Inject,
    /// Telemetry hook: report the event to mission control if it is up
    Report,
}

pub fn run(explicit_root: Option<&Path>, subcommand: HookSubcommand) -> Result<()> {
    let input = HookInput::from_reader(std::io::stdin().lock());
    let start = (!input.cwd.is_empty()).then(|| PathBuf::from(&input.cwd));
    let root = root::resolve_root(explicit_root, start.as_deref());

    let output = match subcommand {
        HookSubcommand::Stop => stop(&root, &input),
        HookSubcommand::Inject => inject(&root, &input),
        HookSubcommand::Report => report(&root, &input),
    };
    println!("{}", output.to_json());
    Ok(())
}

// ---------------------------------------------------------------------------
// Stop
// ---------------------------------------------------------------------------

fn stop(root: &Path, input: &HookInput) -> HookOutput {
    let config = Config::load(root);
    let decision = decision::decide(root, input.session_id_or_unknown(), &config);
    tracing::debug!(?decision, "stop decision");
    decision.into_output()
}

// ---------------------------------------------------------------------------
// Inject
// ---------------------------------------------------------------------------

fn inject(root: &Path, input: &HookInput) -> HookOutput {
    let session = input.session_id_or_unknown();

    // Standby sessions poll the inbox themselves; a second claimer here
    // would race the actor or strand items inflight.
    if resolver::standby_active(root, session) {
        return HookOutput::none();
    }

    let Ok(inbox) = Inbox::at_hub() else {
        return HookOutput::none();
    };

    // A command is mid-execution; don't pile a second one on top.
    if inbox.has_inflight(session) {
        return HookOutput::none();
    }

    if let Some(claimed) = inbox.claim_next(session) {
        return HookOutput::context(format_queue_delivery(&claimed));
    }
    if let Some(item) = inbox.take_legacy(session) {
        return HookOutput::context(format_delivery(&item));
    }
    HookOutput::none()
}

fn rule() -> String {
    "━".repeat(60)
}

fn format_delivery(item: &InboxItem) -> String {
    let rule = rule();
    format!(
        "{rule}\nMISSION CONTROL — Operator Instruction Received\n{rule}\n\n\
         {prompt}\n\n\
         {rule}\nSource: {source}\n{rule}\n\n\
         The operator has sent you an instruction. Acknowledge receipt and act\n\
         on it now.",
        prompt = item.prompt,
        source = item.source,
    )
}

fn format_queue_delivery(claimed: &ClaimedItem) -> String {
    format!(
        "{}\n\nWhen the instruction is complete, mark it processed:\n    \
         holdfast done {}",
        format_delivery(&claimed.item),
        claimed.claim_path.display(),
    )
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

fn report(root: &Path, input: &HookInput) -> HookOutput {
    let config = Config::load(root);
    let client = Reporter::new(config.server_url);

    // Passive mode: the server is only talked to when it is already up.
    if !client.is_server_up() {
        return HookOutput::none();
    }

    let mut event = Event::from_hook(input);
    event.artifacts = reporter::unsynced_artifacts(root);
    let had_artifacts = !event.artifacts.is_empty();

    if client.send_event(&event) && had_artifacts {
        reporter::record_sync(root);
    }
    HookOutput::none()
}
