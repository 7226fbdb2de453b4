use crate::output::print_json;
use anyhow::Context;
use holdfast_core::inbox::{Inbox, InboxItem};

pub fn run(session: &str, source: &str, prompt: &str, json: bool) -> anyhow::Result<()> {
    let inbox = Inbox::at_hub().context("failed to resolve the hub inbox")?;
    let path = inbox
        .enqueue(session, &InboxItem::new(prompt, source))
        .context("failed to queue the instruction")?;

    if json {
        return print_json(&serde_json::json!({
            "queued": true,
            "session": session,
            "path": path,
        }));
    }
    println!("Queued for session {session}: {}", path.display());
    Ok(())
}
