use crate::output::print_json;
use anyhow::Context;
use holdfast_core::inbox::Inbox;
use std::path::Path;

pub fn run(claim_path: &Path, json: bool) -> anyhow::Result<()> {
    let processed = Inbox::mark_processed(claim_path)
        .context("failed to mark the claimed item processed")?;

    if json {
        return print_json(&serde_json::json!({
            "processed": true,
            "path": processed,
        }));
    }
    println!("Processed: {}", processed.display());
    Ok(())
}
