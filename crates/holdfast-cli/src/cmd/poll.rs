use crate::output::print_json;
use anyhow::Context;
use holdfast_core::config::Config;
use holdfast_core::inbox::Inbox;
use std::path::Path;
use std::time::Duration;

/// One standby poll: recover abandoned claims, then claim the oldest pending
/// instruction. Exit 0 in every outcome; "nothing pending" is not an error.
pub fn run(root: &Path, session: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root);
    let inbox = Inbox::at_hub().context("failed to resolve the hub inbox")?;

    let recovered = inbox.recover_stale(session, Duration::from_secs(config.stale_claim_secs));
    if recovered > 0 && !json {
        println!("Recovered {recovered} stale claimed item(s) back to pending.");
    }

    if inbox.has_inflight(session) {
        if json {
            return print_json(&serde_json::json!({ "status": "inflight" }));
        }
        println!("A command is already in flight; finish it before polling again.");
        return Ok(());
    }

    match inbox.claim_next(session) {
        Some(claimed) => {
            if json {
                return print_json(&serde_json::json!({
                    "status": "claimed",
                    "prompt": claimed.item.prompt,
                    "source": claimed.item.source,
                    "claim_path": claimed.claim_path,
                }));
            }
            println!("Claimed instruction from {}:", claimed.item.source);
            println!();
            println!("{}", claimed.item.prompt);
            println!();
            println!("When complete, run: holdfast done {}", claimed.claim_path.display());
            Ok(())
        }
        None => {
            if json {
                return print_json(&serde_json::json!({ "status": "idle" }));
            }
            println!("Nothing pending.");
            Ok(())
        }
    }
}
