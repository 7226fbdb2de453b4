use anyhow::Context;
use holdfast_core::config::Config;
use holdfast_core::{io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    io::ensure_dir(&paths::holdfast_dir(root)).context("failed to create .holdfast/")?;

    let wrote_config = io::write_if_missing(
        &paths::config_path(root),
        Config::starter_yaml().as_bytes(),
    )
    .context("failed to write starter config")?;

    // State files and the sync stamp are per-machine working state.
    for entry in [
        ".holdfast/*.local.md",
        ".holdfast/*.local.json",
        ".holdfast/.mc-last-sync",
    ] {
        io::ensure_gitignore_entry(root, entry).context("failed to update .gitignore")?;
    }

    println!("Initialized {}", paths::holdfast_dir(root).display());
    if wrote_config {
        println!("Wrote starter config: {}", paths::CONFIG_FILE);
    }
    Ok(())
}
