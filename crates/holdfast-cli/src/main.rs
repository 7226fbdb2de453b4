mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::hook::HookSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "holdfast",
    about = "Keep-working hooks and mission-control relay for AI coding sessions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .holdfast/ or .git/)
    #[arg(long, global = true, env = "HOLDFAST_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize holdfast in the current project
    Init,

    /// Hook entry points invoked by the assistant runtime (stdin JSON, stdout JSON)
    Hook {
        #[command(subcommand)]
        subcommand: HookSubcommand,
    },

    /// Queue an operator instruction for a running session
    Send {
        /// Target session id
        #[arg(long)]
        session: String,

        /// Label shown to the session alongside the instruction
        #[arg(long, default_value = "Mission Control")]
        source: String,

        /// The instruction text
        prompt: String,
    },

    /// Claim the oldest pending instruction for a session (standby actors)
    Poll {
        #[arg(long)]
        session: String,
    },

    /// Mark a claimed instruction as processed
    Done {
        /// The .inflight path printed by poll
        claim_path: PathBuf,
    },

    /// Show state files, the governing mode, and inbox occupancy
    Status {
        /// Resolve the governing mode for this session
        #[arg(long)]
        session: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let explicit_root = cli.root.as_deref();

    let result = match cli.command {
        Commands::Init => {
            let root = root::resolve_root(explicit_root, None);
            cmd::init::run(&root)
        }
        // Hooks resolve the root themselves from the event's cwd.
        Commands::Hook { subcommand } => cmd::hook::run(explicit_root, subcommand),
        Commands::Send {
            session,
            source,
            prompt,
        } => cmd::send::run(&session, &source, &prompt, cli.json),
        Commands::Poll { session } => {
            let root = root::resolve_root(explicit_root, None);
            cmd::poll::run(&root, &session, cli.json)
        }
        Commands::Done { claim_path } => cmd::done::run(&claim_path, cli.json),
        Commands::Status { session } => {
            let root = root::resolve_root(explicit_root, None);
            cmd::status::run(&root, session.as_deref(), cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
