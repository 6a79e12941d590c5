#![forbid(unsafe_code)]

//! `cork`: operator CLI for the corkboard tag relationship engine.

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "corkboard: tag alias/implication processing engine",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (defaults to the config's default_actor or $USER).
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Project directory (defaults to the current directory).
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Initialize a corkboard project",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    cork init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        about = "Seed or inspect a post's tag set",
        after_help = "EXAMPLES:\n    # Tag post 1\n    cork post 1 long_hair hat\n\n    # Show post 1\n    cork post 1"
    )]
    Post(cmd::post::PostArgs),

    #[command(
        about = "Propose a tag alias or implication",
        after_help = "EXAMPLES:\n    # Propose renaming `aaa` into `bbb`\n    cork propose alias aaa bbb\n\n    # Propose that `cat_ears` implies `animal_ears`\n    cork propose implication cat_ears animal_ears"
    )]
    Propose(cmd::propose::ProposeArgs),

    #[command(
        about = "Approve a pending proposal and apply it to all posts",
        after_help = "EXAMPLES:\n    cork approve 3 --actor janitor"
    )]
    Approve(cmd::approve::ApproveArgs),

    #[command(about = "Reject a proposal before it is applied")]
    Reject(cmd::reject::RejectArgs),

    #[command(about = "Re-run the apply for an error-parked relationship")]
    Retry(cmd::retry::RetryArgs),

    #[command(
        about = "Undo an applied relationship",
        after_help = "Replays the recorded per-post edits in reverse; safe to re-run."
    )]
    Undo(cmd::undo::UndoArgs),

    #[command(about = "List tag relationships")]
    List(cmd::list::ListArgs),

    #[command(about = "Show one relationship in full")]
    Show(cmd::show::ShowArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    let actor = cmd::resolve_actor(cli.actor.as_deref());
    let root = cli
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(%actor, root = %root.display(), "dispatching command");

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &root),
        Commands::Post(args) => cmd::post::run_post(args, &actor, output, &root),
        Commands::Propose(args) => cmd::propose::run_propose(args, &actor, output, &root),
        Commands::Approve(args) => cmd::approve::run_approve(args, &actor, output, &root),
        Commands::Reject(args) => cmd::reject::run_reject(args, &actor, output, &root),
        Commands::Retry(args) => cmd::retry::run_retry(args, &actor, output, &root),
        Commands::Undo(args) => cmd::undo::run_undo(args, &actor, output, &root),
        Commands::List(args) => cmd::list::run_list(args, output, &root),
        Commands::Show(args) => cmd::show::run_show(args, output, &root),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
