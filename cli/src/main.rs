use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod util;

use commands::demo::DemoArgs;
use commands::play::PlayArgs;
use commands::rollout::RolloutArgs;
use commands::script::ScriptCommands;
use util::resolve_script_or_exit;

#[derive(Parser)]
#[command(
    name = "grandmas-house",
    version,
    about = "Grandma's House — scripted multi-turn episodes that score agent replies"
)]
struct Cli {
    /// Script JSON file (defaults to ~/.config/grandmas-house/script.json, then the built-in script)
    #[arg(long, global = true, env = "GRANDMAS_HOUSE_SCRIPT")]
    script: Option<String>,

    /// Emit logs as JSON on stderr
    #[arg(
        long,
        global = true,
        env = "GRANDMAS_HOUSE_LOG_JSON",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scripted helpful agent through one episode
    Demo(DemoArgs),
    /// Play an episode interactively, one reply per stdin line
    Play(PlayArgs),
    /// Score a batch of reply sequences, one independent episode each
    Rollout(RolloutArgs),
    /// Inspect or validate scripts
    Script {
        #[command(subcommand)]
        command: ScriptCommands,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grandmas_house_core=info,grandmas_house=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let explicit = cli.script.as_deref();
    let code = match cli.command {
        Commands::Demo(args) => commands::demo::run(resolve_script_or_exit(explicit).0, args),
        Commands::Play(args) => commands::play::run(resolve_script_or_exit(explicit).0, args).await,
        Commands::Rollout(args) => {
            let (script, source) = resolve_script_or_exit(explicit);
            commands::rollout::run(script, &source, args).await
        }
        Commands::Script { command } => commands::script::run(explicit, command),
    };

    std::process::exit(code);
}
