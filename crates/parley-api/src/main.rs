//! Parley command-line entry point.
//!
//! Binary name: `parley`
//!
//! Loads configuration, initializes tracing, wires the reply pipeline and
//! then either runs an interactive chat over stdin or a session management
//! command.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    let filter = match cli.verbose {
        0 => "info",
        1 => "info,parley=debug",
        _ => "trace",
    };
    parley_observe::init_tracing(cli.otel, filter)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    parley_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(&cli.config).await?;

    match cli.command {
        Commands::Chat(identity) => {
            let shutdown = CancellationToken::new();
            let on_signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });

            cli::chat::run_chat(&state, identity.into_identity(), shutdown).await?;
        }

        Commands::Sessions { command } => {
            cli::session::run(&state, command).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
