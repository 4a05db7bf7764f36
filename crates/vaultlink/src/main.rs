mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose, cli.global.log_json);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = &cli.global;
    match cli.command {
        // Local commands never touch the router
        Command::Config(ref args) => commands::config_cmd::handle(args, global),
        Command::Hash(args) => commands::hash::handle(args, global),
        Command::Completions(ref args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "vaultlink", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let poll_interval_ms = match cmd {
                Command::Run(ref args) => args.interval_ms,
                _ => None,
            };
            let cfg = config::load_config()?;
            let resolved = config::resolve(global, &cfg, poll_interval_ms)?;

            tracing::debug!(command = ?cmd, profile = %resolved.profile, "dispatching command");
            commands::dispatch(cmd, resolved.router, global)
                .await
                .map_err(|e| e.for_profile(&resolved.profile))
        }
    }
}
