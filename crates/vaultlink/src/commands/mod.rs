//! Command handlers, one module per subcommand.

pub mod alias;
pub mod config_cmd;
pub mod hash;
pub mod roster;
pub mod run;
pub mod status;

use vaultlink_core::RouterConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a router-backed command to its handler.
pub async fn dispatch(
    cmd: Command,
    config: RouterConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Run(_) => run::handle(config).await,
        Command::Roster(args) => roster::handle(args, config, global).await,
        Command::Status => status::handle(config, global).await,
        Command::Alias(args) => alias::handle(args, config, global).await,
        Command::Hash(_) | Command::Config(_) | Command::Completions(_) => {
            unreachable!("handled before router resolution")
        }
    }
}
