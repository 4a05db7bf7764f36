//! Clap derive structures for the `vaultlink` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vaultlink -- router session client and live roster sync
#[derive(Debug, Parser)]
#[command(
    name = "vaultlink",
    version,
    about = "Mirror a home router's connected-device roster",
    long_about = "Logs in to a router's JSON-RPC management API with a challenge-response\n\
        handshake, polls the connected-device roster, and republishes it into a\n\
        TTL cache for captive-portal consumers.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Router profile to use
    #[arg(long, short = 'p', env = "VAULTLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// JSON-RPC endpoint URL (overrides profile)
    #[arg(long, short = 'r', env = "VAULTLINK_ROUTER", global = true)]
    pub router: Option<String>,

    /// Login username (overrides profile)
    #[arg(long, short = 'u', env = "VAULTLINK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VAULTLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "VAULTLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "VAULTLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the router and keep the roster cache fresh until interrupted
    Run(RunArgs),

    /// Fetch and print the connected-device roster once
    #[command(alias = "clients", alias = "ls")]
    Roster(RosterArgs),

    /// Show router system status
    Status,

    /// Set a display alias for a client
    Alias(AliasArgs),

    /// Compute the crypt hash a login challenge expects
    Hash(HashArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Args ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Poll period in milliseconds (overrides profile)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct RosterArgs {
    /// Only show clients the router reports as online
    #[arg(long)]
    pub online: bool,
}

#[derive(Debug, Args)]
pub struct AliasArgs {
    /// Client MAC address
    pub mac: String,

    /// New display alias
    pub alias: String,
}

#[derive(Debug, Args)]
pub struct HashArgs {
    /// Password to hash (prompted for when omitted)
    pub password: Option<String>,

    /// Salt from the login challenge
    #[arg(long)]
    pub salt: String,

    /// Crypt algorithm id from the login challenge
    #[arg(long, default_value = "1")]
    pub alg: String,

    /// Also derive the login hash for this challenge nonce, bound to
    /// --username (default: root)
    #[arg(long)]
    pub nonce: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the current configuration with secrets redacted
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
