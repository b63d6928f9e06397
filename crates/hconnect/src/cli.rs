//! Clap derive structures for the `hconnect` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hconnect -- control Home Connect appliances from the command line
#[derive(Debug, Parser)]
#[command(
    name = "hconnect",
    version,
    about = "Control Home Connect appliances from the command line",
    long_about = "Lists appliances and their derived entities, and sends program,\n\
        setting and option commands through the Home Connect cloud API.",
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
    /// Config file (default: platform config dir)
    #[arg(long, env = "HCONNECT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Restrict to one account
    #[arg(long, short = 'a', env = "HCONNECT_ACCOUNT", global = true)]
    pub account: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HCONNECT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "HCONNECT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Link accounts through the OAuth2 authorization-code flow
    Auth(AuthArgs),

    /// Manage linked accounts
    #[command(alias = "acc")]
    Accounts(AccountsArgs),

    /// List appliances of every linked account
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// List entities derived from appliances
    #[command(alias = "ent", alias = "e")]
    Entities(EntitiesArgs),

    /// Pause the active program
    Pause(TargetArgs),

    /// Resume a paused program
    Resume(TargetArgs),

    /// Select a program without starting it
    Select(ProgramArgs),

    /// Start a program
    Start(ProgramArgs),

    /// Change an appliance setting
    Setting(KeyValueArgs),

    /// Set an option of the active program
    OptionActive(KeyValueArgs),

    /// Set an option of the selected program
    OptionSelected(KeyValueArgs),

    /// Invoke a service by name with a JSON payload
    Call(CallArgs),

    /// Poll continuously and print appliance state changes
    Watch,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Print the URL that grants this client access to an account
    Url,

    /// Exchange an authorization code and store the account's token
    Login {
        /// Account id to store the token under
        account: String,

        /// Authorization code from the redirect
        #[arg(long)]
        code: String,

        /// Display name of the account
        #[arg(long)]
        title: Option<String>,
    },

    /// Store the OAuth client secret in the system keyring
    SetSecret,
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: AccountsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// List configured accounts
    #[command(alias = "ls")]
    List,

    /// Forget an account and its stored token
    #[command(alias = "rm")]
    Remove {
        /// Account id
        account: String,
    },
}

// ── Entities ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// Only entities of this category
    #[arg(long, short = 'c', value_parser = ["binary_sensor", "light", "sensor", "switch"])]
    pub category: Option<String>,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Entity id of the target appliance
    pub entity_id: String,
}

#[derive(Debug, Args)]
pub struct ProgramArgs {
    /// Entity id of the target appliance
    pub entity_id: String,

    /// Program key (e.g. Dishcare.Dishwasher.Program.Eco50)
    pub program: String,

    /// Option key sent with the program
    #[arg(long, requires = "option_value")]
    pub option_key: Option<String>,

    /// Option value (integer or string)
    #[arg(long, requires = "option_key")]
    pub option_value: Option<String>,

    /// Option unit
    #[arg(long)]
    pub option_unit: Option<String>,
}

#[derive(Debug, Args)]
pub struct KeyValueArgs {
    /// Entity id of the target appliance
    pub entity_id: String,

    /// Setting or option key
    pub key: String,

    /// Value to set
    pub value: String,
}

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Service name (e.g. start_program)
    pub service: String,

    /// JSON payload
    #[arg(long, short = 'd', conflicts_with = "from_file")]
    pub data: Option<String>,

    /// Read the JSON payload from a file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
