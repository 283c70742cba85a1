use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use clap_complete::Shell;

use crate::options::ConnectionOptions;

#[derive(Parser)]
#[command(name = "agent-connect")]
#[command(version)]
#[command(about = "Negotiate a session credential and connect to a real-time voice agent room")]
pub struct Args {
    /// Path to a TOML config file (AGENT_CONNECT_* variables override it)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. debug, agent_connect=trace)
    #[arg(long, global = true, default_value = "agent_connect=info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the credential exchange only and print the normalized result
    Token(OptionArgs),
    /// Connect, follow the session until Ctrl-C or disconnect, then hang up
    Connect {
        #[command(flatten)]
        options: OptionArgs,

        /// Sign in first and use stored settings as option defaults
        #[arg(long, requires = "password")]
        email: Option<String>,

        #[arg(long, requires = "email")]
        password: Option<String>,
    },
    /// Show the signed-in user of the auth backend
    Whoami,
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Display name shown to the agent
    #[arg(long)]
    pub name: Option<String>,

    /// Agent voice
    #[arg(long)]
    pub voice: Option<String>,

    /// Agent personality preset
    #[arg(long)]
    pub personality: Option<String>,

    /// Conversation language (e.g. en, de, fr)
    #[arg(long)]
    pub language: Option<String>,
}

impl From<OptionArgs> for ConnectionOptions {
    fn from(args: OptionArgs) -> Self {
        ConnectionOptions {
            display_name: args.name,
            voice: args.voice,
            personality: args.personality,
            language: args.language,
        }
    }
}
