//! CLI command definitions for the `parley` binary.

pub mod chat;
pub mod session;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

use parley_types::user::{Identity, UserProfile};

/// Tool-using chat assistant with persistent sessions.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, global = true, env = "PARLEY_CONFIG", default_value = "parley.toml")]
    pub config: PathBuf,

    /// Detailed logs (-v for debug, -vv for trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat over stdin, one message per line. Replies are printed as JSON.
    Chat(IdentityArgs),

    /// Manage a user's sessions.
    Sessions {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Who the chat turns are attributed to.
#[derive(Args, Clone)]
pub struct IdentityArgs {
    /// Platform user id.
    #[arg(long, default_value = "local")]
    pub user: String,

    /// Username of the bound account. Without it the user is anonymous.
    #[arg(long)]
    pub username: Option<String>,

    /// Display name of the bound account.
    #[arg(long)]
    pub name: Option<String>,

    /// Email of the bound account.
    #[arg(long)]
    pub email: Option<String>,
}

impl IdentityArgs {
    /// A username marks the account as bound and verified.
    pub fn into_identity(self) -> Identity {
        match self.username {
            Some(username) => Identity {
                profile: Some(UserProfile {
                    id: self.user.clone(),
                    name: self.name.unwrap_or_else(|| username.clone()),
                    email: self.email.unwrap_or_default(),
                    username,
                    picture: None,
                }),
                user_id: self.user,
                verified: true,
            },
            None => Identity::anonymous(self.user),
        }
    }
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List sessions, marking the selected one.
    #[command(alias = "ls")]
    List {
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Show one session's summary and conversations.
    Show {
        #[arg(long, default_value = "local")]
        user: String,
        id: Uuid,
    },

    /// Start a new session and select it.
    New {
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Select another session.
    Switch {
        #[arg(long, default_value = "local")]
        user: String,
        id: Uuid,
    },

    /// Delete a session other than the selected one.
    #[command(alias = "rm")]
    Delete {
        #[arg(long, default_value = "local")]
        user: String,
        id: Uuid,
    },
}
