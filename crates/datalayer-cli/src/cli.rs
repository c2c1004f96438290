//! Command line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use datalayer_common::{ENV_RUN_URL, ENV_TOKEN};
use datalayer_sdk::model::RuntimeType;

/// Command line client for the Datalayer platform
#[derive(Debug, Parser)]
#[command(name = "datalayer", version, about)]
pub struct Cli {
    /// Run URL of the Datalayer deployment
    #[arg(long = "run-url", env = ENV_RUN_URL, global = true)]
    pub run_url: Option<String>,

    /// API token (overrides the stored login)
    #[arg(long, env = ENV_TOKEN, global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the token
    Login(LoginArgs),
    /// Log out and forget the stored token
    Logout,
    /// Show the current user
    Whoami,
    /// Show the credit balance
    Credits,
    /// Manage API tokens
    #[command(subcommand)]
    Tokens(TokensCommand),
    /// List runtime environments
    Envs,
    /// Manage runtimes
    #[command(subcommand)]
    Runtimes(RuntimesCommand),
    /// Manage runtime snapshots
    #[command(subcommand)]
    Snapshots(SnapshotsCommand),
    /// Manage spaces
    #[command(subcommand)]
    Spaces(SpacesCommand),
    /// Manage notebooks
    #[command(subcommand)]
    Notebooks(NotebooksCommand),
    /// Manage documents
    #[command(subcommand)]
    Documents(DocumentsCommand),
    /// Manage space items
    #[command(subcommand)]
    Items(ItemsCommand),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account handle
    #[arg(long, env = "DATALAYER_HANDLE")]
    pub handle: Option<String>,

    /// Account password
    #[arg(long, env = "DATALAYER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Validate and store an existing API token instead of a password
    #[arg(long = "with-token")]
    pub with_token: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum TokensCommand {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Days until the token expires
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    Delete {
        uid: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum RuntimesCommand {
    List,
    Get {
        pod_name: String,
    },
    Create {
        /// Environment to start the runtime from
        environment: String,
        /// Maximum credits the runtime may burn
        #[arg(long = "credits-limit", default_value_t = 10.0)]
        credits_limit: f64,
        #[arg(long = "type", default_value_t = RuntimeType::Notebook)]
        runtime_type: RuntimeType,
        #[arg(long)]
        name: Option<String>,
        /// Snapshot to load on start
        #[arg(long)]
        from: Option<String>,
    },
    Delete {
        pod_name: String,
    },
    /// Load a snapshot into a running runtime
    Restore {
        pod_name: String,
        snapshot_uid: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SnapshotsCommand {
    List,
    Get {
        uid: String,
    },
    Create {
        pod_name: String,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Stop the runtime once the snapshot is taken
        #[arg(long)]
        stop: bool,
    },
    /// Delete a snapshot and wait until it is gone
    Delete {
        uid: String,
    },
    Download {
        uid: String,
        /// Destination file (defaults to <uid>.tar.gz)
        dest: Option<PathBuf>,
    },
    /// Upload a snapshot archive, resuming an interrupted upload
    Upload {
        path: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        environment: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SpacesCommand {
    List,
    Get {
        uid: String,
    },
    Create {
        name: String,
        handle: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        public: bool,
    },
    /// List the items of a space
    Items {
        space_uid: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum NotebooksCommand {
    Create {
        space_uid: String,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Initial .ipynb content
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Get {
        uid: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum DocumentsCommand {
    Create {
        space_uid: String,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Get {
        uid: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ItemsCommand {
    Delete { uid: String },
}
