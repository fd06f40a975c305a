use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "slig")]
#[command(author, version, about = "Distributed named locks backed by a shared git remote", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remote repository setup
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },

    /// Manage lock definitions
    Locks {
        #[command(subcommand)]
        action: LocksAction,
    },

    /// Acquire a lock
    #[command(group(ArgGroup::new("rw_mode").args(["read", "write"])))]
    Acquire {
        /// Name of the lock to acquire
        name: String,

        /// Comment appended to the acquire commit message body
        #[arg(short, long)]
        comment: Option<String>,

        /// Acquire a readwrite lock for reading
        #[arg(long, group = "rw_mode")]
        read: bool,

        /// Acquire a readwrite lock for writing
        #[arg(long, group = "rw_mode")]
        write: bool,
    },

    /// Release a lock
    #[command(group(ArgGroup::new("release_by").args(["token", "force"]).required(true)))]
    Release {
        /// Name of the lock to release
        name: String,

        /// Holder token returned by `acquire`
        #[arg(short = 'u', long = "uuid")]
        token: Option<String>,

        /// Force-release without a token (simple locks only)
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RepoAction {
    /// Initialize the remote repository
    Init,
}

#[derive(Subcommand, Debug)]
pub enum LocksAction {
    /// Declare a new lock
    #[command(group(ArgGroup::new("kind").args(["simple", "readwrite"])))]
    Add {
        /// Name of lock to add
        name: String,

        /// Declare a simple (mutex) lock [default]
        #[arg(long, group = "kind")]
        simple: bool,

        /// Declare a readwrite lock
        #[arg(long, group = "kind")]
        readwrite: bool,
    },

    /// Delete a declared lock
    Delete {
        /// Name of lock to delete
        name: String,
    },
}
