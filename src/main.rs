#[macro_use]
mod utils;
mod cli;
mod config;
mod error;
mod git;
mod lock;
mod workdir;

use clap::Parser;

use cli::{Cli, Commands, LocksAction, RepoAction};
use config::LockKind;
use error::SligError;
use git::RemoteDriver;
use lock::{Engine, Mode, ReleaseBy};

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli.command) {
        utils::error(&err.to_string());
        std::process::exit(err.exit_code());
    }
}

fn run(command: Commands) -> Result<(), SligError> {
    let remote = env_remote()?;
    let git_options = env_git_options()?;
    let driver = RemoteDriver::new(git_options);

    let scratch = tempfile::tempdir().map_err(|e| SligError::Io {
        path: std::env::temp_dir(),
        source: e,
    })?;

    step_fmt!("Cloning {}...", remote);
    let root = driver.clone(&remote, scratch.path())?;
    let engine = Engine::new(driver);

    match command {
        Commands::Repo { action } => match action {
            RepoAction::Init => {
                engine.initialize(&root)?;
                success_fmt!("Initialized slig repository");
            }
        },
        Commands::Locks { action } => match action {
            LocksAction::Add {
                name,
                simple: _,
                readwrite,
            } => {
                let kind = if readwrite { LockKind::ReadWrite } else { LockKind::Simple };
                engine.declare(&root, &name, kind)?;
                success_fmt!("Declared {} lock '{}'", kind, name);
            }
            LocksAction::Delete { name } => {
                engine.remove(&root, &name)?;
                success_fmt!("Removed lock '{}'", name);
            }
        },
        Commands::Acquire { name, comment, read, write } => {
            let mode = match (read, write) {
                (true, false) => Some(Mode::Read),
                (false, true) => Some(Mode::Write),
                _ => None,
            };
            let token = engine.acquire(&root, &name, mode, comment.as_deref())?;
            println!("{}", token);
        }
        Commands::Release { name, token, force } => {
            let by = match token {
                Some(token) => ReleaseBy::Token(token),
                None if force => ReleaseBy::Force,
                None => unreachable!("clap enforces token or force"),
            };
            engine.release(&root, &name, by)?;
            success_fmt!("Released lock '{}'", name);
        }
    }

    // Implementers SHOULD delete the scratch clone on all exit paths;
    // correctness never depends on it surviving.
    let _ = std::fs::remove_dir_all(scratch.path());

    Ok(())
}

fn env_remote() -> Result<String, SligError> {
    std::env::var("SLIG_GIT_REPO").map_err(|_| SligError::MissingRemote)
}

fn env_git_options() -> Result<Vec<String>, SligError> {
    match std::env::var("SLIG_GIT_OPTIONS") {
        Ok(value) if !value.trim().is_empty() => Ok(shell_words::split(&value)?),
        _ => Ok(Vec::new()),
    }
}
