//! The Remote Driver: wraps the `git` binary as a subprocess.
//!
//! Every operation here is synchronous and blocks until the subprocess
//! exits (spec §5: no timeouts are imposed by the engine, the caller
//! controls that by killing the process). Extra pass-through options
//! supplied at construction (from `SLIG_GIT_OPTIONS`) are prepended to
//! every invocation, used to forward authentication or transport flags.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::SligError;

/// Outcome of a `push` or `pull --rebase` attempt. Rejection is a normal,
/// expected outcome (another client raced us) — it is never raised as an
/// error, only reported.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub ok: bool,
    pub diagnostics: String,
}

pub struct RemoteDriver {
    git_bin: PathBuf,
    extra_opts: Vec<String>,
}

impl RemoteDriver {
    pub fn new(extra_opts: Vec<String>) -> Self {
        Self {
            git_bin: PathBuf::from("git"),
            extra_opts,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.git_bin);
        cmd.args(&self.extra_opts);
        cmd
    }

    /// Clone `remote` into a fresh subdirectory of `parent_dir`, returning
    /// the absolute path of the cloned working copy.
    pub fn clone(&self, remote: &str, parent_dir: &Path) -> Result<PathBuf, SligError> {
        let output = self
            .command()
            .arg("-C")
            .arg(parent_dir)
            .arg("clone")
            .arg(remote)
            .output()
            .map_err(|e| SligError::Io {
                path: parent_dir.to_path_buf(),
                source: e,
            })?;

        forward_diagnostics(&output.stderr);

        if !output.status.success() {
            return Err(SligError::Remote(format!(
                "git clone exited with status {}",
                output.status
            )));
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(parent_dir)
            .map_err(|e| SligError::Io {
                path: parent_dir.to_path_buf(),
                source: e,
            })?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();

        if entries.len() != 1 {
            return Err(SligError::Remote(format!(
                "expected exactly one cloned directory in {}, found {}",
                parent_dir.display(),
                entries.len()
            )));
        }

        Ok(entries.remove(0))
    }

    /// `git add <path>` — stage a path for the next commit.
    pub fn stage(&self, root: &Path, rel_path: &str) -> Result<(), SligError> {
        self.run_checked(root, &["add", rel_path])
    }

    /// `git rm <path>` — remove a path and stage the deletion.
    pub fn unstage_delete(&self, root: &Path, rel_path: &str) -> Result<(), SligError> {
        self.run_checked(root, &["rm", rel_path])
    }

    /// `git commit -m <message>`.
    pub fn commit(&self, root: &Path, message: &str) -> Result<(), SligError> {
        self.run_checked(root, &["commit", "-m", message])
    }

    /// `git push`. Never raises on rejection — that's the expected
    /// "someone else won the race" outcome (spec §4.4.4).
    pub fn push(&self, root: &Path) -> Result<PushOutcome, SligError> {
        self.run_unchecked(root, &["push"])
    }

    /// `git pull --rebase`. Never raises on rejection/conflict.
    pub fn pull_rebase(&self, root: &Path) -> Result<PushOutcome, SligError> {
        self.run_unchecked(root, &["pull", "--rebase"])
    }

    fn run_checked(&self, root: &Path, args: &[&str]) -> Result<(), SligError> {
        let outcome = self.run_unchecked(root, args)?;
        if outcome.ok {
            Ok(())
        } else {
            Err(SligError::Remote(outcome.diagnostics))
        }
    }

    fn run_unchecked(&self, root: &Path, args: &[&str]) -> Result<PushOutcome, SligError> {
        log::debug!("git -C {} {}", root.display(), args.join(" "));

        let output = self
            .command()
            .arg("-C")
            .arg(root)
            .args(args)
            .output()
            .map_err(|e| SligError::Io {
                path: root.to_path_buf(),
                source: e,
            })?;

        forward_diagnostics(&output.stderr);

        Ok(PushOutcome {
            ok: output.status.success(),
            diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn forward_diagnostics(stderr: &[u8]) {
    if !stderr.is_empty() {
        log::debug!("{}", String::from_utf8_lossy(stderr));
    }
}
