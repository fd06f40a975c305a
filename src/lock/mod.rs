//! The Lock Protocol Engine — the core of slig.
//!
//! Given a working copy plus its `slig.ini`, implements declare / remove /
//! acquire / release for the two lock kinds, encoding state as root-level
//! files and using the Remote Driver's push-or-rebase semantics (via
//! [`sync`]) to achieve mutual exclusion. One operation per invocation;
//! there is no in-process state carried between calls (spec §9: "each
//! invocation starts from a fresh clone").

pub mod sync;

use std::path::Path;

use uuid::Uuid;

use crate::config::{LockKind, LockName, RepoConfig};
use crate::error::SligError;
use crate::git::RemoteDriver;
use crate::workdir::WorkingCopy;

/// Which side of a readwrite lock a client wants. Ignored for `simple`
/// locks (spec §4.4.2: "for simple, mode must be absent (or ignored)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// How a release identifies which holder it's releasing on behalf of.
/// Exactly one of these is ever constructed; there is no third "neither"
/// or "both" state to validate against at runtime.
pub enum ReleaseBy {
    Token(String),
    Force,
}

pub struct Engine {
    driver: RemoteDriver,
    max_retry: u32,
}

impl Engine {
    pub const DEFAULT_MAX_RETRY: u32 = 3;

    pub fn new(driver: RemoteDriver) -> Self {
        Self {
            driver,
            max_retry: Self::DEFAULT_MAX_RETRY,
        }
    }

    pub fn with_max_retry(driver: RemoteDriver, max_retry: u32) -> Self {
        Self { driver, max_retry }
    }

    /// Create `slig.ini` with an empty `[locks]` section, commit, and push.
    pub fn initialize(&self, root: &Path) -> Result<(), SligError> {
        if RepoConfig::load(root).is_ok() {
            return Err(SligError::Remote(format!(
                "{} already exists on this remote",
                crate::config::CONFIG_FILENAME
            )));
        }

        let config = RepoConfig::empty();
        config.save(root)?;

        self.driver.stage(root, crate::config::CONFIG_FILENAME)?;
        self.driver.commit(root, "initialize slig repository")?;

        let outcome = self.driver.push(root)?;
        if !outcome.ok {
            return Err(SligError::Remote(outcome.diagnostics));
        }
        Ok(())
    }

    /// Declare a new `(name, kind)` pair in the repository configuration.
    pub fn declare(&self, root: &Path, name: &str, kind: LockKind) -> Result<(), SligError> {
        let name = LockName::parse(name)?;
        let mut config = RepoConfig::load(root)?;

        if config.locks.contains_key(name.as_str()) {
            return Err(SligError::LockAlreadyDeclared(name.to_string()));
        }
        config.locks.insert(name.to_string(), kind);
        config.save(root)?;

        self.driver.stage(root, crate::config::CONFIG_FILENAME)?;
        self.driver
            .commit(root, &format!("add {} lock: {}", kind, name))?;

        let outcome = self.driver.push(root)?;
        if !outcome.ok {
            return Err(SligError::RemoteConflict);
        }
        Ok(())
    }

    /// Remove a declared lock, refusing while it is held.
    pub fn remove(&self, root: &Path, name: &str) -> Result<(), SligError> {
        let name = LockName::parse(name)?;
        let mut config = RepoConfig::load(root)?;

        if !config.locks.contains_key(name.as_str()) {
            return Err(SligError::NoSuchLock(name.to_string()));
        }

        let wc = WorkingCopy::new(root.to_path_buf());
        let entries = wc.list_entries()?;
        if entries.contains(name.as_str()) || entries.iter().any(|e| name.is_reader_entry(e)) {
            return Err(SligError::LockInUse(name.to_string()));
        }

        config.locks.remove(name.as_str());
        config.save(root)?;

        self.driver.stage(root, crate::config::CONFIG_FILENAME)?;
        self.driver.commit(root, &format!("remove lock: {}", name))?;

        let outcome = self.driver.push(root)?;
        if !outcome.ok {
            return Err(SligError::RemoteConflict);
        }
        Ok(())
    }

    /// Attempt to acquire `name`, returning the freshly generated holder
    /// token on success (spec §4.4.2).
    pub fn acquire(
        &self,
        root: &Path,
        name: &str,
        mode: Option<Mode>,
        comment: Option<&str>,
    ) -> Result<String, SligError> {
        let name = LockName::parse(name)?;
        let config = RepoConfig::load(root)?;
        let kind = config
            .get(name.as_str())
            .ok_or_else(|| SligError::NoSuchLock(name.to_string()))?;

        let mode = match kind {
            LockKind::Simple => None,
            LockKind::ReadWrite => {
                Some(mode.ok_or_else(|| SligError::ModeRequired(name.to_string()))?)
            }
        };

        let wc = WorkingCopy::new(root.to_path_buf());
        let entries = wc.list_entries()?;
        let exclusive_held = entries.contains(name.as_str())
            && wc.read_first_line(name.as_str())?.as_deref() != Some("READ");
        let any_reader_held = entries.iter().any(|e| name.is_reader_entry(e));

        let busy = match (kind, mode) {
            (LockKind::Simple, _) => entries.contains(name.as_str()),
            (LockKind::ReadWrite, Some(Mode::Read)) => exclusive_held,
            (LockKind::ReadWrite, Some(Mode::Write)) => {
                entries.contains(name.as_str()) || any_reader_held
            }
            (LockKind::ReadWrite, None) => unreachable!("mode required for readwrite above"),
        };
        if busy {
            return Err(SligError::LockBusy(name.to_string()));
        }

        let token = Uuid::new_v4().to_string();

        match mode {
            None | Some(Mode::Write) => {
                wc.write(name.as_str(), &token)?;
                self.driver.stage(root, name.as_str())?;
            }
            Some(Mode::Read) => {
                let reader_file = name.reader_file(&token);
                wc.write(&reader_file, &token)?;
                wc.write(name.as_str(), "READ\n")?;
                self.driver.stage(root, &reader_file)?;
                self.driver.stage(root, name.as_str())?;
            }
        }

        let message = match comment {
            Some(comment) if !comment.is_empty() => {
                format!("acquire lock: {}\n\n{}", name, comment)
            }
            _ => format!("acquire lock: {}", name),
        };
        self.driver.commit(root, &message)?;

        match sync::run(&self.driver, root, self.max_retry)? {
            sync::SyncOutcome::Success => Ok(token),
            sync::SyncOutcome::Conflict => Err(SligError::LockBusy(name.to_string())),
        }
    }

    /// Release `name` on behalf of `token`, or force-release (simple
    /// locks only; spec §4.4.3 / §9 refuses force-release on readwrite).
    pub fn release(&self, root: &Path, name: &str, by: ReleaseBy) -> Result<(), SligError> {
        let name = LockName::parse(name)?;
        let config = RepoConfig::load(root)?;
        let kind = config
            .get(name.as_str())
            .ok_or_else(|| SligError::NoSuchLock(name.to_string()))?;

        let wc = WorkingCopy::new(root.to_path_buf());
        if !wc.exists(name.as_str()) {
            return Err(SligError::LockNotHeld(name.to_string()));
        }

        let message = match by {
            ReleaseBy::Token(token) => {
                let first_line = wc.read_first_line(name.as_str())?.unwrap_or_default();

                if first_line == "READ" {
                    let reader_file = name.reader_file(&token);
                    if !wc.exists(&reader_file) {
                        return Err(SligError::LockNotHeldByToken(name.to_string()));
                    }
                    self.driver.unstage_delete(root, &reader_file)?;

                    let entries = wc.list_entries()?;
                    let is_last_reader = !entries
                        .iter()
                        .any(|e| name.is_reader_entry(e) && e.as_str() != reader_file);
                    if is_last_reader {
                        self.driver.unstage_delete(root, name.as_str())?;
                    }

                    format!("release read lock: {} in uuid: {}", reader_file, token)
                } else {
                    if first_line != token {
                        return Err(SligError::LockNotHeldByToken(name.to_string()));
                    }
                    self.driver.unstage_delete(root, name.as_str())?;
                    format!("release lock: {}", name)
                }
            }
            ReleaseBy::Force => match kind {
                LockKind::ReadWrite => {
                    return Err(SligError::ForceReleaseAmbiguous(name.to_string()));
                }
                LockKind::Simple => {
                    self.driver.unstage_delete(root, name.as_str())?;
                    format!("release lock: {}", name)
                }
            },
        };

        self.driver.commit(root, &message)?;

        match sync::run(&self.driver, root, self.max_retry)? {
            sync::SyncOutcome::Success => Ok(()),
            sync::SyncOutcome::Conflict => Err(SligError::ReleaseConflict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_bare_remote() -> TempDir {
        let remote = TempDir::new().unwrap();
        Command::new("git")
            .args(["init", "--bare"])
            .current_dir(remote.path())
            .output()
            .unwrap();
        remote
    }

    fn clone_and_configure(driver: &RemoteDriver, remote: &Path) -> (TempDir, std::path::PathBuf) {
        let parent = TempDir::new().unwrap();
        let root = driver
            .clone(remote.to_str().unwrap(), parent.path())
            .unwrap();
        Command::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(&root)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Test User"])
            .current_dir(&root)
            .output()
            .unwrap();
        (parent, root)
    }

    fn init_repo() -> (TempDir, RemoteDriver, Engine) {
        let remote = init_bare_remote();
        let driver = RemoteDriver::new(vec![]);
        let engine = Engine::new(RemoteDriver::new(vec![]));

        let (_parent, root) = clone_and_configure(&driver, remote.path());
        engine.initialize(&root).unwrap();
        (remote, driver, engine)
    }

    #[test]
    fn round_trip_declare_acquire_release_remove() {
        let (remote, driver, engine) = init_repo();
        let (_parent, root) = clone_and_configure(&driver, remote.path());

        engine.declare(&root, "build", LockKind::Simple).unwrap();
        let (_parent2, root2) = clone_and_configure(&driver, remote.path());
        let token = engine.acquire(&root2, "build", None, None).unwrap();

        let (_parent3, root3) = clone_and_configure(&driver, remote.path());
        engine
            .release(&root3, "build", ReleaseBy::Token(token))
            .unwrap();

        let (_parent4, root4) = clone_and_configure(&driver, remote.path());
        engine.remove(&root4, "build").unwrap();

        let wc = WorkingCopy::new(root4);
        assert!(!wc.exists("build"));
    }

    #[test]
    fn concurrent_simple_acquire_one_wins() {
        let (remote, driver, engine) = init_repo();
        let (_pd, root_declare) = clone_and_configure(&driver, remote.path());
        engine
            .declare(&root_declare, "build", LockKind::Simple)
            .unwrap();

        let (_pa, root_a) = clone_and_configure(&driver, remote.path());
        let (_pb, root_b) = clone_and_configure(&driver, remote.path());

        let result_a = engine.acquire(&root_a, "build", None, None);
        let result_b = engine.acquire(&root_b, "build", None, None);

        let successes = [&result_a, &result_b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
    }

    #[test]
    fn readwrite_multiple_readers_then_drain() {
        let (remote, driver, engine) = init_repo();
        let (_pd, root_declare) = clone_and_configure(&driver, remote.path());
        engine
            .declare(&root_declare, "data", LockKind::ReadWrite)
            .unwrap();

        let (_pa, root_a) = clone_and_configure(&driver, remote.path());
        let token_a = engine
            .acquire(&root_a, "data", Some(Mode::Read), None)
            .unwrap();

        let (_pb, root_b) = clone_and_configure(&driver, remote.path());
        let token_b = engine
            .acquire(&root_b, "data", Some(Mode::Read), None)
            .unwrap();

        let (_pc, root_c) = clone_and_configure(&driver, remote.path());
        assert!(engine
            .acquire(&root_c, "data", Some(Mode::Write), None)
            .is_err());

        let (_pra, root_ra) = clone_and_configure(&driver, remote.path());
        engine
            .release(&root_ra, "data", ReleaseBy::Token(token_a))
            .unwrap();
        let (_prb, root_rb) = clone_and_configure(&driver, remote.path());
        engine
            .release(&root_rb, "data", ReleaseBy::Token(token_b))
            .unwrap();

        let (_pc2, root_c2) = clone_and_configure(&driver, remote.path());
        assert!(engine
            .acquire(&root_c2, "data", Some(Mode::Write), None)
            .is_ok());
    }

    #[test]
    fn force_release_refused_for_readwrite() {
        let (remote, driver, engine) = init_repo();
        let (_pd, root_declare) = clone_and_configure(&driver, remote.path());
        engine
            .declare(&root_declare, "data", LockKind::ReadWrite)
            .unwrap();

        let (_pa, root_a) = clone_and_configure(&driver, remote.path());
        engine
            .acquire(&root_a, "data", Some(Mode::Write), None)
            .unwrap();

        let (_pr, root_r) = clone_and_configure(&driver, remote.path());
        let err = engine.release(&root_r, "data", ReleaseBy::Force).unwrap_err();
        assert!(matches!(err, SligError::ForceReleaseAmbiguous(_)));
    }

    #[test]
    fn release_with_wrong_token_fails() {
        let (remote, driver, engine) = init_repo();
        let (_pd, root_declare) = clone_and_configure(&driver, remote.path());
        engine
            .declare(&root_declare, "build", LockKind::Simple)
            .unwrap();

        let (_pa, root_a) = clone_and_configure(&driver, remote.path());
        engine.acquire(&root_a, "build", None, None).unwrap();

        let (_pr, root_r) = clone_and_configure(&driver, remote.path());
        let err = engine
            .release(&root_r, "build", ReleaseBy::Token("wrong-token".to_string()))
            .unwrap_err();
        assert!(matches!(err, SligError::LockNotHeldByToken(_)));
    }

    #[test]
    fn remove_while_held_fails() {
        let (remote, driver, engine) = init_repo();
        let (_pd, root_declare) = clone_and_configure(&driver, remote.path());
        engine
            .declare(&root_declare, "build", LockKind::Simple)
            .unwrap();

        let (_pa, root_a) = clone_and_configure(&driver, remote.path());
        engine.acquire(&root_a, "build", None, None).unwrap();

        let (_pr, root_r) = clone_and_configure(&driver, remote.path());
        let err = engine.remove(&root_r, "build").unwrap_err();
        assert!(matches!(err, SligError::LockInUse(_)));
    }
}
