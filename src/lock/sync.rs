//! The Sync protocol: publish a local commit, or determine that another
//! client already published an incompatible one (spec §4.4.4).
//!
//! The initial push is a speculative optimisation — most of the time
//! nobody raced. A rejected push means the remote advanced since clone;
//! `pull --rebase` reapplies the local commit atop the new tip. If that
//! rebase itself fails, another client touched the same lock file, which
//! is exactly the race this protocol exists to catch. A successful rebase
//! followed by a rejected push means yet another race happened in between,
//! so we retry up to `max_retry` times before giving up safely.

use std::path::Path;

use crate::error::SligError;
use crate::git::RemoteDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Conflict,
}

pub fn run(driver: &RemoteDriver, root: &Path, max_retry: u32) -> Result<SyncOutcome, SligError> {
    if driver.push(root)?.ok {
        return Ok(SyncOutcome::Success);
    }

    for _ in 0..max_retry {
        if !driver.pull_rebase(root)?.ok {
            return Ok(SyncOutcome::Conflict);
        }
        if driver.push(root)?.ok {
            return Ok(SyncOutcome::Success);
        }
    }

    Ok(SyncOutcome::Conflict)
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
        let root = driver.clone(remote.to_str().unwrap(), parent.path()).unwrap();
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

    #[test]
    fn sync_succeeds_on_empty_remote() {
        let remote = init_bare_remote();
        let driver = RemoteDriver::new(vec![]);
        let (_parent, root) = clone_and_configure(&driver, remote.path());

        std::fs::write(root.join("f"), "x").unwrap();
        driver.stage(&root, "f").unwrap();
        driver.commit(&root, "add f").unwrap();

        assert_eq!(run(&driver, &root, 3).unwrap(), SyncOutcome::Success);
    }

    #[test]
    fn sync_conflicts_when_same_file_raced() {
        let remote = init_bare_remote();
        let driver = RemoteDriver::new(vec![]);

        let (_pa, root_a) = clone_and_configure(&driver, remote.path());
        let (_pb, root_b) = clone_and_configure(&driver, remote.path());

        std::fs::write(root_a.join("lock"), "token-a").unwrap();
        driver.stage(&root_a, "lock").unwrap();
        driver.commit(&root_a, "acquire lock: lock").unwrap();
        assert_eq!(run(&driver, &root_a, 3).unwrap(), SyncOutcome::Success);

        std::fs::write(root_b.join("lock"), "token-b").unwrap();
        driver.stage(&root_b, "lock").unwrap();
        driver.commit(&root_b, "acquire lock: lock").unwrap();
        assert_eq!(run(&driver, &root_b, 3).unwrap(), SyncOutcome::Conflict);
    }

    #[test]
    fn sync_succeeds_after_rebase_of_unrelated_change() {
        let remote = init_bare_remote();
        let driver = RemoteDriver::new(vec![]);

        let (_pa, root_a) = clone_and_configure(&driver, remote.path());
        let (_pb, root_b) = clone_and_configure(&driver, remote.path());

        std::fs::write(root_a.join("a"), "x").unwrap();
        driver.stage(&root_a, "a").unwrap();
        driver.commit(&root_a, "add a").unwrap();
        assert_eq!(run(&driver, &root_a, 3).unwrap(), SyncOutcome::Success);

        std::fs::write(root_b.join("b"), "y").unwrap();
        driver.stage(&root_b, "b").unwrap();
        driver.commit(&root_b, "add b").unwrap();
        assert_eq!(run(&driver, &root_b, 3).unwrap(), SyncOutcome::Success);
    }
}
