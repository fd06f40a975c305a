//! Typed error taxonomy for the lock protocol engine.
//!
//! The CLI front-end matches on these variants to choose an exit code and a
//! one-line diagnostic (spec: every engine error maps to a distinct,
//! stable category). Ambient I/O failures are wrapped transparently so
//! callers don't need to convert them by hand.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SligError {
    #[error("git process failed: {0}")]
    Remote(String),

    #[error("lock '{0}' is not declared")]
    NoSuchLock(String),

    #[error("lock '{0}' is already declared")]
    LockAlreadyDeclared(String),

    #[error("lock '{0}' is currently held, release it before removing")]
    LockInUse(String),

    #[error("lock '{0}' is currently held by another client")]
    LockBusy(String),

    #[error("lock '{0}' is not currently held")]
    LockNotHeld(String),

    #[error("lock '{0}' is held by a different token")]
    LockNotHeldByToken(String),

    #[error("force-release is not supported for readwrite lock '{0}'; release individual reader tokens or force-release only applies to simple locks")]
    ForceReleaseAmbiguous(String),

    #[error("push rejected and rebase could not resolve the conflict: another client holds the lock")]
    RemoteConflict,

    #[error("release did not propagate: another client's commit interposed")]
    ReleaseConflict,

    #[error("invalid lock name '{0}': {1}")]
    InvalidName(String, &'static str),

    #[error("unknown lock kind '{0}', expected 'simple' or 'readwrite'")]
    UnknownKind(String),

    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Ini {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("SLIG_GIT_REPO is not set")]
    MissingRemote,

    #[error("lock '{0}' is a readwrite lock; --read or --write is required")]
    ModeRequired(String),

    #[error("failed to parse SLIG_GIT_OPTIONS: {0}")]
    InvalidGitOptions(#[from] shell_words::ParseError),
}

impl SligError {
    /// Process exit code this error should produce (spec §6.5/§7: non-zero
    /// on any engine error; distinct categories get distinct codes so
    /// scripts can branch on them without parsing the diagnostic text).
    pub fn exit_code(&self) -> i32 {
        match self {
            SligError::Remote(_) => 10,
            SligError::NoSuchLock(_) => 20,
            SligError::LockAlreadyDeclared(_) => 21,
            SligError::LockInUse(_) => 22,
            SligError::LockBusy(_) => 23,
            SligError::LockNotHeld(_) => 24,
            SligError::LockNotHeldByToken(_) => 25,
            SligError::ForceReleaseAmbiguous(_) => 26,
            SligError::RemoteConflict => 30,
            SligError::ReleaseConflict => 31,
            SligError::InvalidName(_, _) => 40,
            SligError::UnknownKind(_) => 41,
            SligError::Io { .. } => 50,
            SligError::Ini { .. } => 51,
            SligError::MissingRemote => 60,
            SligError::InvalidGitOptions(_) => 61,
            SligError::ModeRequired(_) => 42,
        }
    }
}
