//! The Repository Configuration Store: reads and writes the single
//! well-known `slig.ini` file that enumerates declared lock names and
//! their kinds.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ini::Ini;

use crate::error::SligError;

pub const CONFIG_FILENAME: &str = "slig.ini";
const CONFIG_VERSION: &str = "1.0";

/// One of the two supported lock kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Simple,
    ReadWrite,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Simple => write!(f, "simple"),
            LockKind::ReadWrite => write!(f, "readwrite"),
        }
    }
}

impl FromStr for LockKind {
    type Err = SligError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(LockKind::Simple),
            "readwrite" => Ok(LockKind::ReadWrite),
            other => Err(SligError::UnknownKind(other.to_string())),
        }
    }
}

/// A validated lock name: non-empty, no path separators, doesn't contain
/// the reserved substring `.read.` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LockName(String);

impl LockName {
    pub fn parse(name: &str) -> Result<Self, SligError> {
        if name.is_empty() {
            return Err(SligError::InvalidName(name.to_string(), "must not be empty"));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(SligError::InvalidName(
                name.to_string(),
                "must not contain path separators",
            ));
        }
        if name.contains(".read.") {
            return Err(SligError::InvalidName(
                name.to_string(),
                "must not contain the reserved substring '.read.'",
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The reader-file name for a given holder token: `<name>.read.<token>`.
    pub fn reader_file(&self, token: &str) -> String {
        format!("{}.read.{}", self.0, token)
    }

    /// Whether `entry` is this lock's reader-file for some token.
    pub fn is_reader_entry(&self, entry: &str) -> bool {
        entry
            .strip_prefix(&format!("{}.read.", self.0))
            .map(|rest| !rest.is_empty())
            .unwrap_or(false)
    }
}

impl fmt::Display for LockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub locks: BTreeMap<String, LockKind>,
    pub version: String,
}

impl RepoConfig {
    pub fn empty() -> Self {
        Self {
            locks: BTreeMap::new(),
            version: CONFIG_VERSION.to_string(),
        }
    }

    pub fn load(root: &Path) -> Result<Self, SligError> {
        let path = root.join(CONFIG_FILENAME);
        let ini = Ini::load_from_file(&path).map_err(|e| SligError::Ini {
            path: path.clone(),
            source: e,
        })?;

        let mut locks = BTreeMap::new();
        if let Some(section) = ini.section(Some("locks")) {
            for (name, kind) in section.iter() {
                locks.insert(name.to_string(), kind.parse::<LockKind>()?);
            }
        }

        let version = ini
            .section(Some("metadata"))
            .and_then(|s| s.get("version"))
            .unwrap_or(CONFIG_VERSION)
            .to_string();

        Ok(Self { locks, version })
    }

    pub fn save(&self, root: &Path) -> Result<(), SligError> {
        let path = root.join(CONFIG_FILENAME);

        let mut ini = Ini::new();
        {
            let mut section = ini.with_section(Some("locks"));
            for (name, kind) in &self.locks {
                section.set(name.as_str(), kind.to_string());
            }
        }
        ini.with_section(Some("metadata"))
            .set("version", self.version.clone());

        ini.write_to_file(&path).map_err(|e| SligError::Io {
            path,
            source: e,
        })
    }

    pub fn get(&self, name: &str) -> Option<LockKind> {
        self.locks.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_name_rejects_reserved_substring() {
        assert!(LockName::parse("build.read.token").is_err());
        assert!(LockName::parse("a/b").is_err());
        assert!(LockName::parse("").is_err());
        assert!(LockName::parse("build").is_ok());
    }

    #[test]
    fn reader_file_naming() {
        let name = LockName::parse("data").unwrap();
        assert_eq!(name.reader_file("tok1"), "data.read.tok1");
        assert!(name.is_reader_entry("data.read.tok1"));
        assert!(!name.is_reader_entry("data.read."));
        assert!(!name.is_reader_entry("other.read.tok1"));
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut config = RepoConfig::empty();
        config.locks.insert("build".to_string(), LockKind::Simple);
        config.locks.insert("data".to_string(), LockKind::ReadWrite);
        config.save(dir.path()).unwrap();

        let loaded = RepoConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.version, "1.0");
        assert_eq!(loaded.get("build"), Some(LockKind::Simple));
        assert_eq!(loaded.get("data"), Some(LockKind::ReadWrite));
    }
}
