// Configuration loading (drafts.toml): storage location, listing sizes and admin accounts.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    Invalid { field: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    /// Number of drafts on the home listing.
    pub recent_limit: usize,
    pub history_page_size: usize,
    pub admins: Vec<AdminAccount>,
}

/// An administrator allowed to create and cancel drafts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdminAccount {
    pub username: String,
    /// Lowercase hex SHA-256 of the password.
    pub password_sha256: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("drafts.db"),
            recent_limit: 3,
            history_page_size: 10,
            admins: Vec::new(),
        }
    }
}

impl Config {
    /// Reads and validates a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recent_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "recent_limit".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.history_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "history_page_size".into(),
                message: "must be at least 1".into(),
            });
        }

        let mut seen = BTreeSet::new();
        for admin in &self.admins {
            let name = admin.username.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "admins.username".into(),
                    message: "must not be blank".into(),
                });
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid {
                    field: "admins.username".into(),
                    message: format!("duplicate admin '{name}'"),
                });
            }
        }
        Ok(())
    }

    /// Returns the admin's username when the credentials match.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&str> {
        let digest = hash_password(password);
        self.admins
            .iter()
            .find(|a| a.username == username && a.password_sha256.eq_ignore_ascii_case(&digest))
            .map(|a| a.username.as_str())
    }
}

pub fn hash_password(password: &str) -> String {
    sha256::digest(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.recent_limit, 3);
        assert_eq!(config.history_page_size, 10);
        assert!(config.admins.is_empty());
    }

    #[test]
    fn parses_admins_and_authenticates() {
        let digest = hash_password("hunter2");
        let file = write_config(&format!(
            "db_path = \"x.db\"\n\n[[admins]]\nusername = \"alice\"\npassword_sha256 = \"{digest}\"\n"
        ));

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("x.db"));
        assert_eq!(config.authenticate("alice", "hunter2"), Some("alice"));
        assert_eq!(config.authenticate("alice", "wrong"), None);
        assert_eq!(config.authenticate("bob", "hunter2"), None);
    }

    #[test]
    fn rejects_zero_page_size() {
        let file = write_config("history_page_size = 0\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "history_page_size"));
    }

    #[test]
    fn rejects_duplicate_admins() {
        let file = write_config(
            "[[admins]]\nusername = \"a\"\npassword_sha256 = \"00\"\n\n[[admins]]\nusername = \"a\"\npassword_sha256 = \"11\"\n",
        );
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let file = write_config("recent_limit = \"three\"\n");
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
