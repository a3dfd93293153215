//! Configuration-path lookup and console option resolution.
//!
//! Narrow interfaces consumed by the cores; the host wires them to real
//! directories and environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Resolves a logical configuration filename to an absolute path.
pub trait ConfigPath {
    /// Check the user configuration directory, then the application one.
    /// `None` when the file exists in neither.
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Lookup for style/theme option strings (`LS_COLORS`, `HELP_COLORS`,
/// `NANORC_THEME`, ...).
pub trait ConsoleOption {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// [`ConfigPath`] over a user directory and an application directory.
#[derive(Debug, Clone)]
pub struct DirsConfigPath {
    user: PathBuf,
    app: PathBuf,
}

impl DirsConfigPath {
    pub fn new(user: impl Into<PathBuf>, app: impl Into<PathBuf>) -> Self {
        Self {
            user: user.into(),
            app: app.into(),
        }
    }
}

impl ConfigPath for DirsConfigPath {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        for dir in [&self.user, &self.app] {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

/// [`ConsoleOption`] backed by the process environment with an override
/// table layered on top (tests populate the table).
#[derive(Debug, Clone, Default)]
pub struct EnvConsoleOption {
    overrides: HashMap<String, String>,
}

impl EnvConsoleOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.overrides.insert(name.to_string(), value.to_string());
        self
    }
}

impl ConsoleOption for EnvConsoleOption {
    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(v) = self.overrides.get(name) {
            return Some(v.clone());
        }
        std::env::var(name).ok()
    }
}

/// Convenience for tests and hosts that pin both directories to one root.
pub fn config_under(root: &Path) -> DirsConfigPath {
    DirsConfigPath::new(root.join("user"), root.join("app"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_beats_environment() {
        let opts = EnvConsoleOption::new().with("NANORC_THEME", "mauve");
        assert_eq!(opts.lookup("NANORC_THEME").as_deref(), Some("mauve"));
    }

    #[test]
    fn missing_everywhere_is_none() {
        let opts = EnvConsoleOption::new();
        assert_eq!(opts.lookup("SURELY_UNSET_OPTION_9Q"), None);
    }
}
