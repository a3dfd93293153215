//! Editor options file.
//!
//! A small TOML document discovered through the host's `ConfigPath`
//! (`editrc.toml`). Unknown fields are ignored so the format can grow
//! without breaking older files; absent fields take defaults.

use anyhow::{Context, Result};
use core_terminal::ConfigPath;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const CONFIG_FILE: &str = "editrc.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_tabsize")]
    pub tabsize: usize,
    #[serde(default)]
    pub linenumbers: bool,
    #[serde(default = "default_true")]
    pub softwrap: bool,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub casesensitive: bool,
    #[serde(default)]
    pub quickblank: bool,
    #[serde(default = "default_true")]
    pub mouse: bool,
}

fn default_tabsize() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tabsize: default_tabsize(),
            linenumbers: false,
            softwrap: true,
            backup: false,
            casesensitive: false,
            quickblank: false,
            mouse: true,
        }
    }
}

impl EditorConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse editor config")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::parse(&text)?;
        info!(target = "editor.config", path = %path.display(), "loaded");
        Ok(cfg)
    }

    /// Resolve through the host path lookup; absence is not an error.
    pub fn discover(paths: &dyn ConfigPath) -> Result<Self> {
        match paths.resolve(CONFIG_FILE) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = EditorConfig::default();
        assert_eq!(c.tabsize, 4);
        assert!(c.softwrap);
        assert!(!c.linenumbers);
    }

    #[test]
    fn parse_partial_document() {
        let c = EditorConfig::parse("linenumbers = true\ntabsize = 8\n").unwrap();
        assert!(c.linenumbers);
        assert_eq!(c.tabsize, 8);
        assert!(c.softwrap); // untouched default
    }

    #[test]
    fn unknown_keys_tolerated() {
        let c = EditorConfig::parse("future_option = \"yes\"\nbackup = true\n").unwrap();
        assert!(c.backup);
    }

    #[test]
    fn malformed_document_errors() {
        assert!(EditorConfig::parse("tabsize = [not a number").is_err());
    }

    #[test]
    fn discover_prefers_user_directory() {
        let root = tempfile::tempdir().unwrap();
        let user = root.path().join("user");
        let app = root.path().join("app");
        std::fs::create_dir_all(&user).unwrap();
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(user.join(CONFIG_FILE), "tabsize = 2\n").unwrap();
        std::fs::write(app.join(CONFIG_FILE), "tabsize = 8\n").unwrap();
        let paths = core_terminal::DirsConfigPath::new(&user, &app);
        let cfg = EditorConfig::discover(&paths).unwrap();
        assert_eq!(cfg.tabsize, 2);
    }

    #[test]
    fn discover_without_file_uses_defaults() {
        let root = tempfile::tempdir().unwrap();
        let paths = core_terminal::DirsConfigPath::new(
            root.path().join("user"),
            root.path().join("app"),
        );
        let cfg = EditorConfig::discover(&paths).unwrap();
        assert_eq!(cfg.tabsize, 4);
    }
}
