#![forbid(unsafe_code)]

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use udash_geom::{Point, Rect};

/// What a symbol that names nothing does when executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedSymbol {
    /// Push the symbol text as a string (`round linejoin`, `:x define`).
    #[default]
    Quote,
    /// Fail with `UnknownLabel`.
    Reject,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    pub unresolved: UnresolvedSymbol,
    /// Maximum nesting of label calls, loop bodies and quotations.
    pub max_depth: usize,
    /// Seed of the layout stack.
    pub viewport: Rect,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            unresolved: UnresolvedSymbol::default(),
            max_depth: 256,
            viewport: Rect::from_top_left(Point::ORIGIN, 1024.0, 768.0),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    #[diagnostic(code(udash::config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config")]
    #[diagnostic(code(udash::config::toml))]
    Toml(#[from] toml::de::Error),
}

/// On-disk configuration. Only the `[vm]` table is read today.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub vm: VmConfig,
}

impl ConfigFile {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg = ConfigFile::from_toml_str("[vm]\nunresolved = \"reject\"\n").unwrap();
        assert_eq!(cfg.vm.unresolved, UnresolvedSymbol::Reject);
        assert_eq!(cfg.vm.max_depth, 256);
        assert_eq!(ConfigFile::from_toml_str("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn viewport_table() {
        let cfg = ConfigFile::from_toml_str(
            "[vm]\nmax_depth = 8\n[vm.viewport]\nwidth = 100.0\nheight = 50.0\ncenter = { x = 50.0, y = 25.0 }\n",
        )
        .unwrap();
        assert_eq!(cfg.vm.max_depth, 8);
        assert_eq!(cfg.vm.viewport.northwest(), Point::ORIGIN);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            ConfigFile::from_toml_str("[vm]\nunresolved = \"maybe\"\n"),
            Err(ConfigError::Toml(_))
        ));
    }
}
