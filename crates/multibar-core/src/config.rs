//! Configuration management for multibar.
//!
//! Loads rendering defaults from ${MULTIBAR_HOME}/config.toml with sensible
//! defaults when the file is absent.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Characters used to draw the bar body.
///
/// Parsed from a five character skin such as `[=>-]`:
/// left bound, fill, tip, empty, right bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarFormat {
    pub left: char,
    pub fill: char,
    pub tip: char,
    pub empty: char,
    pub right: char,
}

impl BarFormat {
    /// Parses a five character skin.
    ///
    /// # Errors
    /// Returns an error if the skin does not have exactly five characters.
    pub fn parse(skin: &str) -> Result<Self> {
        let chars: Vec<char> = skin.chars().collect();
        let [left, fill, tip, empty, right] = chars[..] else {
            bail!(
                "Bar format must have exactly 5 characters, got {} in {skin:?}",
                chars.len()
            );
        };
        Ok(Self {
            left,
            fill,
            tip,
            empty,
            right,
        })
    }
}

impl Default for BarFormat {
    fn default() -> Self {
        Self {
            left: '[',
            fill: '=',
            tip: '>',
            empty: '-',
            right: ']',
        }
    }
}

impl std::fmt::Display for BarFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.left, self.fill, self.tip, self.empty, self.right
        )
    }
}

pub mod paths {
    //! Path resolution for multibar configuration.
    //!
    //! MULTIBAR_HOME resolution order:
    //! 1. MULTIBAR_HOME environment variable (if set)
    //! 2. ~/.config/multibar (default)
    //! 3. ./.multibar when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the multibar home directory.
    pub fn multibar_home() -> PathBuf {
        if let Ok(home) = std::env::var("MULTIBAR_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".multibar"),
            |h| h.join(".config").join("multibar"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        multibar_home().join("config.toml")
    }
}

/// Rendering defaults shared by every bar of a `Progress` container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Fallback render width, also the default bar width.
    pub width: usize,
    /// Five character bar skin.
    pub format: String,
    /// Tick interval and width-sync timeout in milliseconds.
    pub refresh_rate_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            format: Self::DEFAULT_FORMAT.to_string(),
            refresh_rate_ms: Self::DEFAULT_REFRESH_RATE_MS,
        }
    }
}

impl ProgressConfig {
    pub const DEFAULT_WIDTH: usize = 80;
    pub const DEFAULT_FORMAT: &'static str = "[=>-]";
    pub const DEFAULT_REFRESH_RATE_MS: u64 = 100;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Checks values that serde cannot express.
    ///
    /// # Errors
    /// Returns an error on a malformed format or a zero refresh rate.
    pub fn validate(&self) -> Result<()> {
        BarFormat::parse(&self.format)?;
        if self.refresh_rate_ms == 0 {
            bail!("refresh_rate_ms must be greater than zero");
        }
        Ok(())
    }

    /// Writes a default config file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, Self::default().to_toml()?)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Serializes the config as TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize config")
    }

    pub fn refresh_rate(&self) -> Duration {
        Duration::from_millis(self.refresh_rate_ms)
    }

    /// Parsed skin, falling back to the default on a malformed string.
    pub fn bar_format(&self) -> BarFormat {
        BarFormat::parse(&self.format).unwrap_or_default()
    }
}
