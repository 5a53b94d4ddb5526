use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub backend: BackendConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use Unicode glyphs (× ÷) on the keypad; ASCII otherwise.
    pub use_glyphs: bool,

    /// How long the display stays highlighted after an update, in ms.
    pub pulse_ms: u64,

    /// Event-poll tick, in ms. Bounds pulse decay and readiness latency.
    pub tick_ms: u64,

    /// Show the last pressed key in the status bar.
    pub show_key_indicator: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            use_glyphs: true,
            pulse_ms: 200,
            tick_ms: 50,
            show_key_indicator: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Artificial delay before backend initialization, in ms. Useful for
    /// watching the pending path; leave at 0 normally.
    pub init_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { init_delay_ms: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Colors are ratatui color names or "#rrggbb".
    pub display_fg: String,
    pub pulse_fg: String,
    pub keypad_fg: String,
    pub status_bg: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            display_fg: "white".to_string(),
            pulse_fg: "yellow".to_string(),
            keypad_fg: "gray".to_string(),
            status_bg: "darkgray".to_string(),
        }
    }
}

impl Config {
    /// Loads the config file, falling back to defaults when it is absent.
    /// A file that exists but fails to parse is an error; silently masking a
    /// typo with defaults is worse than failing loudly.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("no config directory on this platform")?;
        Ok(dir.join("calc-tui").join("config.toml"))
    }

    /// Writes a commented default config to the standard location.
    pub fn generate_default_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        fs::write(&path, Self::default_with_comments())
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(path)
    }

    pub fn default_with_comments() -> String {
        r##"# calc-tui configuration

[display]
# Use Unicode glyphs on the keypad (false for plain ASCII)
use_glyphs = true
# Display highlight duration after an update, in milliseconds
pulse_ms = 200
# Event poll tick in milliseconds
tick_ms = 50
# Show the last pressed key in the status bar
show_key_indicator = true

[backend]
# Artificial backend initialization delay in milliseconds (0 = none).
# Handy for watching the "..." pending state.
init_delay_ms = 0

[theme]
# Colors accept ratatui names ("yellow", "darkgray") or "#rrggbb"
display_fg = "white"
pulse_fg = "yellow"
keypad_fg = "gray"
status_bg = "darkgray"
"##
        .to_string()
    }
}
