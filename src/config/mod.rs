pub mod config;

pub use config::{BackendConfig, Config, DisplayConfig, ThemeConfig};
