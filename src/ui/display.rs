//! Display-surface presentation: the four discrete scale steps and color
//! parsing for the theme. Width policy itself lives in the controller's
//! sentinel system; nothing here truncates text.

use ratatui::style::{Color, Modifier, Style};

/// Discrete size steps by display-text length. The terminal cannot change
/// font size, so the steps map to style emphasis instead; the thresholds
/// mirror the original presentation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayScale {
    Large,
    Medium,
    Small,
    Tiny,
}

impl DisplayScale {
    pub fn for_len(len: usize) -> Self {
        match len {
            0..=5 => DisplayScale::Large,
            6..=8 => DisplayScale::Medium,
            9..=10 => DisplayScale::Small,
            _ => DisplayScale::Tiny,
        }
    }

    pub fn for_text(text: &str) -> Self {
        Self::for_len(text.chars().count())
    }

    pub fn style(self, base: Style) -> Style {
        match self {
            DisplayScale::Large => base.add_modifier(Modifier::BOLD),
            DisplayScale::Medium => base,
            DisplayScale::Small => base.add_modifier(Modifier::DIM),
            DisplayScale::Tiny => base.add_modifier(Modifier::DIM | Modifier::ITALIC),
        }
    }
}

/// Theme color lookup; falls back rather than failing on a bad name.
pub fn parse_color(name: &str, fallback: Color) -> Color {
    name.parse().unwrap_or(fallback)
}
