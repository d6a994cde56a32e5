use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Light or dark presentation. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    /// Read the terminal's colour-scheme hint from `COLORFGBG`, if present.
    pub fn detect() -> Option<Self> {
        std::env::var("COLORFGBG")
            .ok()
            .and_then(|value| Self::from_colorfgbg(&value))
    }

    /// Parse a `COLORFGBG` value such as `15;0` or `0;default;15`.
    ///
    /// Only the last field (the background) matters. Palette indexes 7 and
    /// 9-15 are light backgrounds; the remaining ANSI indexes are dark.
    pub fn from_colorfgbg(value: &str) -> Option<Self> {
        let background: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
        match background {
            7 | 9..=15 => Some(ThemeMode::Light),
            0..=6 | 8 => Some(ThemeMode::Dark),
            _ => None,
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            ThemeMode::Light => Palette {
                background: Color::Rgb(250, 250, 250),
                foreground: Color::Rgb(33, 33, 33),
                muted: Color::Rgb(120, 120, 120),
                border: Color::Rgb(76, 175, 80),
                user: Color::Rgb(56, 142, 60),
                assistant: Color::Rgb(84, 110, 122),
                button_bg: Color::Rgb(240, 240, 240),
                button_fg: Color::Rgb(51, 51, 51),
                error_bg: Color::Rgb(253, 237, 237),
                error_fg: Color::Rgb(95, 33, 32),
            },
            ThemeMode::Dark => Palette {
                background: Color::Rgb(18, 18, 18),
                foreground: Color::Rgb(230, 230, 230),
                muted: Color::Rgb(140, 140, 140),
                border: Color::Rgb(76, 175, 80),
                user: Color::Rgb(102, 187, 106),
                assistant: Color::Rgb(144, 164, 174),
                button_bg: Color::Rgb(69, 90, 100),
                button_fg: Color::Rgb(255, 255, 255),
                error_bg: Color::Rgb(22, 11, 11),
                error_fg: Color::Rgb(244, 199, 199),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub border: Color,
    pub user: Color,
    pub assistant: Color,
    pub button_bg: Color,
    pub button_fg: Color,
    pub error_bg: Color,
    pub error_fg: Color,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_is_identity() {
        for mode in [ThemeMode::Light, ThemeMode::Dark] {
            assert_eq!(mode.toggled().toggled(), mode);
            assert_ne!(mode.toggled(), mode);
        }
    }

    #[test]
    fn test_colorfgbg_dark_background() {
        assert_eq!(ThemeMode::from_colorfgbg("15;0"), Some(ThemeMode::Dark));
        assert_eq!(ThemeMode::from_colorfgbg("7;default;8"), Some(ThemeMode::Dark));
    }

    #[test]
    fn test_colorfgbg_light_background() {
        assert_eq!(ThemeMode::from_colorfgbg("0;15"), Some(ThemeMode::Light));
        assert_eq!(ThemeMode::from_colorfgbg("0;7"), Some(ThemeMode::Light));
    }

    #[test]
    fn test_colorfgbg_garbage() {
        assert_eq!(ThemeMode::from_colorfgbg(""), None);
        assert_eq!(ThemeMode::from_colorfgbg("15;default"), None);
        assert_eq!(ThemeMode::from_colorfgbg("0;200"), None);
    }

    #[test]
    fn test_theme_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ThemeMode::Dark).unwrap(), "\"dark\"");
        let mode: ThemeMode = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(mode, ThemeMode::Light);
    }
}
