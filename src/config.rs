//! Command-line and environment configuration.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::mask::DEFAULT_MAX_DISPLAY_HEIGHT;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// RenoVision: mark up a room photo and let Gemini redesign it.
#[derive(Parser, Debug, Clone)]
#[command(name = "renovision", version, about)]
pub struct Config {
    /// Room photo to open straight into the editor.
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    /// Where the user, project and material records live.
    /// Defaults to the platform data directory.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Gemini API key. Falls back to the API_KEY variable when unset.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Image-editing model name.
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the Generative Language API.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Mask brush width in display pixels.
    #[arg(long, default_value_t = 30.0)]
    pub brush_size: f32,

    /// Tallest the editing canvas may be drawn, in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_DISPLAY_HEIGHT)]
    pub max_display_height: f32,

    /// Give up on a generation request after this many seconds.
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.brush_size > 0.0) {
            return Err("--brush-size must be positive".to_string());
        }
        if !(self.max_display_height > 0.0) {
            return Err("--max-display-height must be positive".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("--timeout-secs must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("RenoVision"))
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_web_app() {
        let config = Config::try_parse_from(["renovision"]).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.brush_size, 30.0);
        assert_eq!(config.max_display_height, 600.0);
        assert!(config.image.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn accepts_image_and_overrides() {
        let config = Config::try_parse_from([
            "renovision",
            "kitchen.jpg",
            "--brush-size",
            "12",
            "--data-dir",
            "/tmp/reno",
        ])
        .unwrap();
        assert_eq!(config.image, Some(PathBuf::from("kitchen.jpg")));
        assert_eq!(config.brush_size, 12.0);
        assert_eq!(config.resolved_data_dir(), PathBuf::from("/tmp/reno"));
    }

    #[test]
    fn rejects_non_positive_sizes() {
        let config = Config::try_parse_from(["renovision", "--brush-size", "0"]).unwrap();
        assert!(config.validate().is_err());
        let config = Config::try_parse_from(["renovision", "--max-display-height=-5"]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_key_wins_and_blank_key_is_ignored() {
        let config = Config::try_parse_from(["renovision", "--api-key", "abc"]).unwrap();
        assert_eq!(config.resolved_api_key().as_deref(), Some("abc"));
        let mut blank = config.clone();
        blank.api_key = Some("  ".into());
        assert!(blank.resolved_api_key().is_none());
    }
}
