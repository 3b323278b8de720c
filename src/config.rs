use std::fs;

use bevy::prelude::*;
use serde::Deserialize;

use crate::constants::{
    BAR_WIDTH, DOOR_OPEN_DELAY, EXIT_HOLD_SECONDS, LETTER_DELAY, LINE_DELAY, PLAYER_SPEED,
    WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH,
};

#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub window_title: String,
    pub window_width: f32,
    pub window_height: f32,
    pub line_delay: f32,
    pub letter_delay: f32,
    pub bar_width: f32,
    pub player_speed: f32,
    pub door_open_delay: f32,
    pub exit_hold_seconds: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_title: WINDOW_TITLE.to_string(),
            window_width: WINDOW_WIDTH,
            window_height: WINDOW_HEIGHT,
            line_delay: LINE_DELAY,
            letter_delay: LETTER_DELAY,
            bar_width: BAR_WIDTH,
            player_speed: PLAYER_SPEED,
            door_open_delay: DOOR_OPEN_DELAY,
            exit_hold_seconds: EXIT_HOLD_SECONDS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(serde_json::Error),
}

pub fn parse_config(raw: &str) -> Result<GameConfig, ConfigError> {
    serde_json::from_str::<GameConfig>(raw).map_err(ConfigError::Parse)
}

fn read_config(path: &str) -> Result<GameConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(ConfigError::Read)?;
    parse_config(&raw)
}

/// Loads the config file, falling back to the built-in defaults on any failure.
pub fn load_config(path: &str) -> GameConfig {
    match read_config(path) {
        Ok(config) => config,
        Err(ConfigError::Read(err)) => {
            warn!("Failed to open {path}: {err}; using default config");
            GameConfig::default()
        }
        Err(ConfigError::Parse(err)) => {
            warn!("Failed to parse {path}: {err}; using default config");
            GameConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = parse_config(r#"{ "letter_delay": 0.05 }"#).unwrap();
        assert_relative_eq!(config.letter_delay, 0.05);
        assert_relative_eq!(config.line_delay, LINE_DELAY);
        assert_relative_eq!(config.bar_width, BAR_WIDTH);
        assert_eq!(config.window_title, WINDOW_TITLE);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_config("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = load_config("config/does_not_exist.json");
        assert_relative_eq!(config.player_speed, PLAYER_SPEED);
    }
}
