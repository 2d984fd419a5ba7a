use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use super::Config;
use crate::maze::{MAX_DIMENSION, MIN_DIMENSION};
use crate::prefix::normalize_prefix;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.bot_token.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "auth.bot_token cannot be empty".to_string(),
            ));
        }

        let default_prefix: String = self.general.prefix.nfc().collect();
        match normalize_prefix(&self.general.prefix) {
            Ok(prefix) if prefix == default_prefix => {}
            Ok(_) => {
                return Err(ConfigError::InvalidConfig(
                    "general.prefix must not contain whitespace".to_string(),
                ));
            }
            Err(err) => {
                return Err(ConfigError::InvalidConfig(format!("general.prefix: {err}")));
            }
        }

        for (name, value) in [
            ("general.default_maze_width", self.general.default_maze_width),
            ("general.default_maze_height", self.general.default_maze_height),
        ] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} must be between {MIN_DIMENSION} and {MAX_DIMENSION}"
                )));
            }
        }

        if self.technical.num_workers == 0 {
            return Err(ConfigError::InvalidConfig(
                "technical.num_workers must be at least 1".to_string(),
            ));
        }

        if self.technical.channel_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "technical.channel_capacity must be at least 1".to_string(),
            ));
        }

        if self.database.connection_string().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "database connection string cannot be empty".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidConfig(format!(
                "logging.format must be `pretty` or `json`, got `{}`",
                self.logging.format
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigError;
    use crate::config::Config;

    const MINIMAL: &str = r#"
auth:
  bot_token: "token"
database:
  url: "sqlite:///tmp/maze-bot.db"
"#;

    fn minimal() -> Config {
        serde_yaml::from_str(MINIMAL).expect("minimal config parses")
    }

    #[test]
    fn minimal_config_fills_defaults_and_validates() {
        let config = minimal();
        config.validate().expect("minimal config is valid");

        assert_eq!(config.general.prefix, "!");
        assert_eq!(config.general.default_maze_width, 10);
        assert_eq!(config.general.default_maze_height, 10);
        assert_eq!(config.technical.num_workers, 4);
        assert_eq!(config.technical.channel_capacity, 100);
        assert_eq!(config.database.retry_backoff_ms, 1000);
        assert!(config.messages.help.contains("<prefix>"));
    }

    #[test]
    fn rejects_multi_character_prefix() {
        let mut config = minimal();
        config.general.prefix = "!!".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn default_prefix_follows_set_prefix_rules() {
        for prefix in [" ", " !", "\u{200b}", "ab"] {
            let mut config = minimal();
            config.general.prefix = prefix.to_string();
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidConfig(_))),
                "{prefix:?} should be rejected"
            );
        }

        let mut config = minimal();
        config.general.prefix = "e\u{0301}".to_string();
        config.validate().expect("composes to a single character");
    }

    #[test]
    fn rejects_out_of_range_default_dimensions() {
        let mut config = minimal();
        config.general.default_maze_width = 31;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));

        let mut config = minimal();
        config.general.default_maze_height = 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_workers() {
        let mut config = minimal();
        config.technical.num_workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_token() {
        let mut config = minimal();
        config.auth.bot_token.clear();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }
}
