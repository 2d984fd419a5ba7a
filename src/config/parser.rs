use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub technical: TechnicalConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_maze_dimension")]
    pub default_maze_width: i32,
    #[serde(default = "default_maze_dimension")]
    pub default_maze_height: i32,
    #[serde(default = "default_ignore_bots")]
    pub ignore_bots: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            prefix: default_prefix(),
            default_maze_width: default_maze_dimension(),
            default_maze_height: default_maze_dimension(),
            ignore_bots: default_ignore_bots(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub bot_token: String,
    /// Requests the message content intent, without which guild commands are
    /// invisible to the bot.
    #[serde(default = "default_use_privileged_intents")]
    pub use_privileged_intents: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TechnicalConfig {
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub conn_string: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub min_connections: Option<u32>,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl DatabaseConfig {
    pub fn db_type(&self) -> DbType {
        let url = self.connection_string();
        if url.starts_with("sqlite://") {
            DbType::Sqlite
        } else {
            DbType::Postgres
        }
    }

    pub fn connection_string(&self) -> String {
        if let Some(ref url) = self.url {
            url.clone()
        } else if let Some(ref conn) = self.conn_string {
            conn.clone()
        } else if let Some(ref file) = self.filename {
            format!("sqlite://{}", file)
        } else {
            String::new()
        }
    }

    pub fn sqlite_path(&self) -> Option<String> {
        if let DbType::Sqlite = self.db_type() {
            let url = self.connection_string();
            Some(url.strip_prefix("sqlite://").unwrap_or(&url).to_string())
        } else {
            None
        }
    }

    pub fn max_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.max_connections,
            DbType::Sqlite => Some(1),
        }
    }

    pub fn min_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.min_connections,
            DbType::Sqlite => Some(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(alias = "console", default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Reply templates. Placeholders such as `<prefix>` are replaced verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub help: String,
    pub too_many_args_error: String,
    pub unknown_arg_error: String,
    pub size_error: String,
    pub generic_error: String,
    pub prefix_length_error: String,
    pub prefix_type_error: String,
    pub prefix_dm_error: String,
    pub prefix_changed: String,
    pub prefix_unchanged: String,
    pub permission_error: String,
    pub invalid_command: String,
    pub no_command: String,
    pub mention: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            help: "**Maze bot**\n\
                   `<prefix>maze gen [WIDTHxHEIGHT] [windy|spikey|loopy]` draws a maze, sizes from 2 to 30.\n\
                   `<prefix>maze setPrefix <character>` changes the prefix for this server.\n\
                   `<prefix>maze help` shows this message."
                .to_string(),
            too_many_args_error:
                "Error: Too many arguments. Use `<prefix>maze help` for usage help.".to_string(),
            unknown_arg_error:
                "Error: Unknown argument `<argument>`. Use `<prefix>maze help` for usage help."
                    .to_string(),
            size_error: "Error: Mazes must be between 2x2 and 30x30.".to_string(),
            generic_error: "Error: Something went wrong, please try again later.".to_string(),
            prefix_length_error: "Error: The prefix must be exactly one character.".to_string(),
            prefix_type_error:
                "Error: The prefix must be a letter, number, punctuation mark or symbol."
                    .to_string(),
            prefix_dm_error: "Error: The prefix cannot be changed in a direct message."
                .to_string(),
            prefix_changed: "Prefix changed from `<oldPrefix>` to `<newPrefix>`.".to_string(),
            prefix_unchanged: "The prefix is already `<prefix>`.".to_string(),
            permission_error:
                "Error: You need the Manage Server permission to change the prefix.".to_string(),
            invalid_command:
                "Error: Invalid command `<command>`. Use `<prefix>maze help` for usage help."
                    .to_string(),
            no_command: "Error: No command provided. Use `<prefix>maze help` for usage help."
                .to_string(),
            mention: "My prefix here is `<prefix>`. Try `<prefix>maze help`.".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| "config.yaml".to_string());

        Self::load_from_file(&config_path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("MAZE_BOT_AUTH_BOT_TOKEN") {
            self.auth.bot_token = value;
        }
        if let Ok(value) = std::env::var("MAZE_BOT_DATABASE_URL") {
            self.database.url = Some(value);
        }
    }
}

fn default_project_name() -> String {
    "maze-bot".to_string()
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_maze_dimension() -> i32 {
    10
}

fn default_ignore_bots() -> bool {
    true
}

fn default_use_privileged_intents() -> bool {
    true
}

fn default_num_workers() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    100
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
