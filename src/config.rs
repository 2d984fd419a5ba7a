pub use self::parser::{
    AuthConfig, Config, DatabaseConfig, DbType, GeneralConfig, LoggingConfig, MessagesConfig,
};
pub use self::validator::ConfigError;

mod parser;
mod validator;
