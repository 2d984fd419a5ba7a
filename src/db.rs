pub use self::error::DatabaseError;
pub use self::manager::DatabaseManager;
pub use self::models::{GuildPrefix, PrefixChange, PrefixWrite, plan_prefix_write};
pub use self::stores::PrefixStore;

pub mod error;
pub mod manager;
pub mod models;
pub mod schema;
pub mod stores;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub mod schema_sqlite;
