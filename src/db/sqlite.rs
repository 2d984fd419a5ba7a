use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::schema_sqlite::prefixes;

use super::{
    DatabaseError,
    models::{GuildPrefix, PrefixChange, PrefixWrite, plan_prefix_write},
};

const BUSY_TIMEOUT_MS: u32 = 5000;

// Helper function to convert DateTime to ISO string for SQLite
fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// Helper function to parse ISO string to DateTime
fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = prefixes)]
struct DbGuildPrefix {
    guild_id: String,
    prefix: String,
    updated_at: String,
}

impl DbGuildPrefix {
    fn to_guild_prefix(&self) -> Result<GuildPrefix, DatabaseError> {
        Ok(GuildPrefix {
            guild_id: self.guild_id.clone(),
            prefix: self.prefix.clone(),
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = prefixes)]
struct NewGuildPrefix<'a> {
    guild_id: &'a str,
    prefix: &'a str,
    updated_at: String,
}

pub(crate) fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    let mut conn =
        SqliteConnection::establish(path).map_err(|e| DatabaseError::Connection(e.to_string()))?;
    diesel::sql_query(format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"))
        .execute(&mut conn)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    Ok(conn)
}

pub struct SqlitePrefixStore {
    db_path: Arc<String>,
}

impl SqlitePrefixStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::PrefixStore for SqlitePrefixStore {
    async fn get_guild_prefix(
        &self,
        guild_id: &str,
    ) -> Result<Option<GuildPrefix>, DatabaseError> {
        let guild_id = guild_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            prefixes::table
                .filter(prefixes::guild_id.eq(guild_id))
                .select(DbGuildPrefix::as_select())
                .first::<DbGuildPrefix>(&mut conn)
                .optional()
                .map_err(DatabaseError::from)?
                .map(|row| row.to_guild_prefix())
                .transpose()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn change_prefix(
        &self,
        guild_id: &str,
        proposed: &str,
        default_prefix: &str,
    ) -> Result<PrefixChange, DatabaseError> {
        let guild_id = guild_id.to_string();
        let proposed = proposed.to_string();
        let default_prefix = default_prefix.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            // IMMEDIATE takes the write lock up front, so the read below cannot
            // go stale before the write.
            conn.immediate_transaction(|conn| {
                let stored = prefixes::table
                    .filter(prefixes::guild_id.eq(&guild_id))
                    .select(prefixes::prefix)
                    .first::<String>(conn)
                    .optional()?;

                let write = plan_prefix_write(stored.as_deref(), &proposed, &default_prefix);
                let now = datetime_to_string(&Utc::now());
                match write {
                    PrefixWrite::Unchanged => {}
                    PrefixWrite::Deleted => {
                        diesel::delete(prefixes::table.filter(prefixes::guild_id.eq(&guild_id)))
                            .execute(conn)?;
                    }
                    PrefixWrite::Inserted => {
                        diesel::insert_into(prefixes::table)
                            .values(NewGuildPrefix {
                                guild_id: &guild_id,
                                prefix: &proposed,
                                updated_at: now,
                            })
                            .execute(conn)?;
                    }
                    PrefixWrite::Updated => {
                        diesel::update(prefixes::table.filter(prefixes::guild_id.eq(&guild_id)))
                            .set((prefixes::prefix.eq(&proposed), prefixes::updated_at.eq(now)))
                            .execute(conn)?;
                    }
                }

                Ok::<_, diesel::result::Error>(PrefixChange {
                    old_prefix: stored.unwrap_or_else(|| default_prefix.clone()),
                    new_prefix: proposed.clone(),
                    write,
                })
            })
            .map_err(DatabaseError::from)
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}
