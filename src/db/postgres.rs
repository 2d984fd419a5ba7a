use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::schema::prefixes;

use super::{
    DatabaseError,
    models::{GuildPrefix, PrefixChange, PrefixWrite, plan_prefix_write},
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = prefixes)]
struct DbGuildPrefix {
    guild_id: String,
    prefix: String,
    updated_at: DateTime<Utc>,
}

impl From<DbGuildPrefix> for GuildPrefix {
    fn from(value: DbGuildPrefix) -> Self {
        Self {
            guild_id: value.guild_id,
            prefix: value.prefix,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = prefixes)]
struct NewGuildPrefix<'a> {
    guild_id: &'a str,
    prefix: &'a str,
    updated_at: DateTime<Utc>,
}

async fn with_connection<T, F>(pool: Pool, operation: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        operation(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

pub struct PostgresPrefixStore {
    pool: Pool,
}

impl PostgresPrefixStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::PrefixStore for PostgresPrefixStore {
    async fn get_guild_prefix(
        &self,
        guild_id: &str,
    ) -> Result<Option<GuildPrefix>, DatabaseError> {
        let pool = self.pool.clone();
        let guild_id = guild_id.to_string();
        with_connection(pool, move |conn| {
            prefixes::table
                .filter(prefixes::guild_id.eq(guild_id))
                .select(DbGuildPrefix::as_select())
                .first::<DbGuildPrefix>(conn)
                .optional()
                .map(|value| value.map(Into::into))
                .map_err(DatabaseError::from)
        })
        .await
    }

    async fn change_prefix(
        &self,
        guild_id: &str,
        proposed: &str,
        default_prefix: &str,
    ) -> Result<PrefixChange, DatabaseError> {
        let pool = self.pool.clone();
        let guild_id = guild_id.to_string();
        let proposed = proposed.to_string();
        let default_prefix = default_prefix.to_string();
        with_connection(pool, move |conn| {
            // Fails before the closure runs if BEGIN itself fails.
            conn.build_transaction()
                .repeatable_read()
                .run(|conn| {
                    let stored = prefixes::table
                        .filter(prefixes::guild_id.eq(&guild_id))
                        .select(prefixes::prefix)
                        .first::<String>(conn)
                        .optional()?;

                    let write = plan_prefix_write(stored.as_deref(), &proposed, &default_prefix);
                    let now = Utc::now();
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
    }
}
