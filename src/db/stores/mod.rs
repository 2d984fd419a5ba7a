use async_trait::async_trait;

use super::DatabaseError;
use super::models::{GuildPrefix, PrefixChange};

#[async_trait]
pub trait PrefixStore: Send + Sync {
    async fn get_guild_prefix(&self, guild_id: &str)
    -> Result<Option<GuildPrefix>, DatabaseError>;

    /// Runs one read-modify-write transaction that moves the guild to
    /// `proposed`. A row is kept only while the prefix differs from
    /// `default_prefix`.
    async fn change_prefix(
        &self,
        guild_id: &str,
        proposed: &str,
        default_prefix: &str,
    ) -> Result<PrefixChange, DatabaseError>;
}
