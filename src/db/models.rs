use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A guild's prefix override. Guilds without a row use the configured default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildPrefix {
    pub guild_id: String,
    pub prefix: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefixWrite {
    Unchanged,
    Inserted,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixChange {
    pub old_prefix: String,
    pub new_prefix: String,
    pub write: PrefixWrite,
}

/// Decides which write moves a guild from its stored prefix (`None` when there
/// is no row) to `proposed`.
pub fn plan_prefix_write(
    stored: Option<&str>,
    proposed: &str,
    default_prefix: &str,
) -> PrefixWrite {
    let current = stored.unwrap_or(default_prefix);
    if proposed == current {
        PrefixWrite::Unchanged
    } else if proposed == default_prefix {
        PrefixWrite::Deleted
    } else if stored.is_none() {
        PrefixWrite::Inserted
    } else {
        PrefixWrite::Updated
    }
}
