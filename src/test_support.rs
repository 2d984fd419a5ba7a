//! In-memory doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::config::Config;
use crate::db::{
    DatabaseError, GuildPrefix, PrefixChange, PrefixStore, PrefixWrite, plan_prefix_write,
};
use crate::discord::ChatGateway;
use crate::dispatch::InboundEvent;

pub const BOT_ID: u64 = 4242;

const TEST_CONFIG: &str = r#"
auth:
  bot_token: "token"
database:
  url: "sqlite:///tmp/maze-bot-test.db"
  retry_backoff_ms: 0
technical:
  num_workers: 4
  channel_capacity: 8
"#;

pub fn test_config() -> Config {
    let config: Config = serde_yaml::from_str(TEST_CONFIG).expect("test config parses");
    config.validate().expect("test config is valid");
    config
}

pub fn guild_event(guild_id: u64, content: &str) -> InboundEvent {
    InboundEvent {
        message_id: 1,
        channel_id: 10,
        author_id: 7,
        author_is_bot: false,
        guild_id: Some(guild_id),
        content: content.to_string(),
        sequence: 0,
    }
}

pub fn direct_event(content: &str) -> InboundEvent {
    InboundEvent {
        guild_id: None,
        ..guild_event(0, content)
    }
}

#[derive(Default)]
pub struct MemoryPrefixStore {
    rows: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    failing_writes: AtomicU32,
    attempts: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryPrefixStore {
    pub fn set_row(&self, guild_id: &str, prefix: &str) {
        self.rows
            .lock()
            .unwrap()
            .insert(guild_id.to_string(), prefix.to_string());
    }

    pub fn row(&self, guild_id: &str) -> Option<String> {
        self.rows.lock().unwrap().get(guild_id).cloned()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` transactions fail with a conflict.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrefixStore for MemoryPrefixStore {
    async fn get_guild_prefix(
        &self,
        guild_id: &str,
    ) -> Result<Option<GuildPrefix>, DatabaseError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DatabaseError::Connection("store offline".to_string()));
        }
        Ok(self.row(guild_id).map(|prefix| GuildPrefix {
            guild_id: guild_id.to_string(),
            prefix,
            updated_at: Utc::now(),
        }))
    }

    async fn change_prefix(
        &self,
        guild_id: &str,
        proposed: &str,
        default_prefix: &str,
    ) -> Result<PrefixChange, DatabaseError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(DatabaseError::Conflict("could not serialize access".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        let stored = rows.get(guild_id).cloned();
        let write = plan_prefix_write(stored.as_deref(), proposed, default_prefix);
        match write {
            PrefixWrite::Unchanged => {}
            PrefixWrite::Deleted => {
                rows.remove(guild_id);
            }
            PrefixWrite::Inserted | PrefixWrite::Updated => {
                rows.insert(guild_id.to_string(), proposed.to_string());
            }
        }
        if write != PrefixWrite::Unchanged {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }

        Ok(PrefixChange {
            old_prefix: stored.unwrap_or_else(|| default_prefix.to_string()),
            new_prefix: proposed.to_string(),
            write,
        })
    }
}

/// Records every reply instead of talking to Discord.
#[derive(Default)]
pub struct RecordingGateway {
    replies: Mutex<Vec<(u64, String)>>,
    deny_manage_guild: AtomicBool,
}

impl RecordingGateway {
    pub fn deny_manage_guild(&self) {
        self.deny_manage_guild.store(true, Ordering::SeqCst);
    }

    /// Replies as `(message id, content)` in send order.
    pub fn replies(&self) -> Vec<(u64, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn contents(&self) -> Vec<String> {
        self.replies().into_iter().map(|(_, content)| content).collect()
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn reply(&self, event: &InboundEvent, content: &str) -> anyhow::Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((event.message_id, content.to_string()));
        Ok(())
    }

    async fn can_manage_guild(&self, _event: &InboundEvent) -> anyhow::Result<bool> {
        Ok(!self.deny_manage_guild.load(Ordering::SeqCst))
    }
}
