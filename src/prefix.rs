//! Per-guild command prefixes.
//!
//! Reads fail open to the configured default. Writes are validated here and
//! then run as a transaction in the [`PrefixStore`], retried with linear
//! backoff when the transaction fails.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};
use unicode_general_category::{GeneralCategory, get_general_category};
use unicode_normalization::UnicodeNormalization;

use crate::config::Config;
use crate::db::{DatabaseError, PrefixChange, PrefixStore};
use crate::dispatch::InboundEvent;
use crate::utils::retry::{RetryPolicy, retry_with_backoff};

const PREFIX_WRITE_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum PrefixError {
    #[error("the prefix cannot be changed in a direct message")]
    NotAllowedInDm,
    #[error("setPrefix takes a single argument")]
    TooManyArguments,
    #[error("the prefix must be exactly one character")]
    InvalidLength,
    #[error("the prefix must be a letter, number, punctuation mark or symbol")]
    InvalidCategory,
    #[error("failed to store the prefix")]
    PersistenceFailure(#[source] DatabaseError),
}

/// Validates a `setPrefix` argument and returns it in NFC form.
pub fn normalize_prefix(argument: &str) -> Result<String, PrefixError> {
    let mut tokens = argument.split_whitespace();
    let token = tokens.next().unwrap_or_default();
    if tokens.next().is_some() {
        return Err(PrefixError::TooManyArguments);
    }

    let normalized: String = token.nfc().collect();
    let mut chars = normalized.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return Err(PrefixError::InvalidLength);
    };

    if !is_prefix_category(get_general_category(ch)) {
        return Err(PrefixError::InvalidCategory);
    }

    Ok(normalized)
}

fn is_prefix_category(category: GeneralCategory) -> bool {
    use GeneralCategory::*;
    matches!(
        category,
        UppercaseLetter
            | LowercaseLetter
            | TitlecaseLetter
            | ModifierLetter
            | OtherLetter
            | DecimalNumber
            | LetterNumber
            | OtherNumber
            | ConnectorPunctuation
            | DashPunctuation
            | OpenPunctuation
            | ClosePunctuation
            | InitialPunctuation
            | FinalPunctuation
            | OtherPunctuation
            | MathSymbol
            | CurrencySymbol
            | ModifierSymbol
            | OtherSymbol
    )
}

pub struct PrefixService {
    store: Arc<dyn PrefixStore>,
    default_prefix: String,
    retry: RetryPolicy,
}

impl PrefixService {
    pub fn new(store: Arc<dyn PrefixStore>, default_prefix: String, retry: RetryPolicy) -> Self {
        Self {
            store,
            default_prefix,
            retry,
        }
    }

    pub fn from_config(store: Arc<dyn PrefixStore>, config: &Config) -> Self {
        Self::new(
            store,
            config.general.prefix.nfc().collect(),
            RetryPolicy::linear(
                PREFIX_WRITE_RETRIES,
                Duration::from_millis(config.database.retry_backoff_ms),
            ),
        )
    }

    /// The prefix in effect for a guild, or the default for direct messages.
    /// Store failures are logged and answered with the default.
    pub async fn get_prefix(&self, guild_id: Option<u64>) -> String {
        let Some(guild_id) = guild_id else {
            return self.default_prefix.clone();
        };

        match self.store.get_guild_prefix(&guild_id.to_string()).await {
            Ok(Some(row)) => row.prefix,
            Ok(None) => self.default_prefix.clone(),
            Err(err) => {
                error!(guild_id, error = %err, "failed to read guild prefix, using default");
                self.default_prefix.clone()
            }
        }
    }

    pub async fn set_prefix(
        &self,
        event: &InboundEvent,
        argument: &str,
    ) -> Result<PrefixChange, PrefixError> {
        let guild_id = event.guild_id.ok_or(PrefixError::NotAllowedInDm)?;
        let proposed = normalize_prefix(argument)?;
        let guild_key = guild_id.to_string();

        let change = retry_with_backoff(self.retry, "set_prefix", |attempt| {
            let store = self.store.clone();
            let guild_key = guild_key.clone();
            let proposed = proposed.clone();
            let default_prefix = self.default_prefix.clone();
            async move {
                debug!(guild_id = %guild_key, attempt, "running prefix transaction");
                store
                    .change_prefix(&guild_key, &proposed, &default_prefix)
                    .await
            }
        })
        .await
        .map_err(|err| {
            error!(guild_id, error = %err, "prefix transaction failed after retries");
            PrefixError::PersistenceFailure(err)
        })?;

        info!(
            guild_id,
            old_prefix = %change.old_prefix,
            new_prefix = %change.new_prefix,
            write = ?change.write,
            "guild prefix set"
        );
        Ok(change)
    }
}
