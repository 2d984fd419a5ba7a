use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::{DispatchError, InboundEvent, Route, RouteSenders, RoutedEvent};
use crate::parsers::command_route;
use crate::prefix::PrefixService;

const COMMAND_WORD: &str = "maze";

static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<@!?(\d+)>$").unwrap_or_else(|err| panic!("invalid mention regex: {err}"))
});

/// What the stages see: the event, the prefix in effect for it and its NFC
/// normalized text.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub event: InboundEvent,
    pub prefix: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
pub struct StageScope {
    pub bot_id: u64,
}

/// Keeps the event when it returns true. Runs before the prefix lookup.
type Gate = fn(&StageScope, &InboundEvent) -> bool;

/// `Break(None)` drops the event, `Break(Some(_))` routes it and `Continue`
/// hands it to the next stage.
type Stage = fn(&StageScope, Candidate) -> ControlFlow<Option<RoutedEvent>, Candidate>;

pub struct EventFilterChain {
    scope: StageScope,
    gates: Vec<(&'static str, Gate)>,
    stages: Vec<(&'static str, Stage)>,
    prefixes: Arc<PrefixService>,
    sequence: AtomicU64,
}

impl EventFilterChain {
    pub fn new(prefixes: Arc<PrefixService>, bot_id: u64, ignore_bots: bool) -> Self {
        let mut gates: Vec<(&'static str, Gate)> = vec![("self_authored", not_self_authored)];
        if ignore_bots {
            gates.push(("bot_authored", not_bot_authored));
        }

        Self {
            scope: StageScope { bot_id },
            gates,
            stages: vec![
                ("command", accept_command),
                ("mention", accept_mention),
                ("unaddressed", drop_unaddressed),
            ],
            prefixes,
            sequence: AtomicU64::new(0),
        }
    }

    /// Classifies one event. Returns `None` when the event is not addressed to
    /// the bot.
    pub async fn filter(&self, mut event: InboundEvent) -> Option<RoutedEvent> {
        event.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        if let Some((gate, _)) = self
            .gates
            .iter()
            .find(|(_, keep)| !keep(&self.scope, &event))
        {
            debug!(message_id = event.message_id, gate, "event dropped");
            return None;
        }

        let prefix = self.prefixes.get_prefix(event.guild_id).await;
        let text = event.content.nfc().collect();
        let mut candidate = Candidate {
            event,
            prefix,
            text,
        };

        for (name, stage) in &self.stages {
            match stage(&self.scope, candidate) {
                ControlFlow::Continue(next) => candidate = next,
                ControlFlow::Break(Some(routed)) => {
                    debug!(
                        message_id = routed.event.message_id,
                        sequence = routed.event.sequence,
                        guild_id = ?routed.event.guild_id,
                        stage = name,
                        route = %routed.route,
                        "event accepted"
                    );
                    return Some(routed);
                }
                ControlFlow::Break(None) => return None,
            }
        }
        None
    }

    /// Filters the event and enqueues it, waiting while its channel is full.
    pub async fn dispatch(
        &self,
        event: InboundEvent,
        senders: &RouteSenders,
    ) -> Result<Option<Route>, DispatchError> {
        let Some(routed) = self.filter(event).await else {
            return Ok(None);
        };
        let route = routed.route;
        senders.send(routed).await?;
        Ok(Some(route))
    }
}

fn not_self_authored(scope: &StageScope, event: &InboundEvent) -> bool {
    event.author_id != scope.bot_id
}

fn not_bot_authored(_scope: &StageScope, event: &InboundEvent) -> bool {
    !event.author_is_bot
}

fn accept_command(
    _scope: &StageScope,
    candidate: Candidate,
) -> ControlFlow<Option<RoutedEvent>, Candidate> {
    let Some(rest) = candidate
        .text
        .strip_prefix(candidate.prefix.as_str())
        .and_then(|text| text.strip_prefix(COMMAND_WORD))
    else {
        return ControlFlow::Continue(candidate);
    };

    let rest = rest.trim().to_string();
    ControlFlow::Break(Some(RoutedEvent {
        route: command_route(&rest),
        text: rest,
        event: candidate.event,
        prefix: candidate.prefix,
    }))
}

fn accept_mention(
    scope: &StageScope,
    candidate: Candidate,
) -> ControlFlow<Option<RoutedEvent>, Candidate> {
    let text = candidate.text.trim();
    let mentions_bot = MENTION
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|id| id.as_str().parse::<u64>().ok())
        .is_some_and(|id| id == scope.bot_id);
    if !mentions_bot {
        return ControlFlow::Continue(candidate);
    }

    ControlFlow::Break(Some(RoutedEvent {
        text: text.to_string(),
        route: Route::Mention,
        event: candidate.event,
        prefix: candidate.prefix,
    }))
}

fn drop_unaddressed(
    _scope: &StageScope,
    _candidate: Candidate,
) -> ControlFlow<Option<RoutedEvent>, Candidate> {
    ControlFlow::Break(None)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::EventFilterChain;
    use crate::dispatch::{Route, route_channels};
    use crate::prefix::PrefixService;
    use crate::test_support::{BOT_ID, MemoryPrefixStore, direct_event, guild_event};
    use crate::utils::retry::RetryPolicy;

    fn chain_with(store: Arc<MemoryPrefixStore>, ignore_bots: bool) -> EventFilterChain {
        let prefixes = Arc::new(PrefixService::new(
            store,
            "!".to_string(),
            RetryPolicy::linear(3, Duration::ZERO),
        ));
        EventFilterChain::new(prefixes, BOT_ID, ignore_bots)
    }

    fn chain() -> EventFilterChain {
        chain_with(Arc::new(MemoryPrefixStore::default()), true)
    }

    #[tokio::test]
    async fn classifies_guild_messages() {
        let cases: [(&str, Option<(Route, &str)>); 12] = [
            ("!maze gen 5x5", Some((Route::Generate, "gen 5x5"))),
            ("!maze help", Some((Route::Help, "help"))),
            ("!maze   setPrefix ? ", Some((Route::SetPrefix, "setPrefix ?"))),
            ("!maze", Some((Route::Invalid, ""))),
            ("!maze dance", Some((Route::Invalid, "dance"))),
            ("!mazegen", Some((Route::Generate, "gen"))),
            ("<@4242>", Some((Route::Mention, "<@4242>"))),
            ("  <@!4242> ", Some((Route::Mention, "<@!4242>"))),
            ("<@999>", None),
            ("<@4242> hello", None),
            ("?maze help", None),
            ("hello there", None),
        ];

        let chain = chain();
        for (content, expected) in cases {
            let routed = chain.filter(guild_event(1, content)).await;
            let actual = routed.as_ref().map(|r| (r.route, r.text.as_str()));
            assert_eq!(actual, expected, "{content:?}");
        }
    }

    #[tokio::test]
    async fn drops_own_messages() {
        let mut event = guild_event(1, "!maze help");
        event.author_id = BOT_ID;
        assert!(chain().filter(event).await.is_none());
    }

    #[tokio::test]
    async fn other_bots_are_dropped_only_when_configured() {
        let mut event = guild_event(1, "!maze help");
        event.author_is_bot = true;

        assert!(chain().filter(event.clone()).await.is_none());

        let permissive = chain_with(Arc::new(MemoryPrefixStore::default()), false);
        let routed = permissive.filter(event).await.expect("accepted");
        assert_eq!(routed.route, Route::Help);
    }

    #[tokio::test]
    async fn uses_guild_prefix_override() {
        let store = Arc::new(MemoryPrefixStore::default());
        store.set_row("1", "?");
        let chain = chain_with(store, true);

        let routed = chain
            .filter(guild_event(1, "?maze help"))
            .await
            .expect("override accepted");
        assert_eq!(routed.prefix, "?");
        assert!(chain.filter(guild_event(1, "!maze help")).await.is_none());

        // Other guilds keep the default.
        assert!(chain.filter(guild_event(2, "!maze help")).await.is_some());
    }

    #[tokio::test]
    async fn direct_messages_use_default_prefix() {
        let store = Arc::new(MemoryPrefixStore::default());
        store.set_row("0", "?");
        let routed = chain_with(store, true)
            .filter(direct_event("!maze help"))
            .await
            .expect("accepted");
        assert_eq!(routed.prefix, "!");
        assert!(routed.event.is_direct_message());
    }

    #[tokio::test]
    async fn normalizes_text_before_matching_prefix() {
        let store = Arc::new(MemoryPrefixStore::default());
        store.set_row("1", "\u{00e9}");
        let chain = chain_with(store, true);

        let routed = chain
            .filter(guild_event(1, "e\u{0301}maze help"))
            .await
            .expect("decomposed prefix matches");
        assert_eq!(routed.route, Route::Help);
    }

    #[tokio::test]
    async fn sequence_follows_arrival_order() {
        let chain = chain();
        let first = chain.filter(guild_event(1, "!maze help")).await.expect("first");
        chain.filter(guild_event(1, "chatter")).await;
        let third = chain.filter(guild_event(1, "!maze help")).await.expect("third");
        assert_eq!(first.event.sequence, 0);
        assert_eq!(third.event.sequence, 2);
    }

    #[tokio::test]
    async fn dispatch_enqueues_on_route_channel() {
        let chain = chain();
        let (senders, receivers) = route_channels(8);

        let route = chain
            .dispatch(guild_event(1, "!maze gen"), &senders)
            .await
            .expect("dispatch");
        assert_eq!(route, Some(Route::Generate));
        let ignored = chain
            .dispatch(guild_event(1, "nothing"), &senders)
            .await
            .expect("dispatch");
        assert_eq!(ignored, None);

        let routed = receivers
            .generate
            .lock()
            .await
            .recv()
            .await
            .expect("queued");
        assert_eq!(routed.text, "gen");
    }
}
