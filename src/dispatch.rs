//! Inbound event routing.
//!
//! The [`filter::EventFilterChain`] turns raw chat messages into
//! [`RoutedEvent`]s, each pushed onto the bounded channel of its [`Route`].
//! A fixed [`worker::WorkerPool`] drains all channels and runs the handler for
//! the route.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

pub mod filter;
pub mod handlers;
pub mod worker;

pub use self::filter::EventFilterChain;
pub use self::worker::WorkerPool;

/// A chat message as it arrives from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub message_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_is_bot: bool,
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub content: String,
    /// Arrival order, assigned by the filter chain.
    pub sequence: u64,
}

impl InboundEvent {
    pub fn is_direct_message(&self) -> bool {
        self.guild_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Generate,
    Help,
    SetPrefix,
    Mention,
    Invalid,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Generate => "generate",
            Route::Help => "help",
            Route::SetPrefix => "set_prefix",
            Route::Mention => "mention",
            Route::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted event together with the prefix in effect for it and the text
/// left after `<prefix>maze`. For mentions `text` is the trimmed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedEvent {
    pub event: InboundEvent,
    pub route: Route,
    pub prefix: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0} channel closed")]
    ChannelClosed(Route),
}

pub type SharedReceiver = Arc<Mutex<mpsc::Receiver<RoutedEvent>>>;

#[derive(Clone)]
pub struct RouteSenders {
    generate: mpsc::Sender<RoutedEvent>,
    help: mpsc::Sender<RoutedEvent>,
    set_prefix: mpsc::Sender<RoutedEvent>,
    mention: mpsc::Sender<RoutedEvent>,
    invalid: mpsc::Sender<RoutedEvent>,
}

impl RouteSenders {
    fn sender(&self, route: Route) -> &mpsc::Sender<RoutedEvent> {
        match route {
            Route::Generate => &self.generate,
            Route::Help => &self.help,
            Route::SetPrefix => &self.set_prefix,
            Route::Mention => &self.mention,
            Route::Invalid => &self.invalid,
        }
    }

    /// Waits for room on the route's channel.
    pub async fn send(&self, routed: RoutedEvent) -> Result<(), DispatchError> {
        let route = routed.route;
        self.sender(route)
            .send(routed)
            .await
            .map_err(|_| DispatchError::ChannelClosed(route))
    }
}

/// Receiving ends shared by every worker. Each event is received by exactly
/// one of them.
#[derive(Clone)]
pub struct RouteReceivers {
    pub generate: SharedReceiver,
    pub help: SharedReceiver,
    pub set_prefix: SharedReceiver,
    pub mention: SharedReceiver,
    pub invalid: SharedReceiver,
}

pub fn route_channels(capacity: usize) -> (RouteSenders, RouteReceivers) {
    let (generate_tx, generate_rx) = mpsc::channel(capacity);
    let (help_tx, help_rx) = mpsc::channel(capacity);
    let (set_prefix_tx, set_prefix_rx) = mpsc::channel(capacity);
    let (mention_tx, mention_rx) = mpsc::channel(capacity);
    let (invalid_tx, invalid_rx) = mpsc::channel(capacity);

    let share = |rx| Arc::new(Mutex::new(rx));
    (
        RouteSenders {
            generate: generate_tx,
            help: help_tx,
            set_prefix: set_prefix_tx,
            mention: mention_tx,
            invalid: invalid_tx,
        },
        RouteReceivers {
            generate: share(generate_rx),
            help: share(help_rx),
            set_prefix: share(set_prefix_rx),
            mention: share(mention_rx),
            invalid: share(invalid_rx),
        },
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{DispatchError, Route, RoutedEvent, route_channels};
    use crate::test_support::guild_event;

    fn routed(route: Route, sequence: u64) -> RoutedEvent {
        let mut event = guild_event(1, "!maze help");
        event.sequence = sequence;
        RoutedEvent {
            event,
            route,
            prefix: "!".to_string(),
            text: "help".to_string(),
        }
    }

    #[tokio::test]
    async fn events_land_on_their_route_channel() {
        let (senders, receivers) = route_channels(4);
        senders.send(routed(Route::Help, 1)).await.expect("send help");
        senders
            .send(routed(Route::Invalid, 2))
            .await
            .expect("send invalid");

        let help = receivers.help.lock().await.recv().await.expect("help event");
        let invalid = receivers
            .invalid
            .lock()
            .await
            .recv()
            .await
            .expect("invalid event");
        assert_eq!(help.event.sequence, 1);
        assert_eq!(invalid.event.sequence, 2);
        assert!(receivers.generate.lock().await.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_channel_suspends_sender() {
        let (senders, receivers) = route_channels(1);
        senders.send(routed(Route::Generate, 1)).await.expect("first");

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            senders.send(routed(Route::Generate, 2)),
        )
        .await;
        assert!(blocked.is_err(), "send should wait for capacity");

        receivers.generate.lock().await.recv().await.expect("drain");
        senders.send(routed(Route::Generate, 3)).await.expect("room again");
    }

    #[tokio::test]
    async fn send_fails_once_receivers_are_gone() {
        let (senders, receivers) = route_channels(1);
        drop(receivers);

        let result = senders.send(routed(Route::Mention, 1)).await;
        assert!(matches!(
            result,
            Err(DispatchError::ChannelClosed(Route::Mention))
        ));
    }
}
