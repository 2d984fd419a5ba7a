use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use super::{DispatchError, Route, RouteReceivers, RoutedEvent, SharedReceiver, handlers};
use crate::context::AppContext;

/// Fixed set of workers draining every route channel.
pub struct WorkerPool {
    ctx: Arc<AppContext>,
    receivers: RouteReceivers,
    size: usize,
}

impl WorkerPool {
    pub fn new(ctx: Arc<AppContext>, receivers: RouteReceivers, size: usize) -> Self {
        Self {
            ctx,
            receivers,
            size,
        }
    }

    /// Starts the workers. Each task only finishes when a channel closes.
    pub fn spawn(self) -> JoinSet<Result<(), DispatchError>> {
        let mut workers = JoinSet::new();
        for id in 0..self.size {
            workers.spawn(run_worker(id, self.ctx.clone(), self.receivers.clone()));
        }
        info!(workers = self.size, "worker pool started");
        workers
    }
}

pub async fn run_worker(
    id: usize,
    ctx: Arc<AppContext>,
    receivers: RouteReceivers,
) -> Result<(), DispatchError> {
    loop {
        let (route, next) = tokio::select! {
            event = next_event(&receivers.generate) => (Route::Generate, event),
            event = next_event(&receivers.help) => (Route::Help, event),
            event = next_event(&receivers.set_prefix) => (Route::SetPrefix, event),
            event = next_event(&receivers.mention) => (Route::Mention, event),
            event = next_event(&receivers.invalid) => (Route::Invalid, event),
        };

        let Some(routed) = next else {
            return Err(DispatchError::ChannelClosed(route));
        };

        debug!(
            worker = id,
            route = %route,
            message_id = routed.event.message_id,
            sequence = routed.event.sequence,
            "handling event"
        );
        handlers::handle(&ctx, routed).await;
    }
}

async fn next_event(receiver: &SharedReceiver) -> Option<RoutedEvent> {
    receiver.lock().await.recv().await
}
