//! The host event-bus contract the client and configuration fetcher run on.

use std::time::Duration;

use async_trait::async_trait;
use decisioning_interchange::JsonMap;

use crate::error::BridgeError;
use crate::event::Event;

/// Which shared-state version to read relative to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharedStateResolution {
    /// Latest state, pending or set.
    #[default]
    Any,
    /// Latest state that has been set.
    LastSet,
}

/// The host event bus.
///
/// Implementations must be `Send + Sync + 'static` so one hub can be shared
/// by the client, the configuration fetcher and spawned tasks.
#[async_trait]
pub trait EventHub: Send + Sync + 'static {
    /// Publish an event without waiting for a response.
    fn dispatch(&self, event: Event) -> Result<(), BridgeError>;

    /// Publish an event and wait for its correlated response.
    ///
    /// Returns `Err(BridgeError::Timeout)` if nothing answers within `timeout`.
    async fn dispatch_with_response(
        &self,
        event: Event,
        timeout: Duration,
    ) -> Result<Event, BridgeError>;

    /// Shared state published by `extension`, versioned at `event` when given.
    fn shared_state(
        &self,
        extension: &str,
        event: Option<&Event>,
        resolution: SharedStateResolution,
    ) -> Option<JsonMap>;
}

/// Correlated request bounded by `timeout` regardless of the hub's own timer.
pub(crate) async fn request_with_deadline<H: EventHub + ?Sized>(
    hub: &H,
    event: Event,
    timeout: Duration,
) -> Result<Event, BridgeError> {
    let name = event.name().to_string();
    match tokio::time::timeout(timeout, hub.dispatch_with_response(event, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::timeout(&name, timeout)),
    }
}
