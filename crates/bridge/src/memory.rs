//! In-process [`EventHub`] that records dispatched events.
//!
//! Correlated requests are answered by a responder closure. A request the
//! responder declines (returns `None` for) times out. An optional latency
//! delays every answer, which is how tests hold a request in flight.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use decisioning_interchange::JsonMap;

use crate::error::BridgeError;
use crate::event::Event;
use crate::hub::{EventHub, SharedStateResolution};

type Responder = Box<dyn Fn(&Event) -> Option<Event> + Send + Sync>;

#[derive(Default)]
pub struct InMemoryHub {
    events: Mutex<Vec<Event>>,
    shared_states: Mutex<HashMap<String, JsonMap>>,
    responder: Option<Responder>,
    latency: Option<Duration>,
}

impl InMemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&Event) -> Option<Event> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_shared_state(&self, extension: &str, state: JsonMap) {
        self.shared_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(extension.to_string(), state);
    }

    /// Every event dispatched so far, in dispatch order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| event.name() == name)
            .collect()
    }

    fn record(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl std::fmt::Debug for InMemoryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryHub")
            .field("events", &self.events)
            .field("shared_states", &self.shared_states)
            .field("responder", &self.responder.is_some())
            .field("latency", &self.latency)
            .finish()
    }
}

#[async_trait]
impl EventHub for InMemoryHub {
    fn dispatch(&self, event: Event) -> Result<(), BridgeError> {
        tracing::trace!(name = %event.name(), "dispatch");
        self.record(event);
        Ok(())
    }

    async fn dispatch_with_response(
        &self,
        event: Event,
        timeout: Duration,
    ) -> Result<Event, BridgeError> {
        self.record(event.clone());

        if let Some(latency) = self.latency {
            if latency >= timeout {
                tokio::time::sleep(timeout).await;
                return Err(BridgeError::timeout(event.name(), timeout));
            }
            tokio::time::sleep(latency).await;
        }

        self.responder
            .as_ref()
            .and_then(|responder| responder(&event))
            .ok_or_else(|| BridgeError::timeout(event.name(), timeout))
    }

    fn shared_state(
        &self,
        extension: &str,
        _event: Option<&Event>,
        _resolution: SharedStateResolution,
    ) -> Option<JsonMap> {
        self.shared_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(extension)
            .cloned()
    }
}
