//! Request timeouts and configuration lookup.
//!
//! Two sources feed configuration: the hub's configuration shared state,
//! read synchronously through [`SharedStateConfig`], and a correlated
//! "Get Configurations Request" performed by [`ConfigFetcher`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use decisioning_interchange::JsonMap;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::event::{event_name, event_source, event_type, keys, Event, CONFIGURATION_STATE};
use crate::hub::{request_with_deadline, EventHub, SharedStateResolution};

pub const DEFAULT_GET_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(10);
pub const CONFIG_FETCH_TIMEOUT: Duration = Duration::from_millis(1000);
/// Fallback for the fetched `timeout` configuration, in seconds.
pub const DEFAULT_CONFIGURABLE_TIMEOUT_SECS: f64 = 10.0;

/// Default timeouts applied when a request does not carry its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestConfig {
    pub get_timeout: Duration,
    pub update_timeout: Duration,
    pub config_fetch_timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig {
            get_timeout: DEFAULT_GET_TIMEOUT,
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
            config_fetch_timeout: CONFIG_FETCH_TIMEOUT,
        }
    }
}

/// Read a duration given in seconds. Negative, non-finite or non-numeric
/// values read as `None`.
pub fn seconds_value(map: &JsonMap, key: &str) -> Option<Duration> {
    map.get(key)
        .and_then(Value::as_f64)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Explicit request timeout, else `optimize.timeout` from `configuration`,
/// else `default`.
pub fn resolve_request_timeout(
    requested: Option<Duration>,
    configuration: &JsonMap,
    default: Duration,
) -> Duration {
    requested
        .or_else(|| seconds_value(configuration, keys::CONFIGS_TIMEOUT))
        .unwrap_or(default)
}

/// Configuration shared-state lookups on any [`EventHub`].
pub trait SharedStateConfig {
    /// The configuration shared state versioned at `event`, or an empty map.
    fn configuration(&self, event: Option<&Event>) -> JsonMap;

    /// Extract `key` from the configuration shared state.
    ///
    /// Returns `default` when the state is unavailable or the extractor
    /// yields nothing.
    fn config_value<T, F>(&self, event: Option<&Event>, key: &str, default: T, extractor: F) -> T
    where
        F: FnOnce(&JsonMap, &str) -> Option<T>,
    {
        let state = self.configuration(event);
        if state.is_empty() {
            tracing::debug!(key, "configuration shared state is not available");
            return default;
        }
        match extractor(&state, key) {
            Some(value) => value,
            None => {
                tracing::warn!(key, "configuration value missing or invalid, using default");
                default
            }
        }
    }
}

impl<H: EventHub + ?Sized> SharedStateConfig for H {
    fn configuration(&self, event: Option<&Event>) -> JsonMap {
        self.shared_state(CONFIGURATION_STATE, event, SharedStateResolution::Any)
            .unwrap_or_default()
    }
}

type InFlight = Mutex<Option<broadcast::Sender<Arc<JsonMap>>>>;

/// Fetches configurations from the hub, one request at a time.
///
/// A caller arriving while a fetch is in flight waits for that fetch and
/// receives the same result instead of dispatching its own request.
pub struct ConfigFetcher<H: EventHub> {
    hub: Arc<H>,
    timeout: Duration,
    in_flight: InFlight,
}

impl<H: EventHub> ConfigFetcher<H> {
    pub fn new(hub: Arc<H>, timeout: Duration) -> Self {
        ConfigFetcher {
            hub,
            timeout,
            in_flight: Mutex::new(None),
        }
    }

    /// Current configurations, or an empty map if the fetch fails.
    pub async fn fetch_configurations(&self) -> Arc<JsonMap> {
        let pending = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    *slot = Some(sender);
                    None
                }
            }
        };

        if let Some(mut receiver) = pending {
            tracing::debug!("configuration fetch in progress, waiting for its result");
            return match receiver.recv().await {
                Ok(configurations) => configurations,
                Err(e) => {
                    tracing::debug!(error = %e, "configuration fetch abandoned, returning empty configurations");
                    Arc::new(JsonMap::new())
                }
            };
        }

        let guard = InFlightGuard {
            slot: &self.in_flight,
        };
        let configurations = Arc::new(self.request_configurations().await);
        guard.complete(Arc::clone(&configurations));
        configurations
    }

    /// The fetched `timeout` configuration in seconds.
    pub async fn timeout_config(&self) -> f64 {
        let configurations = self.fetch_configurations().await;
        match configurations.get(keys::TIMEOUT).and_then(Value::as_f64) {
            Some(timeout) => timeout,
            None => {
                tracing::warn!(
                    default = DEFAULT_CONFIGURABLE_TIMEOUT_SECS,
                    "timeout configuration unavailable, using default"
                );
                DEFAULT_CONFIGURABLE_TIMEOUT_SECS
            }
        }
    }

    async fn request_configurations(&self) -> JsonMap {
        let event = Event::new(
            event_name::GET_CONFIGURATIONS_REQUEST,
            event_type::OPTIMIZE,
            event_source::REQUEST_CONFIGURATION,
        );
        match request_with_deadline(self.hub.as_ref(), event, self.timeout).await {
            Ok(response) => {
                tracing::debug!(keys = response.data().len(), "configurations fetched");
                response.into_data()
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch configurations, returning empty configurations");
                JsonMap::new()
            }
        }
    }
}

/// Clears the in-flight slot when the leading fetch ends, including when
/// its future is dropped before completing.
struct InFlightGuard<'a> {
    slot: &'a InFlight,
}

impl InFlightGuard<'_> {
    fn complete(self, configurations: Arc<JsonMap>) {
        if let Some(sender) = self.take() {
            // Err only means no caller was waiting.
            let _ = sender.send(configurations);
        }
    }

    fn take(&self) -> Option<broadcast::Sender<Arc<JsonMap>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.take();
    }
}
