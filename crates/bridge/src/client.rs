//! Request adapters: get, update, track and clear propositions over an [`EventHub`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use decisioning_interchange::{DecisionScope, JsonMap, PayloadError, Proposition};
use decisioning_tracking::InteractionSink;
use serde_json::Value;

use crate::config::{resolve_request_timeout, ConfigFetcher, RequestConfig, SharedStateConfig};
use crate::error::{AdobeError, OptimizeError};
use crate::event::{event_name, event_source, event_type, keys, request_type, Event};
use crate::hub::{request_with_deadline, EventHub};

/// Propositions keyed by the scope they were returned for.
pub type PropositionMap = HashMap<DecisionScope, Arc<Proposition>>;

/// Parameters of an update-propositions request.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub scopes: Vec<DecisionScope>,
    pub xdm: Option<JsonMap>,
    pub data: Option<JsonMap>,
    /// Falls back to the configured `optimize.timeout`, then the client default.
    pub timeout: Option<Duration>,
}

impl UpdateRequest {
    pub fn new(scopes: Vec<DecisionScope>) -> Self {
        UpdateRequest {
            scopes,
            ..Default::default()
        }
    }
}

pub struct DecisioningClient<H: EventHub> {
    hub: Arc<H>,
    config: RequestConfig,
    configs: ConfigFetcher<H>,
}

impl<H: EventHub> DecisioningClient<H> {
    pub fn new(hub: Arc<H>) -> Self {
        Self::with_config(hub, RequestConfig::default())
    }

    pub fn with_config(hub: Arc<H>, config: RequestConfig) -> Self {
        let configs = ConfigFetcher::new(Arc::clone(&hub), config.config_fetch_timeout);
        DecisioningClient {
            hub,
            config,
            configs,
        }
    }

    pub fn hub(&self) -> &Arc<H> {
        &self.hub
    }

    pub fn configs(&self) -> &ConfigFetcher<H> {
        &self.configs
    }

    /// Fetch propositions for `scopes`.
    ///
    /// Without an explicit `timeout` the fetched `timeout` configuration is
    /// used, falling back to the client's get timeout.
    pub async fn get_propositions(
        &self,
        scopes: &[DecisionScope],
        timeout: Option<Duration>,
    ) -> Result<PropositionMap, AdobeError> {
        let Some(scope_data) = valid_scope_data(scopes, "get") else {
            return Err(AdobeError::UnexpectedError);
        };

        let timeout = match timeout {
            Some(timeout) => timeout,
            None => Duration::try_from_secs_f64(self.configs.timeout_config().await)
                .unwrap_or(self.config.get_timeout),
        };

        let mut data = JsonMap::new();
        data.insert(keys::REQUEST_TYPE.to_string(), request_type::GET.into());
        data.insert(keys::DECISION_SCOPES.to_string(), Value::Array(scope_data));
        let event = Event::new(
            event_name::GET_PROPOSITIONS_REQUEST,
            event_type::OPTIMIZE,
            event_source::REQUEST_CONTENT,
        )
        .with_data(data);

        let response = request_with_deadline(self.hub.as_ref(), event, timeout)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "get propositions request failed");
                AdobeError::from(&e)
            })?;

        let data = response.data();
        if let Some(code) = data.get(keys::RESPONSE_ERROR) {
            return Err(code
                .as_i64()
                .map(AdobeError::from_code)
                .unwrap_or(AdobeError::UnexpectedError));
        }

        propositions_from_response(data).map_err(|e| {
            tracing::warn!(error = %e, "malformed get propositions response");
            AdobeError::UnexpectedError
        })
    }

    /// Request fresh propositions for `request.scopes` from the server.
    pub async fn update_propositions(
        &self,
        request: UpdateRequest,
    ) -> Result<PropositionMap, OptimizeError> {
        let Some(scope_data) = valid_scope_data(&request.scopes, "update") else {
            return Err(OptimizeError::unexpected());
        };

        let configuration = self.hub.configuration(None);
        let timeout =
            resolve_request_timeout(request.timeout, &configuration, self.config.update_timeout);

        let mut data = JsonMap::new();
        data.insert(keys::REQUEST_TYPE.to_string(), request_type::UPDATE.into());
        data.insert(keys::DECISION_SCOPES.to_string(), Value::Array(scope_data));
        if let Some(xdm) = request.xdm {
            data.insert(keys::XDM.to_string(), Value::Object(xdm));
        }
        if let Some(extra) = request.data {
            data.insert(keys::DATA.to_string(), Value::Object(extra));
        }
        data.insert(
            keys::TIMEOUT.to_string(),
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).into(),
        );
        let event = Event::new(
            event_name::UPDATE_PROPOSITIONS_REQUEST,
            event_type::OPTIMIZE,
            event_source::REQUEST_CONTENT,
        )
        .with_data(data);

        let response = request_with_deadline(self.hub.as_ref(), event, timeout)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "update propositions request failed");
                OptimizeError::from(&e)
            })?;

        let data = response.data();
        match data.get(keys::RESPONSE_ERROR) {
            None => {}
            Some(Value::Object(error)) => return Err(OptimizeError::from_map(error)),
            Some(other) => {
                tracing::warn!(error = %other, "unrecognized update propositions response error");
                return Err(OptimizeError::unexpected());
            }
        }

        propositions_from_response(data).map_err(|e| {
            tracing::warn!(error = %e, "malformed update propositions response");
            OptimizeError::unexpected()
        })
    }

    /// Dispatch an interaction document as a track-propositions request.
    /// An empty document is not dispatched.
    pub fn track_propositions(&self, xdm: JsonMap) {
        if xdm.is_empty() {
            tracing::debug!("interaction xdm is empty, track request not dispatched");
            return;
        }

        let mut data = JsonMap::new();
        data.insert(keys::REQUEST_TYPE.to_string(), request_type::TRACK.into());
        data.insert(keys::PROPOSITION_INTERACTIONS.to_string(), Value::Object(xdm));
        let event = Event::new(
            event_name::TRACK_PROPOSITIONS_REQUEST,
            event_type::OPTIMIZE,
            event_source::REQUEST_CONTENT,
        )
        .with_data(data);

        if let Err(e) = self.hub.dispatch(event) {
            tracing::warn!(error = %e, "track propositions request not dispatched");
        }
    }

    /// Ask the decisioning extension to drop its cached propositions.
    pub fn clear_cached_propositions(&self) {
        let event = Event::new(
            event_name::CLEAR_PROPOSITIONS_REQUEST,
            event_type::OPTIMIZE,
            event_source::REQUEST_RESET,
        );
        if let Err(e) = self.hub.dispatch(event) {
            tracing::warn!(error = %e, "clear propositions request not dispatched");
        }
    }
}

impl<H: EventHub> InteractionSink for DecisioningClient<H> {
    fn track(&self, xdm: JsonMap) {
        self.track_propositions(xdm);
    }
}

fn valid_scope_data(scopes: &[DecisionScope], request: &str) -> Option<Vec<Value>> {
    if scopes.is_empty() {
        tracing::warn!(request, "no decision scopes provided");
        return None;
    }
    let valid: Vec<Value> = scopes
        .iter()
        .filter(|scope| scope.is_valid())
        .map(DecisionScope::to_event_data)
        .collect();
    if valid.is_empty() {
        tracing::warn!(request, "provided decision scopes have no valid scope");
        return None;
    }
    Some(valid)
}

/// Reshape a response payload into propositions keyed by scope.
///
/// A missing `propositions` key is an empty result. Malformed propositions
/// and propositions without a scope are dropped; a later proposition for
/// the same scope replaces an earlier one.
pub fn propositions_from_response(data: &JsonMap) -> Result<PropositionMap, PayloadError> {
    let list = match data.get(keys::PROPOSITIONS) {
        None | Some(Value::Null) => return Ok(PropositionMap::new()),
        Some(Value::Array(list)) => list,
        Some(_) => {
            return Err(PayloadError::TypeMismatch {
                record: "response",
                field: keys::PROPOSITIONS.to_string(),
                expected: "array",
            })
        }
    };

    Ok(list
        .iter()
        .filter_map(Proposition::from_event_data)
        .filter(|proposition| !proposition.scope().is_empty())
        .map(|proposition| (DecisionScope::new(proposition.scope()), proposition))
        .collect())
}

/// Propositions carried by a notification event, or `None` when it has none.
pub fn propositions_from_notification(event: &Event) -> Option<PropositionMap> {
    match propositions_from_response(event.data()) {
        Ok(map) if !map.is_empty() => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed propositions notification");
            None
        }
    }
}
