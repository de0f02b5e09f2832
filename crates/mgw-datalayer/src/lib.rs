//! ---
//! mgw_section: "05-networking-external-interfaces"
//! mgw_subsection: "module"
//! mgw_type: "source"
//! mgw_scope: "code"
//! mgw_description: "REST client for the controller Data Layer."
//! mgw_version: "v0.1.0"
//! mgw_owner: "tbd"
//! ---
//! Client for the controller's node-based Data Layer REST interface.
//!
//! Every node is addressable as `{base}/automation/api/v2/nodes/{address}`
//! and wraps its payload in a `{"value": ...}` envelope. The gateway only
//! ever touches the two motor nodes, but the client itself is
//! address-agnostic: it forwards the caller's credential verbatim, issues
//! one HTTP call per operation, and classifies failures without retrying.

#![warn(missing_docs)]

use std::fmt;

use anyhow::{Context, Result};
use mgw_common::config::ControllerConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

/// Symbolic address of the motor enable flag in the PLC application.
pub const MOTOR_ENABLE_NODE: &str = "plc/app/Application/sym/PLC_PRG/motorEnable";

/// Symbolic address of the motor speed setpoint in the PLC application.
pub const MOTOR_SPEED_NODE: &str = "plc/app/Application/sym/PLC_PRG/motorSpeed";

/// Fixed path prefix of the Data Layer REST interface.
const NODE_PATH_PREFIX: &str = "automation/api/v2/nodes";

/// Opaque caller credential forwarded verbatim to the controller.
///
/// The gateway never parses, validates, or caches the value; the
/// controller's own identity service decides whether it is acceptable.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw `Authorization` header value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw header value to forward.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never echo bearer tokens into logs.
        f.write_str("Credential(***)")
    }
}

/// Failures surfaced by [`DataLayerClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum DataLayerError {
    /// The node address could not be combined with the base URL.
    #[error("invalid data layer url for node '{address}': {source}")]
    InvalidNodeUrl {
        /// Symbolic node address that failed to join.
        address: String,
        /// Underlying URL parse failure.
        #[source]
        source: url::ParseError,
    },
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("data layer request for node '{address}' failed: {source}")]
    Transport {
        /// Symbolic node address of the failed call.
        address: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The controller answered with a non-success HTTP status.
    #[error("data layer returned {status} for node '{address}': {detail}")]
    Status {
        /// Symbolic node address of the failed call.
        address: String,
        /// Upstream HTTP status code.
        status: StatusCode,
        /// Upstream response body, trimmed for the error detail.
        detail: String,
    },
    /// The controller's response body was not a `{"value": ...}` envelope.
    #[error("data layer response for node '{address}' is not a value envelope")]
    MalformedEnvelope {
        /// Symbolic node address of the malformed response.
        address: String,
    },
}

impl DataLayerError {
    /// Whether this failure originated upstream (gateway-type failure) as
    /// opposed to a local defect such as a malformed envelope or bad URL.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            DataLayerError::Transport { .. } | DataLayerError::Status { .. }
        )
    }
}

/// HTTP client bound to one controller's Data Layer.
#[derive(Debug, Clone)]
pub struct DataLayerClient {
    base: Url,
    http: reqwest::Client,
}

impl DataLayerClient {
    /// Build a client from controller settings.
    ///
    /// TLS verification is an explicit toggle threaded in from
    /// configuration rather than a process-wide global, so tests and
    /// multi-posture deployments can see exactly what each client does.
    pub fn new(settings: &ControllerConfig) -> Result<Self> {
        let base = settings.parsed_base_url()?;
        let mut builder = reqwest::Client::builder();
        if !settings.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder
            .build()
            .context("failed to build data layer http client")?;
        debug!(base = %base, verify_tls = settings.verify_tls, "data layer client ready");
        Ok(Self { base, http })
    }

    fn node_url(&self, address: &str) -> Result<Url, DataLayerError> {
        let raw = format!(
            "{}/{}/{}",
            self.base.as_str().trim_end_matches('/'),
            NODE_PATH_PREFIX,
            address
        );
        Url::parse(&raw).map_err(|source| DataLayerError::InvalidNodeUrl {
            address: address.to_owned(),
            source,
        })
    }

    /// Read a node and return the payload of its `value` envelope.
    pub async fn read_node(
        &self,
        credential: &Credential,
        address: &str,
    ) -> Result<Value, DataLayerError> {
        let url = self.node_url(address)?;
        debug!(node = address, "reading data layer node");
        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, credential.as_str())
            .send()
            .await
            .map_err(|source| transport(address, source))?;
        let body = check_status(address, response).await?;
        extract_value(address, &body)
    }

    /// Write a node by wrapping `value` in the Data Layer envelope.
    pub async fn write_node(
        &self,
        credential: &Credential,
        address: &str,
        value: Value,
    ) -> Result<(), DataLayerError> {
        let url = self.node_url(address)?;
        debug!(node = address, "writing data layer node");
        let response = self
            .http
            .put(url)
            .header(reqwest::header::AUTHORIZATION, credential.as_str())
            .json(&json!({ "value": value }))
            .send()
            .await
            .map_err(|source| transport(address, source))?;
        check_status(address, response).await?;
        Ok(())
    }
}

fn transport(address: &str, source: reqwest::Error) -> DataLayerError {
    warn!(node = address, error = %source, "data layer transport failure");
    DataLayerError::Transport {
        address: address.to_owned(),
        source,
    }
}

/// Treat any non-success status as an upstream failure carrying the
/// response body as detail; return the body on success.
async fn check_status(
    address: &str,
    response: reqwest::Response,
) -> Result<String, DataLayerError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| transport(address, source))?;
    if !status.is_success() {
        warn!(node = address, status = %status, "data layer returned error status");
        return Err(DataLayerError::Status {
            address: address.to_owned(),
            status,
            detail: body.trim().to_owned(),
        });
    }
    Ok(body)
}

fn extract_value(address: &str, body: &str) -> Result<Value, DataLayerError> {
    let envelope: Value =
        serde_json::from_str(body).map_err(|_| DataLayerError::MalformedEnvelope {
            address: address.to_owned(),
        })?;
    envelope
        .get("value")
        .cloned()
        .ok_or_else(|| DataLayerError::MalformedEnvelope {
            address: address.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct RecordedCall {
        method: String,
        address: String,
        authorization: Option<String>,
        content_type: Option<String>,
    }

    #[derive(Clone, Default)]
    struct MockState {
        calls: Arc<Mutex<Vec<RecordedCall>>>,
        nodes: Arc<Mutex<HashMap<String, Value>>>,
        fail_reads: bool,
        raw_body: Option<&'static str>,
    }

    impl MockState {
        fn record(&self, method: &str, address: &str, headers: &HeaderMap) {
            self.calls.lock().unwrap().push(RecordedCall {
                method: method.to_owned(),
                address: address.to_owned(),
                authorization: headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
                content_type: headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
            });
        }
    }

    async fn get_node(
        State(state): State<MockState>,
        Path(address): Path<String>,
        headers: HeaderMap,
    ) -> axum::response::Response {
        state.record("GET", &address, &headers);
        if state.fail_reads {
            return (StatusCode::INTERNAL_SERVER_ERROR, "node unavailable").into_response();
        }
        if let Some(raw) = state.raw_body {
            return (StatusCode::OK, raw.to_owned()).into_response();
        }
        let nodes = state.nodes.lock().unwrap();
        match nodes.get(&address) {
            Some(value) => Json(json!({ "value": value })).into_response(),
            None => (StatusCode::NOT_FOUND, "no such node").into_response(),
        }
    }

    async fn put_node(
        State(state): State<MockState>,
        Path(address): Path<String>,
        headers: HeaderMap,
        Json(envelope): Json<Value>,
    ) -> axum::response::Response {
        state.record("PUT", &address, &headers);
        let value = envelope.get("value").cloned().unwrap_or(Value::Null);
        state.nodes.lock().unwrap().insert(address, value);
        Json(json!({})).into_response()
    }

    async fn spawn_mock(state: MockState) -> SocketAddr {
        let router = Router::new()
            .route("/automation/api/v2/nodes/*address", get(get_node).put(put_node))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn client_for(addr: SocketAddr) -> DataLayerClient {
        DataLayerClient::new(&ControllerConfig {
            base_url: format!("http://{addr}"),
            verify_tls: false,
        })
        .unwrap()
    }

    #[test]
    fn node_url_uses_fixed_prefix() {
        let client = DataLayerClient::new(&ControllerConfig {
            base_url: "https://controller.local".into(),
            verify_tls: true,
        })
        .unwrap();
        let url = client.node_url(MOTOR_ENABLE_NODE).unwrap();
        assert_eq!(
            url.as_str(),
            "https://controller.local/automation/api/v2/nodes/plc/app/Application/sym/PLC_PRG/motorEnable"
        );
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("Bearer super-secret");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
    }

    #[tokio::test]
    async fn read_node_unwraps_value_envelope() {
        let state = MockState::default();
        state
            .nodes
            .lock()
            .unwrap()
            .insert(MOTOR_SPEED_NODE.to_owned(), json!(1500));
        let addr = spawn_mock(state.clone()).await;
        let client = client_for(addr);

        let value = client
            .read_node(&Credential::new("Bearer abc"), MOTOR_SPEED_NODE)
            .await
            .unwrap();
        assert_eq!(value, json!(1500));

        let calls = state.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].address, MOTOR_SPEED_NODE);
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn write_node_sends_envelope_and_content_type() {
        let state = MockState::default();
        let addr = spawn_mock(state.clone()).await;
        let client = client_for(addr);

        client
            .write_node(&Credential::new("Bearer abc"), MOTOR_ENABLE_NODE, json!(true))
            .await
            .unwrap();

        assert_eq!(
            state.nodes.lock().unwrap().get(MOTOR_ENABLE_NODE),
            Some(&json!(true))
        );
        let calls = state.calls.lock().unwrap();
        assert_eq!(calls[0].method, "PUT");
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(calls[0].content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_upstream_error() {
        let state = MockState {
            fail_reads: true,
            ..MockState::default()
        };
        let addr = spawn_mock(state).await;
        let client = client_for(addr);

        let err = client
            .read_node(&Credential::new("Bearer abc"), MOTOR_ENABLE_NODE)
            .await
            .unwrap_err();
        assert!(err.is_upstream());
        match err {
            DataLayerError::Status { status, detail, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(detail, "node unavailable");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_envelope_is_not_an_upstream_error() {
        let state = MockState {
            raw_body: Some("{\"payload\": 1}"),
            ..MockState::default()
        };
        let addr = spawn_mock(state).await;
        let client = client_for(addr);

        let err = client
            .read_node(&Credential::new("Bearer abc"), MOTOR_ENABLE_NODE)
            .await
            .unwrap_err();
        assert!(!err.is_upstream());
        assert!(matches!(err, DataLayerError::MalformedEnvelope { .. }));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        // Bind-then-drop to get a port with no listener.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(addr);
        let err = client
            .read_node(&Credential::new("Bearer abc"), MOTOR_ENABLE_NODE)
            .await
            .unwrap_err();
        assert!(err.is_upstream());
        assert!(matches!(err, DataLayerError::Transport { .. }));
    }
}
