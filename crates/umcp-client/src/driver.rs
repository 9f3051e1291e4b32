//! MCP client driver: one session against one streamable HTTP endpoint.
//!
//! Handles the protocol handshake (initialize + initialized notification),
//! tool discovery (tools/list), and tool invocation (tools/call).

use std::pin::pin;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use umcp_codec::FrameStream;
use umcp_types::mcp::methods;
use umcp_types::{
    CallToolParams, Envelope, Implementation, InitializeParams, InitializeResult,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId,
    SESSION_ID_HEADER, ToolDescriptor, ToolResult,
};

use crate::error::ClientError;

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Handshake progress of a [`McpHttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Disconnected,
    Handshaking,
    Ready,
}

/// Settings for a [`McpHttpClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Full URL of the MCP endpoint, e.g. `http://localhost:8006/mcp`.
    pub endpoint: String,
    pub timeout: Duration,
    pub client_info: Implementation,
    pub protocol_version: String,
}

impl ClientOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            client_info: Implementation::new("umcp-client", env!("CARGO_PKG_VERSION")),
            protocol_version: umcp_types::PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for a single MCP server session.
///
/// Every call takes `&mut self`, so one driver has at most one request in
/// flight. Share it behind a mutex if several tasks need it.
pub struct McpHttpClient {
    http: reqwest::Client,
    options: ClientOptions,
    state: DriverState,
    session_id: Option<String>,
    server: Option<InitializeResult>,
}

impl McpHttpClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Self {
            http,
            options,
            state: DriverState::Disconnected,
            session_id: None,
            server: None,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// What the server reported during the last successful handshake.
    pub fn server(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    pub fn endpoint(&self) -> &str {
        &self.options.endpoint
    }

    /// Perform the handshake. Moves to `Ready` only if both steps succeed.
    ///
    /// Calling this on a connected driver starts a fresh session.
    pub async fn connect(&mut self) -> Result<InitializeResult, ClientError> {
        self.state = DriverState::Handshaking;
        self.session_id = None;
        self.server = None;

        match self.handshake().await {
            Ok(result) => {
                self.state = DriverState::Ready;
                self.server = Some(result.clone());
                tracing::info!(
                    endpoint = %self.options.endpoint,
                    server = %result.server_info.name,
                    protocol_version = %result.protocol_version,
                    "Connected to MCP server"
                );
                Ok(result)
            }
            Err(e) => {
                self.state = DriverState::Disconnected;
                self.session_id = None;
                Err(ClientError::Connect {
                    source: Box::new(e),
                })
            }
        }
    }

    async fn handshake(&mut self) -> Result<InitializeResult, ClientError> {
        let params = InitializeParams {
            protocol_version: self.options.protocol_version.clone(),
            ..InitializeParams::new(self.options.client_info.clone())
        };
        let (response, session_id) = self
            .round_trip(methods::INITIALIZE, Some(to_value(params)?))
            .await?;
        let session_id = session_id.ok_or_else(|| {
            ClientError::Protocol("initialize response carried no session id".to_string())
        })?;
        let result: InitializeResult = parse_result(response)?;
        self.session_id = Some(session_id);

        let ack = JsonRpcNotification::new(methods::INITIALIZED, None);
        let res = self.post(&Envelope::from(ack)).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(result)
    }

    /// List the server's tools, in the server's order.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ClientError> {
        let response = self.request(methods::TOOLS_LIST, None).await?;
        let list: ListToolsResult = parse_result(response)?;
        Ok(list.tools)
    }

    /// Call a tool. A tool that ran and failed comes back as `Ok` with
    /// `is_error` set; protocol errors are [`ClientError::Rpc`].
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolResult, ClientError> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        let response = self
            .request(methods::TOOLS_CALL, Some(to_value(params)?))
            .await?;
        parse_result(response)
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        let response = self.request(methods::PING, None).await?;
        parse_result::<Value>(response).map(|_| ())
    }

    /// End the session on the server and return to `Disconnected`.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        let session_id = self.session_id.take();
        self.state = DriverState::Disconnected;
        self.server = None;

        let Some(session_id) = session_id else {
            return Ok(());
        };
        let res = self
            .http
            .delete(&self.options.endpoint)
            .header(SESSION_ID_HEADER, &session_id)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = res.status();
        // 404: the server already forgot the session.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(session_id, "Session closed");
            Ok(())
        } else {
            Err(ClientError::Status {
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            })
        }
    }

    async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<JsonRpcResponse, ClientError> {
        if self.state != DriverState::Ready {
            return Err(ClientError::NotReady { state: self.state });
        }
        let (response, _) = self.round_trip(method, params).await?;
        Ok(response)
    }

    /// Send one request and read its response. Also returns the session
    /// header of the reply, if any.
    async fn round_trip(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(JsonRpcResponse, Option<String>), ClientError> {
        let id = RequestId::String(uuid::Uuid::new_v4().to_string());
        let request = JsonRpcRequest::new(id.clone(), method, params);
        tracing::debug!(method, id = %id, "Sending request");

        let res = self.post(&Envelope::from(request)).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let session_id = res
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let response = self.read_response(res, &id).await?;
        Ok((response, session_id))
    }

    async fn post(&self, envelope: &Envelope) -> Result<reqwest::Response, ClientError> {
        let body = serde_json::to_vec(envelope)
            .map_err(|e| ClientError::Protocol(format!("Failed to serialize request: {e}")))?;

        let mut builder = self
            .http
            .post(&self.options.endpoint)
            .header(ACCEPT, HeaderValue::from_static(ACCEPT_BOTH))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);
        if let Some(session_id) = &self.session_id {
            builder = builder.header(SESSION_ID_HEADER, session_id);
        }
        builder.send().await.map_err(|e| self.transport_error(e))
    }

    /// Decode the reply body and return the response matching `expected`.
    async fn read_response(
        &self,
        res: reqwest::Response,
        expected: &RequestId,
    ) -> Result<JsonRpcResponse, ClientError> {
        let is_json = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let bytes = res.bytes().await.map_err(|e| self.transport_error(e))?;
            let envelope: Envelope = serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::Protocol(format!("Invalid JSON reply: {e}")))?;
            return match envelope {
                Envelope::Response(response) => correlate(response, expected),
                _ => Err(ClientError::NoData),
            };
        }

        let mut frames = pin!(FrameStream::new(res.bytes_stream()));
        while let Some(frame) = frames.next().await {
            match frame? {
                Envelope::Response(response) => return correlate(response, expected),
                other => {
                    tracing::debug!(method = other.method().unwrap_or("-"), "Skipping server message");
                }
            }
        }
        Err(ClientError::NoData)
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                timeout_ms: self.options.timeout.as_millis() as u64,
            }
        } else {
            ClientError::Http(e.to_string())
        }
    }
}

fn correlate(response: JsonRpcResponse, expected: &RequestId) -> Result<JsonRpcResponse, ClientError> {
    if &response.id != expected {
        return Err(ClientError::IdMismatch {
            expected: expected.clone(),
            actual: response.id,
        });
    }
    Ok(response)
}

fn parse_result<T: serde::de::DeserializeOwned>(
    response: JsonRpcResponse,
) -> Result<T, ClientError> {
    let value = response.into_result().map_err(|e| ClientError::Rpc {
        code: e.code,
        message: e.message,
    })?;
    serde_json::from_value(value)
        .map_err(|e| ClientError::Protocol(format!("Unexpected result shape: {e}")))
}

fn to_value<T: serde::Serialize>(params: T) -> Result<Value, ClientError> {
    serde_json::to_value(params)
        .map_err(|e| ClientError::Protocol(format!("Failed to serialize params: {e}")))
}
