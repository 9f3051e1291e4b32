//! Protocol dispatcher: session preconditions, then method routing.
//!
//! [`McpServer::handle`] knows nothing about HTTP. It takes the values of the
//! `Accept` and `Mcp-Session-Id` headers plus one decoded envelope, and
//! returns either an [`Outcome`] for the transport to render or a
//! [`TransportError`] that ends processing before any method runs.

use std::sync::Arc;

use serde_json::{Value, json};
use umcp_session::SessionStore;
use umcp_tools::ToolRegistry;
use umcp_types::mcp::methods;
use umcp_types::{
    Envelope, Implementation, InitializeResult, JSONRPC_VERSION, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS, ToolError,
};

use crate::error::TransportError;

/// Static server identity advertised by `initialize`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_info: Implementation,
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_info: Implementation::new("umcp-server", env!("CARGO_PKG_VERSION")),
            instructions: None,
        }
    }
}

/// What the transport should send back.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Reply with one response frame. `session_id` goes in the response header.
    Respond {
        response: JsonRpcResponse,
        session_id: Option<String>,
    },
    /// The message was a notification or client response; acknowledge with no body.
    Accepted { session_id: String },
}

/// The server-side protocol engine.
pub struct McpServer {
    config: ServerConfig,
    store: Arc<SessionStore>,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(config: ServerConfig, registry: ToolRegistry) -> Self {
        Self::with_store(config, Arc::new(registry), Arc::new(SessionStore::new()))
    }

    pub fn with_store(
        config: ServerConfig,
        registry: Arc<ToolRegistry>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Dispatch one incoming message.
    pub async fn handle(
        &self,
        accept: Option<&str>,
        session_header: Option<&str>,
        envelope: Envelope,
    ) -> Result<Outcome, TransportError> {
        if !accepts_event_stream(accept) {
            return Err(TransportError::NotAcceptable);
        }

        if let Envelope::Request(request) = &envelope {
            if request.method == methods::INITIALIZE {
                return Ok(self.initialize(request).await);
            }
        }

        let session_id = session_header
            .filter(|s| !s.is_empty())
            .ok_or(TransportError::MissingSession)?;
        let session = self
            .store
            .get(session_id)
            .await
            .map_err(|_| TransportError::UnknownSession {
                id: session_id.to_string(),
            })?;

        let request = match envelope {
            Envelope::Request(request) => request,
            Envelope::Notification(notification) => {
                if notification.method == methods::INITIALIZED {
                    self.store.mark_ready(session_id).await.map_err(|_| {
                        TransportError::UnknownSession {
                            id: session_id.to_string(),
                        }
                    })?;
                } else {
                    tracing::debug!(method = %notification.method, "Ignoring notification");
                }
                return Ok(Outcome::Accepted {
                    session_id: session_id.to_string(),
                });
            }
            Envelope::Response(response) => {
                tracing::debug!(id = %response.id, "Ignoring client response");
                return Ok(Outcome::Accepted {
                    session_id: session_id.to_string(),
                });
            }
        };

        if !session.is_ready() && request.method != methods::PING {
            return Err(TransportError::SessionNotReady {
                id: session_id.to_string(),
            });
        }

        let response = self.dispatch(request).await;

        // The session may have been deleted while the request ran.
        if self.store.touch(session_id).await.is_err() {
            tracing::debug!(session_id, "Session gone before touch");
        }

        Ok(Outcome::Respond {
            response,
            session_id: Some(session_id.to_string()),
        })
    }

    /// End a session. Backs `DELETE /mcp`.
    pub async fn terminate(&self, session_header: Option<&str>) -> Result<(), TransportError> {
        let session_id = session_header
            .filter(|s| !s.is_empty())
            .ok_or(TransportError::MissingSession)?;
        self.store
            .remove(session_id)
            .await
            .map_err(|_| TransportError::UnknownSession {
                id: session_id.to_string(),
            })?;
        tracing::info!(session_id, "Session terminated");
        Ok(())
    }

    // Always opens a session, whatever the request's `jsonrpc` field says.
    async fn initialize(&self, request: &JsonRpcRequest) -> Outcome {
        let requested = request
            .params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let protocol_version = requested
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
            .unwrap_or(PROTOCOL_VERSION);

        let client = request
            .params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        let session_id = self.store.create().await;
        tracing::info!(
            session_id = %session_id,
            client,
            protocol_version,
            requested = requested.unwrap_or("none"),
            "Session initialized"
        );

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: self.config.server_info.clone(),
            instructions: self.config.instructions.clone(),
        };

        Outcome::Respond {
            response: to_response(request, result),
            session_id: Some(session_id.to_string()),
        }
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if let Some(response) = check_version(&request) {
            return response;
        }
        tracing::debug!(method = %request.method, id = %request.id, "Dispatching request");

        let method = request.method.clone();
        match method.as_str() {
            methods::PING => JsonRpcResponse::ok(request.id, json!({})),
            methods::TOOLS_LIST => {
                let result = ListToolsResult {
                    tools: self.registry.list(),
                };
                to_response(&request, result)
            }
            methods::TOOLS_CALL => self.call_tool(request).await,
            other => JsonRpcResponse::err(
                request.id,
                JsonRpcError::method_not_found(format!("Method '{other}' not found")),
            ),
        }
    }

    async fn call_tool(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let Some(params) = request.params.as_ref().filter(|p| !p.is_null()) else {
            return JsonRpcResponse::err(
                request.id,
                JsonRpcError::invalid_params("Missing parameters"),
            );
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::err(
                request.id,
                JsonRpcError::invalid_params("Missing required parameter: name"),
            );
        };
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args) => args.clone(),
        };

        match self.registry.invoke(name, arguments).await {
            Ok(result) => to_response(&request, result),
            Err(e @ ToolError::UnknownTool { .. }) => {
                JsonRpcResponse::err(request.id, JsonRpcError::method_not_found(e.to_string()))
            }
            Err(e) => {
                JsonRpcResponse::err(request.id, JsonRpcError::internal_error(e.to_string()))
            }
        }
    }
}

/// True when `accept` names both `application/json` and `text/event-stream`.
///
/// Media-type parameters are ignored. Wildcards do not count.
pub fn accepts_event_stream(accept: Option<&str>) -> bool {
    let Some(accept) = accept else {
        return false;
    };
    let mut json = false;
    let mut sse = false;
    for media in accept.split(',') {
        let essence = media.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case("application/json") {
            json = true;
        } else if essence.eq_ignore_ascii_case("text/event-stream") {
            sse = true;
        }
    }
    json && sse
}

fn check_version(request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    (request.jsonrpc != JSONRPC_VERSION).then(|| {
        JsonRpcResponse::err(
            request.id.clone(),
            JsonRpcError::invalid_request(format!(
                "Unsupported jsonrpc version '{}'",
                request.jsonrpc
            )),
        )
    })
}

fn to_response<T: serde::Serialize>(request: &JsonRpcRequest, result: T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::ok(request.id.clone(), value),
        Err(e) => JsonRpcResponse::err(
            request.id.clone(),
            JsonRpcError::internal_error(format!("Failed to serialize result: {e}")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umcp_tools::{InMemoryUserService, register_user_tools};
    use umcp_types::{JsonRpcNotification, RequestId, ToolResult, codes};

    const ACCEPT: Option<&str> = Some("application/json, text/event-stream");

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        register_user_tools(&mut registry, Arc::new(InMemoryUserService::seeded())).unwrap();
        McpServer::new(ServerConfig::default(), registry)
    }

    fn request(id: i64, method: &str, params: Value) -> Envelope {
        JsonRpcRequest::new(id, method, Some(params)).into()
    }

    fn initialized() -> Envelope {
        JsonRpcNotification::new(methods::INITIALIZED, None).into()
    }

    async fn ready_session(server: &McpServer) -> String {
        let outcome = server
            .handle(ACCEPT, None, request(1, "initialize", json!({"protocolVersion": "2024-11-05"})))
            .await
            .unwrap();
        let Outcome::Respond {
            session_id: Some(id),
            ..
        } = outcome
        else {
            panic!("initialize did not return a session id");
        };
        server.handle(ACCEPT, Some(&id), initialized()).await.unwrap();
        id
    }

    fn response(outcome: Outcome) -> JsonRpcResponse {
        match outcome {
            Outcome::Respond { response, .. } => response,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn accept_header_needs_both_types() {
        assert!(accepts_event_stream(ACCEPT));
        assert!(accepts_event_stream(Some(
            "Text/Event-Stream; q=0.9 , application/json;charset=utf-8"
        )));
        assert!(!accepts_event_stream(Some("application/json")));
        assert!(!accepts_event_stream(Some("*/*")));
        assert!(!accepts_event_stream(Some("application/jsonx, text/event-stream")));
        assert!(!accepts_event_stream(None));
    }

    #[tokio::test]
    async fn not_acceptable_before_anything_else() {
        let server = server();
        let err = server
            .handle(Some("application/json"), None, request(1, "initialize", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::NotAcceptable);
        assert!(server.store().is_empty().await);
    }

    #[tokio::test]
    async fn initialize_echoes_supported_version() {
        let server = server();
        for (asked, expected) in [
            ("2024-11-05", "2024-11-05"),
            ("2025-03-26", "2025-03-26"),
            ("1999-01-01", PROTOCOL_VERSION),
        ] {
            let outcome = server
                .handle(ACCEPT, None, request(1, "initialize", json!({"protocolVersion": asked})))
                .await
                .unwrap();
            let result: InitializeResult =
                serde_json::from_value(response(outcome).into_result().unwrap()).unwrap();
            assert_eq!(result.protocol_version, expected);
            assert!(result.capabilities.get("tools").is_some());
            assert_eq!(result.server_info.name, "umcp-server");
        }
        assert_eq!(server.store().len().await, 3);
    }

    #[tokio::test]
    async fn session_id_stays_out_of_the_payload() {
        let server = server();
        let outcome = server
            .handle(ACCEPT, None, request(1, "initialize", json!({})))
            .await
            .unwrap();
        let Outcome::Respond {
            response,
            session_id: Some(id),
        } = outcome
        else {
            panic!("missing session id");
        };
        let body = serde_json::to_string(&response).unwrap();
        assert!(!body.contains(&id));
    }

    #[tokio::test]
    async fn missing_and_unknown_sessions() {
        let server = server();
        let err = server
            .handle(ACCEPT, None, request(2, "tools/list", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::MissingSession);

        let err = server
            .handle(ACCEPT, Some("bogus"), request(2, "tools/call", json!({"name": "get_user_by_id"})))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownSession { .. }));
        assert!(server.store().is_empty().await);
    }

    #[tokio::test]
    async fn requests_before_acknowledgment_are_rejected() {
        let server = server();
        let outcome = server
            .handle(ACCEPT, None, request(1, "initialize", json!({})))
            .await
            .unwrap();
        let Outcome::Respond {
            session_id: Some(id),
            ..
        } = outcome
        else {
            panic!("missing session id");
        };

        let err = server
            .handle(ACCEPT, Some(&id), request(2, "tools/list", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::SessionNotReady { .. }));

        let pong = server
            .handle(ACCEPT, Some(&id), request(3, "ping", json!({})))
            .await
            .unwrap();
        assert_eq!(response(pong).result(), Some(&json!({})));
    }

    #[tokio::test]
    async fn acknowledgment_is_accepted_and_marks_ready() {
        let server = server();
        let id = ready_session(&server).await;
        assert!(server.store().get(&id).await.unwrap().is_ready());

        let again = server.handle(ACCEPT, Some(&id), initialized()).await.unwrap();
        assert_eq!(again, Outcome::Accepted { session_id: id });
    }

    #[tokio::test]
    async fn tools_list_is_stable() {
        let server = server();
        let id = ready_session(&server).await;
        let first = response(
            server
                .handle(ACCEPT, Some(&id), request(2, "tools/list", json!({})))
                .await
                .unwrap(),
        );
        let second = response(
            server
                .handle(ACCEPT, Some(&id), request(3, "tools/list", json!({})))
                .await
                .unwrap(),
        );
        assert_eq!(first.result(), second.result());
        let tools: ListToolsResult = serde_json::from_value(first.into_result().unwrap()).unwrap();
        assert_eq!(tools.tools.len(), 5);
    }

    #[tokio::test]
    async fn tools_call_errors_are_protocol_level() {
        let server = server();
        let id = ready_session(&server).await;

        let cases = [
            (Value::Null, codes::INVALID_PARAMS),
            (json!({"arguments": {}}), codes::INVALID_PARAMS),
            (json!({"name": "drop_tables"}), codes::METHOD_NOT_FOUND),
        ];
        for (params, code) in cases {
            let envelope = JsonRpcRequest::new(9, "tools/call", Some(params)).into();
            let resp = response(server.handle(ACCEPT, Some(&id), envelope).await.unwrap());
            assert_eq!(resp.id, RequestId::from(9));
            assert_eq!(resp.error().unwrap().code, code);
        }
    }

    #[tokio::test]
    async fn tool_failure_is_an_error_result() {
        let server = server();
        let id = ready_session(&server).await;
        let resp = response(
            server
                .handle(
                    ACCEPT,
                    Some(&id),
                    request(4, "tools/call", json!({"name": "get_user_by_id", "arguments": {"id": 404}})),
                )
                .await
                .unwrap(),
        );
        assert!(resp.error().is_none());
        let result: ToolResult = serde_json::from_value(resp.into_result().unwrap()).unwrap();
        assert!(result.is_error);
        assert!(result.first_text().unwrap().starts_with("Tool execution error:"));
    }

    #[tokio::test]
    async fn unknown_method_and_bad_version() {
        let server = server();
        let id = ready_session(&server).await;

        let resp = response(
            server
                .handle(ACCEPT, Some(&id), request(5, "resources/list", json!({})))
                .await
                .unwrap(),
        );
        assert_eq!(resp.error().unwrap().code, codes::METHOD_NOT_FOUND);

        let mut old = JsonRpcRequest::new(6, "tools/list", None);
        old.jsonrpc = "1.0".into();
        let resp = response(server.handle(ACCEPT, Some(&id), old.into()).await.unwrap());
        assert_eq!(resp.error().unwrap().code, codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn initialize_succeeds_with_any_jsonrpc_version() {
        let server = server();
        let mut init = JsonRpcRequest::new(1, "initialize", Some(json!({})));
        init.jsonrpc = "1.0".into();
        let outcome = server.handle(ACCEPT, None, init.into()).await.unwrap();
        let Outcome::Respond {
            response,
            session_id: Some(id),
        } = outcome
        else {
            panic!("initialize did not return a session id");
        };
        assert!(response.result().is_some());
        assert!(server.store().get(&id).await.is_ok());
    }

    #[tokio::test]
    async fn successful_requests_touch_the_session() {
        let server = server();
        let id = ready_session(&server).await;
        let before = server.store().get(&id).await.unwrap().last_activity;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        server
            .handle(ACCEPT, Some(&id), request(2, "ping", json!({})))
            .await
            .unwrap();
        assert!(server.store().get(&id).await.unwrap().last_activity > before);
    }

    #[tokio::test]
    async fn terminate_removes_session() {
        let server = server();
        let id = ready_session(&server).await;
        server.terminate(Some(&id)).await.unwrap();
        assert!(matches!(
            server.terminate(Some(&id)).await,
            Err(TransportError::UnknownSession { .. })
        ));
        assert_eq!(server.terminate(None).await, Err(TransportError::MissingSession));
        let err = server
            .handle(ACCEPT, Some(&id), request(2, "ping", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownSession { .. }));
    }
}
