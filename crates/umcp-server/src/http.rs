//! Streamable HTTP transport on axum.
//!
//! `POST /mcp` carries one JSON-RPC message per request. Replies to requests
//! are `text/event-stream` bodies holding one frame and the terminal frame;
//! notifications get a bare 202. `DELETE /mcp` ends a session.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tokio::net::TcpListener;
use umcp_codec::encode_reply;
use umcp_types::{Envelope, JsonRpcError, JsonRpcResponse, RequestId, SESSION_ID_HEADER};

use crate::dispatcher::{McpServer, Outcome, accepts_event_stream};
use crate::error::TransportError;

/// Correlation id used on transport-level error bodies.
const SERVER_ERROR_ID: &str = "server-error";

/// Build the `/mcp` router.
pub fn mcp_router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post).delete(handle_mcp_delete))
        .with_state(server)
}

/// Serve `/mcp` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, server: Arc<McpServer>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "MCP server listening");
    }
    axum::serve(listener, mcp_router(server))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn handle_mcp_post(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let accept = header_str(&headers, header::ACCEPT.as_str());
    let session_header = header_str(&headers, SESSION_ID_HEADER);

    if !accepts_event_stream(accept) {
        return transport_error(TransportError::NotAcceptable);
    }

    let envelope: Envelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable request body");
            return json_error(StatusCode::BAD_REQUEST, JsonRpcError::parse_error(e));
        }
    };

    tracing::debug!(
        method = envelope.method().unwrap_or("-"),
        id = ?envelope.id(),
        session_id = session_header.unwrap_or("-"),
        "MCP message received"
    );

    match server.handle(accept, session_header, envelope).await {
        Ok(Outcome::Respond {
            response,
            session_id,
        }) => event_stream(response, session_id.as_deref()),
        Ok(Outcome::Accepted { session_id }) => {
            let mut res = StatusCode::ACCEPTED.into_response();
            set_session_header(&mut res, Some(&session_id));
            res
        }
        Err(e) => transport_error(e),
    }
}

async fn handle_mcp_delete(State(server): State<Arc<McpServer>>, headers: HeaderMap) -> Response {
    match server.terminate(header_str(&headers, SESSION_ID_HEADER)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => transport_error(e),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn set_session_header(res: &mut Response, session_id: Option<&str>) {
    if let Some(value) = session_id.and_then(|id| HeaderValue::from_str(id).ok()) {
        res.headers_mut().insert(SESSION_ID_HEADER, value);
    }
}

fn event_stream(response: JsonRpcResponse, session_id: Option<&str>) -> Response {
    let envelope = Envelope::Response(response);
    let frames = match encode_reply([&envelope]) {
        Ok(frames) => frames,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                JsonRpcError::internal_error(e.to_string()),
            );
        }
    };

    let body = Body::from_stream(futures_util::stream::iter(
        frames.into_iter().map(Ok::<_, Infallible>),
    ));
    let mut res = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response();
    set_session_header(&mut res, session_id);
    res
}

fn transport_error(error: TransportError) -> Response {
    let status = match error {
        TransportError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
        TransportError::MissingSession | TransportError::SessionNotReady { .. } => {
            StatusCode::BAD_REQUEST
        }
        TransportError::UnknownSession { .. } => StatusCode::NOT_FOUND,
    };
    tracing::debug!(status = status.as_u16(), error = %error, "Transport error");
    json_error(status, JsonRpcError::invalid_request(error.to_string()))
}

fn json_error(status: StatusCode, error: JsonRpcError) -> Response {
    let body = JsonRpcResponse::err(RequestId::from(SERVER_ERROR_ID), error);
    (status, axum::Json(body)).into_response()
}
