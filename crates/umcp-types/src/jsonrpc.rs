//! JSON-RPC 2.0 envelopes exchanged between the MCP client and server.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The only protocol version string this implementation speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Caller-chosen correlation identifier. Round-trips exactly as received,
/// including ids beyond `i64` and fractional numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n.into())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 notification (no id, never answered).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(detail: impl fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, "Parse error")
            .with_data(serde_json::json!({ "detail": detail.to_string() }))
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Either a result or an error; a response never carries both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    Result(Value),
    Error(JsonRpcError),
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResponse")]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

/// Wire shape of a response before the result/error exclusivity check.
#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    jsonrpc: String,
    id: RequestId,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

// A present `"result": null` is still a result.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<RawResponse> for JsonRpcResponse {
    type Error = &'static str;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        let payload = match (raw.result, raw.error) {
            (Some(result), None) => ResponsePayload::Result(result),
            (None, Some(error)) => ResponsePayload::Error(error),
            (Some(_), Some(_)) => return Err("response carries both result and error"),
            (None, None) => return Err("response carries neither result nor error"),
        };
        Ok(Self {
            jsonrpc: raw.jsonrpc,
            id: raw.id,
            payload,
        })
    }
}

impl JsonRpcResponse {
    pub fn ok(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    pub fn err(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Error(error),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(v) => Some(v),
            ResponsePayload::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            ResponsePayload::Result(_) => None,
            ResponsePayload::Error(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.payload {
            ResponsePayload::Result(v) => Ok(v),
            ResponsePayload::Error(e) => Err(e),
        }
    }
}

/// One logical protocol message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl Envelope {
    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Envelope::Request(r) => Some(&r.method),
            Envelope::Notification(n) => Some(&n.method),
            Envelope::Response(_) => None,
        }
    }

    /// Correlation id for requests and responses.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Envelope::Request(r) => Some(&r.id),
            Envelope::Response(r) => Some(&r.id),
            Envelope::Notification(_) => None,
        }
    }
}

impl From<JsonRpcRequest> for Envelope {
    fn from(r: JsonRpcRequest) -> Self {
        Envelope::Request(r)
    }
}

impl From<JsonRpcResponse> for Envelope {
    fn from(r: JsonRpcResponse) -> Self {
        Envelope::Response(r)
    }
}

impl From<JsonRpcNotification> for Envelope {
    fn from(n: JsonRpcNotification) -> Self {
        Envelope::Notification(n)
    }
}

// Shape decides the variant: `method` + `id` is a request, `method` alone a
// notification, anything else must be a response.
impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Some(obj) = value.as_object() else {
            return Err(D::Error::custom("JSON-RPC message must be an object"));
        };

        let has_method = obj.contains_key("method");
        let has_id = obj.get("id").is_some_and(|id| !id.is_null());

        let parsed = if has_method && has_id {
            serde_json::from_value(value).map(Envelope::Request)
        } else if has_method {
            serde_json::from_value(value).map(Envelope::Notification)
        } else {
            serde_json::from_value(value).map(Envelope::Response)
        };
        parsed.map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialize_request_without_params() {
        let req = JsonRpcRequest::new(2, "tools/list", None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 2);
        assert_eq!(json["method"], "tools/list");
        assert!(json.get("params").is_none());
    }

    #[test]
    fn string_and_number_ids_roundtrip() {
        let s: RequestId = serde_json::from_value(json!("abc-123")).unwrap();
        assert_eq!(s, RequestId::String("abc-123".into()));
        let n: RequestId = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(n, RequestId::from(7));
        assert_eq!(serde_json::to_value(&s).unwrap(), json!("abc-123"));
    }

    #[test]
    fn wide_and_fractional_ids_roundtrip() {
        for raw in ["18446744073709551615", "1.5", "-0.0", "-9223372036854775808"] {
            let json = format!(r#"{{"jsonrpc":"2.0","id":{raw},"method":"tools/list"}}"#);
            let Envelope::Request(req) = serde_json::from_str::<Envelope>(&json).unwrap() else {
                panic!("expected a request for id {raw}");
            };
            assert_eq!(req.id.to_string(), raw);

            let reply = JsonRpcResponse::ok(req.id, json!({}));
            let out = serde_json::to_string(&reply).unwrap();
            assert!(out.contains(&format!(r#""id":{raw}"#)), "{out}");
        }
    }

    #[test]
    fn response_has_result_or_error_never_both() {
        let ok = JsonRpcResponse::ok(RequestId::from(1), json!({"tools": []}));
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.get("result").is_some());
        assert!(json.get("error").is_none());

        let err = JsonRpcResponse::err(
            RequestId::from(1),
            JsonRpcError::method_not_found("Method 'x' not found"),
        );
        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], -32601);
        assert!(json["error"].get("data").is_none());
    }

    #[test]
    fn deserialize_response_with_error_data() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"Invalid","data":"extra info"}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        let err = resp.error().unwrap();
        assert_eq!(err.code, -32600);
        assert_eq!(err.data.as_ref().unwrap(), "extra info");
    }

    #[test]
    fn deserialize_response_with_null_result() {
        let json = r#"{"jsonrpc":"2.0","id":"a","result":null}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.result(), Some(&Value::Null));
    }

    #[test]
    fn envelope_classifies_by_shape() {
        let req: Envelope =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"1","method":"tools/list"}"#).unwrap();
        assert!(matches!(req, Envelope::Request(_)));

        let notif: Envelope =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(matches!(notif, Envelope::Notification(_)));
        assert!(notif.id().is_none());

        let resp: Envelope =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#).unwrap();
        assert!(matches!(resp, Envelope::Response(_)));
    }

    #[test]
    fn response_with_both_or_neither_payload_is_rejected() {
        let both = r#"{"jsonrpc":"2.0","id":1,"result":{},"error":{"code":-1,"message":"x"}}"#;
        let err = serde_json::from_str::<Envelope>(both).unwrap_err();
        assert!(err.to_string().contains("both result and error"), "{err}");
        assert!(serde_json::from_str::<JsonRpcResponse>(both).is_err());
    }

    #[test]
    fn envelope_rejects_non_objects() {
        assert!(serde_json::from_str::<Envelope>("[1,2]").is_err());
        assert!(serde_json::from_str::<Envelope>(r#"{"jsonrpc":"2.0","id":1}"#).is_err());
    }

    #[test]
    fn notification_serializes_without_id() {
        let notif = JsonRpcNotification::new("notifications/initialized", None);
        let json = serde_json::to_value(Envelope::from(notif)).unwrap();
        assert_eq!(json["method"], "notifications/initialized");
        assert!(json.get("id").is_none());
        assert!(json.get("params").is_none());
    }
}
