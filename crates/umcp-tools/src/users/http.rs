//! REST client for the user-management service.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use umcp_types::ToolError;

use super::{NewUser, ServiceFuture, User, UserSearch, UserService, UserUpdate};

/// Default request timeout for user-service calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`UserService`] backed by the `/v1/users` REST API.
#[derive(Clone)]
pub struct HttpUserService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUserService {
    /// Create a client. `api_key`, when set, is sent as a bearer credential.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| ToolError::ExecutionFailed("Invalid API key format".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/users{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ToolError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::ExecutionFailed("user service timed out".into())
            } else {
                ToolError::ExecutionFailed(format!("user service unreachable: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "User service error");
        Err(ToolError::Service {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ToolError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("invalid user service response: {e}")))
    }
}

/// Pull a message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(alias = "detail", alias = "error")]
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.to_string())
}

impl UserService for HttpUserService {
    fn get_user(&self, id: u64) -> ServiceFuture<'_, User> {
        Box::pin(async move {
            tracing::debug!(id, "GET user");
            self.send_json(self.http.get(self.url(&format!("/{id}")))).await
        })
    }

    fn search_users(&self, filter: UserSearch) -> ServiceFuture<'_, Vec<User>> {
        Box::pin(async move {
            tracing::debug!(?filter, "Search users");
            self.send_json(self.http.get(self.url("/search")).query(&filter))
                .await
        })
    }

    fn add_user(&self, user: NewUser) -> ServiceFuture<'_, User> {
        Box::pin(async move {
            self.send_json(self.http.post(self.url("")).json(&user))
                .await
        })
    }

    fn update_user(&self, id: u64, update: UserUpdate) -> ServiceFuture<'_, User> {
        Box::pin(async move {
            self.send_json(self.http.put(self.url(&format!("/{id}"))).json(&update))
                .await
        })
    }

    fn delete_user(&self, id: u64) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.send(self.http.delete(self.url(&format!("/{id}"))))
                .await
                .map(|_| ())
        })
    }
}
