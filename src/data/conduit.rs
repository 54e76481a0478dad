//! Conduit API client
//!
//! Conduit methods are called with an HTTP POST to `<api url><method>`. The
//! parameters travel as a JSON document in the `params` form field, with the
//! API token embedded under `__conduit__`. Every response is wrapped in an
//! envelope carrying either a `result` or an `error_code`.

use std::future::Future;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors that can occur when calling a Conduit method
#[derive(Debug, Error)]
pub enum ConduitError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Conduit server returned HTTP {0}")]
    Status(u16),

    /// Failed to parse the response
    #[error("Failed to parse Conduit response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The method itself failed
    #[error("{code}: {info}")]
    Api { code: String, info: String },
}

/// Something that can execute Conduit methods
///
/// Implemented by [`ConduitClient`] for the real service; tests provide
/// canned responses instead.
pub trait Conduit {
    /// Calls `method` and returns the raw `result` of the response envelope
    fn call_raw(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ConduitError>>;
}

/// Calls `method` and deserializes its result
pub async fn call<C, R>(conduit: &C, method: &str, params: Value) -> Result<R, ConduitError>
where
    C: Conduit,
    R: DeserializeOwned,
{
    let result = conduit.call_raw(method, params).await?;
    Ok(serde_json::from_value(result)?)
}

/// Response envelope shared by every Conduit method
#[derive(Debug, Deserialize)]
struct ConduitResponse {
    #[serde(default)]
    result: Value,
    error_code: Option<String>,
    error_info: Option<String>,
}

impl ConduitResponse {
    fn into_result(self) -> Result<Value, ConduitError> {
        match self.error_code {
            Some(code) => Err(ConduitError::Api {
                code,
                info: self.error_info.unwrap_or_default(),
            }),
            None => Ok(self.result),
        }
    }
}

/// HTTP client for a Phabricator install
#[derive(Debug, Clone)]
pub struct ConduitClient {
    http_client: Client,
    /// Base URL of the API, ending with `/api/`
    api_url: String,
    token: String,
}

impl ConduitClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_url, token)
    }

    /// Create a new ConduitClient with a custom HTTP client
    pub fn with_client(client: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http_client: client,
            api_url: api_url.into(),
            token: token.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}{}", self.api_url, method)
    }

    /// Builds the form body for a call, embedding the API token
    fn form(&self, mut params: Value) -> [(&'static str, String); 3] {
        if !params.is_object() {
            params = json!({});
        }
        params["__conduit__"] = json!({ "token": self.token });

        [
            ("params", params.to_string()),
            ("output", "json".to_string()),
            ("__conduit__", "1".to_string()),
        ]
    }
}

impl Conduit for ConduitClient {
    async fn call_raw(&self, method: &str, params: Value) -> Result<Value, ConduitError> {
        tracing::debug!(method, "calling conduit");

        let response = self
            .http_client
            .post(self.endpoint(method))
            .form(&self.form(params))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConduitError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let envelope: ConduitResponse = serde_json::from_str(&text)?;
        envelope.into_result()
    }
}
