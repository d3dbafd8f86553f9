pub mod region;

use async_trait::async_trait;
use model::scrum_update::CrmRecord;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

pub use region::{Region, RegionUrls};

pub const DEFAULT_MODULE: &str = "Scrum_Updates";

#[derive(Debug, thiserror::Error)]
pub enum ZohoError {
    #[error("auth failed")]
    AuthFailed { status: u16 },
    #[error("request to Zoho failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Long-lived secrets traded for an access token on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshCredentials {
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for RefreshCredentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RefreshCredentials")
            .field("refresh_token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Status and body of a CRM call, kept raw so callers decide how to surface failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as JSON, or as a JSON string when it is not JSON.
    pub fn raw_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

#[derive(Serialize, Debug)]
pub struct InsertRequest<'a> {
    pub data: Vec<&'a CrmRecord>,
    pub trigger: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RecordList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<CrmRecord>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CrmRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CrmRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The calls the gateway makes against Zoho.
#[async_trait]
pub trait CrmApi: Send + Sync {
    async fn refresh_access_token(&self, credentials: &RefreshCredentials) -> Result<String, ZohoError>;

    async fn list_records(&self, access_token: &str) -> Result<UpstreamResponse, ZohoError>;

    async fn insert_record(&self, access_token: &str, record: &CrmRecord) -> Result<UpstreamResponse, ZohoError>;
}

pub struct Client {
    client: reqwest::Client,
    urls: RegionUrls,
    module: String,
}

impl Client {
    pub fn new(urls: RegionUrls, module: String, timeout: Option<Duration>) -> Result<Client, ZohoError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Client {
            client: builder.build()?,
            urls,
            module,
        })
    }

    fn records_url(&self) -> String {
        format!("{}/crm/v2/{}", self.urls.api, self.module)
    }

    async fn upstream(&self, request: reqwest::RequestBuilder, operation: &str) -> Result<UpstreamResponse, ZohoError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::info!(operation, status, keys = ?json_keys(&body), "Zoho response");
        Ok(UpstreamResponse { status, body })
    }
}

#[async_trait]
impl CrmApi for Client {
    /// Exchanges the refresh token for a short-lived access token.
    async fn refresh_access_token(&self, credentials: &RefreshCredentials) -> Result<String, ZohoError> {
        let response = self
            .client
            .post(format!("{}/oauth/v2/token", self.urls.accounts))
            .form(&[
                ("refresh_token", credentials.refresh_token.as_str()),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::info!(status = status.as_u16(), keys = ?json_keys(&body), "Zoho token exchange");

        // Zoho answers some failures (e.g. `invalid_code`) with a 200 and no token.
        let token = serde_json::from_str::<Map<String, Value>>(&body)
            .ok()
            .and_then(|map| map.get("access_token").and_then(Value::as_str).map(str::to_owned));

        match token {
            Some(token) if status.is_success() && !token.is_empty() => Ok(token),
            _ => {
                tracing::error!(status = status.as_u16(), "Zoho token exchange did not return an access token");
                Err(ZohoError::AuthFailed {
                    status: status.as_u16(),
                })
            }
        }
    }

    async fn list_records(&self, access_token: &str) -> Result<UpstreamResponse, ZohoError> {
        let request = self
            .client
            .get(self.records_url())
            .header(AUTHORIZATION, format!("Zoho-oauthtoken {}", access_token));
        self.upstream(request, "list").await
    }

    async fn insert_record(&self, access_token: &str, record: &CrmRecord) -> Result<UpstreamResponse, ZohoError> {
        let request = self
            .client
            .post(self.records_url())
            .header(AUTHORIZATION, format!("Zoho-oauthtoken {}", access_token))
            .json(&InsertRequest {
                data: vec![record],
                trigger: vec![],
            });
        self.upstream(request, "insert").await
    }
}

/// Top-level keys of a JSON object body, for logging without the values.
pub fn json_keys(body: &str) -> Vec<String> {
    match serde_json::from_str::<Map<String, Value>>(body) {
        Ok(map) => map.keys().cloned().collect(),
        Err(_) => Vec::new(),
    }
}
