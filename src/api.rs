//! Home Assistant REST API client
//!
//! Fetches entity snapshots and calls services for resolved entities.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::config::RuntimeContext;

/// Home Assistant REST API client
pub struct HassClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HassClient {
    /// Create a new Home Assistant client from runtime context
    pub fn new(ctx: &RuntimeContext) -> Result<Self> {
        Self::connect(ctx.server_url()?, ctx.token()?, ctx.timeout(), ctx.insecure())
    }

    pub fn connect(server_url: &str, token: &str, timeout: u64, insecure: bool) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent(format!("hmatch/{}", env!("CARGO_PKG_VERSION")));

        if insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("building HTTP client")?;

        Ok(Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Make a GET request to the API
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/api{}", self.base_url, path);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .with_context(|| format!("request to {url}"))?;

        self.handle_response(response).await
    }

    /// Make a POST request to the API
    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = format!("{}/api{}", self.base_url, path);
        log::debug!("POST {} {:?}", url, body);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {url}"))?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, &url, &error_text));
        }

        response
            .json()
            .await
            .with_context(|| format!("parsing response from {url}"))
    }

    /// API banner plus instance details from `/api/config`
    pub async fn get_info(&self) -> Result<HassInfo> {
        let banner: Value = self.get("/").await?;
        let config: HassConfig = self.get("/config").await?;

        Ok(HassInfo {
            message: banner
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Home Assistant API")
                .to_string(),
            location_name: config.location_name,
            version: config.version,
            time_zone: config.time_zone,
        })
    }

    /// Get all entity states
    pub async fn get_states(&self) -> Result<Vec<EntityState>> {
        self.get("/states").await
    }

    /// Call a service
    pub async fn call_service(&self, domain: &str, service: &str, data: &Value) -> Result<Value> {
        self.post(&format!("/services/{domain}/{service}"), data)
            .await
    }
}

fn status_to_error(status: StatusCode, url: &str, body: &str) -> anyhow::Error {
    let hint = match status {
        StatusCode::UNAUTHORIZED => "Check your authentication token (HASS_TOKEN or --token)",
        StatusCode::FORBIDDEN => "Your token may not have sufficient permissions",
        StatusCode::NOT_FOUND => "The requested resource was not found",
        StatusCode::SERVICE_UNAVAILABLE => "Home Assistant may be starting up or restarting",
        StatusCode::BAD_REQUEST => "Invalid request parameters",
        _ => "",
    };

    let msg = if body.is_empty() {
        format!("HTTP {status} from {url}")
    } else {
        format!("HTTP {status} from {url}: {body}")
    };

    if hint.is_empty() {
        anyhow!(msg)
    } else {
        anyhow!("{msg}\nHint: {hint}")
    }
}

// --- API Types ---

#[derive(Debug, Clone, Serialize)]
pub struct HassInfo {
    pub message: String,
    pub location_name: String,
    pub version: String,
    pub time_zone: String,
}

#[derive(Debug, Deserialize)]
struct HassConfig {
    #[serde(default)]
    location_name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    time_zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub last_changed: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub context: Value,
}
