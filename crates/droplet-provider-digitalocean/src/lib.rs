// # DigitalOcean API Client
//
// This crate provides the `CloudApi` implementation for the DigitalOcean v2
// REST API.
//
// ## Behavior
//
// - One logical API operation per call: no retries, no backoff, no caching
// - Explicit request timeout (configurable, 30 seconds by default)
// - Specific error messages for HTTP status codes (401/403, 404, 429, 5xx)
// - Listing follows `links.pages.next` until the last page, never off the API host
// - Dry-run mode: listing is performed, create/delete are only logged
//
// Idempotency is NOT provided here. `DropletController` checks existence
// before every create or delete.
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - API token MUST be provided via environment variables only
// - An empty token is a configuration error at construction, never per call
//
// ## API Reference
//
// - List Droplets: GET `/droplets?per_page=200`
// - Create Droplet: POST `/droplets` (202 Accepted)
// - Delete Droplet: DELETE `/droplets/:id` (204 No Content)

use async_trait::async_trait;
use droplet_core::config::{ManagerConfig, RunMode};
use droplet_core::traits::{CloudApi, Droplet, DropletSpec};
use droplet_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Droplets requested per list page (API maximum)
const PAGE_SIZE: u32 = 200;

/// Upper bound on followed pages, guards against a `next` link cycle
const MAX_PAGES: usize = 100;

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// One page of `GET /droplets`
#[derive(Debug, Deserialize)]
struct DropletPage {
    droplets: Vec<Droplet>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Pages,
}

#[derive(Debug, Default, Deserialize)]
struct Pages {
    next: Option<String>,
}

/// DigitalOcean API client
///
/// # Dry-Run Mode
///
/// In [`RunMode::DryRun`] the client still lists droplets, but create and
/// delete requests are logged with their payload and reported as accepted
/// without being sent.
pub struct DigitalOceanClient {
    /// Bearer token
    /// ⚠️ NEVER log this value
    token: String,

    /// API base URL without trailing slash
    base_url: String,

    /// HTTP client with the request timeout applied
    client: reqwest::Client,

    /// Live or dry-run
    mode: RunMode,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DigitalOceanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanClient")
            .field("token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("mode", &self.mode)
            .finish()
    }
}

impl DigitalOceanClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be built.
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        mode: RunMode,
    ) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::config("DigitalOcean API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            mode,
        })
    }

    /// Create a client from the loaded manager configuration
    pub fn from_config(config: &ManagerConfig) -> Result<Self> {
        if config.mode == RunMode::DryRun {
            tracing::warn!("DigitalOcean client running in DRY-RUN mode - no droplets will be created or destroyed");
        }

        Self::new(
            config.api.token.clone(),
            config.api.base_url.clone(),
            Duration::from_secs(config.api.http_timeout_secs),
            config.mode,
        )
    }

    /// Whether mutating requests are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.mode == RunMode::DryRun
    }

    /// Fetch one list page and decode it
    async fn fetch_page(&self, url: &str) -> Result<DropletPage> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport_error("list droplets", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("list droplets", e))?;

        if status != StatusCode::OK {
            return Err(status_error("list droplets", status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::decode(format!("Invalid droplet list response: {}", e)))
    }
}

#[async_trait]
impl CloudApi for DigitalOceanClient {
    async fn list_droplets(&self) -> Result<Vec<Droplet>> {
        let mut url = format!("{}/droplets?per_page={}", self.base_url, PAGE_SIZE);
        let mut droplets = Vec::new();

        for _ in 0..MAX_PAGES {
            let page = self.fetch_page(&url).await?;
            droplets.extend(page.droplets);

            match page.links.pages.next {
                // The bearer token goes with every request, so only follow
                // links back into the configured API
                Some(next) if !next.starts_with(&format!("{}/", self.base_url)) => {
                    return Err(Error::decode(format!(
                        "Pagination link {} is outside the API base {}",
                        next, self.base_url
                    )));
                }
                Some(next) => url = next,
                None => {
                    tracing::debug!("Listed {} droplets", droplets.len());
                    return Ok(droplets);
                }
            }
        }

        Err(Error::decode(format!(
            "Droplet list did not end after {} pages",
            MAX_PAGES
        )))
    }

    async fn create_droplet(&self, spec: &DropletSpec) -> Result<()> {
        let url = format!("{}/droplets", self.base_url);

        if self.is_dry_run() {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(spec).unwrap_or_default()
            );
            return Ok(());
        }

        tracing::info!(
            "Creating droplet '{}' (region={}, size={}, image={})",
            spec.name,
            spec.region,
            spec.size,
            spec.image
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(spec)
            .send()
            .await
            .map_err(|e| transport_error("create droplet", e))?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error("create droplet", status, &body));
        }

        tracing::info!("Droplet '{}' creation accepted", spec.name);
        Ok(())
    }

    async fn delete_droplet(&self, id: u64) -> Result<()> {
        let url = format!("{}/droplets/{}", self.base_url, id);

        if self.is_dry_run() {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        tracing::info!("Deleting droplet {}", id);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport_error("delete droplet", e))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error("delete droplet", status, &body));
        }

        tracing::info!("Droplet {} deletion accepted", id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "digitalocean"
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::transport(format!("{} timed out: {}", operation, err))
    } else {
        Error::transport(format!("{} failed: {}", operation, err))
    }
}

/// Map a non-expected HTTP status to an error with a readable description
fn status_error(operation: &str, status: StatusCode, body: &str) -> Error {
    let detail = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: Invalid API token or insufficient permissions - {}",
            body
        ),
        404 => format!("Not found - {}", body),
        429 => format!("Rate limit exceeded. Please retry later - {}", body),
        500..=599 => format!("DigitalOcean server error (transient) - {}", body),
        _ => body.to_string(),
    };

    Error::unexpected_status(operation, status.as_u16(), detail)
}
