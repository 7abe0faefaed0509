//! Client for the GitHub repository traffic API.
//!
//! Three read-only endpoints are used: daily clones, daily views and popular
//! referrers. Any non-success status aborts the run, so callers never see a
//! partial snapshot.

use reqwest::{
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
    Client, Url,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::{Result, TrafficError};
use crate::models::{ClonesResponse, ReferrerRecord, TrafficSample, TrafficSnapshot, ViewsResponse};

pub const DEFAULT_API_BASE: &str = "https://api.github.com/repos";
const ACCEPT_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("repo_traffic/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    client: Client,
    base_url: Url,
}

impl GitHubClient {
    /// Client pointed at the public GitHub API.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    /// Client with a custom base URL, e.g. GitHub Enterprise or a mock server.
    /// `base_url` is the prefix that `{owner}/{repo}/traffic/...` is appended to.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("token {token}"))
            .map_err(|_| TrafficError::InvalidCredential)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_MEDIA_TYPE));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()?;

        // Exactly one trailing slash so joins append rather than replace the
        // last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|_| TrafficError::InvalidBaseUrl(base_url.to_owned()))?;

        Ok(Self { client, base_url })
    }

    pub async fn fetch_clones(&self, owner: &str, repo: &str) -> Result<Vec<TrafficSample>> {
        let response: ClonesResponse = self.get_json(owner, repo, "traffic/clones").await?;
        Ok(response.clones)
    }

    pub async fn fetch_views(&self, owner: &str, repo: &str) -> Result<Vec<TrafficSample>> {
        let response: ViewsResponse = self.get_json(owner, repo, "traffic/views").await?;
        Ok(response.views)
    }

    /// Referrers come back ordered by the API; the order is kept as delivered.
    pub async fn fetch_referrers(&self, owner: &str, repo: &str) -> Result<Vec<ReferrerRecord>> {
        self.get_json(owner, repo, "traffic/popular/referrers").await
    }

    /// Fetches all three series one after another.
    pub async fn fetch_snapshot(&self, owner: &str, repo: &str) -> Result<TrafficSnapshot> {
        let clones = self.fetch_clones(owner, repo).await?;
        let views = self.fetch_views(owner, repo).await?;
        let referrers = self.fetch_referrers(owner, repo).await?;

        info!(
            clones = clones.len(),
            views = views.len(),
            referrers = referrers.len(),
            "fetched traffic for {owner}/{repo}"
        );

        Ok(TrafficSnapshot {
            clones,
            views,
            referrers,
        })
    }

    fn endpoint(&self, owner: &str, repo: &str, path: &str) -> Result<Url> {
        let relative = format!("{owner}/{repo}/{path}");
        self.base_url
            .join(&relative)
            .map_err(|_| TrafficError::InvalidBaseUrl(format!("{}{relative}", self.base_url)))
    }

    async fn get_json<T: DeserializeOwned>(&self, owner: &str, repo: &str, path: &str) -> Result<T> {
        let url = self.endpoint(owner, repo, path)?;
        debug!(%url, "GET");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrafficError::Upstream {
                endpoint: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| TrafficError::Decode {
            endpoint: url.to_string(),
            source,
        })
    }
}
