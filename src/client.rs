//! HTTP client for the Numista API.
//!
//! All calls are `GET`s against `numista.api_base`:
//!
//! | Call | Path | Auth | Timeout |
//! |------|------|------|---------|
//! | Token exchange | `/oauth_token?code=..&client_id=..&client_secret=..&redirect_uri=..` | none | request |
//! | Collection | `/users/{user_id}/collected_coins?lang=..` | API key + bearer | request |
//! | Coin detail | `/coins/{coin_id}?lang=..` | API key | request |
//! | Picture | absolute URL from the detail | `User-Agent` only | image |
//!
//! Failures never escape as panics: every transport, status or body
//! problem comes back as a [`CatalogError`].

use anyhow::{Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::NumistaConfig;
use crate::error::CatalogError;
use crate::images::CoinImage;
use crate::models::{AccessToken, CollectionPage, ItemDetail, TokenResponse};

/// Header carrying the application's API key.
pub const API_KEY_HEADER: &str = "Numista-API-Key";

pub struct NumistaClient {
    http: reqwest::Client,
    image_http: reqwest::Client,
    api_base: String,
    api_key: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    language: String,
}

impl NumistaClient {
    /// Build a client from configuration. Fails if no API key is available.
    pub fn new(config: &NumistaConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let client_secret = config.resolve_client_secret()?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let image_http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.image_timeout_secs))
            .build()
            .context("failed to build image HTTP client")?;

        Ok(Self {
            http,
            image_http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            client_id: config.client_id.clone(),
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
            language: config.language().to_string(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Trade a one-time authorization code for a bearer token.
    ///
    /// A body without `access_token` or `user_id` is an error, like any
    /// transport failure.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken, CatalogError> {
        if code.is_empty() {
            return Err(CatalogError::MissingField("code"));
        }

        tracing::debug!(endpoint = "oauth_token", "exchanging authorization code");
        let request = self.http.get(format!("{}/oauth_token", self.api_base)).query(&[
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ]);

        let body: TokenResponse = self.get_json(request).await?;
        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(CatalogError::MissingField("access_token"))?;
        let user_id = body.user_id.ok_or(CatalogError::MissingField("user_id"))?;

        Ok(AccessToken { token, user_id })
    }

    /// Fetch the user's collected coins.
    ///
    /// `page` is `(page_number, page_size)`; `None` asks for everything in
    /// one response.
    pub async fn fetch_collection_page(
        &self,
        token: &AccessToken,
        page: Option<(u32, u32)>,
    ) -> Result<CollectionPage, CatalogError> {
        let url = format!("{}/users/{}/collected_coins", self.api_base, token.user_id);
        tracing::debug!(url = %url, page = ?page, "fetching collection");

        let mut request = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(&token.token)
            .query(&[("lang", self.language.as_str())]);
        if let Some((number, size)) = page {
            request = request.query(&[("page", number), ("count", size)]);
        }

        self.get_json(request).await
    }

    /// Fetch the full catalog entry for one coin.
    pub async fn fetch_detail(&self, coin_id: u64) -> Result<ItemDetail, CatalogError> {
        let url = format!("{}/coins/{}", self.api_base, coin_id);
        tracing::debug!(url = %url, "fetching coin detail");

        let request = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("lang", self.language.as_str())]);

        self.get_json(request).await
    }

    /// Download and decode one picture.
    pub async fn fetch_image(&self, url: &str) -> Result<CoinImage, CatalogError> {
        let parsed = Url::parse(url).map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", url, e)))?;
        tracing::debug!(url = %parsed, "fetching image");

        let response = self.image_http.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let bytes = response.bytes().await?;
        CoinImage::decode(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CatalogError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
