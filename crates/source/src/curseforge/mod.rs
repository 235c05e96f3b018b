//! CurseForge REST API client.

mod dto;

use self::dto::{DownloadUrlResponse, ListResponse, decode_entries, decode_page};
use crate::error::{Error, ErrorKind, Result};
use crate::{CatalogPage, CatalogSource, DownloadLink, DownloadStream};
use async_trait::async_trait;
use exn::ResultExt;
use futures::StreamExt;
use modsync_extract::models::CatalogEntry;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_BASE_URL: &str = "https://api.curseforge.com/v1";
/// Hytale.
pub const DEFAULT_GAME_ID: u32 = 70216;
const API_KEY_HEADER: &str = "x-api-key";

/// Settings for [`CurseForgeSource`].
#[derive(Debug, Clone)]
pub struct CurseForgeOptions {
    pub base_url: String,
    pub api_key: Option<String>,
    pub game_id: u32,
    pub timeout: Duration,
    pub user_agent: String,
}
impl Default for CurseForgeOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            game_id: DEFAULT_GAME_ID,
            timeout: Duration::from_secs(30),
            user_agent: concat!("modsync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Catalog source backed by the CurseForge REST API.
///
/// # Examples
///
/// ```no_run
/// use modsync_source::{CatalogSource, CurseForgeOptions, CurseForgeSource};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = CurseForgeSource::new(CurseForgeOptions {
///     api_key: Some("secret".to_string()),
///     ..CurseForgeOptions::default()
/// })?;
/// let first_page = source.list_page(0, 50).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CurseForgeSource {
    client: Client,
    base_url: String,
    game_id: u32,
}
impl CurseForgeSource {
    pub fn new(options: CurseForgeOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        match options.api_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => {
                let mut value = HeaderValue::from_str(key)
                    .or_raise(|| ErrorKind::Configuration("API key is not a valid header value".to_string()))?;
                value.set_sensitive(true);
                headers.insert(API_KEY_HEADER, value);
                tracing::info!("CurseForge API key configured");
            },
            None => tracing::warn!("No CurseForge API key configured, requests may be rejected"),
        }
        let client = Client::builder()
            .user_agent(options.user_agent)
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .or_raise(|| ErrorKind::Configuration("failed to create HTTP client".to_string()))?;
        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            game_id: options.game_id,
        })
    }

    fn transport_error(err: reqwest::Error, url: &str) -> Error {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout(url.to_string())
        } else if err.is_decode() {
            ErrorKind::Malformed(url.to_string())
        } else {
            ErrorKind::Network(url.to_string())
        };
        exn::Exn::from(err).raise(kind)
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        self.client.get(url).query(query).send().await.map_err(|e| Self::transport_error(e, url))
    }

    fn ensure_success(response: Response, url: &str) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
        let body = response.bytes().await.map_err(|e| Self::transport_error(e, url))?;
        serde_json::from_slice(&body).or_raise(|| ErrorKind::Malformed(url.to_string()))
    }

    async fn search_endpoint(&self, query: &[(&str, String)]) -> Result<ListResponse> {
        let url = format!("{}/mods/search", self.base_url);
        let mut params = vec![("gameId", self.game_id.to_string())];
        params.extend(query.iter().cloned());
        let response = Self::ensure_success(self.get(&url, &params).await?, &url)?;
        Self::json(response, &url).await
    }
}

#[async_trait]
impl CatalogSource for CurseForgeSource {
    fn name(&self) -> &str {
        "curseforge"
    }

    #[instrument(skip(self))]
    async fn search(&self, term: &str, page_size: usize) -> Result<Vec<CatalogEntry>> {
        let list = self.search_endpoint(&[("searchFilter", term.to_string()), ("pageSize", page_size.to_string())]).await?;
        Ok(decode_entries(list))
    }

    #[instrument(skip(self))]
    async fn list_page(&self, offset: usize, page_size: usize) -> Result<CatalogPage> {
        let list = self.search_endpoint(&[("pageSize", page_size.to_string()), ("index", offset.to_string())]).await?;
        Ok(decode_page(list))
    }

    #[instrument(skip(self))]
    async fn get_by_slug(&self, slug: &str) -> Result<Option<CatalogEntry>> {
        let list = self.search_endpoint(&[("slug", slug.to_string()), ("pageSize", "1".to_string())]).await?;
        let entry = decode_entries(list).into_iter().find(|entry| entry.slug == slug);
        if entry.is_none() {
            tracing::warn!(slug, "No mod found with slug");
        }
        Ok(entry)
    }

    #[instrument(skip(self))]
    async fn download_url(&self, mod_id: u64, file_id: u64) -> Result<DownloadLink> {
        let url = format!("{}/mods/{mod_id}/files/{file_id}/download-url", self.base_url);
        let response = self.get(&url, &[]).await?;
        match response.status() {
            StatusCode::FORBIDDEN => {
                tracing::warn!(mod_id, file_id, "Download forbidden, distribution disabled by the author");
                Ok(DownloadLink::Forbidden)
            },
            StatusCode::NOT_FOUND => Ok(DownloadLink::Unavailable),
            _ => {
                let response = Self::ensure_success(response, &url)?;
                let body: DownloadUrlResponse = Self::json(response, &url).await?;
                Ok(match body.data.filter(|link| !link.is_empty()) {
                    Some(link) => DownloadLink::Url(link),
                    None => DownloadLink::Unavailable,
                })
            },
        }
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<DownloadStream> {
        let response = Self::ensure_success(self.get(url, &[]).await?, url)?;
        let owned_url = url.to_string();
        let stream = response.bytes_stream().map(move |chunk| chunk.map_err(|e| Self::transport_error(e, &owned_url)));
        Ok(Box::pin(stream))
    }
}
