use crate::config::Config;
use crate::pokeapi::api_types::{ApiListResponse, ApiNamedResource, ApiPokemon};
use crate::pokeapi::error::FetchError;
use crate::pokeapi::types::{Page, Pokemon};
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use futures::{stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, trace};
use url::Url;

/// Raw HTTP GET, returning the body of a successful response.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Fetches one listing page and the details of every item on it.
#[async_trait]
pub trait PageFetcher: Send + Sync {
  async fn fetch_page(&self, offset: usize) -> Result<Page, FetchError>;
}

/// reqwest-backed transport with a per-request timeout
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("pokepage/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }

  pub fn client(&self) -> &reqwest::Client {
    &self.client
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
    let response = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(|e| FetchError::network(url.as_str(), describe(&e)))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::network(url.as_str(), format!("HTTP {}", status)));
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| FetchError::network(url.as_str(), describe(&e)))?;

    Ok(body.to_vec())
  }
}

fn describe(e: &reqwest::Error) -> String {
  if e.is_timeout() {
    "request timed out".to_string()
  } else {
    e.to_string()
  }
}

fn decode<T: DeserializeOwned>(url: &Url, body: &[u8]) -> Result<T, FetchError> {
  serde_json::from_slice(body).map_err(|e| FetchError::parse(url.as_str(), e.to_string()))
}

/// PokeAPI client
#[derive(Clone)]
pub struct PokeApiClient<T: Transport = HttpTransport> {
  transport: T,
  base_url: Url,
  page_size: usize,
  /// Upper bound on detail requests in flight for one page
  max_concurrent_details: usize,
}

impl PokeApiClient<HttpTransport> {
  pub fn new(config: &Config) -> Result<Self> {
    let transport = HttpTransport::new(config.api.request_timeout())?;
    let base_url = config.api.base_url()?;

    Ok(Self::with_transport(
      transport,
      base_url,
      config.paging.page_size,
      config.api.max_concurrent_details,
    ))
  }
}

impl<T: Transport> PokeApiClient<T> {
  pub fn with_transport(
    transport: T,
    base_url: Url,
    page_size: usize,
    max_concurrent_details: usize,
  ) -> Self {
    Self {
      transport,
      base_url,
      page_size: page_size.max(1),
      max_concurrent_details: max_concurrent_details.max(1),
    }
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// `<base>?limit=<page_size>&offset=<offset>`
  fn listing_url(&self, offset: usize) -> Url {
    let mut url = self.base_url.clone();
    url
      .query_pairs_mut()
      .append_pair("limit", &self.page_size.to_string())
      .append_pair("offset", &offset.to_string());
    url
  }

  async fn fetch_detail(&self, resource: &ApiNamedResource) -> Result<Pokemon, FetchError> {
    let url = Url::parse(&resource.url).map_err(|e| {
      FetchError::parse(
        &resource.url,
        format!("invalid detail url for {}: {}", resource.name, e),
      )
    })?;

    trace!(name = %resource.name, %url, "Fetching detail");
    let body = self.transport.get(&url).await?;
    let detail: ApiPokemon = decode(&url, &body)?;
    Ok(detail.into())
  }
}

#[async_trait]
impl<T: Transport> PageFetcher for PokeApiClient<T> {
  #[instrument(skip(self), level = "debug")]
  async fn fetch_page(&self, offset: usize) -> Result<Page, FetchError> {
    let list_url = self.listing_url(offset);
    let body = self.transport.get(&list_url).await?;
    let listing: ApiListResponse = decode(&list_url, &body)?;

    // Details resolve in any order; `buffered` yields them in listing order
    // and the first failure aborts the whole page.
    let details: Vec<_> = listing
      .results
      .iter()
      .map(|resource| self.fetch_detail(resource))
      .collect();
    let pokemons: Vec<Pokemon> = stream::iter(details)
      .buffered(self.max_concurrent_details)
      .try_collect()
      .await?;

    debug!(offset, items = pokemons.len(), count = listing.count, "Fetched page");

    Ok(Page {
      pokemons,
      count: listing.count,
    })
  }
}
