//! Paginated, cache-first page loading for one list session.
//!
//! Pages are served from the [`PageCache`] when a valid entry exists, with a
//! background refresh that only warms the cache; otherwise they are fetched,
//! written through, and merged. A failed fetch falls back to whatever the
//! cache still holds for that offset.

mod state;

pub use state::{LoadOptions, LoaderState, PageSource, LOAD_FAILED_MESSAGE};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{KeyValueStore, PageCache};
use crate::connectivity::Connectivity;
use crate::pokeapi::client::PageFetcher;
use crate::pokeapi::error::FetchError;

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to load page at offset {offset} and no cached copy is available")]
  AllSourcesExhausted {
    offset: usize,
    #[source]
    source: FetchError,
  },
}

/// One reserved page load.
///
/// Dropping it clears the busy flags, so a load abandoned mid-await (under
/// `timeout` or `select!`) does not wedge the loader. While `previous_offset`
/// is set, dropping also puts the page offset back: nothing was merged, so
/// the next `load_more` retries the same page.
struct InFlight<'a> {
  state: &'a Mutex<LoaderState>,
  previous_offset: Option<usize>,
  /// Released after the flags are cleared
  _flight: Option<tokio::sync::MutexGuard<'a, ()>>,
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(previous) = self.previous_offset.take() {
      state.page_offset = previous;
    }
    state.clear_flags();
  }
}

pub struct PaginatedCacheLoader<F, S>
where
  F: PageFetcher + 'static,
  S: KeyValueStore + 'static,
{
  fetcher: Arc<F>,
  cache: PageCache<S>,
  connectivity: Connectivity,
  page_size: usize,
  state: Mutex<LoaderState>,
  /// Held for the duration of each page load
  flight: tokio::sync::Mutex<()>,
  background: Mutex<JoinSet<()>>,
}

impl<F, S> PaginatedCacheLoader<F, S>
where
  F: PageFetcher + 'static,
  S: KeyValueStore + 'static,
{
  pub fn new(
    fetcher: Arc<F>,
    cache: PageCache<S>,
    connectivity: Connectivity,
    page_size: usize,
  ) -> Self {
    Self {
      fetcher,
      cache,
      connectivity,
      page_size: page_size.max(1),
      state: Mutex::new(LoaderState::default()),
      flight: tokio::sync::Mutex::new(()),
      background: Mutex::new(JoinSet::new()),
    }
  }

  pub fn cache(&self) -> &PageCache<S> {
    &self.cache
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  fn state(&self) -> MutexGuard<'_, LoaderState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn background(&self) -> MutexGuard<'_, JoinSet<()>> {
    self.background.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Copy of the current state for rendering.
  pub fn snapshot(&self) -> LoaderState {
    self.state().clone()
  }

  /// Load the page at `offset` and merge it into the list.
  ///
  /// Loads are serialized: a call waits for any load already in flight.
  /// On failure the error slot is set and the cache is consulted once more;
  /// `Err` means neither the network nor the cache had the page.
  pub async fn load_page(&self, offset: usize, opts: LoadOptions) -> Result<PageSource, LoadError> {
    let in_flight = {
      let mut state = self.state();
      self.reserve(&mut state, offset, opts)
    };
    self.run_load(in_flight, offset, opts).await
  }

  fn reserve(&self, state: &mut LoaderState, offset: usize, opts: LoadOptions) -> InFlight<'_> {
    state.begin(offset, opts);
    InFlight {
      state: &self.state,
      previous_offset: None,
      _flight: None,
    }
  }

  async fn run_load<'a>(
    &'a self,
    mut in_flight: InFlight<'a>,
    offset: usize,
    opts: LoadOptions,
  ) -> Result<PageSource, LoadError> {
    in_flight._flight = Some(self.flight.lock().await);

    {
      let mut state = self.state();
      // A load that finished while this one waited has cleared the flags
      state.begin(offset, opts);
      state.error = None;
      in_flight.previous_offset = Some(std::mem::replace(&mut state.page_offset, offset));
    }

    let result = self.fetch_and_merge(offset, opts).await;
    if result.is_ok() {
      in_flight.previous_offset = None;
    }
    result
  }

  async fn fetch_and_merge(&self, offset: usize, opts: LoadOptions) -> Result<PageSource, LoadError> {
    if opts.use_cache && !opts.force_refresh {
      if let Some(page) = self.cache.read(offset).await {
        self.state().merge(offset, &page);
        if self.connectivity.is_online() {
          self.spawn_background_refresh(offset);
        }
        debug!(offset, items = page.pokemons.len(), "Served page from cache");
        return Ok(PageSource::Cache);
      }
    }

    match self.fetcher.fetch_page(offset).await {
      Ok(page) => {
        self.cache.write(offset, &page).await;
        self.state().merge(offset, &page);
        Ok(PageSource::Network)
      }
      Err(err) => {
        warn!(offset, error = %err, "Failed to load page");
        self.state().error = Some(LOAD_FAILED_MESSAGE.to_string());

        match self.cache.read(offset).await {
          Some(page) => {
            info!(offset, "Showing cached page after failed fetch");
            self.state().merge(offset, &page);
            Ok(PageSource::Fallback)
          }
          None => Err(LoadError::AllSourcesExhausted {
            offset,
            source: err,
          }),
        }
      }
    }
  }

  /// Refetch `offset` and store the result without touching the visible list.
  fn spawn_background_refresh(&self, offset: usize) {
    let fetcher = Arc::clone(&self.fetcher);
    let cache = self.cache.clone();

    let mut tasks = self.background();
    while tasks.try_join_next().is_some() {}

    tasks.spawn(async move {
      match fetcher.fetch_page(offset).await {
        Ok(page) => {
          cache.write(offset, &page).await;
          debug!(offset, "Background refresh stored page");
        }
        Err(e) => debug!(offset, error = %e, "Background refresh failed"),
      }
    });
  }

  /// Pull-to-refresh: refetch page 0, bypassing and then overwriting its cache entry.
  pub async fn refresh(&self) -> Result<PageSource, LoadError> {
    self.load_page(0, LoadOptions::forced()).await
  }

  /// Load the page after the last requested one.
  ///
  /// Returns `Ok(None)` without doing anything while a load is in flight or
  /// once every item has been loaded.
  pub async fn load_more(&self) -> Result<Option<PageSource>, LoadError> {
    let opts = LoadOptions::default();
    let (next_offset, in_flight) = {
      let mut state = self.state();
      if state.is_busy() || state.is_complete() {
        return Ok(None);
      }
      let next_offset = state.page_offset + self.page_size;
      (next_offset, self.reserve(&mut state, next_offset, opts))
    };

    self.run_load(in_flight, next_offset, opts).await.map(Some)
  }

  /// Wait for outstanding background refreshes to finish.
  pub async fn drain_background(&self) {
    let mut tasks = std::mem::take(&mut *self.background());
    while let Some(result) = tasks.join_next().await {
      if let Err(e) = result {
        debug!(error = %e, "Background refresh task ended early");
      }
    }
  }
}
