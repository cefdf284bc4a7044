use crate::pokeapi::types::{Page, Pokemon};

/// Shown when a foreground load fails.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load Pokémon. Showing offline cache if available.";

/// Options for a single page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
  /// Serve from cache when a valid entry exists
  pub use_cache: bool,
  /// Skip the cache and go to the network (pull-to-refresh)
  pub force_refresh: bool,
}

impl Default for LoadOptions {
  fn default() -> Self {
    Self {
      use_cache: true,
      force_refresh: false,
    }
  }
}

impl LoadOptions {
  pub fn forced() -> Self {
    Self {
      use_cache: false,
      force_refresh: true,
    }
  }
}

/// Where the data merged by a load came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
  /// Fresh data from network
  Network,
  /// Valid cache entry; a background refresh may be warming the cache
  Cache,
  /// Network failed, last-known-good cache entry shown instead
  Fallback,
}

/// Working state of one list session, read by the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct LoaderState {
  /// All pages loaded so far, page 0 first
  pub items: Vec<Pokemon>,
  /// Offset of the most recently requested page
  pub page_offset: usize,
  /// Unknown until the first page arrives
  pub total_count: Option<usize>,
  pub loading: bool,
  pub loading_more: bool,
  pub refreshing: bool,
  pub error: Option<String>,
}

impl LoaderState {
  pub fn is_busy(&self) -> bool {
    self.loading || self.loading_more
  }

  /// True once every item the remote reported has been loaded.
  pub fn is_complete(&self) -> bool {
    self
      .total_count
      .is_some_and(|total| self.items.len() >= total)
  }

  /// Page 0 replaces the list; later pages are appended.
  pub(super) fn merge(&mut self, offset: usize, page: &Page) {
    if offset == 0 {
      self.items = page.pokemons.clone();
    } else {
      self.items.extend(page.pokemons.iter().cloned());
    }
    self.total_count = Some(page.count);
  }

  /// Raise the busy flags for a load of `offset`.
  pub(super) fn begin(&mut self, offset: usize, opts: LoadOptions) {
    if offset == 0 {
      self.loading = true;
    } else {
      self.loading_more = true;
    }
    if opts.force_refresh {
      self.refreshing = true;
    }
  }

  pub(super) fn clear_flags(&mut self) {
    self.loading = false;
    self.loading_more = false;
    self.refreshing = false;
  }
}
