use crate::cache::{KeyValueStore, PageCache};
use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::loader::{LoadError, LoadOptions, LoaderState, PageSource, PaginatedCacheLoader};
use crate::pokeapi::client::PokeApiClient;
use clap::Subcommand;
use color_eyre::Result;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Show the first N pages (cache first, then network)
  List {
    #[arg(short, long, default_value_t = 1)]
    pages: usize,
  },
  /// Refetch the first page, bypassing the cache
  Refresh,
  /// Drop the cached page at an offset
  Invalidate {
    #[arg(short, long)]
    offset: usize,
  },
}

impl Default for Command {
  fn default() -> Self {
    Command::List { pages: 1 }
  }
}

/// One list session
pub struct App<S: KeyValueStore + 'static> {
  loader: PaginatedCacheLoader<PokeApiClient, S>,
}

impl<S: KeyValueStore + 'static> App<S> {
  /// Wire the fetcher, page cache and connectivity over `store`.
  ///
  /// With `offline` set, connectivity stays pinned offline and no probe runs.
  pub fn new(config: &Config, store: S, offline: bool) -> Result<Self> {
    let client = PokeApiClient::new(config)?;

    let connectivity = Connectivity::new(!offline);
    if !offline {
      connectivity.spawn_probe(
        client.transport().client().clone(),
        config.api.base_url()?,
        config.connectivity.probe_interval(),
      );
    }

    let cache = PageCache::new(Arc::new(store))
      .with_ttl(config.cache.ttl())
      .with_prefix(config.cache.key_prefix.clone());

    let loader = PaginatedCacheLoader::new(
      Arc::new(client),
      cache,
      connectivity,
      config.paging.page_size,
    );

    Ok(Self { loader })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    let last = match command {
      Command::Invalidate { offset } => {
        self.loader.cache().invalidate(offset).await;
        println!("Removed cached page at offset {}", offset);
        return Ok(());
      }
      Command::Refresh => self.loader.refresh().await,
      Command::List { pages } => self.load_pages(pages).await,
    };

    // Let background refreshes land in the cache before the process exits
    self.loader.drain_background().await;

    let state = self.loader.snapshot();
    print_list(&state);
    self.print_footer(&state, last.as_ref().ok().copied());

    match last {
      Err(e) if state.items.is_empty() => Err(e.into()),
      _ => Ok(()),
    }
  }

  async fn load_pages(&self, pages: usize) -> Result<PageSource, LoadError> {
    let mut last = self.loader.load_page(0, LoadOptions::default()).await;
    if last.is_err() {
      return last;
    }

    for _ in 1..pages {
      match self.loader.load_more().await {
        Ok(Some(source)) => last = Ok(source),
        Ok(None) => {
          info!("All pages loaded");
          break;
        }
        Err(e) => {
          last = Err(e);
          break;
        }
      }
    }

    last
  }

  fn print_footer(&self, state: &LoaderState, source: Option<PageSource>) {
    let total = state
      .total_count
      .map(|t| t.to_string())
      .unwrap_or_else(|| "?".to_string());
    let page = state.page_offset / self.loader.page_size() + 1;
    let source = match source {
      Some(PageSource::Network) => "network",
      Some(PageSource::Cache) => "cache",
      Some(PageSource::Fallback) => "offline cache",
      None => "unavailable",
    };

    println!(
      "-- {} of {} shown, page {} from {} --",
      state.items.len(),
      total,
      page,
      source
    );

    if let Some(error) = &state.error {
      eprintln!("! {}", error);
    }
  }
}

fn print_list(state: &LoaderState) {
  for pokemon in &state.items {
    println!(
      "#{:<4} {:<16} {}",
      pokemon.id,
      pokemon.name,
      pokemon.types.join(" • ")
    );
  }
}
