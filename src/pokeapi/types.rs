use serde::{Deserialize, Serialize};

/// One listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
  pub id: u32,
  pub name: String,
  /// Artwork or sprite URL, when the API provides one
  pub sprite: Option<String>,
  /// Type names in API order (e.g. ["grass", "poison"])
  pub types: Vec<String>,
}

/// One fetched (or cached) page of the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  pub pokemons: Vec<Pokemon>,
  /// Total number of items across all pages, as reported at fetch time
  pub count: usize,
}
