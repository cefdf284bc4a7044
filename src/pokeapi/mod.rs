//! PokeAPI access: wire types, domain types and the page fetcher.

pub mod api_types;
pub mod client;
pub mod error;
pub mod types;
