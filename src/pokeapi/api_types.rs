//! Serde-deserializable types matching PokeAPI responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::Pokemon;

// ============================================================================
// Listing endpoint response
// ============================================================================

/// `GET /pokemon?limit=..&offset=..`
#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  pub count: usize,
  #[serde(default)]
  pub results: Vec<ApiNamedResource>,
}

#[derive(Debug, Deserialize)]
pub struct ApiNamedResource {
  pub name: String,
  pub url: String,
}

// ============================================================================
// Detail endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiPokemon {
  pub id: u32,
  pub name: String,
  #[serde(default)]
  pub sprites: Option<ApiSprites>,
  #[serde(default)]
  pub types: Vec<ApiTypeSlot>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSprites {
  pub front_default: Option<String>,
  #[serde(default)]
  pub other: Option<ApiOtherSprites>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiOtherSprites {
  #[serde(rename = "official-artwork", default)]
  pub official_artwork: Option<ApiArtwork>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiArtwork {
  pub front_default: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTypeSlot {
  #[serde(rename = "type")]
  pub kind: ApiTypeRef,
}

#[derive(Debug, Deserialize)]
pub struct ApiTypeRef {
  pub name: String,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl ApiSprites {
  /// Official artwork first, then the standard sprite.
  fn best(self) -> Option<String> {
    let artwork = self
      .other
      .and_then(|o| o.official_artwork)
      .and_then(|a| a.front_default)
      .filter(|url| !url.is_empty());

    artwork.or(self.front_default.filter(|url| !url.is_empty()))
  }
}

impl From<ApiPokemon> for Pokemon {
  fn from(api: ApiPokemon) -> Self {
    Pokemon {
      id: api.id,
      name: api.name,
      sprite: api.sprites.and_then(ApiSprites::best),
      types: api.types.into_iter().map(|slot| slot.kind.name).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(json: &str) -> Pokemon {
    serde_json::from_str::<ApiPokemon>(json).unwrap().into()
  }

  #[test]
  fn test_prefers_official_artwork() {
    let p = parse(
      r#"{
        "id": 1,
        "name": "bulbasaur",
        "sprites": {
          "front_default": "https://img/sprite/1.png",
          "other": { "official-artwork": { "front_default": "https://img/art/1.png" } }
        },
        "types": [
          { "slot": 1, "type": { "name": "grass", "url": "x" } },
          { "slot": 2, "type": { "name": "poison", "url": "y" } }
        ]
      }"#,
    );

    assert_eq!(p.id, 1);
    assert_eq!(p.name, "bulbasaur");
    assert_eq!(p.sprite.as_deref(), Some("https://img/art/1.png"));
    assert_eq!(p.types, vec!["grass", "poison"]);
  }

  #[test]
  fn test_falls_back_to_front_sprite() {
    let p = parse(
      r#"{
        "id": 25,
        "name": "pikachu",
        "sprites": {
          "front_default": "https://img/sprite/25.png",
          "other": { "official-artwork": { "front_default": null } }
        },
        "types": [{ "type": { "name": "electric" } }]
      }"#,
    );

    assert_eq!(p.sprite.as_deref(), Some("https://img/sprite/25.png"));
  }

  #[test]
  fn test_missing_sprites_and_types() {
    let p = parse(r#"{ "id": 10001, "name": "deoxys-attack", "sprites": null }"#);
    assert_eq!(p.sprite, None);
    assert!(p.types.is_empty());
  }

  #[test]
  fn test_listing_requires_count() {
    let ok: ApiListResponse = serde_json::from_str(
      r#"{ "count": 151, "next": null, "previous": null,
           "results": [{ "name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/" }] }"#,
    )
    .unwrap();
    assert_eq!(ok.count, 151);
    assert_eq!(ok.results[0].name, "bulbasaur");

    assert!(serde_json::from_str::<ApiListResponse>(r#"{ "results": [] }"#).is_err());
  }
}
