//! Leagues and the source catalog they are discovered from.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, season::SeasonMeta};

/// Whether a competition is a round-robin league or a knockout cup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeagueKind {
  League,
  Cup,
}

impl LeagueKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::League => "league",
      Self::Cup => "cup",
    }
  }

  /// Parse either the stored lowercase form or the API's capitalised form.
  pub fn parse(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "league" => Ok(Self::League),
      "cup" => Ok(Self::Cup),
      _ => Err(Error::UnknownLeagueKind(s.to_owned())),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
  pub name: String,
  pub code: Option<String>,
  pub flag: Option<String>,
}

/// Static league metadata. Only ever changed by re-discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
  pub league_id: i64,
  pub name:      String,
  pub kind:      LeagueKind,
  pub logo:      Option<String>,
  pub country:   Country,
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// One season as listed in the source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSeason {
  pub year:                  i32,
  pub meta:                  SeasonMeta,
  /// The source publishes per-fixture events (and therefore results) for
  /// this season. Seasons without it are useless downstream.
  pub covers_fixture_events: bool,
}

/// A league together with every season the source knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
  pub league:  League,
  pub seasons: Vec<CatalogSeason>,
}
