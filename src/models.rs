//! Shared models and types
//!
//! Tile and analysis result types used by the relay, the analysis client
//! and the session controller.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Highest face value printed on a tile
pub const MAX_TILE_COUNT: u32 = 13;

/// Note attached to the canonical empty result
pub const FALLBACK_NOTE: &str = "Tiles not recognized. Please try again.";

/// Note shown when the relay has no service credential
pub const MISCONFIGURED_NOTE: &str = "Analysis service is not configured.";

/// Tile color (exactly four in the game)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TileColor {
    Red,
    Black,
    Blue,
    Yellow,
}

impl TileColor {
    /// Map a color name onto the canonical set.
    ///
    /// Case-insensitive. Accepts English names and the Turkish names the
    /// vision prompt historically used. Anything else is `None`; there is
    /// no fifth color.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "red" | "kirmizi" | "kırmızı" => Some(Self::Red),
            "black" | "siyah" => Some(Self::Black),
            "blue" | "mavi" => Some(Self::Blue),
            "yellow" | "sari" | "sarı" => Some(Self::Yellow),
            _ => None,
        }
    }

    /// Convert to string for logging/serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            TileColor::Red => "red",
            TileColor::Black => "black",
            TileColor::Blue => "blue",
            TileColor::Yellow => "yellow",
        }
    }
}

impl std::fmt::Display for TileColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scored tile. Immutable once created.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Tile {
    count: u32,
    color: TileColor,
}

impl Tile {
    /// Create a tile, rejecting counts outside 1..=13
    pub fn new(count: u32, color: TileColor) -> Result<Self> {
        if count == 0 || count > MAX_TILE_COUNT {
            return Err(Error::Validation(format!(
                "tile count {} outside 1..={}",
                count, MAX_TILE_COUNT
            )));
        }
        Ok(Self { count, color })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn color(&self) -> TileColor {
        self.color
    }
}

/// Normalized analysis result
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub tiles: Vec<Tile>,
    pub total_score: u32,
    pub note: String,
}

impl AnalysisResult {
    /// Build a result whose total is derived from the tiles
    pub fn from_tiles(tiles: Vec<Tile>, note: impl Into<String>) -> Self {
        let total_score = tiles.iter().map(Tile::count).sum();
        Self {
            tiles,
            total_score,
            note: note.into(),
        }
    }

    /// Canonical empty result for unusable replies
    pub fn fallback() -> Self {
        Self {
            tiles: Vec::new(),
            total_score: 0,
            note: FALLBACK_NOTE.to_string(),
        }
    }

    /// Empty result shown when the relay is missing its credential
    pub fn misconfigured() -> Self {
        Self {
            tiles: Vec::new(),
            total_score: 0,
            note: MISCONFIGURED_NOTE.to_string(),
        }
    }
}

/// Raw payload the relay returns when nothing could be extracted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFallback {
    pub tiles: Vec<serde_json::Value>,
    pub total_score: u32,
    pub note: String,
}

impl Default for RawFallback {
    fn default() -> Self {
        Self {
            tiles: Vec::new(),
            total_score: 0,
            note: FALLBACK_NOTE.to_string(),
        }
    }
}

/// Relay request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64 JPEG, no data-URI prefix
    #[serde(default)]
    pub image: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service_configured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse_is_case_insensitive() {
        assert_eq!(TileColor::parse("RED"), Some(TileColor::Red));
        assert_eq!(TileColor::parse(" Blue "), Some(TileColor::Blue));
        assert_eq!(TileColor::parse("Kirmizi"), Some(TileColor::Red));
        assert_eq!(TileColor::parse("sarı"), Some(TileColor::Yellow));
        assert_eq!(TileColor::parse("green"), None);
        assert_eq!(TileColor::parse(""), None);
    }

    #[test]
    fn test_tile_count_bounds() {
        assert!(Tile::new(1, TileColor::Red).is_ok());
        assert!(Tile::new(13, TileColor::Black).is_ok());
        assert!(Tile::new(0, TileColor::Red).is_err());
        assert!(Tile::new(14, TileColor::Red).is_err());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = AnalysisResult::from_tiles(
            vec![Tile::new(5, TileColor::Red).unwrap()],
            "1 tiles detected",
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalScore"], 5);
        assert_eq!(json["tiles"][0]["color"], "red");
        assert_eq!(json["tiles"][0]["count"], 5);
    }

    #[test]
    fn test_fallback_is_stable() {
        let fallback = AnalysisResult::fallback();
        assert!(fallback.tiles.is_empty());
        assert_eq!(fallback.total_score, 0);
        assert_eq!(fallback.note, "Tiles not recognized. Please try again.");
        assert_eq!(fallback, AnalysisResult::fallback());
    }
}
