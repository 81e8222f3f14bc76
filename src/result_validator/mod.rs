//! ResultValidator - Shape checks and normalization of untrusted payloads
//!
//! ## Responsibilities
//!
//! - Turn an untyped payload into a well-formed `AnalysisResult`
//! - Drop individual bad tiles instead of failing the whole result
//! - Recompute the total score from surviving tiles
//! - Converge every unusable input on the canonical fallback
//!
//! ## Rules (in order)
//!
//! 1. `tiles` must be a sequence; elements need an integer count (1..=13)
//!    and a string color
//! 2. Colors map case-insensitively onto red/black/blue/yellow
//! 3. The reported total is discarded and recomputed
//! 4. Zero survivors from a non-empty payload resets the note

use crate::models::{AnalysisResult, Tile, TileColor, FALLBACK_NOTE};
use crate::response_extractor::Extraction;
use serde_json::{Map, Value};

const TILES_KEYS: &[&str] = &["tiles", "taslar"];
const COUNT_KEYS: &[&str] = &["count", "sayi"];
const COLOR_KEYS: &[&str] = &["color", "renk"];
const TOTAL_KEYS: &[&str] = &["totalScore", "total_score", "toplam_puan"];
const NOTE_KEYS: &[&str] = &["note", "aciklama"];

/// Why a raw tile entry was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileRejection {
    NotAnObject,
    MissingCount,
    CountOutOfRange(i64),
    MissingColor,
    UnknownColor(String),
}

/// Normalize the outcome of the extractor
pub fn normalize_extraction(extraction: &Extraction) -> AnalysisResult {
    match extraction {
        Extraction::Payload(value) => normalize(value),
        Extraction::Malformed(_) | Extraction::NotFound => AnalysisResult::fallback(),
    }
}

/// Normalize a raw payload into a well-formed result.
///
/// Anything that is not an object with a `tiles` sequence yields the
/// canonical fallback.
pub fn normalize(raw: &Value) -> AnalysisResult {
    let Some(object) = raw.as_object() else {
        tracing::warn!(kind = %value_kind(raw), "Payload is not an object, using fallback");
        return AnalysisResult::fallback();
    };

    let Some(raw_tiles) = lookup(object, TILES_KEYS).and_then(Value::as_array) else {
        tracing::warn!("Payload has no tiles sequence, using fallback");
        return AnalysisResult::fallback();
    };

    let mut tiles = Vec::with_capacity(raw_tiles.len());
    for (index, entry) in raw_tiles.iter().enumerate() {
        match parse_tile(entry) {
            Ok(tile) => tiles.push(tile),
            Err(reason) => {
                tracing::warn!(index = index, reason = ?reason, "Dropping unrecognized tile");
            }
        }
    }

    // The payload object holds at least `tiles`, so it is never empty here
    let result = if tiles.is_empty() {
        AnalysisResult::from_tiles(tiles, FALLBACK_NOTE)
    } else {
        let note = lookup(object, NOTE_KEYS)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} tiles detected", tiles.len()));
        AnalysisResult::from_tiles(tiles, note)
    };

    if let Some(reported) = lookup(object, TOTAL_KEYS).and_then(Value::as_i64) {
        if reported != i64::from(result.total_score) {
            tracing::debug!(
                reported = reported,
                recomputed = result.total_score,
                "Discarding mismatched total score"
            );
        }
    }

    tracing::debug!(
        raw_tiles = raw_tiles.len(),
        kept_tiles = result.tiles.len(),
        total_score = result.total_score,
        "Payload normalized"
    );

    result
}

/// Validate a single raw tile entry
pub fn parse_tile(entry: &Value) -> Result<Tile, TileRejection> {
    let object = entry.as_object().ok_or(TileRejection::NotAnObject)?;

    let count = lookup(object, COUNT_KEYS)
        .and_then(integer_value)
        .ok_or(TileRejection::MissingCount)?;

    let color_name = lookup(object, COLOR_KEYS)
        .and_then(Value::as_str)
        .ok_or(TileRejection::MissingColor)?;

    let color = TileColor::parse(color_name)
        .ok_or_else(|| TileRejection::UnknownColor(color_name.to_string()))?;

    let count_u32 = u32::try_from(count).map_err(|_| TileRejection::CountOutOfRange(count))?;
    Tile::new(count_u32, color).map_err(|_| TileRejection::CountOutOfRange(count))
}

/// Integer counts only; `5.0` is accepted, `5.5` and `"5"` are not
fn integer_value(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| object.get(*k))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response_extractor::extract;
    use serde_json::json;

    #[test]
    fn test_total_is_recomputed() {
        let raw = json!({
            "tiles": [{"count": 5, "color": "red"}, {"count": 7, "color": "black"}],
            "totalScore": 999,
            "note": "2 tiles"
        });
        let result = normalize(&raw);
        assert_eq!(result.total_score, 12);
        assert_eq!(result.tiles.len(), 2);
        assert_eq!(result.note, "2 tiles");
    }

    #[test]
    fn test_unknown_color_is_dropped_not_defaulted() {
        let raw = json!({
            "tiles": [{"count": 5, "color": "green"}, {"count": 3, "color": "Yellow"}],
            "totalScore": 8
        });
        let result = normalize(&raw);
        assert_eq!(result.tiles.len(), 1);
        assert_eq!(result.tiles[0].color(), TileColor::Yellow);
        assert_eq!(result.total_score, 3);
    }

    #[test]
    fn test_bad_elements_are_dropped_individually() {
        let raw = json!({
            "tiles": [
                {"count": "5", "color": "red"},
                {"count": 4.5, "color": "red"},
                {"count": 0, "color": "red"},
                {"count": 14, "color": "red"},
                {"count": 2, "color": 7},
                {"color": "blue"},
                "tile",
                {"count": 9.0, "color": "BLUE"}
            ],
            "note": "mixed"
        });
        let result = normalize(&raw);
        assert_eq!(result.tiles.len(), 1);
        assert_eq!(result.tiles[0].count(), 9);
        assert_eq!(result.total_score, 9);
    }

    #[test]
    fn test_all_dropped_overwrites_note() {
        let raw = json!({
            "tiles": [{"count": 5, "color": "purple"}],
            "totalScore": 5,
            "note": "1 purple tile detected"
        });
        let result = normalize(&raw);
        assert_eq!(result, AnalysisResult::fallback());
    }

    #[test]
    fn test_empty_sequence_overwrites_contradictory_note() {
        let raw = json!({"tiles": [], "totalScore": 12, "note": "2 tiles detected"});
        let result = normalize(&raw);
        assert_eq!(result, AnalysisResult::fallback());

        let raw = json!({"taslar": [], "aciklama": "No tiles in frame"});
        assert_eq!(normalize(&raw).note, FALLBACK_NOTE);
    }

    #[test]
    fn test_missing_note_defaults_to_count() {
        let raw = json!({"tiles": [{"count": 1, "color": "red"}]});
        assert_eq!(normalize(&raw).note, "1 tiles detected");
    }

    #[test]
    fn test_non_sequence_shapes_converge_on_fallback() {
        for raw in [
            json!(42),
            json!("tiles"),
            json!(null),
            json!([{"count": 5, "color": "red"}]),
            json!({"tiles": "5 red"}),
            json!({"totalScore": 12}),
        ] {
            assert_eq!(normalize(&raw), AnalysisResult::fallback(), "input: {raw}");
        }
    }

    #[test]
    fn test_legacy_keys_are_accepted() {
        let raw = json!({
            "taslar": [{"sayi": 13, "renk": "mavi"}, {"sayi": 7, "renk": "kirmizi"}],
            "toplam_puan": 21,
            "aciklama": "2 taş tespit edildi"
        });
        let result = normalize(&raw);
        assert_eq!(result.total_score, 20);
        assert_eq!(result.tiles[0].color(), TileColor::Blue);
        assert_eq!(result.tiles[1].color(), TileColor::Red);
    }

    #[test]
    fn test_unusable_text_yields_exact_fallback() {
        for text in ["", "no json here", "{not json}", "{\"tiles\": ["] {
            let result = normalize_extraction(&extract(text));
            assert_eq!(result.tiles, Vec::new());
            assert_eq!(result.total_score, 0);
            assert_eq!(result.note, "Tiles not recognized. Please try again.");
        }
    }
}
