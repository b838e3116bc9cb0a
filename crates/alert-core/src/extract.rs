//! Ordered field-extraction policy for location text
//!
//! The location subtree is free-form and varies across mobile app versions,
//! so the lookup is an ordered list of extractors tried in sequence,
//! returning the first non-empty result. Typed record fields resolve their
//! own legacy spellings through accessors on the store-core wire types; only
//! the location stays value-based.

use serde_json::Value;

/// One way of pulling a string out of a record
pub type Extractor = fn(&Value) -> Option<String>;

/// Try each extractor in order; first non-empty result wins
pub fn first_non_empty(record: &Value, extractors: &[Extractor]) -> Option<String> {
    extractors.iter().find_map(|extract| {
        extract(record).filter(|value| !value.trim().is_empty())
    })
}

/// Human-readable location: the geocoded address, then raw coordinates
pub const LOCATION_TEXT: &[Extractor] = &[
    |r| r.get("location").and_then(|l| l.get("address")).and_then(Value::as_str).map(str::to_string),
    |r| {
        let location = r.get("location")?;
        let lat = coordinate(location, &["latitude", "lat"])?;
        let lng = coordinate(location, &["longitude", "lng"])?;
        Some(format!("{lat}, {lng}"))
    },
];

fn coordinate(location: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| location.get(*name)?.as_f64())
}
