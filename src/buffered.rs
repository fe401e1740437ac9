//! Whole-document executor
//!
//! Loads the entire input, filters `features` in memory and writes the
//! pretty-printed result in a single write. Nothing reaches `output` unless
//! parsing and serialization both succeed.

use std::io::{Read, Write};

use serde_json::{Map, Value};

use crate::error::{FilterError, FilterResult};
use crate::filter::{feature_matches, FilterCounts};
use crate::ids::AllowSet;

/// Filter a fully buffered FeatureCollection
///
/// With `preserve_top`, every top-level key except `features` is carried
/// over in its original position; `type` is always forced to
/// `"FeatureCollection"` and `features` is appended last.
pub fn filter_buffered<R: Read, W: Write>(
    mut input: R,
    output: &mut W,
    allow: &AllowSet,
    preserve_top: bool,
) -> FilterResult<FilterCounts> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let text = String::from_utf8(bytes)?;

    let mut document = match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => map,
        other => {
            return Err(FilterError::Shape(format!(
                "expected a FeatureCollection object, found {}",
                kind(&other)
            )))
        }
    };

    let features = match document.get_mut("features").map(Value::take) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(features)) => features,
        Some(other) => {
            return Err(FilterError::Shape(format!(
                "`features` must be an array, found {}",
                kind(&other)
            )))
        }
    };

    let mut counts = FilterCounts::default();
    let mut kept = Vec::new();
    for feature in features {
        // Non-object entries are dropped without counting
        if let Value::Object(map) = feature {
            counts.scanned += 1;
            if feature_matches(&map, allow) {
                kept.push(Value::Object(map));
            }
        }
    }
    counts.kept = kept.len();

    let mut collection: Map<String, Value> = if preserve_top {
        document
            .into_iter()
            .filter(|(key, _)| key != "features")
            .collect()
    } else {
        Map::new()
    };
    collection.insert("type".to_string(), Value::from("FeatureCollection"));
    collection.insert("features".to_string(), Value::Array(kept));

    let mut rendered = serde_json::to_vec_pretty(&Value::Object(collection))?;
    rendered.push(b'\n');

    output.write_all(&rendered)?;
    output.flush()?;

    Ok(counts)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
