//! Incremental executor
//!
//! Walks the input document with serde's visitor API so that only one
//! element of `features` is materialized at a time. Every other top-level
//! key is skipped without being built, and kept features are written as soon
//! as they are seen.

use std::fmt;
use std::io::{self, BufReader, Read, Write};

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};

use crate::error::FilterResult;
use crate::filter::{feature_matches, FilterCounts};
use crate::ids::AllowSet;

const HEADER: &[u8] = br#"{"type":"FeatureCollection","features":["#;
const FOOTER: &[u8] = b"]}\n";

/// Stream a FeatureCollection from `input`, writing kept features compactly
///
/// Output is written while input is still being read. On a parse error the
/// bytes already written stay in `output`.
pub fn filter_stream<R: Read, W: Write>(
    input: R,
    output: &mut W,
    allow: &AllowSet,
) -> FilterResult<FilterCounts> {
    output.write_all(HEADER)?;

    let mut sink = FeatureSink {
        output: &mut *output,
        allow,
        counts: FilterCounts::default(),
        failure: None,
    };

    let mut de = serde_json::Deserializer::from_reader(BufReader::new(input));
    let parsed = CollectionSeed { sink: &mut sink }
        .deserialize(&mut de)
        .and_then(|()| de.end());

    // A write failure surfaces as a parse error; report the real cause
    if let Some(err) = sink.failure.take() {
        return Err(err.into());
    }
    parsed?;
    let counts = sink.counts;

    output.write_all(FOOTER)?;
    output.flush()?;

    Ok(counts)
}

/// Receives features one at a time and writes the matching ones
struct FeatureSink<'a, W: Write> {
    output: &'a mut W,
    allow: &'a AllowSet,
    counts: FilterCounts,
    failure: Option<io::Error>,
}

impl<'a, W: Write> FeatureSink<'a, W> {
    fn accept(&mut self, feature: &Map<String, Value>) -> io::Result<()> {
        self.counts.scanned += 1;
        if !feature_matches(feature, self.allow) {
            return Ok(());
        }

        if self.counts.kept > 0 {
            self.output.write_all(b",")?;
        }
        serde_json::to_writer(&mut *self.output, feature)?;
        self.counts.kept += 1;
        Ok(())
    }
}

/// Top-level document: an object whose `features` key is streamed
struct CollectionSeed<'s, 'a, W: Write> {
    sink: &'s mut FeatureSink<'a, W>,
}

impl<'de, W: Write> DeserializeSeed<'de> for CollectionSeed<'_, '_, W> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, W: Write> Visitor<'de> for CollectionSeed<'_, '_, W> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a GeoJSON FeatureCollection object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let sink = self.sink;
        let mut seen_features = false;
        while let Some(key) = map.next_key::<String>()? {
            // Only the first `features` key is streamed
            if key == "features" && !seen_features {
                seen_features = true;
                map.next_value_seed(FeaturesSeed { sink: &mut *sink })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

/// The `features` array; `null` is read as an empty array
struct FeaturesSeed<'s, 'a, W: Write> {
    sink: &'s mut FeatureSink<'a, W>,
}

impl<'de, W: Write> DeserializeSeed<'de> for FeaturesSeed<'_, '_, W> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, W: Write> Visitor<'de> for FeaturesSeed<'_, '_, W> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of features")
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(element) = seq.next_element::<Value>()? {
            let Value::Object(feature) = element else {
                continue;
            };
            if let Err(err) = self.sink.accept(&feature) {
                let message = format!("failed to write feature: {}", err);
                self.sink.failure = Some(err);
                return Err(de::Error::custom(message));
            }
        }
        Ok(())
    }
}
