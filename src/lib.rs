//! geojson-route-filter - Filter GeoJSON FeatureCollections by route id
//!
//! Keeps only the features whose `properties.route_ids` array contains at
//! least one id from an allow-set. Designed for stop/shape exports that are
//! too large to comfortably load at once.
//!
//! # Key Features
//!
//! - **Streaming**: With the default `streaming` feature, features are read
//!   and written one at a time, so memory stays flat regardless of input size
//! - **Tolerant matching**: Ids may be numbers or numeric strings; malformed
//!   `properties`, `route_ids` or id values never abort a run
//! - **Order preservation**: Kept features appear in their original order
//! - **Buffered fallback**: Loads the whole document, can keep extra
//!   top-level keys and pretty-prints the result
//! - **Checksums**: Optionally computes SHA-256/SHA-512 of the output
//!
//! # Examples
//!
//! ```no_run
//! use geojson_route_filter::{filter_features, normalize_id_set, ExecutionMode, Executor};
//! use std::fs::File;
//!
//! let allow = normalize_id_set(["100254", "100259"]).unwrap();
//! let executor = Executor::select(ExecutionMode::Auto, false).unwrap();
//!
//! let input = File::open("stops.geojson").unwrap();
//! let mut output = File::create("stops.filtered.geojson").unwrap();
//! let stats = filter_features(input, &mut output, &allow, executor, None).unwrap();
//! println!("kept {} of {} features", stats.kept, stats.scanned);
//! ```
//!
//! Keeping extra top-level keys such as `name` or `crs`:
//!
//! ```no_run
//! # use geojson_route_filter::{filter_features, normalize_id_set, Executor};
//! # use std::fs::File;
//! # let allow = normalize_id_set(["100254"]).unwrap();
//! let input = File::open("stops.geojson").unwrap();
//! let mut output = Vec::new();
//! let executor = Executor::Buffered { preserve_top: true };
//! filter_features(input, &mut output, &allow, executor, None).unwrap();
//! ```

pub mod buffered;
pub mod error;
pub mod filter;
pub mod ids;
#[cfg(feature = "streaming")]
pub mod stream;

pub use error::{FilterError, FilterResult};
pub use filter::{
    feature_matches, filter_features, DigestAlgorithm, DigestWriter, ExecutionMode, Executor,
    FilterCounts, FilterStats, STREAMING_AVAILABLE,
};
pub use ids::{normalize_id, normalize_id_set, normalize_id_token, AllowSet};
