use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use serde_json::{Map, Value};
use sha2::digest::DynDigest;
use sha2::{Sha256, Sha512};

use crate::buffered;
use crate::error::FilterResult;
use crate::ids::{normalize_id, AllowSet};
#[cfg(feature = "streaming")]
use crate::stream;

/// Whether this build carries the incremental parser
pub const STREAMING_AVAILABLE: bool = cfg!(feature = "streaming");

/// Requested execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Stream when the build supports it, otherwise buffer
    #[default]
    Auto,
    /// Always stream; a configuration error if unavailable
    Streaming,
    /// Always load the whole document
    Buffered,
}

/// Concrete executor, chosen once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executor {
    /// One feature in memory at a time, compact output, extra keys dropped
    #[cfg(feature = "streaming")]
    Streaming,
    /// Whole document in memory, pretty output
    Buffered {
        /// Keep top-level keys other than `type` and `features`
        preserve_top: bool,
    },
}

impl Executor {
    /// Resolve a requested mode against what this build can do
    pub fn select(mode: ExecutionMode, preserve_top: bool) -> FilterResult<Self> {
        match mode {
            ExecutionMode::Buffered => Ok(Executor::Buffered { preserve_top }),
            ExecutionMode::Streaming | ExecutionMode::Auto => {
                Self::streaming_or_fallback(mode, preserve_top)
            }
        }
    }

    #[cfg(feature = "streaming")]
    fn streaming_or_fallback(_mode: ExecutionMode, preserve_top: bool) -> FilterResult<Self> {
        if preserve_top {
            log::warn!(
                "--preserve-top has no effect in streaming mode; use --mode buffered to keep extra top-level keys"
            );
        }
        Ok(Executor::Streaming)
    }

    #[cfg(not(feature = "streaming"))]
    fn streaming_or_fallback(mode: ExecutionMode, preserve_top: bool) -> FilterResult<Self> {
        match mode {
            ExecutionMode::Streaming => Err(crate::error::FilterError::StreamingUnavailable),
            _ => Ok(Executor::Buffered { preserve_top }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "streaming")]
            Executor::Streaming => "streaming",
            Executor::Buffered { .. } => "buffered",
        }
    }

    /// Run this executor over `input`, writing the filtered collection to `output`
    pub fn run<R: Read, W: Write>(
        &self,
        input: R,
        output: &mut W,
        allow: &AllowSet,
    ) -> FilterResult<FilterCounts> {
        match *self {
            #[cfg(feature = "streaming")]
            Executor::Streaming => stream::filter_stream(input, output, allow),
            Executor::Buffered { preserve_top } => {
                buffered::filter_buffered(input, output, allow, preserve_top)
            }
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ExecutionMode::Auto),
            "streaming" | "stream" => Ok(ExecutionMode::Streaming),
            "buffered" | "buffer" => Ok(ExecutionMode::Buffered),
            _ => Err(format!(
                "unknown mode '{}' (supported: auto, streaming, buffered)",
                s
            )),
        }
    }
}

/// Per-run feature counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    /// Elements of `features` that were objects
    pub scanned: usize,
    /// Features written to the output
    pub kept: usize,
}

/// Outcome of a complete run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStats {
    pub scanned: usize,
    pub kept: usize,
    /// Hex checksum of the written bytes, when requested
    pub digest: Option<String>,
}

/// Decide whether a feature carries at least one allowed route id
///
/// A missing or non-object `properties`, or a `route_ids` that is missing or
/// not an array, makes the feature non-matching. Ids that do not normalize
/// are skipped.
pub fn feature_matches(feature: &Map<String, Value>, allow: &AllowSet) -> bool {
    let route_ids = match feature.get("properties").and_then(Value::as_object) {
        Some(properties) => match properties.get("route_ids") {
            Some(Value::Array(ids)) => ids,
            _ => return false,
        },
        None => return false,
    };

    route_ids
        .iter()
        .filter_map(normalize_id)
        .any(|id| allow.contains(id))
}

/// Filter a FeatureCollection from `input` into `output`
///
/// When `digest_algorithm` is set, the checksum of everything written to
/// `output` is returned in the stats.
pub fn filter_features<R: Read, W: Write>(
    input: R,
    output: &mut W,
    allow: &AllowSet,
    executor: Executor,
    digest_algorithm: Option<DigestAlgorithm>,
) -> FilterResult<FilterStats> {
    match digest_algorithm {
        Some(algorithm) => {
            let mut digest_writer = DigestWriter::new(output, algorithm);
            let counts = executor.run(input, &mut digest_writer, allow)?;
            Ok(FilterStats {
                scanned: counts.scanned,
                kept: counts.kept,
                digest: Some(digest_writer.finalize()),
            })
        }
        None => {
            let counts = executor.run(input, output, allow)?;
            Ok(FilterStats {
                scanned: counts.scanned,
                kept: counts.kept,
                digest: None,
            })
        }
    }
}

/// Supported digest algorithms for checksum computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-256 checksum
    Sha256,
    /// SHA-512 checksum
    Sha512,
}

impl DigestAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    fn hasher(&self) -> Box<dyn DynDigest> {
        match self {
            DigestAlgorithm::Sha256 => Box::new(Sha256::default()),
            DigestAlgorithm::Sha512 => Box::new(Sha512::default()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(format!(
                "unknown digest algorithm '{}' (supported: sha256, sha512)",
                s
            )),
        }
    }
}

/// Writer wrapper that hashes everything passing through it
pub struct DigestWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: Box<dyn DynDigest>,
}

impl<'a, W: Write> DigestWriter<'a, W> {
    pub fn new(inner: &'a mut W, algorithm: DigestAlgorithm) -> Self {
        DigestWriter {
            inner,
            hasher: algorithm.hasher(),
        }
    }

    /// Hex checksum of every byte written so far
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl<'a, W: Write> Write for DigestWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // Only hash what the inner writer accepted
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
