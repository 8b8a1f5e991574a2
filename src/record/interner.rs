//! File-scoped interning of (metric, tag set) series identities.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// Hard cap on distinct series per file: the packed record form stores the
/// series id in 16 bits.
pub const MAX_SERIES_PER_FILE: usize = u16::MAX as usize + 1;

/// The deduplicated identity of one series: metric name plus its full tag
/// set. Equality is structural; tag order never matters because the map is
/// ordered by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesKey {
    pub metric: String,
    pub tags: BTreeMap<String, String>,
}

/// Returned when a single file contains more distinct series than fit the
/// 16-bit id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesTableFull;

impl fmt::Display for SeriesTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "series table full ({} distinct series per file)",
            MAX_SERIES_PER_FILE
        )
    }
}

impl std::error::Error for SeriesTableFull {}

/// Interns (metric, tag set) pairs into dense ids.
///
/// Scoped to one input file: the caller creates a fresh interner per file and
/// drops (or clears) it on completion, so ids are never meaningful across
/// files. Lookup is hash-keyed over a canonical serialization of the series,
/// not a scan of existing entries.
#[derive(Debug, Default)]
pub struct SeriesInterner {
    /// xxh3 of the canonical serialization -> dense id.
    ids: HashMap<u64, u16>,
    /// id -> series identity, in insertion order.
    entries: Vec<SeriesKey>,
}

impl SeriesInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a series and returns its dense id.
    ///
    /// The first occurrence is assigned `id == len()`; later occurrences of a
    /// structurally equal series return the same id.
    pub fn intern(
        &mut self,
        metric: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<u16, SeriesTableFull> {
        let hash = canonical_hash(metric, tags);
        if let Some(&id) = self.ids.get(&hash) {
            return Ok(id);
        }
        if self.entries.len() >= MAX_SERIES_PER_FILE {
            return Err(SeriesTableFull);
        }
        let id = self.entries.len() as u16;
        self.ids.insert(hash, id);
        self.entries.push(SeriesKey {
            metric: metric.to_string(),
            tags: tags.clone(),
        });
        Ok(id)
    }

    /// Resolves a dense id back to its series identity.
    pub fn resolve(&self, id: u16) -> Option<&SeriesKey> {
        self.entries.get(id as usize)
    }

    /// Returns the number of interned series.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the interner contains no series.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries so the id space restarts at zero for the next file.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.entries.clear();
    }
}

/// xxh3 over the canonical serialization: metric, then tag pairs in key
/// order, NUL-separated. Map iteration is already key-sorted, so equal tag
/// sets hash equally regardless of input order.
fn canonical_hash(metric: &str, tags: &BTreeMap<String, String>) -> u64 {
    let mut buf = Vec::with_capacity(metric.len() + 16 * tags.len());
    buf.extend_from_slice(metric.as_bytes());
    for (key, value) in tags {
        buf.push(0);
        buf.extend_from_slice(key.as_bytes());
        buf.push(0);
        buf.extend_from_slice(value.as_bytes());
    }
    xxh3_64(&buf)
}
