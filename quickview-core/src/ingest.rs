//! Event ingestion - concurrent accumulation of per-location outcome counters
//!
//! Global invariants enforced:
//! - Counters only ever increase while the table is live
//! - Freezing is the single write/read barrier; a frozen table is immutable
//! - Freeze output ordering is independent of record interleaving

use crate::location::{Counts, Outcome, SourceLocation};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Number of independently locked shards; a small power of two is enough to
/// keep unrelated locations off the same lock.
const SHARD_COUNT: usize = 16;

/// One location's live counters; incremented without holding a write lock
#[derive(Default)]
struct CounterPair {
    specialized: AtomicU64,
    adaptive: AtomicU64,
}

impl CounterPair {
    fn increment(&self, outcome: Outcome) {
        // Counts are commutative sums, so relaxed ordering loses nothing
        match outcome {
            Outcome::Specialized => self.specialized.fetch_add(1, Ordering::Relaxed),
            Outcome::Adaptive => self.adaptive.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(self) -> Counts {
        Counts {
            specialized: self.specialized.into_inner(),
            adaptive: self.adaptive.into_inner(),
        }
    }
}

type Shard = RwLock<HashMap<SourceLocation, CounterPair>>;

/// Shared mutable aggregation table, one per analysis run.
///
/// `record` is safe to call from any number of threads while the target
/// program executes. The table is consumed by [`AggregationTable::freeze`],
/// which is the synchronization barrier between execution and rendering;
/// call it only once the event source has quiesced.
pub struct AggregationTable {
    shards: Vec<Shard>,
    dropped: AtomicU64,
}

impl Default for AggregationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationTable {
    pub fn new() -> Self {
        AggregationTable {
            shards: (0..SHARD_COUNT).map(|_| Shard::default()).collect(),
            dropped: AtomicU64::new(0),
        }
    }

    fn shard_for(&self, location: &SourceLocation) -> &Shard {
        let mut hasher = DefaultHasher::new();
        location.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % SHARD_COUNT]
    }

    /// Record one observed instruction execution.
    ///
    /// Never fails visibly and performs no I/O. Structurally malformed
    /// locations are dropped and counted; validation that needs the file's
    /// text happens later, when the frozen table meets source texts.
    pub fn record(&self, location: SourceLocation, outcome: Outcome) {
        if location.is_degenerate() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let shard = self.shard_for(&location);
        {
            let map = shard.read().unwrap_or_else(|e| e.into_inner());
            if let Some(pair) = map.get(&location) {
                pair.increment(outcome);
                return;
            }
        }
        let mut map = shard.write().unwrap_or_else(|e| e.into_inner());
        map.entry(location).or_default().increment(outcome);
    }

    /// Events rejected so far as structurally malformed
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Freeze the table into an immutable, deterministically ordered form.
    ///
    /// Consuming `self` makes recording past the barrier a compile error.
    pub fn freeze(self) -> FrozenTable {
        let mut by_file: BTreeMap<String, Vec<(SourceLocation, Counts)>> = BTreeMap::new();
        for shard in self.shards {
            let map = shard.into_inner().unwrap_or_else(|e| e.into_inner());
            for (location, pair) in map {
                by_file
                    .entry(location.file.clone())
                    .or_default()
                    .push((location, pair.snapshot()));
            }
        }
        for entries in by_file.values_mut() {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
        }
        FrozenTable {
            by_file,
            dropped: self.dropped.into_inner(),
        }
    }
}

/// Read-only aggregation results, grouped per file and sorted by location
pub struct FrozenTable {
    by_file: BTreeMap<String, Vec<(SourceLocation, Counts)>>,
    dropped: u64,
}

impl FrozenTable {
    /// Files named by at least one recorded event, in sorted order
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.by_file.keys().map(String::as_str)
    }

    /// All entries recorded against one file
    pub fn entries_for(&self, file: &str) -> &[(SourceLocation, Counts)] {
        self.by_file.get(file).map_or(&[], Vec::as_slice)
    }

    /// Events dropped as structurally malformed during ingestion
    pub fn dropped_events(&self) -> u64 {
        self.dropped
    }

    /// Total events recorded against files outside the given rendered set
    pub fn unattributed_events<'a, I>(&self, rendered: I) -> u64
    where
        I: IntoIterator<Item = &'a str>,
    {
        let rendered: std::collections::HashSet<&str> = rendered.into_iter().collect();
        self.by_file
            .iter()
            .filter(|(file, _)| !rendered.contains(file.as_str()))
            .flat_map(|(_, entries)| entries.iter())
            .map(|(_, counts)| counts.total())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn loc(start_col: u32, end_col: u32) -> SourceLocation {
        SourceLocation::new("a.py", 1, start_col, 1, end_col)
    }

    #[test]
    fn test_record_accumulates() {
        let table = AggregationTable::new();
        table.record(loc(1, 6), Outcome::Specialized);
        table.record(loc(1, 6), Outcome::Specialized);
        table.record(loc(1, 6), Outcome::Adaptive);
        table.record(loc(4, 9), Outcome::Specialized);

        let frozen = table.freeze();
        let entries = frozen.entries_for("a.py");
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].1,
            Counts {
                specialized: 2,
                adaptive: 1
            }
        );
        assert_eq!(
            entries[1].1,
            Counts {
                specialized: 1,
                adaptive: 0
            }
        );
    }

    #[test]
    fn test_degenerate_locations_dropped() {
        let table = AggregationTable::new();
        table.record(loc(5, 5), Outcome::Specialized);
        table.record(loc(9, 2), Outcome::Adaptive);
        table.record(SourceLocation::new("a.py", 0, 1, 1, 2), Outcome::Specialized);
        table.record(loc(1, 2), Outcome::Specialized);
        assert_eq!(table.dropped_events(), 3);

        let frozen = table.freeze();
        assert_eq!(frozen.dropped_events(), 3);
        assert_eq!(frozen.entries_for("a.py").len(), 1);
    }

    #[test]
    fn test_freeze_groups_and_sorts() {
        let table = AggregationTable::new();
        table.record(SourceLocation::new("b.py", 2, 1, 2, 4), Outcome::Adaptive);
        table.record(SourceLocation::new("a.py", 3, 1, 3, 4), Outcome::Specialized);
        table.record(SourceLocation::new("a.py", 1, 1, 1, 4), Outcome::Specialized);

        let frozen = table.freeze();
        let files: Vec<&str> = frozen.files().collect();
        assert_eq!(files, vec!["a.py", "b.py"]);
        let entries = frozen.entries_for("a.py");
        assert_eq!(entries[0].0.start_line, 1);
        assert_eq!(entries[1].0.start_line, 3);
        assert!(frozen.entries_for("missing.py").is_empty());
    }

    #[test]
    fn test_concurrent_record_loses_no_updates() {
        let table = Arc::new(AggregationTable::new());
        let mut handles = Vec::new();
        for worker in 0..8 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for round in 0..1000 {
                    // Everyone hammers one shared location, plus one of their own
                    table.record(loc(1, 6), Outcome::Specialized);
                    table.record(loc(worker + 2, worker + 10), Outcome::Adaptive);
                    if round % 2 == 0 {
                        table.record(loc(1, 6), Outcome::Adaptive);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker panicked");
        }

        let table = Arc::into_inner(table).expect("all workers joined");
        let frozen = table.freeze();
        let entries = frozen.entries_for("a.py");
        let shared = entries
            .iter()
            .find(|(l, _)| *l == loc(1, 6))
            .expect("shared location present");
        assert_eq!(shared.1.specialized, 8 * 1000);
        assert_eq!(shared.1.adaptive, 8 * 500);
        for worker in 0..8u32 {
            let own = entries
                .iter()
                .find(|(l, _)| *l == loc(worker + 2, worker + 10))
                .expect("per-worker location present");
            assert_eq!(own.1.adaptive, 1000);
        }
    }

    #[test]
    fn test_unattributed_events() {
        let table = AggregationTable::new();
        table.record(SourceLocation::new("a.py", 1, 1, 1, 4), Outcome::Specialized);
        table.record(SourceLocation::new("b.py", 1, 1, 1, 4), Outcome::Adaptive);
        table.record(SourceLocation::new("b.py", 1, 1, 1, 4), Outcome::Adaptive);

        let frozen = table.freeze();
        assert_eq!(frozen.unattributed_events(["a.py"]), 2);
        assert_eq!(frozen.unattributed_events(["a.py", "b.py"]), 0);
        assert_eq!(frozen.unattributed_events([]), 3);
    }
}
