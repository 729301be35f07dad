//! chained-hashmap: a single-threaded, string-keyed hash map with separate
//! chaining and an explicit value-disposal hook, plus a polling file monitor
//! built on top of it.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small map whose ownership rules are exact: every value handed
//!   to the map is disposed of exactly once, through one path.
//! - Layers:
//!   - `fnv`: FNV-1a 64-bit hashing, deterministic across processes.
//!   - `ChainedHashMap<V, S>`: power-of-two bucket array whose heads point
//!     into a generational arena of entries; each entry links to the next
//!     entry of its chain.
//!   - `watch`: directory walk, byte-sum fingerprints and a polling
//!     `Monitor` that keys a `ChainedHashMap<u64>` by absolute path.
//!
//! Constraints
//! - Single-threaded: no internal synchronization. A stored cleanup hook is
//!   a `Box<dyn FnMut(V)>`, which keeps the map `!Send`/`!Sync`.
//! - Keys are text. `put` copies the caller's `&str`; the caller's buffer
//!   can be reused immediately.
//! - Capacity is always a power of two, at least 16, so the bucket index is
//!   `hash & (capacity - 1)`.
//!
//! Ownership and disposal
//! - A value is owned by its entry until it is overwritten, removed, cleared
//!   or the map is dropped. At that point it goes to the cleanup hook if one
//!   is configured, otherwise it is dropped.
//! - Rehash relinks entries in place inside the arena. Values are never
//!   moved, cloned or disposed of by a resize.
//!
//! Growth
//! - Before every `put` the map grows (doubling) when `len / capacity`
//!   strictly exceeds 3/4. A table of 16 therefore holds 13 entries and
//!   grows on the 14th insertion.
//! - Failure to allocate the larger bucket array is absorbed: the insertion
//!   proceeds into the current table with longer chains.
//!
//! Failure boundaries
//! - Allocation failures surface as `Error::Allocation` from construction
//!   and from `put` (key copy); the map is unchanged on failure.
//! - Absent keys are `None` / `false`, never errors.
//!
//! Notes and non-goals
//! - No ordered iteration: `iter()` walks buckets then chains, and that
//!   order changes whenever the table grows.
//! - No collision resistance; chains absorb collisions.

pub mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod error;
pub mod fnv;
pub mod watch;

// Public surface
pub use chained_hash_map::{capacity_for, ChainedHashMap, Cleanup, Iter, MIN_CAPACITY};
pub use error::{Error, Result};
pub use fnv::{fnv1a, FnvBuildHasher, FnvHasher};
pub use watch::{Change, ChangeDetector, Monitor, MonitorConfig};
