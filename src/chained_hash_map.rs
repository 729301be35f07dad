//! ChainedHashMap: string-keyed map with separate chaining and value disposal.
//!
//! Entries live in a generational arena; buckets and chain links are arena
//! keys. A rehash rewrites links only, so entries (and the values they own)
//! never move, clone or drop while the table grows.

use crate::error::Result;
use crate::fnv::FnvBuildHasher;
use core::fmt;
use core::hash::{BuildHasher, Hasher};
use slotmap::{DefaultKey, SlotMap};
use std::collections::TryReserveError;

/// Smallest bucket count a table ever has.
pub const MIN_CAPACITY: usize = 16;

/// Largest power of two representable in `usize`.
pub const MAX_CAPACITY: usize = 1 << (usize::BITS - 1);

/// Disposal hook run on every value the map discards.
pub type Cleanup<V> = Box<dyn FnMut(V)>;

/// Round a requested bucket count up to a valid table capacity.
///
/// Returns the next power of two, never below [`MIN_CAPACITY`]. Requests
/// above [`MAX_CAPACITY`] saturate there instead of wrapping to zero.
pub fn capacity_for(requested: usize) -> usize {
    requested
        .checked_next_power_of_two()
        .unwrap_or(MAX_CAPACITY)
        .max(MIN_CAPACITY)
}

fn alloc_buckets(capacity: usize) -> core::result::Result<Vec<Link>, TryReserveError> {
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(capacity)?;
    buckets.resize(capacity, None);
    Ok(buckets)
}

fn hash_key<S: BuildHasher>(hasher: &S, key: &str) -> u64 {
    let mut h = hasher.build_hasher();
    h.write(key.as_bytes());
    h.finish()
}

type Link = Option<DefaultKey>;

#[derive(Debug)]
struct Entry<V> {
    key: String,
    value: V,
    next: Link,
}

pub struct ChainedHashMap<V, S = FnvBuildHasher> {
    hasher: S,
    buckets: Vec<Link>, // chain heads; len is the capacity
    entries: SlotMap<DefaultKey, Entry<V>>,
    cleanup: Option<Cleanup<V>>,
    // Bucket counts above this fail to allocate during growth.
    #[cfg(test)]
    alloc_limit: usize,
}

/// Doubled bucket count, or `None` once the table is at [`MAX_CAPACITY`].
fn grown_capacity(capacity: usize) -> Option<usize> {
    capacity.checked_mul(2)
}

impl<V> ChainedHashMap<V> {
    /// Empty map at the minimum capacity, without a cleanup hook.
    pub fn new() -> Self {
        Self::with_hasher(FnvBuildHasher)
    }

    /// Empty map sized for `hint` buckets (rounded by [`capacity_for`]).
    pub fn with_capacity(hint: usize) -> Result<Self> {
        Self::with_capacity_cleanup_and_hasher(hint, None, FnvBuildHasher)
    }

    /// Empty map that hands every discarded value to `cleanup`.
    pub fn with_cleanup<F>(hint: usize, cleanup: F) -> Result<Self>
    where
        F: FnMut(V) + 'static,
    {
        Self::with_capacity_cleanup_and_hasher(hint, Some(Box::new(cleanup)), FnvBuildHasher)
    }
}

impl<V> Default for ChainedHashMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> ChainedHashMap<V, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            buckets: vec![None; MIN_CAPACITY],
            entries: SlotMap::with_key(),
            cleanup: None,
            #[cfg(test)]
            alloc_limit: usize::MAX,
        }
    }

    /// Fails only if the bucket array cannot be allocated.
    pub fn with_capacity_cleanup_and_hasher(
        hint: usize,
        cleanup: Option<Cleanup<V>>,
        hasher: S,
    ) -> Result<Self> {
        let buckets = alloc_buckets(capacity_for(hint))?;
        Ok(Self {
            hasher,
            buckets,
            entries: SlotMap::with_key(),
            cleanup,
            #[cfg(test)]
            alloc_limit: usize::MAX,
        })
    }

    fn bucket_of(&self, key: &str) -> usize {
        (hash_key(&self.hasher, key) as usize) & (self.buckets.len() - 1)
    }

    fn find_in_bucket(&self, index: usize, key: &str) -> Option<DefaultKey> {
        let mut cur = self.buckets[index];
        while let Some(k) = cur {
            let entry = self.entries.get(k)?;
            if entry.key == key {
                return Some(k);
            }
            cur = entry.next;
        }
        None
    }

    fn find(&self, key: &str) -> Option<DefaultKey> {
        self.find_in_bucket(self.bucket_of(key), key)
    }

    /// Insert or overwrite `key`.
    ///
    /// Overwriting disposes of the previous value and keeps the stored key.
    /// A new key is copied before the entry is linked at the head of its
    /// chain. If the copy cannot be allocated the map is left unchanged and
    /// `value` is dropped without being passed to the cleanup hook.
    pub fn put(&mut self, key: &str, value: V) -> Result<()> {
        self.grow_if_needed();
        let index = self.bucket_of(key);

        if let Some(entry) = self
            .find_in_bucket(index, key)
            .and_then(|k| self.entries.get_mut(k))
        {
            let old = core::mem::replace(&mut entry.value, value);
            self.dispose(old);
            return Ok(());
        }

        let mut owned = String::new();
        owned.try_reserve_exact(key.len())?;
        owned.push_str(key);

        let next = self.buckets[index];
        let k = self.entries.insert(Entry {
            key: owned,
            value,
            next,
        });
        self.buckets[index] = Some(k);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let k = self.find(key)?;
        self.entries.get(k).map(|e| &e.value)
    }

    /// Mutable access to a stored value. Never invokes the cleanup hook.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let k = self.find(key)?;
        self.entries.get_mut(k).map(|e| &mut e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Unlink and dispose of the entry for `key`. Returns false if absent.
    pub fn remove(&mut self, key: &str) -> bool {
        let index = self.bucket_of(key);
        let mut prev: Link = None;
        let mut cur = self.buckets[index];

        while let Some(k) = cur {
            let Some(entry) = self.entries.get(k) else {
                return false;
            };
            if entry.key != key {
                prev = cur;
                cur = entry.next;
                continue;
            }

            let next = entry.next;
            match prev.and_then(|p| self.entries.get_mut(p)) {
                Some(prev_entry) => prev_entry.next = next,
                None => self.buckets[index] = next,
            }
            if let Some(Entry { key, value, .. }) = self.entries.remove(k) {
                drop(key);
                self.dispose(value);
            }
            return true;
        }
        false
    }

    // Grow when load strictly exceeds 3/4. A failed allocation leaves the
    // current table in place and the caller's insertion proceeds.
    fn grow_if_needed(&mut self) {
        let capacity = self.capacity();
        if self.len() <= capacity - capacity / 4 {
            return;
        }
        let Some(new_capacity) = grown_capacity(capacity) else {
            log::debug!("table already at {capacity} buckets, not growing");
            return;
        };
        if let Err(e) = self.rehash(new_capacity) {
            log::debug!("growth to {new_capacity} buckets failed, staying at {capacity}: {e}");
        }
    }

    fn rehash(&mut self, new_capacity: usize) -> Result<()> {
        debug_assert!(new_capacity.is_power_of_two());
        #[cfg(test)]
        if new_capacity > self.alloc_limit {
            Vec::<Link>::new().try_reserve_exact(usize::MAX)?;
        }
        let mut buckets = alloc_buckets(new_capacity)?;
        let mask = new_capacity - 1;

        for &head in &self.buckets {
            let mut cur = head;
            while let Some(k) = cur {
                let Some(entry) = self.entries.get_mut(k) else {
                    break;
                };
                cur = entry.next;
                let index = (hash_key(&self.hasher, &entry.key) as usize) & mask;
                entry.next = buckets[index];
                buckets[index] = Some(k);
            }
        }

        log::trace!(
            "rehashed {} entries: {} -> {} buckets",
            self.entries.len(),
            self.buckets.len(),
            new_capacity
        );
        self.buckets = buckets;
        Ok(())
    }
}

impl<V, S> ChainedHashMap<V, S> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current number of buckets; always a power of two.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Dispose of every entry, keeping the current capacity.
    pub fn clear(&mut self) {
        for i in 0..self.buckets.len() {
            let mut cur = self.buckets[i].take();
            while let Some(k) = cur {
                let Some(Entry { key, value, next }) = self.entries.remove(k) else {
                    break;
                };
                cur = next;
                drop(key);
                self.dispose(value);
            }
        }
        debug_assert!(self.entries.is_empty());
    }

    /// Entries in bucket order, then chain order. The order is unspecified
    /// and may change after any mutation.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            entries: &self.entries,
            cur: None,
            remaining: self.entries.len(),
        }
    }

    fn dispose(&mut self, value: V) {
        match self.cleanup.as_mut() {
            Some(cleanup) => cleanup(value),
            None => drop(value),
        }
    }
}

impl<V, S> Drop for ChainedHashMap<V, S> {
    fn drop(&mut self) {
        if self.cleanup.is_some() {
            self.clear();
        }
    }
}

impl<V: fmt::Debug, S> fmt::Debug for ChainedHashMap<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over `(key, value)` pairs of a [`ChainedHashMap`].
pub struct Iter<'a, V> {
    buckets: core::slice::Iter<'a, Link>,
    entries: &'a SlotMap<DefaultKey, Entry<V>>,
    cur: Link,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(k) = self.cur {
                let entry = self.entries.get(k)?;
                self.cur = entry.next;
                self.remaining = self.remaining.saturating_sub(1);
                return Some((entry.key.as_str(), &entry.value));
            }
            self.cur = *self.buckets.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V, S> IntoIterator for &'a ChainedHashMap<V, S> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
