//! FNV-1a, 64-bit.
//!
//! Deterministic across processes and platforms: the same key bytes always
//! produce the same digest. Not collision resistant; the map resolves
//! collisions by chaining.

use core::hash::{BuildHasher, Hasher};

pub const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a byte string in one shot.
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h = FnvHasher::new();
    h.write(bytes);
    h.finish()
}

/// Streaming FNV-1a state.
#[derive(Copy, Clone, Debug)]
pub struct FnvHasher(u64);

impl FnvHasher {
    #[inline]
    pub const fn new() -> Self {
        FnvHasher(FNV_OFFSET)
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

/// Stateless builder; every hasher starts from the offset basis.
#[derive(Copy, Clone, Debug, Default)]
pub struct FnvBuildHasher;

impl BuildHasher for FnvBuildHasher {
    type Hasher = FnvHasher;

    #[inline]
    fn build_hasher(&self) -> FnvHasher {
        FnvHasher::new()
    }
}
