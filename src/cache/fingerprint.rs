//! Deterministic request fingerprints

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

use super::CacheCategory;

const FINGERPRINT_SEED: u64 = 0x6d65_6d65_7363_6f75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Hash of the category name plus each parameter, length-prefixed so
    /// ["ab", "c"] and ["a", "bc"] never collide structurally
    pub fn of(category: CacheCategory, params: &[&str]) -> Self {
        let mut buf = Vec::with_capacity(32 + params.iter().map(|p| p.len() + 8).sum::<usize>());
        let name = category.name().as_bytes();
        buf.extend_from_slice(&(name.len() as u64).to_le_bytes());
        buf.extend_from_slice(name);
        for param in params {
            buf.extend_from_slice(&(param.len() as u64).to_le_bytes());
            buf.extend_from_slice(param.as_bytes());
        }
        Fingerprint(xxh64(&buf, FINGERPRINT_SEED))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
