//! Block identifiers and the generators that mint them.
//!
//! Identifiers are the one non-deterministic part of a [`Schema`](super::Schema).
//! Every identifier is produced by an [`IdGenerator`] handed to the schema
//! emitter, so equivalence checks can ignore them without special cases.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a block within one schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh block identifiers.
///
/// Implementations must never hand out the same identifier twice over their
/// own lifetime.
pub trait IdGenerator {
    fn next_id(&mut self) -> BlockId;
}

/// Call-local counter: `b1`, `b2`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::with_prefix("b")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> BlockId {
        self.next += 1;
        BlockId(format!("{}{}", self.prefix, self.next))
    }
}

static SHARED_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-wide counter. Identifiers stay unique across calls and threads.
#[derive(Debug, Clone)]
pub struct SharedIds {
    prefix: String,
}

impl SharedIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl IdGenerator for SharedIds {
    fn next_id(&mut self) -> BlockId {
        let n = SHARED_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        BlockId(format!("{}{}", self.prefix, n))
    }
}

/// Random identifiers from a seeded ChaCha8 stream, collision-checked.
#[derive(Debug, Clone)]
pub struct SeededIds {
    rng: ChaCha8Rng,
    issued: HashSet<u32>,
}

impl SeededIds {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }
}

impl IdGenerator for SeededIds {
    fn next_id(&mut self) -> BlockId {
        loop {
            let candidate: u32 = self.rng.gen();
            if self.issued.insert(candidate) {
                return BlockId(format!("b{candidate:08x}"));
            }
        }
    }
}
