//! LRU cache for keccak digests.
//!
//! Inputs of 32 and 64 bytes dominate the hashing done by `SHA3` (storage
//! key derivation and two-word hashes), so each of those sizes gets its own
//! fixed-capacity LRU; anything else bypasses the cache and is hashed
//! directly. Entries live in a pre-allocated vector wired into a
//! doubly-linked list by index; a free-list cursor hands out slots until the
//! vector fills, after which the tail is evicted.

use lfvm_common::H256;
use rustc_hash::FxHashMap;
use sha3::{Digest, Keccak256};

const NONE: u32 = u32::MAX;

struct Entry<const N: usize> {
    key: [u8; N],
    hash: H256,
    pred: u32,
    succ: u32,
}

struct CacheShard<const N: usize> {
    entries: Vec<Entry<N>>,
    index: FxHashMap<[u8; N], u32>,
    head: u32,
    tail: u32,
    next_free: usize,
}

impl<const N: usize> CacheShard<N> {
    fn new(capacity: usize, hasher: &mut Keccak256) -> Self {
        assert!(capacity >= 2, "hash cache capacity must be at least 2");
        let mut shard = Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::default(),
            head: NONE,
            tail: NONE,
            next_free: 0,
        };
        for _ in 0..capacity {
            shard.entries.push(Entry {
                key: [0; N],
                hash: H256::zero(),
                pred: NONE,
                succ: NONE,
            });
        }
        // Seed with the all-zero input so the list is never empty: values
        // are only ever evicted, not removed, which spares the lookup path
        // an empty-list special case.
        let zero_key = [0u8; N];
        let slot = shard.take_free_slot();
        shard.entries[slot as usize].key = zero_key;
        shard.entries[slot as usize].hash = digest(hasher, &zero_key);
        shard.head = slot;
        shard.tail = slot;
        shard.index.insert(zero_key, slot);
        shard
    }

    fn get(&mut self, key: &[u8; N], hasher: &mut Keccak256) -> (H256, bool) {
        if let Some(&slot) = self.index.get(key) {
            self.move_to_front(slot);
            return (self.entries[slot as usize].hash, true);
        }

        let hash = digest(hasher, key);
        let slot = self.take_free_slot();
        let entry = &mut self.entries[slot as usize];
        entry.key = *key;
        entry.hash = hash;
        entry.pred = NONE;
        entry.succ = self.head;
        self.entries[self.head as usize].pred = slot;
        self.head = slot;
        self.index.insert(*key, slot);
        (hash, false)
    }

    fn move_to_front(&mut self, slot: u32) {
        if slot == self.head {
            return;
        }
        // Unlink.
        let (pred, succ) = {
            let entry = &self.entries[slot as usize];
            (entry.pred, entry.succ)
        };
        self.entries[pred as usize].succ = succ;
        if succ != NONE {
            self.entries[succ as usize].pred = pred;
        } else {
            self.tail = pred;
        }
        // Relink at the front.
        self.entries[slot as usize].pred = NONE;
        self.entries[slot as usize].succ = self.head;
        self.entries[self.head as usize].pred = slot;
        self.head = slot;
    }

    /// A slot for a new entry: from the free cursor while any remain,
    /// otherwise the evicted LRU tail.
    fn take_free_slot(&mut self) -> u32 {
        if self.next_free < self.entries.len() {
            let slot = self.next_free as u32;
            self.next_free += 1;
            return slot;
        }
        let slot = self.tail;
        let pred = self.entries[slot as usize].pred;
        self.tail = pred;
        self.entries[pred as usize].succ = NONE;
        let key = self.entries[slot as usize].key;
        self.index.remove(&key);
        slot
    }
}

/// LRU-governed keccak cache with separately sized shards for 32- and
/// 64-byte inputs.
pub struct HashCache {
    shard32: CacheShard<32>,
    shard64: CacheShard<64>,
    hits: u64,
    misses: u64,
}

impl HashCache {
    pub fn new(capacity32: usize, capacity64: usize) -> Self {
        let mut hasher = Keccak256::new();
        Self {
            shard32: CacheShard::new(capacity32, &mut hasher),
            shard64: CacheShard::new(capacity64, &mut hasher),
            hits: 0,
            misses: 0,
        }
    }

    /// Fetch the cached digest of `data` or compute it with `hasher`.
    pub fn hash(&mut self, hasher: &mut Keccak256, data: &[u8]) -> H256 {
        let (hash, hit) = match data.len() {
            32 => {
                let mut key = [0u8; 32];
                key.copy_from_slice(data);
                self.shard32.get(&key, hasher)
            }
            64 => {
                let mut key = [0u8; 64];
                key.copy_from_slice(data);
                self.shard64.get(&key, hasher)
            }
            _ => (digest(hasher, data), false),
        };
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        hash
    }

    /// (hits, misses) since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// One-shot keccak through a reusable hasher.
pub fn digest(hasher: &mut Keccak256, data: &[u8]) -> H256 {
    hasher.update(data);
    H256::from_slice(&hasher.finalize_reset())
}
