//! The process-wide pieces of the interpreter, gathered behind one handle.
//!
//! The original formulation kept the translation cache and stack pool as
//! package globals; here they live in a [`Runtime`] constructed once at
//! program start and passed into every EVM instance, so embedders (and
//! tests) control their lifetime.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use lfvm_common::{Address, H256};
use sha3::Keccak256;

use crate::errors::TranslationError;
use crate::hash_cache::{self, HashCache};
use crate::instruction::Code;
use crate::stack::{PooledStack, StackPool};
use crate::translator::TranslationCache;

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// LRU capacity for 32-byte keccak inputs.
    pub hash_cache_capacity_32: usize,
    /// LRU capacity for 64-byte keccak inputs.
    pub hash_cache_capacity_64: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            hash_cache_capacity_32: 1 << 16,
            hash_cache_capacity_64: 1 << 12,
        }
    }
}

pub struct Runtime {
    translation_cache: TranslationCache,
    stack_pool: Arc<StackPool>,
    hash_cache: Mutex<HashCache>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            translation_cache: TranslationCache::new(),
            stack_pool: Arc::new(StackPool::new()),
            hash_cache: Mutex::new(HashCache::new(
                config.hash_cache_capacity_32,
                config.hash_cache_capacity_64,
            )),
        }
    }

    /// Translate through the process-wide cache. See
    /// [`TranslationCache::translate`] for the creation-mode and
    /// flagged-address rules.
    pub fn translate(
        &self,
        address: Address,
        code: &Bytes,
        with_super_instructions: bool,
        create: bool,
    ) -> Result<Arc<Code>, TranslationError> {
        self.translation_cache
            .translate(address, code, with_super_instructions, create)
    }

    pub fn acquire_stack(&self) -> PooledStack {
        self.stack_pool.acquire()
    }

    /// Keccak through the shared LRU; inputs that are not 32 or 64 bytes
    /// long skip the lock and hash directly.
    pub fn keccak(&self, hasher: &mut Keccak256, data: &[u8]) -> H256 {
        match data.len() {
            32 | 64 => self
                .hash_cache
                .lock()
                .expect("poisoned hash cache lock")
                .hash(hasher, data),
            _ => hash_cache::digest(hasher, data),
        }
    }

    /// (hits, misses) of the keccak LRU.
    pub fn hash_cache_stats(&self) -> (u64, u64) {
        self.hash_cache
            .lock()
            .expect("poisoned hash cache lock")
            .stats()
    }

    pub fn translation_cache_len(&self) -> usize {
        self.translation_cache.len()
    }

    pub fn clear_translation_cache(&self) {
        self.translation_cache.clear();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
