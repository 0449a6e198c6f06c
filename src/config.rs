use serde::Deserialize;
use thiserror::Error;

use crate::{
    cache::{AllocMode, Cache, IsCache, Policies, WriteMode},
    memory::{Memory, WORD_SIZE},
    replace::{lru::Lru, mru::Mru, rand::Rand},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{what} must be a power of two, got {got}")]
    NotPowerOfTwo { what: &'static str, got: usize },
    #[error("block size must be at least {WORD_SIZE} bytes, got {0}")]
    BlockTooSmall(usize),
    #[error("cache size {cache} is not a multiple of the block size {block}")]
    UnevenBlocks { cache: usize, block: usize },
    #[error("associativity {ways} does not divide the {lines} cache lines evenly")]
    UnevenSets { ways: usize, lines: usize },
    #[error("memory of {mem} bytes cannot hold a full {block}-byte block")]
    MemoryTooSmall { mem: usize, block: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Replacement {
    Random,
    Lru,
    Mru,
}

#[derive(Deserialize)]
pub struct Config {
    pub name: String,
    pub memory_bytes: usize,
    pub cache_bytes: usize,
    pub block_size: usize,
    pub associativity: usize,
    pub replacement: Replacement,
    #[serde(default)]
    pub write: WriteMode,
    #[serde(default)]
    pub allocate: AllocMode,
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub seed: u64,
}

impl Config {
    /// Fail fast on geometry the address decoder cannot express, instead of
    /// silently producing wrong masks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.block_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                what: "block size",
                got: self.block_size,
            });
        }
        if self.block_size < WORD_SIZE {
            return Err(ConfigError::BlockTooSmall(self.block_size));
        }
        if self.cache_bytes % self.block_size != 0 {
            return Err(ConfigError::UnevenBlocks {
                cache: self.cache_bytes,
                block: self.block_size,
            });
        }
        if !self.associativity.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                what: "associativity",
                got: self.associativity,
            });
        }
        let lines = self.cache_bytes / self.block_size;
        if lines % self.associativity != 0 {
            return Err(ConfigError::UnevenSets {
                ways: self.associativity,
                lines,
            });
        }
        if !(lines / self.associativity).is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                what: "number of sets",
                got: lines / self.associativity,
            });
        }
        if !self.memory_bytes.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                what: "memory size",
                got: self.memory_bytes,
            });
        }
        if self.memory_bytes < self.block_size {
            return Err(ConfigError::MemoryTooSmall {
                mem: self.memory_bytes,
                block: self.block_size,
            });
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Box<dyn IsCache>, ConfigError> {
        self.validate()?;
        let n_sets = self.cache_bytes / self.block_size / self.associativity;
        let policies = Policies {
            write: self.write,
            alloc: self.allocate,
            trace: self.trace,
        };
        let mem = Memory::new(self.memory_bytes);
        Ok(match self.replacement {
            Replacement::Random => Box::new(Cache::new(
                self.name.clone(),
                self.block_size,
                n_sets,
                self.associativity,
                policies,
                mem,
                Rand::new(fastrand::Rng::with_seed(self.seed)),
            )) as Box<dyn IsCache>,
            Replacement::Lru => Box::new(Cache::new(
                self.name.clone(),
                self.block_size,
                n_sets,
                self.associativity,
                policies,
                mem,
                Lru::new(),
            )) as Box<dyn IsCache>,
            Replacement::Mru => Box::new(Cache::new(
                self.name.clone(),
                self.block_size,
                n_sets,
                self.associativity,
                policies,
                mem,
                Mru::new(),
            )) as Box<dyn IsCache>,
        })
    }
}
