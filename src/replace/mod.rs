pub mod lru;
pub mod mru;
pub mod rand;

use std::collections::VecDeque;

/// Factory for the per-set state a policy keeps.
pub trait MakeS {
    fn new(n_ways: usize) -> Self;
}

/// Random replacement keeps no per-set state.
impl MakeS for () {
    fn new(_n_ways: usize) -> Self {}
}

/// Selects victims within a set and maintains its recency state.
pub trait Replace<S: MakeS> {
    /// Called whenever `way` is hit or filled.
    fn touch(&mut self, set: &mut S, way: usize);

    /// Pick the way to evict. Only called when every line in the set is
    /// valid; empty lines are always consumed first.
    fn victim(&mut self, set: &mut S, n_ways: usize) -> usize;
}

/// Source of raw random numbers, injected so that victim selection is
/// replayable under test.
pub trait RngSource {
    fn next(&mut self) -> u64;
}

impl RngSource for fastrand::Rng {
    fn next(&mut self) -> u64 {
        self.u64(..)
    }
}

/// Recency order of the ways in one set: a permutation of
/// `[0, associativity)` with the most recently touched way at the head.
#[derive(Debug)]
pub struct Recency {
    order: VecDeque<u16>,
}

impl Recency {
    /// Move `way` to the head, shifting the ways that were ahead of it back
    /// by one. The only mutator; keeps `order` a permutation.
    pub fn make_most_recent(&mut self, way: usize) {
        let at = self
            .order
            .iter()
            .position(|&w| w as usize == way)
            .unwrap();
        if at != 0 {
            self.order.remove(at);
            self.order.push_front(way as u16);
        }
    }

    pub fn most_recent(&self) -> usize {
        self.order[0] as usize
    }

    pub fn least_recent(&self) -> usize {
        *self.order.back().unwrap() as usize
    }
}

impl MakeS for Recency {
    fn new(n_ways: usize) -> Self {
        Recency {
            order: (0..n_ways as u16).collect(),
        }
    }
}

#[cfg(test)]
pub struct SeqRng {
    vals: Vec<u64>,
    at: usize,
}

#[cfg(test)]
impl SeqRng {
    pub fn new(vals: Vec<u64>) -> Self {
        SeqRng { vals, at: 0 }
    }
}

#[cfg(test)]
impl RngSource for SeqRng {
    fn next(&mut self) -> u64 {
        let val = self.vals[self.at % self.vals.len()];
        self.at += 1;
        val
    }
}
