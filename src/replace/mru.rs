use super::{Recency, Replace};

/// Most-recently-used: evict the way at the head of the recency order.
/// Deliberately counter-intuitive; useful against looping access patterns
/// that defeat LRU.
pub struct Mru {}

impl Mru {
    pub fn new() -> Self {
        Mru {}
    }
}

impl Replace<Recency> for Mru {
    fn touch(&mut self, set: &mut Recency, way: usize) {
        set.make_most_recent(way);
    }

    fn victim(&mut self, set: &mut Recency, _n_ways: usize) -> usize {
        set.most_recent()
    }
}
