use super::{Recency, Replace};

/// Least-recently-used: evict the way at the tail of the recency order.
pub struct Lru {}

impl Lru {
    pub fn new() -> Self {
        Lru {}
    }
}

impl Replace<Recency> for Lru {
    fn touch(&mut self, set: &mut Recency, way: usize) {
        set.make_most_recent(way);
    }

    fn victim(&mut self, set: &mut Recency, _n_ways: usize) -> usize {
        set.least_recent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::MakeS;

    #[test]
    fn evicts_the_least_recently_touched_way() {
        let mut lru = Lru::new();
        let mut set = Recency::new(4);
        for way in [0, 1, 2, 3] {
            lru.touch(&mut set, way);
        }
        lru.touch(&mut set, 1);
        assert_eq!(lru.victim(&mut set, 4), 0);
    }
}
