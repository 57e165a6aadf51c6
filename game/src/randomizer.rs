use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

use crate::shapes::PieceKind;

/// Every pool member repeated by its weight, shuffled.
pub fn weighted_bag<R: Rng + ?Sized>(pool: &[PieceKind], rng: &mut R) -> Vec<PieceKind> {
    let mut bag: Vec<PieceKind> = pool
        .iter()
        .flat_map(|&kind| std::iter::repeat_n(kind, kind.def().weight() as usize))
        .collect();
    bag.shuffle(rng);
    bag
}

/// Up to `count` distinct kinds, each draw weighted, removing every copy of a drawn kind.
pub fn draw_unlock_options<R: Rng + ?Sized>(
    candidates: &[PieceKind],
    count: usize,
    rng: &mut R,
) -> Vec<PieceKind> {
    let mut pool: Vec<PieceKind> = candidates
        .iter()
        .flat_map(|&kind| std::iter::repeat_n(kind, kind.def().weight() as usize))
        .collect();
    let mut out = Vec::with_capacity(count);
    while out.len() < count && !pool.is_empty() {
        let pick = pool[rng.random_range(0..pool.len())];
        pool.retain(|&k| k != pick);
        out.push(pick);
    }
    out
}

/// Weighted sampling of distinct items by repeated draws from the expanded list.
pub fn pick_weighted<T, R>(items: &[(T, u32)], count: usize, rng: &mut R) -> Vec<T>
where
    T: Copy + PartialEq,
    R: Rng + ?Sized,
{
    let mut pool: Vec<T> = items
        .iter()
        .flat_map(|&(item, weight)| std::iter::repeat_n(item, weight as usize))
        .collect();
    let mut out: Vec<T> = Vec::with_capacity(count);
    while out.len() < count && !pool.is_empty() {
        let idx = rng.random_range(0..pool.len());
        let item = pool.swap_remove(idx);
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Queue of upcoming kinds refilled one bag at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Randomizer {
    rng: Xoshiro256StarStar,
    queue: VecDeque<PieceKind>,
}

impl Randomizer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            queue: VecDeque::new(),
        }
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Keeps at least `depth` kinds queued. An empty pool leaves the queue alone.
    pub fn ensure(&mut self, pool: &[PieceKind], depth: usize) {
        if pool.is_empty() {
            return;
        }
        while self.queue.len() < depth.max(1) {
            let bag = weighted_bag(pool, &mut self.rng);
            self.queue.extend(bag);
        }
    }

    pub fn next(&mut self, pool: &[PieceKind]) -> Option<PieceKind> {
        self.ensure(pool, 1);
        let kind = self.queue.pop_front();
        if self.queue.is_empty() {
            self.ensure(pool, 1);
        }
        kind
    }

    pub fn peek(&self, depth: usize) -> Vec<PieceKind> {
        self.queue.iter().take(depth).copied().collect()
    }

    /// Puts `kinds` back at the head of the queue, first one next.
    pub fn return_to_front(&mut self, kinds: &[PieceKind]) {
        for &kind in kinds.iter().rev() {
            self.queue.push_front(kind);
        }
    }

    /// Drops queued kinds that left the pool, refilling if that empties the queue.
    pub fn retain_pool(&mut self, pool: &[PieceKind]) {
        self.queue.retain(|k| pool.contains(k));
        if self.queue.is_empty() {
            self.ensure(pool, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(names: &[&str]) -> Vec<PieceKind> {
        names.iter().map(|n| PieceKind::from_name(n).unwrap()).collect()
    }

    #[test]
    fn bag_holds_each_kind_weight_times() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let pool = kinds(&["M", "T", "P"]);
        let bag = weighted_bag(&pool, &mut rng);
        let count = |k: PieceKind| bag.iter().filter(|&&b| b == k).count();
        assert_eq!(count(pool[0]), 6);
        assert_eq!(count(pool[1]), 3);
        assert_eq!(count(pool[2]), 2);
    }

    #[test]
    fn unlock_draw_never_repeats() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(11);
        let pool = kinds(&["M", "D", "I3", "P"]);
        for _ in 0..50 {
            let picks = draw_unlock_options(&pool, 3, &mut rng);
            assert_eq!(picks.len(), 3);
            for (i, a) in picks.iter().enumerate() {
                assert!(!picks[i + 1..].contains(a));
            }
        }
        assert_eq!(draw_unlock_options(&pool[..2], 3, &mut rng).len(), 2);
    }

    #[test]
    fn weighted_pick_is_distinct_and_bounded() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(5);
        let items = [('a', 3), ('b', 1), ('c', 0)];
        let picks = pick_weighted(&items, 3, &mut rng);
        assert_eq!(picks.len(), 2);
        assert!(!picks.contains(&'c'));
    }

    #[test]
    fn queue_refills_and_previews() {
        let pool = kinds(&["I", "O"]);
        let mut r = Randomizer::new(9);
        r.ensure(&pool, 3);
        assert_eq!(r.peek(3).len(), 3);
        for _ in 0..20 {
            assert!(r.next(&pool).is_some());
        }
        assert!(!r.peek(1).is_empty());
    }

    #[test]
    fn returned_kinds_are_dealt_first_in_order() {
        let pool = kinds(&["I"]);
        let mut r = Randomizer::new(4);
        r.ensure(&pool, 2);
        r.return_to_front(&kinds(&["O", "T"]));
        assert_eq!(r.peek(3), kinds(&["O", "T", "I"]));
        assert_eq!(r.next(&pool), Some(kinds(&["O"])[0]));
    }

    #[test]
    fn removed_kinds_leave_the_queue() {
        let pool = kinds(&["I", "O", "T"]);
        let mut r = Randomizer::new(1);
        r.ensure(&pool, 9);
        let smaller = kinds(&["I"]);
        r.retain_pool(&smaller);
        assert!(r.peek(20).iter().all(|k| *k == smaller[0]));
    }
}
