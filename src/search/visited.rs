use std::{
    hash::Hash,
    sync::atomic::{AtomicUsize, Ordering},
};

use ahash::RandomState;
use hashbrown::HashSet;
use parking_lot::Mutex;

use crate::error::CapacityError;

const SHARDS_PER_THREAD: usize = 4;

pub struct VisitedSet<P> {
    shards: Box<[Mutex<HashSet<P, RandomState>>]>,
    hasher: RandomState,
    shard_mask: usize,
    len: AtomicUsize,
    limit: Option<usize>,
}

impl<P: Eq + Hash> VisitedSet<P> {
    #[must_use]
    pub fn new(num_threads: usize, limit: Option<usize>) -> Self {
        let shard_count = num_threads
            .max(1)
            .saturating_mul(SHARDS_PER_THREAD)
            .next_power_of_two();
        let hasher = RandomState::new();
        let shards = (0..shard_count)
            .map(|_| Mutex::new(HashSet::with_hasher(hasher.clone())))
            .collect();
        Self {
            shards,
            hasher,
            shard_mask: shard_count - 1,
            len: AtomicUsize::new(0),
            limit,
        }
    }

    fn shard_for(&self, position: &P) -> &Mutex<HashSet<P, RandomState>> {
        let hash = self.hasher.hash_one(position);
        let index = usize::try_from(hash).unwrap_or(usize::MAX) & self.shard_mask;
        &self.shards[index]
    }

    /// Returns `Ok(true)` iff this call is the first to mark `position`.
    pub fn try_mark_visited(&self, position: &P) -> Result<bool, CapacityError>
    where
        P: Clone,
    {
        let mut shard = self.shard_for(position).lock();
        if shard.contains(position) {
            return Ok(false);
        }
        let reserved = self.len.fetch_add(1, Ordering::AcqRel);
        if let Some(limit) = self.limit
            && reserved >= limit
        {
            self.len.fetch_sub(1, Ordering::AcqRel);
            return Err(CapacityError { limit });
        }
        shard.insert(position.clone());
        Ok(true)
    }

    #[must_use]
    pub fn contains(&self, position: &P) -> bool {
        self.shard_for(position).lock().contains(position)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Barrier},
        thread,
    };

    use super::*;

    #[test]
    fn test_first_mark_wins() {
        let visited = VisitedSet::new(2, None);
        assert_eq!(visited.try_mark_visited(&7u32), Ok(true));
        assert_eq!(visited.try_mark_visited(&7u32), Ok(false));
        assert_eq!(visited.try_mark_visited(&8u32), Ok(true));
        assert!(visited.contains(&7));
        assert!(!visited.contains(&9));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_concurrent_marks_have_one_winner() {
        const THREADS: usize = 16;
        let visited = Arc::new(VisitedSet::new(THREADS, None));
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let visited = Arc::clone(&visited);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    (0..1_000u64)
                        .filter(|position| visited.try_mark_visited(position) == Ok(true))
                        .count()
                })
            })
            .collect();
        let wins: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(wins, 1_000);
        assert_eq!(visited.len(), 1_000);
    }

    #[test]
    fn test_limit_reports_capacity_error() {
        let visited = VisitedSet::new(1, Some(2));
        assert_eq!(visited.try_mark_visited(&"a"), Ok(true));
        assert_eq!(visited.try_mark_visited(&"b"), Ok(true));
        assert_eq!(visited.try_mark_visited(&"a"), Ok(false));
        assert_eq!(
            visited.try_mark_visited(&"c"),
            Err(CapacityError { limit: 2 })
        );
        assert_eq!(visited.len(), 2);
        assert_eq!(visited.limit(), Some(2));
    }
}
