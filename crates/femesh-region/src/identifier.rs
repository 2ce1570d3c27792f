//! Next-free identifier allocation.

use femesh_core::MeshError;

/// Caches the smallest free identifier of one kind.
///
/// The cached value means "every identifier below this is taken". It is
/// only written by default-start queries, so probing from an arbitrary
/// start never poisons it, and any removal resets it to unknown rather
/// than tracking individual holes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentifierCache {
    next_free: Option<u32>,
}

impl IdentifierCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Smallest identifier `>= start` for which `in_use` is false.
    ///
    /// A `start` of 0 is treated as 1. Fails with
    /// [`MeshError::AllocationFailure`] when every identifier from
    /// `start` up to `u32::MAX` is taken.
    pub fn next_free(
        &mut self,
        start: u32,
        in_use: impl Fn(u32) -> bool,
    ) -> Result<u32, MeshError> {
        let start = start.max(1);
        let mut identifier = match self.next_free {
            Some(cached) if cached > start => cached,
            _ => start,
        };
        while in_use(identifier) {
            identifier = identifier.checked_add(1).ok_or_else(|| {
                MeshError::allocation(format!("no free identifier at or above {start}"))
            })?;
        }
        if start < 2 {
            self.next_free = Some(identifier);
        }
        Ok(identifier)
    }

    /// Forget the cached value.
    pub fn invalidate(&mut self) {
        self.next_free = None;
    }

    /// The cached value, if known.
    pub fn cached(&self) -> Option<u32> {
        self.next_free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn zero_start_means_one() {
        let mut cache = IdentifierCache::new();
        assert_eq!(cache.next_free(0, |_| false), Ok(1));
    }

    #[test]
    fn arbitrary_start_does_not_poison_cache() {
        let used: BTreeSet<u32> = [1, 2, 3].into();
        let mut cache = IdentifierCache::new();
        assert_eq!(cache.next_free(1, |id| used.contains(&id)), Ok(4));
        assert_eq!(cache.cached(), Some(4));
        assert_eq!(cache.next_free(10, |id| used.contains(&id)), Ok(10));
        assert_eq!(cache.cached(), Some(4));
    }

    #[test]
    fn invalidation_finds_freed_holes() {
        let mut used: BTreeSet<u32> = [1, 2, 3].into();
        let mut cache = IdentifierCache::new();
        assert_eq!(cache.next_free(1, |id| used.contains(&id)), Ok(4));
        used.remove(&2);
        cache.invalidate();
        assert_eq!(cache.next_free(1, |id| used.contains(&id)), Ok(2));
    }

    #[test]
    fn exhausted_range_is_an_allocation_failure() {
        let mut cache = IdentifierCache::new();
        let top = u32::MAX - 2;
        assert!(matches!(
            cache.next_free(top, |id| id >= top),
            Err(MeshError::AllocationFailure { .. })
        ));
        assert_eq!(cache.next_free(top, |id| id > top), Ok(top));
    }

    proptest! {
        #[test]
        fn consecutive_allocation_strictly_increases(
            taken in prop::collection::btree_set(1u32..60, 0..30),
            count in 1usize..40,
        ) {
            let mut used = taken;
            let mut cache = IdentifierCache::new();
            let mut last = 0;
            for _ in 0..count {
                let id = cache.next_free(1, |id| used.contains(&id)).unwrap();
                prop_assert!(id > last);
                prop_assert!(!used.contains(&id));
                used.insert(id);
                last = id;
            }
        }

        #[test]
        fn result_is_smallest_free_at_or_above_start(
            taken in prop::collection::btree_set(1u32..40, 0..30),
            start in 0u32..45,
        ) {
            let mut cache = IdentifierCache::new();
            let id = cache.next_free(start, |id| taken.contains(&id)).unwrap();
            let from = start.max(1);
            prop_assert!(id >= from);
            prop_assert!((from..id).all(|k| taken.contains(&k)));
        }
    }
}
