//! Guaranteed capacity of pools under a single row failure.

use crate::{Capacity, Facility, PoolId};

/// Calculates the capacity of `pool` that is guaranteed to remain available when any single
/// row fails.
///
/// This is the total capacity of the pool minus the capacity of its members located in the
/// row in which the pool is most concentrated. An empty pool has no guaranteed capacity.
#[must_use]
pub fn pool_guaranteed_capacity(facility: &Facility, pool: PoolId) -> Capacity {
    let mut row_capacities = vec![0; facility.rows().len()];
    let mut total = 0;
    for &member in facility.pool(pool).members() {
        let server = facility.server(member);
        if let Some(location) = server.location() {
            row_capacities[usize::from(location.row)] += server.capacity();
            total += server.capacity();
        }
    }
    total - row_capacities.into_iter().max().unwrap_or(0)
}

/// Evaluates the global score, i.e., the minimum guaranteed capacity over all pools,
/// caching the guaranteed capacity of each pool.
///
/// The cache is not aware of any changes to the data center: once membership of a pool
/// changes, the pool must be [invalidated](Objective::invalidate) before the next evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    cache: Vec<Option<Capacity>>,
}

impl Objective {
    /// Constructs an objective with all entries stale.
    #[must_use]
    pub fn new(num_pools: usize) -> Self {
        Self {
            cache: vec![None; num_pools],
        }
    }

    /// Marks all entries stale.
    pub fn reset(&mut self) {
        self.cache.iter_mut().for_each(|entry| *entry = None);
    }

    /// Marks the entry of `pool` stale.
    pub fn invalidate(&mut self, pool: PoolId) {
        self.cache[usize::from(pool)] = None;
    }

    /// Returns the cached guaranteed capacity of `pool`, or `None` if stale.
    #[must_use]
    pub fn cached(&self, pool: PoolId) -> Option<Capacity> {
        self.cache[usize::from(pool)]
    }

    /// Overwrites the cache entry of `pool`. Used to restore the entry after rolling back
    /// a membership change.
    pub fn restore(&mut self, pool: PoolId, entry: Option<Capacity>) {
        self.cache[usize::from(pool)] = entry;
    }

    /// Recomputes all stale entries and returns the guaranteed capacity of every pool.
    pub fn pool_capacities(&mut self, facility: &Facility) -> Vec<Capacity> {
        self.refresh(facility);
        self.cache.iter().map(|c| c.unwrap_or(0)).collect()
    }

    /// Recomputes all stale entries and returns the global score.
    pub fn global_score(&mut self, facility: &Facility) -> Capacity {
        self.refresh(facility);
        self.cache.iter().filter_map(|c| *c).min().unwrap_or(0)
    }

    fn refresh(&mut self, facility: &Facility) {
        debug_assert_eq!(self.cache.len(), facility.pools().len());
        for (idx, entry) in self.cache.iter_mut().enumerate() {
            if entry.is_none() {
                *entry = Some(pool_guaranteed_capacity(facility, PoolId::from(idx)));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{RowId, ServerId};

    /// Two rows of three slots, servers of size 2 and capacity 10 placed one per row.
    fn two_rows(num_pools: usize) -> Facility {
        let mut facility =
            Facility::new(2, 3, vec![], vec![(2, 10), (2, 10)], num_pools).unwrap();
        assert!(facility.place(ServerId::from(0), RowId::from(0), 0));
        assert!(facility.place(ServerId::from(1), RowId::from(1), 1));
        facility
    }

    #[test]
    fn test_one_server_per_row() {
        let mut facility = two_rows(1);
        facility.assign_pool(ServerId::from(0), PoolId::from(0));
        facility.assign_pool(ServerId::from(1), PoolId::from(0));
        assert_eq!(pool_guaranteed_capacity(&facility, PoolId::from(0)), 10);
        assert_eq!(Objective::new(1).global_score(&facility), 10);
    }

    #[test]
    fn test_empty_pool_scores_zero() {
        let mut facility = two_rows(2);
        facility.assign_pool(ServerId::from(0), PoolId::from(0));
        facility.assign_pool(ServerId::from(1), PoolId::from(0));
        assert_eq!(pool_guaranteed_capacity(&facility, PoolId::from(1)), 0);
        let mut objective = Objective::new(2);
        assert_eq!(objective.global_score(&facility), 0);
        assert_eq!(objective.pool_capacities(&facility), vec![10, 0]);
    }

    #[test]
    fn test_cache() {
        let mut facility = two_rows(2);
        facility.assign_pool(ServerId::from(0), PoolId::from(0));
        facility.assign_pool(ServerId::from(1), PoolId::from(1));
        let mut objective = Objective::new(2);
        assert_eq!(objective.cached(PoolId::from(0)), None);
        assert_eq!(objective.global_score(&facility), 0);
        assert_eq!(objective.cached(PoolId::from(0)), Some(0));
        assert_eq!(objective.cached(PoolId::from(1)), Some(0));

        facility.transfer(ServerId::from(1), PoolId::from(1), PoolId::from(0));

        // Entry is stale but not invalidated.
        assert_eq!(objective.pool_capacities(&facility), vec![0, 0]);

        objective.invalidate(PoolId::from(0));
        assert_eq!(objective.pool_capacities(&facility), vec![10, 0]);

        objective.restore(PoolId::from(1), Some(7));
        assert_eq!(objective.global_score(&facility), 7);
        objective.reset();
        assert_eq!(objective.global_score(&facility), 0);
    }
}
