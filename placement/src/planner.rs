//! Greedy placement of servers in rows, and random seeding of pools.

use crate::{Capacity, Facility, PoolId, Row, RowId, Server, ServerId};

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::cmp::Ordering;

/// Compares capacity densities (capacity per slot) of two servers without rounding.
fn cmp_density(lhs: &Server, rhs: &Server) -> Ordering {
    let lhs_scaled = u128::from(lhs.capacity()) * rhs.size() as u128;
    let rhs_scaled = u128::from(rhs.capacity()) * lhs.size() as u128;
    lhs_scaled.cmp(&rhs_scaled)
}

/// Returns the first slot of the shortest free segment in `row` that can fit `size` slots.
/// Ties between equally short segments are broken uniformly at random.
fn best_fit<R: Rng + ?Sized>(row: &Row, size: usize, rng: &mut R) -> Option<usize> {
    let segments = row.free_segments(size);
    let shortest = segments.iter().map(|s| s.len).min()?;
    let candidates: Vec<_> = segments.iter().filter(|s| s.len == shortest).collect();
    candidates.choose(rng).map(|s| s.start)
}

/// Places all unplaced servers in the data center, one by one, and returns the number of
/// servers that have been placed.
///
/// Servers are processed in the order of decreasing capacity density, with ties broken at
/// random. Each server goes to the least loaded row (in terms of capacity already placed there)
/// that has enough free space, into the shortest free segment it fits in.
///
/// Servers that do not fit anywhere remain unplaced.
pub fn place_all<R: Rng + ?Sized>(facility: &mut Facility, rng: &mut R) -> usize {
    let mut order: Vec<(ServerId, u64)> = facility
        .servers()
        .iter()
        .filter(|s| s.location().is_none())
        .map(|s| (s.id(), rng.gen()))
        .collect();
    order.sort_by(|(lhs, lhs_key), (rhs, rhs_key)| {
        cmp_density(facility.server(*rhs), facility.server(*lhs)).then(lhs_key.cmp(rhs_key))
    });

    let mut loads: Vec<Capacity> = facility
        .rows()
        .iter()
        .map(|row| facility.row_load(row.id()))
        .collect();
    let mut rows: Vec<RowId> = facility.rows().iter().map(Row::id).collect();

    let mut placed = 0;
    for (id, _) in order {
        let size = facility.server(id).size();
        rows.sort_by_key(|&row| (loads[usize::from(row)], row));
        let target = rows.iter().find_map(|&row| {
            best_fit(facility.row(row), size, rng).map(|slot| (row, slot))
        });
        if let Some((row, slot)) = target {
            if facility.place(id, row, slot) {
                loads[usize::from(row)] += facility.server(id).capacity();
                placed += 1;
            }
        } else {
            log::debug!("Server {} of size {} does not fit in any row", id, size);
        }
    }
    log::info!(
        "Placed {} servers; {} remain unplaced",
        placed,
        facility.servers().len() - facility.num_placed()
    );
    placed
}

/// Assigns each placed server to a pool drawn uniformly at random.
/// Unplaced servers are skipped.
pub fn seed_pools<R: Rng + ?Sized>(facility: &mut Facility, rng: &mut R) {
    let pools = Uniform::new(0, facility.pools().len());
    let placed: Vec<_> = facility
        .servers()
        .iter()
        .filter(|s| s.location().is_some())
        .map(Server::id)
        .collect();
    for server in placed {
        facility.assign_pool(server, PoolId::from(pools.sample(rng)));
    }
}
