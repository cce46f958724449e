use crate::{Capacity, Error, Result, Row};

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Upper bound on the number of slots in a data center, counting every row as at least one.
pub const MAX_GRID_SLOTS: usize = 1 << 24;

/// Upper bound on the number of pools in a data center.
pub const MAX_POOLS: usize = 1 << 20;

/// Server ID: index into [`Facility::servers`].
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ServerId(usize);

/// Row ID: index into [`Facility::rows`].
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct RowId(usize);

/// Pool ID: index into [`Facility::pools`].
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct PoolId(usize);

/// Physical location of a placed server: its row and the first slot it occupies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Row containing the server.
    pub row: RowId,
    /// First slot occupied by the server.
    pub slot: usize,
}

/// A server of fixed size and capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    id: ServerId,
    size: usize,
    capacity: Capacity,
    location: Option<Location>,
    pool: Option<PoolId>,
}

impl Server {
    /// Constructs an unassigned server.
    #[must_use]
    pub fn new(id: ServerId, size: usize, capacity: Capacity) -> Self {
        Self {
            id,
            size,
            capacity,
            location: None,
            pool: None,
        }
    }

    /// Server ID.
    #[must_use]
    pub fn id(&self) -> ServerId {
        self.id
    }

    /// Number of consecutive slots occupied by the server.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Compute capacity.
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Location in the data center, or `None` if the server has not been placed.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Pool the server belongs to, or `None` if it has not been assigned to any.
    #[must_use]
    pub fn pool(&self) -> Option<PoolId> {
        self.pool
    }

    pub(crate) fn set_location(&mut self, location: Option<Location>) {
        self.location = location;
    }

    pub(crate) fn set_pool(&mut self, pool: Option<PoolId>) {
        self.pool = pool;
    }
}

/// A logical group of servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    id: PoolId,
    members: Vec<ServerId>,
}

impl Pool {
    fn new(id: PoolId) -> Self {
        Self {
            id,
            members: Vec::new(),
        }
    }

    /// Pool ID.
    #[must_use]
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Member servers. The order carries no meaning.
    #[must_use]
    pub fn members(&self) -> &[ServerId] {
        &self.members
    }

    /// Number of member servers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Checks if the pool has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Checks if `server` is a member.
    #[must_use]
    pub fn contains(&self, server: ServerId) -> bool {
        self.members.contains(&server)
    }

    fn insert(&mut self, server: ServerId) {
        if !self.contains(server) {
            self.members.push(server);
        }
    }

    fn remove(&mut self, server: ServerId) -> bool {
        if let Some(pos) = self.members.iter().position(|&m| m == server) {
            self.members.swap_remove(pos);
            true
        } else {
            false
        }
    }
}

/// Inconsistency between servers, rows, and pools, as reported by
/// [`Facility::check_consistency`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Server is placed but not in a pool, or in a pool but not placed.
    PartialAssignment(ServerId),
    /// A slot of the server's run is not reported by the row as occupied by this server.
    SlotMismatch {
        /// Server ID.
        server: ServerId,
        /// Slot that does not resolve to the server.
        slot: usize,
    },
    /// Server references a pool that does not list it exactly once.
    MembershipMismatch {
        /// Server ID.
        server: ServerId,
        /// Pool referenced by the server.
        pool: PoolId,
    },
    /// Pool lists a server that does not reference it back.
    StrayMember {
        /// Pool ID.
        pool: PoolId,
        /// Listed server.
        server: ServerId,
    },
}

/// The data center: rows, servers, and pools, indexed by their IDs.
///
/// The number of rows, servers, and pools is fixed at construction.
#[derive(Debug, Clone)]
pub struct Facility {
    rows: Vec<Row>,
    servers: Vec<Server>,
    pools: Vec<Pool>,
}

impl Facility {
    /// Constructs a data center with `num_rows` rows of `num_slots` slots each,
    /// one server per `(size, capacity)` pair, and `num_pools` empty pools.
    ///
    /// # Errors
    ///
    /// Returns an error if an unavailable slot is outside of the grid, any server has size 0,
    /// there are no pools, or the grid or the number of pools exceeds [`MAX_GRID_SLOTS`] or
    /// [`MAX_POOLS`].
    pub fn new<U, S>(
        num_rows: usize,
        num_slots: usize,
        unavailable: U,
        servers: S,
        num_pools: usize,
    ) -> Result<Self>
    where
        U: IntoIterator<Item = (usize, usize)>,
        S: IntoIterator<Item = (usize, Capacity)>,
    {
        if num_pools == 0 {
            return Err(Error::ZeroPools);
        }
        if num_pools > MAX_POOLS {
            return Err(Error::TooManyPools { num_pools });
        }
        match num_rows.checked_mul(num_slots.max(1)) {
            Some(total) if total <= MAX_GRID_SLOTS => {}
            _ => {
                return Err(Error::GridTooLarge {
                    num_rows,
                    num_slots,
                })
            }
        }
        let mut per_row = vec![Vec::new(); num_rows];
        for (row, slot) in unavailable {
            per_row
                .get_mut(row)
                .ok_or(Error::RowOutOfBounds { row, num_rows })?
                .push(slot);
        }
        let rows = per_row
            .into_iter()
            .enumerate()
            .map(|(id, slots)| Row::new(RowId::from(id), num_slots, slots))
            .collect::<Result<Vec<_>>>()?;
        let servers = servers
            .into_iter()
            .enumerate()
            .map(|(id, (size, capacity))| {
                if size == 0 {
                    Err(Error::ZeroSizedServer { server: id })
                } else {
                    Ok(Server::new(ServerId::from(id), size, capacity))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let pools = (0..num_pools).map(|id| Pool::new(PoolId::from(id))).collect();
        Ok(Self {
            rows,
            servers,
            pools,
        })
    }

    /// All rows, indexed by [`RowId`].
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// All servers, indexed by [`ServerId`].
    #[must_use]
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// All pools, indexed by [`PoolId`].
    #[must_use]
    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Returns the row with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    #[must_use]
    pub fn row(&self, id: RowId) -> &Row {
        &self.rows[usize::from(id)]
    }

    /// Returns the server with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    #[must_use]
    pub fn server(&self, id: ServerId) -> &Server {
        &self.servers[usize::from(id)]
    }

    /// Returns the pool with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    #[must_use]
    pub fn pool(&self, id: PoolId) -> &Pool {
        &self.pools[usize::from(id)]
    }

    /// Number of servers that have been placed in a row.
    #[must_use]
    pub fn num_placed(&self) -> usize {
        self.servers.iter().filter(|s| s.location.is_some()).count()
    }

    /// Total capacity of the servers placed in `row`.
    #[must_use]
    pub fn row_load(&self, row: RowId) -> Capacity {
        self.row(row)
            .servers()
            .map(|id| self.server(id).capacity)
            .sum()
    }

    /// Places `server` in `row` at `slot`. Returns `false` if it does not fit there or has
    /// already been placed.
    pub(crate) fn place(&mut self, server: ServerId, row: RowId, slot: usize) -> bool {
        let server = &mut self.servers[usize::from(server)];
        server.location.is_none() && self.rows[usize::from(row)].place(slot, server)
    }

    /// Adds a placed server to a pool. Unplaced servers are ignored, and a server already in a
    /// pool is moved from there.
    pub(crate) fn assign_pool(&mut self, server: ServerId, pool: PoolId) {
        let record = &mut self.servers[usize::from(server)];
        if record.location.is_none() {
            return;
        }
        if let Some(previous) = record.pool.replace(pool) {
            self.pools[usize::from(previous)].remove(server);
        }
        self.pools[usize::from(pool)].insert(server);
    }

    /// Moves `server` from pool `from` to pool `to`.
    pub(crate) fn transfer(&mut self, server: ServerId, from: PoolId, to: PoolId) {
        debug_assert_eq!(self.servers[usize::from(server)].pool, Some(from));
        if self.pools[usize::from(from)].remove(server) {
            self.pools[usize::from(to)].insert(server);
            self.servers[usize::from(server)].pool = Some(to);
        }
    }

    /// Removes every server from its row and pool.
    pub fn unassign_all(&mut self) {
        for row in &mut self.rows {
            row.clear();
        }
        for pool in &mut self.pools {
            pool.members.clear();
        }
        for server in &mut self.servers {
            server.location = None;
            server.pool = None;
        }
    }

    /// Verifies that every server is either fully unassigned or fully assigned, that the rows
    /// agree with the recorded server locations, and that pools agree with the recorded
    /// server pools.
    ///
    /// Returns all violations found; an empty vector means the data center is consistent.
    #[must_use]
    pub fn check_consistency(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        for server in &self.servers {
            match (server.location, server.pool) {
                (None, None) => {}
                (Some(location), Some(pool)) => {
                    let row = self.rows.get(usize::from(location.row));
                    for slot in location.slot..location.slot + server.size {
                        if row.and_then(|r| r.occupant_at(slot)) != Some(server.id) {
                            violations.push(Violation::SlotMismatch {
                                server: server.id,
                                slot,
                            });
                        }
                    }
                    let count = self
                        .pools
                        .get(usize::from(pool))
                        .map_or(0, |p| p.members.iter().filter(|&&m| m == server.id).count());
                    if count != 1 {
                        violations.push(Violation::MembershipMismatch {
                            server: server.id,
                            pool,
                        });
                    }
                }
                _ => violations.push(Violation::PartialAssignment(server.id)),
            }
        }
        for pool in &self.pools {
            for &member in &pool.members {
                let back = self.servers.get(usize::from(member)).and_then(|s| s.pool);
                if back != Some(pool.id) {
                    violations.push(Violation::StrayMember {
                        pool: pool.id,
                        server: member,
                    });
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn facility() -> Facility {
        Facility::new(2, 4, vec![(1, 0)], vec![(2, 10), (3, 20), (1, 5)], 2).unwrap()
    }

    #[test]
    fn test_new_validates_input() {
        assert!(matches!(
            Facility::new(1, 4, vec![], vec![(1, 1)], 0),
            Err(Error::ZeroPools)
        ));
        assert!(matches!(
            Facility::new(1, 4, vec![(1, 0)], vec![(1, 1)], 1),
            Err(Error::RowOutOfBounds { row: 1, num_rows: 1 })
        ));
        assert!(matches!(
            Facility::new(1, 4, vec![(0, 4)], vec![(1, 1)], 1),
            Err(Error::SlotOutOfBounds { row: 0, slot: 4, .. })
        ));
        assert!(matches!(
            Facility::new(1, 4, vec![], vec![(1, 1), (0, 3)], 1),
            Err(Error::ZeroSizedServer { server: 1 })
        ));
    }

    #[test]
    fn test_new_rejects_oversized_input() {
        assert!(matches!(
            Facility::new(usize::MAX, 1, vec![], vec![], 1),
            Err(Error::GridTooLarge { .. })
        ));
        assert!(matches!(
            Facility::new(usize::MAX, 0, vec![], vec![], 1),
            Err(Error::GridTooLarge { num_slots: 0, .. })
        ));
        assert!(matches!(
            Facility::new(1, MAX_GRID_SLOTS + 1, vec![], vec![], 1),
            Err(Error::GridTooLarge { num_rows: 1, .. })
        ));
        assert!(matches!(
            Facility::new(2, 3, vec![], vec![], MAX_POOLS + 1),
            Err(Error::TooManyPools { .. })
        ));
        assert!(Facility::new(4, 100, vec![], vec![], 100).is_ok());
    }

    #[test]
    fn test_place_and_assign() {
        let mut facility = facility();
        assert!(facility.place(ServerId::from(0), RowId::from(0), 0));
        assert!(!facility.place(ServerId::from(0), RowId::from(0), 2));
        assert!(!facility.place(ServerId::from(1), RowId::from(1), 0));
        assert!(facility.place(ServerId::from(1), RowId::from(1), 1));
        assert_eq!(facility.num_placed(), 2);
        assert_eq!(facility.row_load(RowId::from(0)), 10);
        assert_eq!(facility.row_load(RowId::from(1)), 20);

        // Placed but not pooled.
        assert_eq!(
            facility.check_consistency(),
            vec![
                Violation::PartialAssignment(ServerId::from(0)),
                Violation::PartialAssignment(ServerId::from(1)),
            ]
        );

        facility.assign_pool(ServerId::from(0), PoolId::from(0));
        facility.assign_pool(ServerId::from(1), PoolId::from(0));
        facility.assign_pool(ServerId::from(2), PoolId::from(1));
        assert!(facility.pool(PoolId::from(1)).is_empty());
        assert!(facility.check_consistency().is_empty());

        facility.transfer(ServerId::from(1), PoolId::from(0), PoolId::from(1));
        assert_eq!(facility.pool(PoolId::from(0)).members(), &[ServerId::from(0)]);
        assert_eq!(facility.pool(PoolId::from(1)).members(), &[ServerId::from(1)]);
        assert_eq!(facility.server(ServerId::from(1)).pool(), Some(PoolId::from(1)));
        assert!(facility.check_consistency().is_empty());

        facility.assign_pool(ServerId::from(0), PoolId::from(1));
        assert!(facility.pool(PoolId::from(0)).is_empty());
        assert_eq!(facility.pool(PoolId::from(1)).len(), 2);
        assert!(facility.check_consistency().is_empty());
    }

    #[test]
    fn test_unassign_all() {
        let mut facility = facility();
        assert!(facility.place(ServerId::from(2), RowId::from(1), 3));
        facility.assign_pool(ServerId::from(2), PoolId::from(1));
        facility.unassign_all();
        assert_eq!(facility.num_placed(), 0);
        assert!(facility.pools().iter().all(Pool::is_empty));
        assert!(facility.servers().iter().all(|s| s.pool().is_none()));
        assert_eq!(facility.row(RowId::from(1)).free_segments(3).len(), 1);
        assert!(facility.check_consistency().is_empty());
    }
}
