//! Random data center layouts for tests.

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use proptest::collection::vec;
use proptest::prelude::*;
use rand::Rng;
use std::fmt::Write;

/// Plain description of a data center, independent of how it is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Number of rows.
    pub num_rows: usize,
    /// Number of slots in each row.
    pub num_slots: usize,
    /// Unavailable `(row, slot)` pairs.
    pub unavailable: Vec<(usize, usize)>,
    /// `(size, capacity)` of each server.
    pub servers: Vec<(usize, u64)>,
    /// Number of pools.
    pub num_pools: usize,
}

impl Layout {
    /// Generates a layout where each slot is unavailable with probability `unavailable_ratio`,
    /// and servers have sizes in `1..=max_size` and capacities in `1..=max_capacity`.
    pub fn random<R: Rng>(
        rng: &mut R,
        (num_rows, num_slots): (usize, usize),
        num_servers: usize,
        num_pools: usize,
        unavailable_ratio: f64,
        (max_size, max_capacity): (usize, u64),
    ) -> Self {
        let unavailable = (0..num_rows)
            .flat_map(|row| (0..num_slots).map(move |slot| (row, slot)))
            .filter(|_| rng.gen_bool(unavailable_ratio))
            .collect();
        let servers = (0..num_servers)
            .map(|_| {
                (
                    rng.gen_range(1, max_size + 1),
                    rng.gen_range(1, max_capacity + 1),
                )
            })
            .collect();
        Self {
            num_rows,
            num_slots,
            unavailable,
            servers,
            num_pools,
        }
    }

    /// Renders the layout in the input format: a `R S U P M` header, followed by unavailable
    /// slots and servers, one per line.
    #[must_use]
    pub fn to_input(&self) -> String {
        let mut input = format!(
            "{} {} {} {} {}\n",
            self.num_rows,
            self.num_slots,
            self.unavailable.len(),
            self.num_pools,
            self.servers.len()
        );
        for (row, slot) in &self.unavailable {
            writeln!(input, "{} {}", row, slot).expect("writing to string cannot fail");
        }
        for (size, capacity) in &self.servers {
            writeln!(input, "{} {}", size, capacity).expect("writing to string cannot fail");
        }
        input
    }

    /// Sum of all server capacities.
    #[must_use]
    pub fn total_capacity(&self) -> u64 {
        self.servers.iter().map(|(_, c)| c).sum()
    }
}

/// Small layouts with a few rows, pools, and unavailable slots, and enough servers that
/// some of them might not fit.
pub fn layouts() -> impl Strategy<Value = Layout> {
    (1..6_usize, 1..12_usize, 1..5_usize).prop_flat_map(|(num_rows, num_slots, num_pools)| {
        let grid = num_rows * num_slots;
        (
            vec((0..num_rows, 0..num_slots), 0..=grid / 4),
            vec((1..=num_slots, 0..100_u64), 0..=grid / 2 + 2),
        )
            .prop_map(move |(mut unavailable, servers)| {
                unavailable.sort_unstable();
                unavailable.dedup();
                Layout {
                    num_rows,
                    num_slots,
                    unavailable,
                    servers,
                    num_pools,
                }
            })
    })
}
