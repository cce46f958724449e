//! Resilient placement of servers in a data center.
//!
//! Servers are packed into rows of slots, then grouped into pools so that the lowest
//! guaranteed capacity over all pools is as high as possible, where the guaranteed
//! capacity of a pool is whatever remains after losing its most loaded row.
//!
//! The optimization runs in three phases:
//! 1. [`place_all`] greedily assigns servers to rows and slots,
//! 2. [`seed_pools`] distributes the placed servers among pools at random,
//! 3. [`LocalSearch`] hill-climbs over pool membership with random swaps and moves.
//!
//! [`Optimizer`] runs all three phases in order.

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
#![deny(unsafe_code)]

mod config;
mod facility;
pub mod io;
mod objective;
mod planner;
mod row;
mod search;

pub use config::SearchConfig;
pub use facility::{
    Facility, Location, Pool, PoolId, RowId, Server, ServerId, Violation, MAX_GRID_SLOTS, MAX_POOLS,
};
pub use objective::{pool_guaranteed_capacity, Objective};
pub use planner::{place_all, seed_pools};
pub use row::{FreeSegment, Row, Slot};
pub use search::{LocalSearch, Optimizer, PhaseStats, Trial};

/// Capacity, in compute units, of a server, a row, or a pool.
pub type Capacity = u64;

/// Error type encompassing all errors of loading and validating a data center.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input/output failure while reading or writing a data center description.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The input has no header line.
    #[error("Missing header line.")]
    MissingHeader,
    /// The input ended before all declared records were read.
    #[error("Unexpected end of input: expected {expected}.")]
    UnexpectedEof {
        /// Description of the missing record.
        expected: &'static str,
    },
    /// A token could not be parsed as a non-negative integer.
    #[error("Invalid number `{token}` in line {line}.")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        token: String,
    },
    /// A line has fewer fields than its record requires.
    #[error("Missing field in line {line}.")]
    MissingField {
        /// 1-based line number.
        line: usize,
    },
    /// Slot index does not fit in the row.
    #[error("Slot {slot} out of bounds in row {row} with {num_slots} slots.")]
    SlotOutOfBounds {
        /// Row index.
        row: usize,
        /// Slot index.
        slot: usize,
        /// Number of slots in the row.
        num_slots: usize,
    },
    /// Row index does not fit in the data center.
    #[error("Row {row} out of bounds in a data center with {num_rows} rows.")]
    RowOutOfBounds {
        /// Row index.
        row: usize,
        /// Number of rows.
        num_rows: usize,
    },
    /// Pool index does not fit in the data center.
    #[error("Pool {pool} out of bounds in a data center with {num_pools} pools.")]
    PoolOutOfBounds {
        /// Pool index.
        pool: usize,
        /// Number of pools.
        num_pools: usize,
    },
    /// A data center must have at least one pool.
    #[error("There must be at least one pool.")]
    ZeroPools,
    /// The grid of rows and slots is too large to allocate.
    #[error("Grid of {num_rows} rows with {num_slots} slots each is too large.")]
    GridTooLarge {
        /// Number of rows.
        num_rows: usize,
        /// Number of slots in each row.
        num_slots: usize,
    },
    /// Too many pools to allocate.
    #[error("Too many pools: {num_pools}.")]
    TooManyPools {
        /// Number of pools.
        num_pools: usize,
    },
    /// Every server must occupy at least one slot.
    #[error("Server {server} has size 0.")]
    ZeroSizedServer {
        /// Server index.
        server: usize,
    },
    /// A recorded server location overlaps an unavailable slot or another server.
    #[error("Server {server} cannot be placed in row {row} at slot {slot}.")]
    IllegalPlacement {
        /// Server index.
        server: usize,
        /// Row index.
        row: usize,
        /// Slot index.
        slot: usize,
    },
    /// Search configuration that cannot drive the search.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias using [`Error`](enum.Error.html).
pub type Result<T> = std::result::Result<T, Error>;
