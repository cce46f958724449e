//! Reading data center descriptions and reading/writing server assignments.
//!
//! # Input format
//!
//! ```text
//! R S U P M
//! r s        (U lines: slot `s` in row `r` is unavailable)
//! z c        (M lines: server of size `z` and capacity `c`)
//! ```
//!
//! where `R` is the number of rows, `S` the number of slots in each row, `U` the number of
//! unavailable slots, `P` the number of pools, and `M` the number of servers.
//!
//! # Assignment format
//!
//! One line per server, in server order: `row slot pool`, or `x` for an unassigned server.

use crate::{Capacity, Error, Facility, PoolId, Result, RowId, ServerId};

use itertools::Itertools;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// Marks an unassigned server in the assignment format.
pub const UNASSIGNED: &str = "x";

/// Iterates over non-empty lines, tracking 1-based line numbers.
struct Records<B> {
    lines: std::io::Lines<B>,
    line: usize,
}

impl<B: BufRead> Records<B> {
    fn new(reader: B) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// Returns the next non-empty line along with its number.
    fn next_record(&mut self, expected: &'static str) -> Result<(usize, String)> {
        for text in &mut self.lines {
            self.line += 1;
            let text = text?;
            if !text.trim().is_empty() {
                return Ok((self.line, text));
            }
        }
        Err(Error::UnexpectedEof { expected })
    }
}

fn field<T: FromStr>(line: usize, tokens: &[&str], idx: usize) -> Result<T> {
    let token = tokens.get(idx).ok_or(Error::MissingField { line })?;
    token.parse().map_err(|_| Error::InvalidNumber {
        line,
        token: (*token).to_string(),
    })
}

fn fields<T: FromStr>(line: usize, text: &str, count: usize) -> Result<Vec<T>> {
    let tokens = text.split_whitespace().collect_vec();
    (0..count).map(|idx| field(line, &tokens, idx)).collect()
}

/// Reads a data center description. All servers are unassigned and all pools are empty.
///
/// # Errors
///
/// Returns an error if the input cannot be read, is malformed, has fewer records than declared
/// in the header, or describes an invalid data center (see [`Facility::new`]).
pub fn read_facility<B: BufRead>(reader: B) -> Result<Facility> {
    let mut records = Records::new(reader);
    let (line, header) = records.next_record("header").map_err(|err| match err {
        Error::UnexpectedEof { .. } => Error::MissingHeader,
        err => err,
    })?;
    let header: Vec<usize> = fields(line, &header, 5)?;
    let (num_rows, num_slots, num_unavailable, num_pools, num_servers) =
        (header[0], header[1], header[2], header[3], header[4]);
    let unavailable = (0..num_unavailable)
        .map(|_| {
            let (line, text) = records.next_record("unavailable slot")?;
            let slot: Vec<usize> = fields(line, &text, 2)?;
            Ok((slot[0], slot[1]))
        })
        .collect::<Result<Vec<_>>>()?;
    let servers = (0..num_servers)
        .map(|_| {
            let (line, text) = records.next_record("server")?;
            let tokens = text.split_whitespace().collect_vec();
            Ok((
                field::<usize>(line, &tokens, 0)?,
                field::<Capacity>(line, &tokens, 1)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    let facility = Facility::new(num_rows, num_slots, unavailable, servers, num_pools)?;
    log::info!(
        "Loaded {} rows of {} slots, {} servers, {} pools",
        num_rows,
        num_slots,
        num_servers,
        num_pools
    );
    Ok(facility)
}

/// Writes the assignment of every server, in server order.
///
/// A server is written as unassigned unless it is both placed and in a pool.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_assignment<W: Write>(mut writer: W, facility: &Facility) -> Result<()> {
    for server in facility.servers() {
        match (server.location(), server.pool()) {
            (Some(location), Some(pool)) => {
                writeln!(writer, "{} {} {}", location.row, location.slot, pool)?
            }
            _ => writeln!(writer, "{}", UNASSIGNED)?,
        }
    }
    writer.flush()?;
    Ok(())
}

/// Reads an assignment previously written by [`write_assignment`] and applies it to
/// `facility`, replacing any existing assignment.
///
/// # Errors
///
/// Returns an error if the input is malformed, has fewer lines than servers, references rows,
/// slots, or pools outside of the data center, or places servers illegally.
pub fn read_assignment<B: BufRead>(reader: B, facility: &mut Facility) -> Result<()> {
    facility.unassign_all();
    let mut records = Records::new(reader);
    let num_rows = facility.rows().len();
    let num_pools = facility.pools().len();
    for server in (0..facility.servers().len()).map(ServerId::from) {
        let (line, text) = records.next_record("server assignment")?;
        if text.trim() == UNASSIGNED {
            continue;
        }
        let values: Vec<usize> = fields(line, &text, 3)?;
        let (row, slot, pool) = (values[0], values[1], values[2]);
        if row >= num_rows {
            return Err(Error::RowOutOfBounds { row, num_rows });
        }
        let num_slots = facility.row(RowId::from(row)).num_slots();
        if slot >= num_slots {
            return Err(Error::SlotOutOfBounds {
                row,
                slot,
                num_slots,
            });
        }
        if pool >= num_pools {
            return Err(Error::PoolOutOfBounds { pool, num_pools });
        }
        if !facility.place(server, RowId::from(row), slot) {
            return Err(Error::IllegalPlacement {
                server: server.into(),
                row,
                slot,
            });
        }
        facility.assign_pool(server, PoolId::from(pool));
    }
    Ok(())
}
