use crate::facility::{Location, RowId, Server, ServerId};
use crate::{Error, Result};

use std::fmt;

/// State of a single slot in a row.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Permanently unusable.
    Unavailable,
    /// Available and not occupied.
    Free,
    /// First slot of a server's run.
    Head(ServerId),
    /// Non-first slot of a server's run; holds the distance back to the head.
    Body(usize),
}

/// Maximal run of free slots.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FreeSegment {
    /// First slot of the run.
    pub start: usize,
    /// Number of slots in the run.
    pub len: usize,
}

/// A row of fixed-width slots.
///
/// A server occupies a contiguous run of slots: the first one is tagged with the server ID,
/// and each following slot stores its offset from the first one. This way, the occupant of
/// any slot can be resolved in constant time without an additional index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    id: RowId,
    slots: Vec<Slot>,
}

impl Row {
    /// Constructs a row of `num_slots` free slots, except for `unavailable` ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotOutOfBounds`] if any of the unavailable slots is not within the row.
    pub fn new<I>(id: RowId, num_slots: usize, unavailable: I) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut slots = vec![Slot::Free; num_slots];
        for slot in unavailable {
            *slots.get_mut(slot).ok_or(Error::SlotOutOfBounds {
                row: id.into(),
                slot,
                num_slots,
            })? = Slot::Unavailable;
        }
        Ok(Self { id, slots })
    }

    /// Row ID.
    #[must_use]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Number of slots in the row, including unavailable ones.
    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Returns the state of the given slot, or `None` if out of bounds.
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<Slot> {
        self.slots.get(slot).copied()
    }

    /// Checks if a server of `size` slots fits at `slot`.
    ///
    /// This requires the run to be non-empty, entirely within the row, and all its slots to be
    /// free.
    #[must_use]
    pub fn can_place(&self, slot: usize, size: usize) -> bool {
        slot.checked_add(size)
            .filter(|_| size > 0)
            .and_then(|end| self.slots.get(slot..end))
            .map_or(false, |run| run.iter().all(|s| *s == Slot::Free))
    }

    /// Places `server` at `slot` and records the location on the server.
    ///
    /// Returns `false` and changes nothing if the server does not fit there.
    pub fn place(&mut self, slot: usize, server: &mut Server) -> bool {
        let size = server.size();
        if !self.can_place(slot, size) {
            return false;
        }
        self.slots[slot] = Slot::Head(server.id());
        for offset in 1..size {
            self.slots[slot + offset] = Slot::Body(offset);
        }
        server.set_location(Some(Location { row: self.id, slot }));
        true
    }

    /// Returns the server occupying `slot`, if any.
    #[must_use]
    pub fn occupant_at(&self, slot: usize) -> Option<ServerId> {
        match self.slots.get(slot)? {
            Slot::Head(id) => Some(*id),
            Slot::Body(offset) => match self.slots.get(slot.checked_sub(*offset)?)? {
                Slot::Head(id) => Some(*id),
                _ => None,
            },
            Slot::Free | Slot::Unavailable => None,
        }
    }

    /// Returns all maximal free runs of at least `min_len` slots, in slot order.
    ///
    /// Yields nothing when `min_len` is 0.
    #[must_use]
    pub fn free_segments(&self, min_len: usize) -> Vec<FreeSegment> {
        if min_len == 0 {
            return Vec::new();
        }
        let mut segments = Vec::new();
        let mut start = None;
        for (idx, slot) in self.slots.iter().enumerate() {
            match (start, *slot == Slot::Free) {
                (None, true) => start = Some(idx),
                (Some(begin), false) => {
                    if idx - begin >= min_len {
                        segments.push(FreeSegment {
                            start: begin,
                            len: idx - begin,
                        });
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(begin) = start {
            let len = self.slots.len() - begin;
            if len >= min_len {
                segments.push(FreeSegment { start: begin, len });
            }
        }
        segments
    }

    /// Iterates over the servers placed in this row, in slot order.
    pub fn servers(&self) -> impl Iterator<Item = ServerId> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Head(id) => Some(*id),
            _ => None,
        })
    }

    /// Frees all occupied slots. Unavailable slots stay unavailable.
    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            if let Slot::Head(_) | Slot::Body(_) = slot {
                *slot = Slot::Free;
            }
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, slot) in self.slots.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            match slot {
                Slot::Unavailable => write!(f, "U")?,
                Slot::Free => write!(f, ".")?,
                Slot::Head(id) => write!(f, "{}", id)?,
                Slot::Body(_) => write!(f, "-")?,
            }
        }
        Ok(())
    }
}
