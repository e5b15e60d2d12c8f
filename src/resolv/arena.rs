//! Storage for operations.
//!
//! Operations are kept in a vector of slots. A [`Handle`] names a slot
//! together with the generation of the slot at the time the operation was
//! inserted. When an operation is removed, the generation of its slot is
//! increased, so that any handles still lying around won’t match a later
//! occupant of the same slot.

use core::cmp;
use core::fmt;
use std::vec::Vec;

//------------ Handle --------------------------------------------------------

/// A reference to an operation of a resolver context.
///
/// Handles are cheap to copy. They stay valid until the operation has
/// been delivered or cancelled. After that, they never refer to any other
/// operation.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

//------------ Arena ---------------------------------------------------------

/// A vector of slots with generational handles.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    /// The number of occupied slots.
    count: usize,

    /// Index in `slots` where to start looking for a free slot.
    curr: usize,

    /// The slots.
    slots: Vec<Slot<T>>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

impl<T> Arena<T> {
    /// Creates a new empty arena.
    pub fn new() -> Self {
        Arena {
            count: 0,
            curr: 0,
            slots: Vec::new(),
        }
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns whether there are no items in the arena.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Inserts an item and returns its handle.
    pub fn insert(&mut self, item: T) -> Handle {
        // If more than half the slots are empty, we try and find one
        // from `curr` on.
        let free = if self.slots.len() >= 2 * self.count {
            (self.curr..self.slots.len())
                .find(|&idx| self.slots[idx].item.is_none())
        } else {
            None
        };
        let index = match free {
            Some(index) => {
                self.slots[index].item = Some(item);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    item: Some(item),
                });
                self.slots.len() - 1
            }
        };
        self.count += 1;
        if index == self.curr {
            self.curr += 1;
        }
        Handle {
            index: index as u32,
            generation: self.slots[index].generation,
        }
    }

    /// Returns a reference to the item with the given handle.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.item.as_ref()
    }

    /// Returns a mutable reference to the item with the given handle.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.item.as_mut()
    }

    /// Removes and returns the item with the given handle.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let res = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.count -= 1;
        self.curr = cmp::min(self.curr, handle.index as usize);
        Some(res)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

//============ Testing =======================================================
