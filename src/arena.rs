//! Arena - slab allocator backing the intrusive queue family.
//!
//! The arena pre-allocates a contiguous block of slots at startup and hands
//! out `u32` handles instead of pointers. Every slot carries exactly one
//! `next` link; the queues in [`crate::queue`] thread their membership
//! through that link, and the arena threads its free list through the same
//! link while a slot is unallocated. Neither the queues nor the arena
//! allocate per enqueued item.

use std::fmt;

/// Sentinel value representing a null/invalid index (like nullptr)
pub const NULL_INDEX: u32 = u32::MAX;

/// Type alias for arena indices - our "compressed pointers".
/// Using u32 instead of 64-bit pointers halves link metadata.
pub type ArenaIndex = u32;

/// A single arena slot: the stored value plus the one intrusive link.
///
/// `value` is `None` exactly while the slot sits on the free list.
struct Slot<T> {
    value: Option<T>,
    next: ArenaIndex,
}

/// Pre-allocated slot pool with O(1) allocation and deallocation.
///
/// Uses a free list threaded through the `next` link of unallocated slots.
/// Out-of-bounds handles and double frees are linked-structure corruption
/// and fail fast rather than being tolerated.
pub struct Arena<T> {
    /// Contiguous block of pre-allocated slots
    slots: Vec<Slot<T>>,

    /// Head of the free list (index of first available slot)
    free_head: ArenaIndex,

    /// Number of currently allocated slots
    allocated_count: u32,

    /// Total capacity
    capacity: u32,
}

impl<T> Arena<T> {
    /// Create a new arena with the specified capacity.
    ///
    /// # Panics
    /// Panics if capacity exceeds `u32::MAX - 1` (we reserve MAX for
    /// `NULL_INDEX`).
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < NULL_INDEX, "capacity must be less than NULL_INDEX");

        // Thread the free list through all slots
        let mut slots = Vec::with_capacity(capacity as usize);
        for i in 0..capacity {
            slots.push(Slot {
                value: None,
                next: if i + 1 < capacity { i + 1 } else { NULL_INDEX },
            });
        }

        Self {
            slots,
            free_head: if capacity > 0 { 0 } else { NULL_INDEX },
            allocated_count: 0,
            capacity,
        }
    }

    /// Allocate a slot and move `value` into it.
    ///
    /// Returns `None` if the arena is full. The new slot's `next` link is
    /// `NULL_INDEX`, i.e. the item starts out enqueued nowhere.
    ///
    /// # Complexity
    /// O(1) - pops from head of free list
    #[inline]
    pub fn alloc(&mut self, value: T) -> Option<ArenaIndex> {
        if self.free_head == NULL_INDEX {
            return None;
        }

        let index = self.free_head;
        let slot = &mut self.slots[index as usize];
        self.free_head = slot.next;
        slot.next = NULL_INDEX;
        slot.value = Some(value);
        self.allocated_count += 1;

        Some(index)
    }

    /// Free a slot back to the arena, returning the stored value.
    ///
    /// The item must not be a member of any queue (its `next` link is
    /// overwritten by the free list).
    ///
    /// # Panics
    /// Panics on an out-of-bounds handle or a slot that is already free.
    ///
    /// # Complexity
    /// O(1) - pushes to head of free list
    #[inline]
    pub fn free(&mut self, index: ArenaIndex) -> T {
        let slot = &mut self.slots[index as usize];
        let value = slot
            .value
            .take()
            .unwrap_or_else(|| panic!("double free of arena slot {index}"));
        slot.next = self.free_head;
        self.free_head = index;
        self.allocated_count -= 1;
        value
    }

    /// Get an immutable reference to an allocated value.
    ///
    /// # Panics
    /// Panics on an out-of-bounds or unallocated handle.
    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &T {
        self.slots[index as usize]
            .value
            .as_ref()
            .unwrap_or_else(|| panic!("arena slot {index} is not allocated"))
    }

    /// Get a mutable reference to an allocated value.
    ///
    /// # Panics
    /// Panics on an out-of-bounds or unallocated handle.
    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> &mut T {
        self.slots[index as usize]
            .value
            .as_mut()
            .unwrap_or_else(|| panic!("arena slot {index} is not allocated"))
    }

    /// Read the intrusive `next` link of a slot.
    #[inline]
    pub fn next(&self, index: ArenaIndex) -> ArenaIndex {
        self.slots[index as usize].next
    }

    /// Write the intrusive `next` link of a slot.
    ///
    /// Reserved for the queue family; items themselves never touch their
    /// link.
    #[inline]
    pub(crate) fn set_next(&mut self, index: ArenaIndex, next: ArenaIndex) {
        self.slots[index as usize].next = next;
    }

    /// Returns the number of currently allocated slots.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.allocated_count
    }

    /// Returns the total capacity of the arena.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns true if the arena has no allocated slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    /// Returns true if the arena is full (no free slots).
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_head == NULL_INDEX
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("allocated", &self.allocated_count)
            .field("free_head", &self.free_head)
            .finish()
    }
}
