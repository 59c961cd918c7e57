//! Intrusive queue family - the executive's universal work-list primitive.
//!
//! [`LinkedQueue`] is a singly-linked FIFO threaded through the arena's
//! intrusive `next` links; [`PriorityQueue`] is the same structure kept
//! sorted under a caller-supplied comparator. A queue is three words of
//! bookkeeping: it borrows items from the [`Arena`], never owns or frees
//! them, and splicing an item between queues moves it in O(1) without
//! copying.
//!
//! Invariant: an item is a member of at most one queue at a time, and its
//! `next` link is `NULL_INDEX` exactly when it is not enqueued (the tail's
//! link is also null while enqueued; `push` guards that case with a tail
//! identity check). Violations panic - a corrupted linked structure cannot
//! be safely continued from.

use std::marker::PhantomData;

use crate::arena::{Arena, ArenaIndex, NULL_INDEX};

/// A FIFO queue of arena-resident items.
#[derive(Debug)]
pub struct LinkedQueue<T> {
    /// Index of the oldest item (next to pop)
    head: ArenaIndex,
    /// Index of the newest item
    tail: ArenaIndex,
    /// Number of items in the queue
    count: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LinkedQueue<T> {
    /// Create a new empty queue.
    #[inline]
    pub const fn new() -> Self {
        Self {
            head: NULL_INDEX,
            tail: NULL_INDEX,
            count: 0,
            _marker: PhantomData,
        }
    }

    /// Number of items in the queue.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.count
    }

    /// Returns true if the queue holds no items.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Index of the head item, or `None` if empty.
    #[inline]
    pub fn front(&self) -> Option<ArenaIndex> {
        if self.head == NULL_INDEX {
            None
        } else {
            Some(self.head)
        }
    }

    /// Append an item at the tail.
    ///
    /// # Panics
    /// Panics if the item is already a member of a queue.
    ///
    /// # Complexity
    /// O(1)
    pub fn push(&mut self, arena: &mut Arena<T>, index: ArenaIndex) {
        assert!(
            arena.next(index) == NULL_INDEX && index != self.tail,
            "item {index} is already queued"
        );

        if self.tail == NULL_INDEX {
            debug_assert!(self.head == NULL_INDEX);
            self.head = index;
        } else {
            arena.set_next(self.tail, index);
        }
        self.tail = index;
        self.count += 1;
    }

    /// Remove and return the head item, clearing its link.
    ///
    /// # Complexity
    /// O(1)
    pub fn pop(&mut self, arena: &mut Arena<T>) -> Option<ArenaIndex> {
        if self.head == NULL_INDEX {
            return None;
        }

        let index = self.head;
        self.head = arena.next(index);
        if self.head == NULL_INDEX {
            self.tail = NULL_INDEX;
        }
        arena.set_next(index, NULL_INDEX);
        self.count -= 1;

        Some(index)
    }

    /// Unlink an arbitrary member, clearing its link.
    ///
    /// Returns without effect if the item is not a member of this queue.
    ///
    /// # Complexity
    /// O(n) - tracks the preceding link while scanning
    pub fn remove(&mut self, arena: &mut Arena<T>, index: ArenaIndex) {
        let mut prev = NULL_INDEX;
        let mut cur = self.head;
        while cur != NULL_INDEX {
            if cur == index {
                self.unlink_after(arena, prev, cur);
                return;
            }
            prev = cur;
            cur = arena.next(cur);
        }
    }

    /// Find the first item satisfying `pred` without removing it.
    pub fn find_if<F>(&self, arena: &Arena<T>, pred: F) -> Option<ArenaIndex>
    where
        F: Fn(&T) -> bool,
    {
        let mut cur = self.head;
        while cur != NULL_INDEX {
            if pred(arena.get(cur)) {
                return Some(cur);
            }
            cur = arena.next(cur);
        }
        None
    }

    /// Splice out and return the first item satisfying `pred`.
    pub fn remove_if<F>(&mut self, arena: &mut Arena<T>, pred: F) -> Option<ArenaIndex>
    where
        F: Fn(&T) -> bool,
    {
        let mut prev = NULL_INDEX;
        let mut cur = self.head;
        while cur != NULL_INDEX {
            if pred(arena.get(cur)) {
                self.unlink_after(arena, prev, cur);
                return Some(cur);
            }
            prev = cur;
            cur = arena.next(cur);
        }
        None
    }

    /// Reset the queue to empty in O(1).
    ///
    /// Member links are NOT touched: items other than the old tail still
    /// carry a non-null `next` and will fail the `push` membership check
    /// until re-linked through pop/remove on a queue that reaches them.
    /// Prefer draining with `pop` unless the members are being discarded.
    #[inline]
    pub fn clear(&mut self) {
        self.head = NULL_INDEX;
        self.tail = NULL_INDEX;
        self.count = 0;
    }

    /// Iterate over member indices from head to tail.
    #[inline]
    pub fn iter<'a>(&self, arena: &'a Arena<T>) -> Iter<'a, T> {
        Iter {
            arena,
            cur: self.head,
        }
    }

    /// Unlink `cur`, whose predecessor is `prev` (`NULL_INDEX` for the head).
    fn unlink_after(&mut self, arena: &mut Arena<T>, prev: ArenaIndex, cur: ArenaIndex) {
        let next = arena.next(cur);
        if prev == NULL_INDEX {
            self.head = next;
        } else {
            arena.set_next(prev, next);
        }
        if self.tail == cur {
            self.tail = prev;
        }
        arena.set_next(cur, NULL_INDEX);
        self.count -= 1;
    }
}

impl<T> Default for LinkedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the member indices of a [`LinkedQueue`].
pub struct Iter<'a, T> {
    arena: &'a Arena<T>,
    cur: ArenaIndex,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = ArenaIndex;

    fn next(&mut self) -> Option<ArenaIndex> {
        if self.cur == NULL_INDEX {
            return None;
        }
        let index = self.cur;
        self.cur = self.arena.next(index);
        Some(index)
    }
}

/// A [`LinkedQueue`] kept in non-decreasing order under a caller-supplied
/// strict-less-than comparator.
///
/// Only `insert` may add items; equal items land after all existing equals,
/// so submission order is preserved among ties (FIFO tie-break). The caller
/// must pass a consistent comparator across all insertions into one queue.
#[derive(Debug, Default)]
pub struct PriorityQueue<T> {
    queue: LinkedQueue<T>,
}

impl<T> PriorityQueue<T> {
    /// Create a new empty priority queue.
    #[inline]
    pub const fn new() -> Self {
        Self {
            queue: LinkedQueue::new(),
        }
    }

    /// Splice an item in front of the first strictly-greater member, or at
    /// the tail if none is found.
    ///
    /// # Panics
    /// Panics if the item is already a member of a queue.
    ///
    /// # Complexity
    /// O(n) positional splice
    pub fn insert<F>(&mut self, arena: &mut Arena<T>, index: ArenaIndex, less: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        assert!(
            arena.next(index) == NULL_INDEX && index != self.queue.tail,
            "item {index} is already queued"
        );

        // Walk past every member not greater than the new item
        let mut prev = NULL_INDEX;
        let mut cur = self.queue.head;
        while cur != NULL_INDEX && !less(arena.get(index), arena.get(cur)) {
            prev = cur;
            cur = arena.next(cur);
        }

        arena.set_next(index, cur);
        if prev == NULL_INDEX {
            self.queue.head = index;
        } else {
            arena.set_next(prev, index);
        }
        if cur == NULL_INDEX {
            self.queue.tail = index;
        }
        self.queue.count += 1;
    }

    /// Remove and return the head (least) item.
    #[inline]
    pub fn pop(&mut self, arena: &mut Arena<T>) -> Option<ArenaIndex> {
        self.queue.pop(arena)
    }

    /// Index of the head (least) item, or `None` if empty.
    #[inline]
    pub fn front(&self) -> Option<ArenaIndex> {
        self.queue.front()
    }

    /// Unlink an arbitrary member; no-op if absent.
    #[inline]
    pub fn remove(&mut self, arena: &mut Arena<T>, index: ArenaIndex) {
        self.queue.remove(arena, index);
    }

    /// Number of items in the queue.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.queue.len()
    }

    /// Returns true if the queue holds no items.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Reset to empty in O(1); see [`LinkedQueue::clear`] for the link caveat.
    #[inline]
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Iterate over member indices in sorted order.
    #[inline]
    pub fn iter<'a>(&self, arena: &'a Arena<T>) -> Iter<'a, T> {
        self.queue.iter(arena)
    }
}
