//! Fixed capacity sliding window over the most recent elements.
//!
//! Once the buffer is full every [`RingBuffer::push`] evicts the oldest
//! element, so the buffer always holds the `capacity` newest insertions in
//! the order they arrived.
//!
//! The buffer does no locking of its own. Shared between threads it has to be
//! wrapped by the caller (e.g. in a `Mutex`) so that pushes never interleave
//! with an iteration.

use std::iter::FusedIterator;

use crate::Error;

/// A circular buffer with FIFO eviction.
///
/// Backed by `capacity` slots allocated once at construction. `head` is the
/// next slot to write and `tail` the oldest occupied one; `head == tail` is
/// either empty or full, which `full` disambiguates.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    full: bool,
}

impl<T> RingBuffer<T> {
    /// Allocates a buffer holding at most `capacity` elements.
    ///
    /// A zero capacity is rejected with [`Error::InvalidArgument`].
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::InvalidArgument("ring buffer capacity must be positive"));
        }

        Ok(Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            full: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else if self.head >= self.tail {
            self.head - self.tail
        } else {
            self.capacity() + self.head - self.tail
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Appends `item` as the newest element.
    ///
    /// When the buffer is already full the oldest element is evicted first and
    /// handed back to the caller. Dropping the returned value releases it.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.full {
            let oldest = self.slots[self.tail].take();
            self.tail = self.advance(self.tail);
            oldest
        } else {
            None
        };

        self.slots[self.head] = Some(item);
        self.head = self.advance(self.head);
        self.full = self.head == self.tail;

        evicted
    }

    /// Removes and returns the oldest element.
    ///
    /// Fails with [`Error::EmptyContainer`] rather than producing a default
    /// value.
    pub fn pop(&mut self) -> Result<T, Error> {
        if self.is_empty() {
            return Err(Error::EmptyContainer);
        }

        let oldest = self.slots[self.tail].take().ok_or(Error::EmptyContainer)?;
        self.full = false;
        self.tail = self.advance(self.tail);

        Ok(oldest)
    }

    /// Drops every element, keeping the allocation.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.full = false;
    }

    /// Element `index` positions after the oldest one.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        self.slots[(self.tail + index) % self.capacity()].as_ref()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|last| self.get(last))
    }

    pub fn newest_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        let last = (self.head + self.capacity() - 1) % self.capacity();
        self.slots[last].as_mut()
    }

    /// Iterates from the oldest to the newest element.
    ///
    /// Every call starts over at the current oldest element.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: self,
            front: 0,
            back: self.len(),
        }
    }

    fn advance(&self, cursor: usize) -> usize {
        (cursor + 1) % self.capacity()
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator returned by [`RingBuffer::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a, T> {
    buffer: &'a RingBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let item = self.buffer.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        self.buffer.get(self.back)
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> FusedIterator for Iter<'a, T> {}
