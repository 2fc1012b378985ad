// In: src/chunk_pipeline/reorder.rs

//! Holding area for chunks that finished ahead of the writer's cursor.
//! Single-threaded by contract: only the writer stage touches it.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Anything carrying the splitter-assigned sequence number.
pub trait Indexed {
    fn index(&self) -> u64;
}

struct Entry<T>(T);

impl<T: Indexed> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.index() == other.0.index()
    }
}

impl<T: Indexed> Eq for Entry<T> {}

impl<T: Indexed> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Indexed> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.index().cmp(&other.0.index())
    }
}

/// Min-ordered buffer keyed by `Indexed::index`.
pub struct ReorderBuffer<T: Indexed> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
}

impl<T: Indexed> ReorderBuffer<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn add(&mut self, item: T) {
        self.heap.push(Reverse(Entry(item)));
    }

    /// The entry with the smallest index, if any.
    pub fn peek_min(&self) -> Option<&T> {
        self.heap.peek().map(|Reverse(Entry(item))| item)
    }

    /// Removes and returns the smallest entry. `None` (and no change) when empty.
    pub fn pop_min(&mut self) -> Option<T> {
        self.heap.pop().map(|Reverse(Entry(item))| item)
    }

    /// Pops the minimum only if its index equals `index`.
    pub fn pop_if_index(&mut self, index: u64) -> Option<T> {
        match self.peek_min() {
            Some(item) if item.index() == index => self.pop_min(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T: Indexed> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
