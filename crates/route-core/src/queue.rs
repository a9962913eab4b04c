//! Min-priority queue with stable ordering among equal priorities.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug)]
struct Entry<T> {
    priority: FloatOrd,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Lowest priority dequeues first; ties leave in insertion order.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    next_seq: u64,
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, item: T, priority: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            priority: FloatOrd(priority),
            seq,
            item,
        }));
    }

    pub fn dequeue(&mut self) -> Option<T> {
        self.heap.pop().map(|Reverse(entry)| entry.item)
    }

    /// Like [`dequeue`](Self::dequeue), also returning the priority.
    pub fn dequeue_with_priority(&mut self) -> Option<(T, f64)> {
        self.heap
            .pop()
            .map(|Reverse(entry)| (entry.item, entry.priority.0))
    }

    pub fn peek_priority(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(entry)| entry.priority.0)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_priority_first() {
        let mut queue = PriorityQueue::new();
        queue.enqueue("c", 3.0);
        queue.enqueue("a", 1.0);
        queue.enqueue("b", 2.0);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek_priority(), Some(1.0));
        assert_eq!(queue.dequeue(), Some("a"));
        assert_eq!(queue.dequeue(), Some("b"));
        assert_eq!(queue.dequeue(), Some("c"));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let mut queue = PriorityQueue::new();
        for i in 0..10 {
            queue.enqueue(i, 5.0);
        }
        queue.enqueue(99, 0.5);
        assert_eq!(queue.dequeue(), Some(99));
        let drained: Vec<i32> = std::iter::from_fn(|| queue.dequeue()).collect();
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn infinite_priorities_sort_last() {
        let mut queue = PriorityQueue::new();
        queue.enqueue("never", f64::INFINITY);
        queue.enqueue("soon", 0.0);
        assert_eq!(queue.dequeue_with_priority(), Some(("soon", 0.0)));
        queue.clear();
        assert!(queue.is_empty());
    }
}
