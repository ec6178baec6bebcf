//! Append-merge sequence: a linked sequence whose nodes live in an index
//! addressed arena.
//!
//! Appends are O(1), and a [`CursorMut`] can remove or insert at its
//! position without moving the rest of the sequence. Removed slots go on a
//! free list and [`AppendSequence::clear`] keeps the arena's capacity, so a
//! sequence reused once per frame stops allocating after warm-up.
//!
//! Not synchronized: confine a sequence to one thread or guard it.

use std::fmt;

#[derive(Debug, Clone)]
struct Node<T> {
    value: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Clone)]
pub struct AppendSequence<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for AppendSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AppendSequence<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots currently allocated in the arena
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|i| self.nodes[i].value.as_ref())
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|i| self.nodes[i].value.as_ref())
    }

    pub fn push_back(&mut self, value: T) {
        let idx = self.alloc(value, self.tail, None);
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    pub fn push_front(&mut self, value: T) {
        let idx = self.alloc(value, None, self.head);
        match self.head {
            Some(head) => self.nodes[head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.head.map(|idx| self.unlink(idx))
    }

    /// Moves every element of `other` to the back of `self`, leaving `other`
    /// empty but with its arena intact.
    pub fn append(&mut self, other: &mut AppendSequence<T>) {
        self.reserve(other.len);
        while let Some(value) = other.pop_front() {
            self.push_back(value);
        }
    }

    /// Makes room for `additional` more elements without reallocating,
    /// counting free-listed slots first
    pub fn reserve(&mut self, additional: usize) {
        self.nodes.reserve(additional.saturating_sub(self.free.len()));
    }

    /// Drops all elements, keeping the arena allocation
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            seq: self,
            next: self.head,
            remaining: self.len,
        }
    }

    /// Cursor positioned before the first element
    pub fn cursor_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut {
            seq: self,
            current: None,
        }
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    fn alloc(&mut self, value: T, prev: Option<usize>, next: Option<usize>) -> usize {
        self.len += 1;
        let node = Node {
            value: Some(value),
            prev,
            next,
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn unlink(&mut self, idx: usize) -> T {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
        self.free.push(idx);
        let node = &mut self.nodes[idx];
        node.prev = None;
        node.next = None;
        match node.value.take() {
            Some(value) => value,
            None => unreachable!("linked node {} has no value", idx),
        }
    }

    fn insert_between(&mut self, value: T, prev: Option<usize>, next: Option<usize>) -> usize {
        let idx = self.alloc(value, prev, next);
        match prev {
            Some(p) => self.nodes[p].next = Some(idx),
            None => self.head = Some(idx),
        }
        match next {
            Some(n) => self.nodes[n].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        idx
    }
}

impl<T: fmt::Debug> fmt::Debug for AppendSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for AppendSequence<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T> Extend<T> for AppendSequence<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> FromIterator<T> for AppendSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut seq = AppendSequence::new();
        seq.extend(iter);
        seq
    }
}

pub struct Iter<'a, T> {
    seq: &'a AppendSequence<T>,
    next: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let idx = self.next?;
        let node = &self.seq.nodes[idx];
        self.next = node.next;
        self.remaining -= 1;
        node.value.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a AppendSequence<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

pub struct IntoIter<T>(AppendSequence<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.0.len, Some(self.0.len))
    }
}

impl<T> IntoIterator for AppendSequence<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter(self)
    }
}

/// Forward cursor that can edit the sequence at its position.
///
/// The cursor either points at an element or sits on the "ghost" position
/// that joins the back of the sequence to its front. It starts on the ghost.
pub struct CursorMut<'a, T> {
    seq: &'a mut AppendSequence<T>,
    current: Option<usize>,
}

impl<T> CursorMut<'_, T> {
    /// Advances to the next element, or from the last element to the ghost.
    /// From the ghost it moves to the first element.
    pub fn move_next(&mut self) -> Option<&mut T> {
        self.current = match self.current {
            Some(idx) => self.seq.nodes[idx].next,
            None => self.seq.head,
        };
        self.current()
    }

    pub fn current(&mut self) -> Option<&mut T> {
        let idx = self.current?;
        self.seq.nodes[idx].value.as_mut()
    }

    pub fn peek_next(&self) -> Option<&T> {
        let next = match self.current {
            Some(idx) => self.seq.nodes[idx].next,
            None => self.seq.head,
        };
        next.and_then(|idx| self.seq.nodes[idx].value.as_ref())
    }

    /// Removes the current element and moves onto the one after it
    pub fn remove_current(&mut self) -> Option<T> {
        let idx = self.current?;
        self.current = self.seq.nodes[idx].next;
        Some(self.seq.unlink(idx))
    }

    /// Inserts in front of the current element; on the ghost this appends
    pub fn insert_before(&mut self, value: T) {
        let (prev, next) = match self.current {
            Some(idx) => (self.seq.nodes[idx].prev, Some(idx)),
            None => (self.seq.tail, None),
        };
        self.seq.insert_between(value, prev, next);
    }

    /// Inserts behind the current element; on the ghost this prepends
    pub fn insert_after(&mut self, value: T) {
        let (prev, next) = match self.current {
            Some(idx) => (Some(idx), self.seq.nodes[idx].next),
            None => (None, self.seq.head),
        };
        self.seq.insert_between(value, prev, next);
    }
}
