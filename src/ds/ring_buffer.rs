#![allow(clippy::len_without_is_empty)]
use std::{mem, ops::Index};

/// A fixed-capacity ringbuffer that overwrites its oldest element once full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    ix: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// **Panics** if `capacity` is 0
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be nonzero");
        Self {
            buffer: Vec::<T>::with_capacity(capacity),
            ix: 0,
            capacity,
        }
    }

    /// Returns the buffer length
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Insert an element into the buffer, returning the element it overwrote if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let ix = self.ix;
        self.ix = (ix + 1) % self.capacity;
        if ix >= self.len() {
            self.buffer.push(item);
            None
        } else {
            Some(mem::replace(&mut self.buffer[ix], item))
        }
    }

    /// Get a slice view of the internal buffer, in storage order
    pub fn view(&self) -> &[T] {
        &self.buffer
    }
}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.buffer[index]
    }
}
