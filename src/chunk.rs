#![allow(unsafe_code)]

use crate::arena::Arena;
use crate::error::Error;
use std::ptr::NonNull;

/// Elements per chunk. A power of two, so `index % CHUNK_LEN` and the
/// hashmap's bucket modulo both reduce to a mask.
pub(crate) const CHUNK_LEN: usize = 64;

const _: () = assert!(CHUNK_LEN.is_power_of_two());

/// One fixed-size block in a singly linked chunk chain.
#[repr(C)]
pub(crate) struct Chunk<T> {
    pub next: Option<NonNull<Chunk<T>>>,
    pub elems: [T; CHUNK_LEN],
}

/// A singly linked list of [`Chunk`]s, the storage substrate for both
/// hashmap bucket arrays and array-section elements.
///
/// Chunks are arena-allocated and never move; growing the list appends new
/// chunks at the tail, so every element address stays stable for the life of
/// the document.
pub(crate) struct ChunkList<T> {
    head: Option<NonNull<Chunk<T>>>,
    tail: Option<NonNull<Chunk<T>>>,
    chunks: usize,
}

impl<T: Copy> ChunkList<T> {
    pub const fn new() -> Self {
        ChunkList {
            head: None,
            tail: None,
            chunks: 0,
        }
    }

    #[inline]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunks * CHUNK_LEN
    }

    #[inline]
    pub fn head(&self) -> Option<NonNull<Chunk<T>>> {
        self.head
    }

    fn chunk_at(&self, mut n: usize) -> Option<NonNull<Chunk<T>>> {
        let mut cur = self.head?;
        while n > 0 {
            // Safety: chunk pointers are arena-resident and live as long as
            // the list.
            cur = unsafe { cur.as_ref() }.next?;
            n -= 1;
        }
        Some(cur)
    }

    /// Reads the element at `index`, walking `index / CHUNK_LEN` chunks.
    /// Returns `None` past the current capacity.
    pub fn get(&self, index: usize) -> Option<T> {
        let chunk = self.chunk_at(index / CHUNK_LEN)?;
        // Safety: the chunk pointer is valid and the slot index is masked
        // into range.
        Some(unsafe { chunk.as_ref().elems[index % CHUNK_LEN] })
    }

    /// Overwrites the element at `index`, which must be within capacity.
    pub fn set(&mut self, index: usize, value: T) {
        let chunk = self
            .chunk_at(index / CHUNK_LEN)
            .expect("chunk index within capacity");
        // Safety: the chunk is arena-resident and exclusively reachable
        // through this list.
        unsafe { (*chunk.as_ptr()).elems[index % CHUNK_LEN] = value };
    }

    /// Appends one chunk with every slot set to `fill`.
    pub fn push_chunk(&mut self, arena: &Arena, fill: T) -> Result<(), Error> {
        let chunk = arena.alloc_value(Chunk {
            next: None,
            elems: [fill; CHUNK_LEN],
        })?;
        match self.tail {
            // Safety: tail is a live arena chunk owned by this list.
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(chunk) },
            None => self.head = Some(chunk),
        }
        self.tail = Some(chunk);
        self.chunks += 1;
        Ok(())
    }

    /// Doubles the chunk count in one step.
    ///
    /// The new chunks are linked to each other first and attached to the
    /// existing tail only once every allocation has succeeded, so a failure
    /// mid-grow rolls the arena cursor back and leaves the list exactly as
    /// it was.
    pub fn grow_double(&mut self, arena: &Arena) -> Result<(), Error>
    where
        T: Default,
    {
        if self.chunks == 0 {
            return Ok(());
        }
        let rollback = arena.cursor();
        let mut first: Option<NonNull<Chunk<T>>> = None;
        let mut last: Option<NonNull<Chunk<T>>> = None;
        for _ in 0..self.chunks {
            let chunk = match arena.alloc_value(Chunk {
                next: None,
                elems: [T::default(); CHUNK_LEN],
            }) {
                Ok(chunk) => chunk,
                Err(err) => {
                    arena.set_cursor(rollback);
                    return Err(err);
                }
            };
            match last {
                // Safety: prev was allocated just above and is unshared.
                Some(prev) => unsafe { (*prev.as_ptr()).next = Some(chunk) },
                None => first = Some(chunk),
            }
            last = Some(chunk);
        }
        let tail = self.tail.expect("non-empty list has a tail");
        // Safety: tail is a live arena chunk owned by this list.
        unsafe { (*tail.as_ptr()).next = first };
        self.tail = last;
        self.chunks *= 2;
        Ok(())
    }

    /// Iterates every slot in chunk order. The list does not track a length;
    /// callers bound the walk themselves (e.g. with `take`).
    pub fn iter(&self) -> SlotIter<'_, T> {
        SlotIter {
            chunk: self.head,
            slot: 0,
            _list: std::marker::PhantomData,
        }
    }
}

pub(crate) struct SlotIter<'l, T> {
    chunk: Option<NonNull<Chunk<T>>>,
    slot: usize,
    _list: std::marker::PhantomData<&'l ChunkList<T>>,
}

impl<T> SlotIter<'_, T> {
    pub(crate) fn empty() -> Self {
        SlotIter {
            chunk: None,
            slot: 0,
            _list: std::marker::PhantomData,
        }
    }
}

impl<T: Copy> Iterator for SlotIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let chunk = self.chunk?;
        // Safety: chunk is a live arena chunk borrowed from the list.
        let value = unsafe { chunk.as_ref().elems[self.slot] };
        self.slot += 1;
        if self.slot == CHUNK_LEN {
            self.chunk = unsafe { chunk.as_ref().next };
            self.slot = 0;
        }
        Some(value)
    }
}

#[cfg(test)]
#[path = "./chunk_tests.rs"]
mod tests;
