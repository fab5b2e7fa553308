#![allow(unsafe_code)]

use crate::arena::Arena;
use crate::chunk::{Chunk, ChunkList, CHUNK_LEN};
use crate::error::Error;
use crate::str::Str;
use std::hash::{BuildHasher, Hasher};
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Hashes a byte string to the cached 32-bit value stored with every
/// interned string. Deterministic across runs so bucket layouts are
/// reproducible.
pub(crate) fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hasher = foldhash::fast::FixedState::default().build_hasher();
    hasher.write(bytes);
    hasher.finish() as u32
}

/// Load-factor check, selected at compile time. Exceeding it triggers a
/// doubling rehash before the next insert.
#[inline]
fn over_load_factor(len: usize, capacity: usize) -> bool {
    #[cfg(feature = "load-factor-100")]
    {
        len > capacity
    }
    #[cfg(all(feature = "load-factor-200", not(feature = "load-factor-100")))]
    {
        len / 2 > capacity
    }
    #[cfg(not(any(feature = "load-factor-100", feature = "load-factor-200")))]
    {
        len + len / 4 > capacity
    }
}

/// An entry in a [`ChunkedMap`]: the intrusive chain link and interned key,
/// followed by a caller-chosen payload.
#[repr(C)]
pub(crate) struct MapNode<'a, P> {
    pub next: Option<NonNull<MapNode<'a, P>>>,
    pub key: Str<'a>,
    pub payload: P,
}

/// An open-hashing map whose bucket array is a [`ChunkList`].
///
/// Growing appends bucket chunks instead of reallocating, and the rehash
/// relocates nodes by relinking them, so neither buckets nor nodes ever
/// move. Every pointer to a node stays valid for the life of the arena.
pub(crate) struct ChunkedMap<'a, P> {
    buckets: ChunkList<Option<NonNull<MapNode<'a, P>>>>,
    len: usize,
}

impl<'a, P> ChunkedMap<'a, P> {
    /// A map with no bucket storage; the first insert allocates it.
    pub const fn empty() -> Self {
        ChunkedMap {
            buckets: ChunkList::new(),
            len: 0,
        }
    }

    /// A map with its first bucket chunk allocated eagerly.
    pub fn new_in(arena: &Arena) -> Result<Self, Error> {
        let mut map = Self::empty();
        map.buckets.push_chunk(arena, None)?;
        Ok(map)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Bucket index for `hash`. Capacity is always a power of two (one chunk
    /// doubled n times), so the modulo is a mask.
    #[inline]
    fn bucket_index(&self, hash: u32, capacity: usize) -> usize {
        debug_assert!(capacity.is_power_of_two());
        hash as usize & (capacity - 1)
    }

    /// Looks a key up by `(hash, bytes)` equality.
    pub fn get(&self, hash: u32, bytes: &[u8]) -> Option<NonNull<MapNode<'a, P>>> {
        if self.buckets.chunks() == 0 {
            return None;
        }
        let index = self.bucket_index(hash, self.buckets.capacity());
        let mut cur = self.buckets.get(index).flatten();
        while let Some(node) = cur {
            // Safety: nodes are arena-resident for 'a.
            let node_ref = unsafe { node.as_ref() };
            if node_ref.key.as_bytes() == bytes {
                return Some(node);
            }
            cur = node_ref.next;
        }
        None
    }

    /// Looks an interned key up by pointer identity.
    pub fn get_interned(&self, key: Str<'a>) -> Option<NonNull<MapNode<'a, P>>> {
        if self.buckets.chunks() == 0 {
            return None;
        }
        let index = self.bucket_index(key.hash_value(), self.buckets.capacity());
        let mut cur = self.buckets.get(index).flatten();
        while let Some(node) = cur {
            // Safety: nodes are arena-resident for 'a.
            let node_ref = unsafe { node.as_ref() };
            if node_ref.key.same(key) {
                return Some(node);
            }
            cur = node_ref.next;
        }
        None
    }

    /// Appends a new node for `key`, which the caller has verified absent.
    ///
    /// Does not rehash; callers run [`rehash_if_needed`](Self::rehash_if_needed)
    /// at a point where no temporary string is pending discard. On failure
    /// nothing has been linked, so the caller may roll the arena cursor back
    /// past this call's allocations.
    pub fn insert_new(
        &mut self,
        arena: &Arena,
        key: Str<'a>,
        payload: P,
    ) -> Result<NonNull<MapNode<'a, P>>, Error> {
        if self.buckets.chunks() == 0 {
            self.buckets.push_chunk(arena, None)?;
        }
        let node = arena.alloc_value(MapNode {
            next: None,
            key,
            payload,
        })?;
        let index = self.bucket_index(key.hash_value(), self.buckets.capacity());
        self.append_to_bucket(index, node);
        self.len += 1;
        Ok(node)
    }

    /// Links `node` (whose `next` is `None`) at the tail of a bucket chain.
    fn append_to_bucket(&mut self, index: usize, node: NonNull<MapNode<'a, P>>) {
        match self.buckets.get(index).flatten() {
            None => self.buckets.set(index, Some(node)),
            Some(head) => {
                let mut cur = head;
                // Safety: chain nodes are arena-resident and owned by this map.
                unsafe {
                    while let Some(next) = (*cur.as_ptr()).next {
                        cur = next;
                    }
                    (*cur.as_ptr()).next = Some(node);
                }
            }
        }
    }

    /// Doubles the bucket count once the load factor is exceeded, then
    /// relocates every node whose bucket index changed under the new modulo.
    ///
    /// Only the original chunks are walked: a relocated node's new index is
    /// `old_index + old_capacity`, which always lands in a freshly appended
    /// chunk, and those must not be revisited. Nodes move by unlinking and
    /// relinking; their addresses never change.
    pub fn rehash_if_needed(&mut self, arena: &Arena) -> Result<(), Error> {
        let old_chunks = self.buckets.chunks();
        if old_chunks == 0 {
            return Ok(());
        }
        let old_capacity = old_chunks * CHUNK_LEN;
        if !over_load_factor(self.len, old_capacity) {
            return Ok(());
        }
        self.buckets.grow_double(arena)?;
        let new_capacity = self.buckets.capacity();

        let mut chunk = self.buckets.head();
        for chunk_no in 0..old_chunks {
            let cur_chunk = chunk.expect("original chunk count in sync");
            for slot in 0..CHUNK_LEN {
                let bucket = chunk_no * CHUNK_LEN + slot;
                let mut prev: Option<NonNull<MapNode<'a, P>>> = None;
                // Safety: all chunk and node pointers below are arena-resident
                // and owned by this map; we hold &mut self.
                let mut cur = unsafe { (*cur_chunk.as_ptr()).elems[slot] };
                while let Some(node) = cur {
                    let next = unsafe { (*node.as_ptr()).next };
                    let hash = unsafe { (*node.as_ptr()).key.hash_value() };
                    let new_index = self.bucket_index(hash, new_capacity);
                    if new_index != bucket {
                        match prev {
                            Some(p) => unsafe { (*p.as_ptr()).next = next },
                            None => unsafe { (*cur_chunk.as_ptr()).elems[slot] = next },
                        }
                        unsafe { (*node.as_ptr()).next = None };
                        self.append_to_bucket(new_index, node);
                    } else {
                        prev = cur;
                    }
                    cur = next;
                }
            }
            chunk = unsafe { (*cur_chunk.as_ptr()).next };
        }
        Ok(())
    }

    pub fn iter(&self) -> MapIter<'a, P> {
        MapIter {
            chunk: self.buckets.head(),
            slot: 0,
            node: None,
            started: false,
            _marker: PhantomData,
        }
    }
}

/// Bucket-order walk over a [`ChunkedMap`]. Yields raw node pointers; the
/// public iterators wrap them into typed items. Single pass, valid as long
/// as the arena.
pub(crate) struct MapIter<'a, P> {
    chunk: Option<NonNull<Chunk<Option<NonNull<MapNode<'a, P>>>>>>,
    slot: usize,
    node: Option<NonNull<MapNode<'a, P>>>,
    started: bool,
    _marker: PhantomData<&'a ()>,
}

impl<'a, P> Iterator for MapIter<'a, P> {
    type Item = NonNull<MapNode<'a, P>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = self.chunk?;
        // Safety throughout: chunks and nodes are arena-resident for 'a.
        if !self.started {
            self.started = true;
            self.node = unsafe { chunk.as_ref().elems[0] };
        } else if let Some(node) = self.node {
            self.node = unsafe { node.as_ref().next };
        }
        while self.node.is_none() {
            self.slot += 1;
            if self.slot >= CHUNK_LEN {
                match unsafe { chunk.as_ref().next } {
                    Some(next) => {
                        chunk = next;
                        self.chunk = Some(next);
                        self.slot = 0;
                    }
                    None => {
                        self.chunk = None;
                        return None;
                    }
                }
            }
            self.node = unsafe { chunk.as_ref().elems[self.slot] };
        }
        self.node
    }
}

#[cfg(test)]
#[path = "./map_tests.rs"]
mod tests;
