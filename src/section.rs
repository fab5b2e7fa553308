#![allow(unsafe_code)]

use crate::arena::Arena;
use crate::chunk::{ChunkList, SlotIter};
use crate::error::Error;
use crate::map::{ChunkedMap, MapIter, MapNode};
use crate::str::Str;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Discriminates the two section variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Table,
    Array,
}

/// One node in the row-index list of an array section, holding the 1D offset
/// of the first element of its row.
#[repr(C)]
pub(crate) struct RowIndex {
    pub next: Option<NonNull<RowIndex>>,
    pub index: usize,
}

pub(crate) struct TableBody<'a> {
    pub entries: ChunkedMap<'a, Str<'a>>,
}

pub(crate) struct ArrayBody<'a> {
    pub elems: ChunkList<Option<Str<'a>>>,
    pub len: usize,
    /// Head of the row-index list. Always present; the first row implicitly
    /// starts at offset 0.
    pub rows_head: NonNull<RowIndex>,
    pub rows_tail: NonNull<RowIndex>,
}

pub(crate) enum SectionBody<'a> {
    Table(TableBody<'a>),
    Array(ArrayBody<'a>),
}

pub(crate) type SectionNode<'a> = MapNode<'a, SectionBody<'a>>;

impl<'a> ArrayBody<'a> {
    pub fn push(&mut self, arena: &Arena, value: Str<'a>, new_row: bool) -> Result<(), Error> {
        if self.len >= self.elems.capacity() {
            self.elems.push_chunk(arena, None)?;
        }
        self.elems.set(self.len, Some(value));
        if new_row && self.len > 0 {
            let node = arena.alloc_value(RowIndex {
                next: None,
                index: self.len,
            })?;
            // Safety: rows_tail is a live arena node owned by this body.
            unsafe { (*self.rows_tail.as_ptr()).next = Some(node) };
            self.rows_tail = node;
        }
        self.len += 1;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<Str<'a>> {
        if index >= self.len {
            return None;
        }
        self.elems.get(index).flatten()
    }

    pub fn get_2d(&self, row: usize, col: usize) -> Option<Str<'a>> {
        let mut node = self.rows_head;
        for _ in 0..row {
            // Safety: row nodes are arena-resident for 'a.
            node = unsafe { node.as_ref() }.next?;
        }
        let start = unsafe { node.as_ref() }.index;
        let abs = start.checked_add(col)?;
        if let Some(next) = unsafe { node.as_ref() }.next {
            if abs >= unsafe { next.as_ref() }.index {
                return None;
            }
        }
        self.get(abs)
    }

    /// Rows and columns of the 2D view. Columns report the widest row when
    /// `jagged`, the narrowest otherwise. Walks the whole row list.
    pub fn size_2d(&self, jagged: bool) -> (usize, usize) {
        let mut rows = 0;
        let mut cols = if jagged { 0 } else { self.len };
        let mut node = Some(self.rows_head);
        while let Some(cur) = node {
            // Safety: row nodes are arena-resident for 'a.
            let cur = unsafe { cur.as_ref() };
            let width = match cur.next {
                Some(next) => unsafe { next.as_ref() }.index - cur.index,
                None => self.len - cur.index,
            };
            rows += 1;
            cols = if jagged {
                cols.max(width)
            } else {
                cols.min(width)
            };
            node = cur.next;
        }
        (rows, cols)
    }
}

/// A handle to one named section of a [`Document`](crate::Document).
///
/// `Section` is `Copy` and remains valid as long as the arena the document
/// borrows. Lookups never require the document; mutation goes through the
/// document so it can verify ownership and allocate.
#[derive(Copy, Clone)]
pub struct Section<'a> {
    node: NonNull<SectionNode<'a>>,
    _marker: PhantomData<&'a ()>,
}

impl<'a> Section<'a> {
    #[inline]
    pub(crate) fn from_node(node: NonNull<SectionNode<'a>>) -> Self {
        Section {
            node,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn node_ptr(&self) -> *const u8 {
        self.node.as_ptr().cast()
    }

    #[inline]
    fn body(&self) -> &'a SectionBody<'a> {
        // Safety: the node is arena-resident for 'a; shared access only.
        unsafe { &(*self.node.as_ptr()).payload }
    }

    /// Exclusive access to the body, for the owning document's mutation
    /// paths.
    ///
    /// # Safety
    ///
    /// The caller must hold exclusive access to the owning document and drop
    /// the returned borrow before any other access to this section.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn body_mut(&self) -> &'a mut SectionBody<'a> {
        unsafe { &mut (*self.node.as_ptr()).payload }
    }

    /// The section's interned name.
    #[inline]
    pub fn name(&self) -> Str<'a> {
        // Safety: the node is arena-resident for 'a.
        unsafe { (*self.node.as_ptr()).key }
    }

    #[inline]
    pub fn kind(&self) -> SectionKind {
        match self.body() {
            SectionBody::Table(_) => SectionKind::Table,
            SectionBody::Array(_) => SectionKind::Array,
        }
    }

    /// Number of entries (table) or elements (array).
    pub fn len(&self) -> usize {
        match self.body() {
            SectionBody::Table(table) => table.entries.len(),
            SectionBody::Array(array) => array.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a table value by key bytes.
    pub fn table_get(&self, key: &[u8]) -> Result<Str<'a>, Error> {
        let SectionBody::Table(table) = self.body() else {
            return Err(Error::SectionType);
        };
        match table.entries.get(crate::map::hash_bytes(key), key) {
            // Safety: nodes are arena-resident for 'a.
            Some(node) => Ok(unsafe { node.as_ref() }.payload),
            None => Err(Error::NotFound),
        }
    }

    /// Identity lookup with an already-interned key; used by the parser's
    /// duplicate check.
    pub(crate) fn table_get_interned(&self, key: Str<'a>) -> Option<Str<'a>> {
        match self.body() {
            SectionBody::Table(table) => table
                .entries
                .get_interned(key)
                // Safety: nodes are arena-resident for 'a.
                .map(|node| unsafe { node.as_ref() }.payload),
            SectionBody::Array(_) => None,
        }
    }

    /// Iterates a table's `(key, value)` pairs in bucket order. Empty for
    /// array sections.
    pub fn table_entries(&self) -> TableEntries<'a> {
        match self.body() {
            SectionBody::Table(table) => TableEntries {
                inner: Some(table.entries.iter()),
            },
            SectionBody::Array(_) => TableEntries { inner: None },
        }
    }

    /// Reads an array element by 1D index.
    pub fn array_get(&self, index: usize) -> Result<Str<'a>, Error> {
        let SectionBody::Array(array) = self.body() else {
            return Err(Error::SectionType);
        };
        array.get(index).ok_or(Error::NotFound)
    }

    /// Reads an array element by row and column. Fails with `NotFound` when
    /// the column runs past the end of the row.
    pub fn array_get_2d(&self, row: usize, col: usize) -> Result<Str<'a>, Error> {
        let SectionBody::Array(array) = self.body() else {
            return Err(Error::SectionType);
        };
        array.get_2d(row, col).ok_or(Error::NotFound)
    }

    /// The `(rows, cols)` of the 2D view; see [`ArrayBody::size_2d`] for the
    /// jagged semantics.
    pub fn array_size_2d(&self, jagged: bool) -> Result<(usize, usize), Error> {
        let SectionBody::Array(array) = self.body() else {
            return Err(Error::SectionType);
        };
        Ok(array.size_2d(jagged))
    }

    /// Linear scan for the first element equal to `value`.
    pub fn array_find(&self, value: &[u8]) -> Result<usize, Error> {
        if self.kind() != SectionKind::Array {
            return Err(Error::SectionType);
        }
        self.array_values()
            .position(|elem| elem == value)
            .ok_or(Error::NotFound)
    }

    /// Linear scan returning the `(row, col)` of the first match.
    pub fn array_find_2d(&self, value: &[u8]) -> Result<(usize, usize), Error> {
        if self.kind() != SectionKind::Array {
            return Err(Error::SectionType);
        }
        self.array_cells()
            .find(|(elem, _, _)| *elem == value)
            .map(|(_, row, col)| (row, col))
            .ok_or(Error::NotFound)
    }

    /// Finds the column of the first match within `row`.
    pub fn array_find_in_row(&self, row: usize, value: &[u8]) -> Result<usize, Error> {
        if self.kind() != SectionKind::Array {
            return Err(Error::SectionType);
        }
        self.array_cells()
            .find(|&(elem, r, _)| r == row && elem == value)
            .map(|(_, _, col)| col)
            .ok_or(Error::NotFound)
    }

    /// Finds the row of the first match within `col`.
    pub fn array_find_in_col(&self, col: usize, value: &[u8]) -> Result<usize, Error> {
        if self.kind() != SectionKind::Array {
            return Err(Error::SectionType);
        }
        self.array_cells()
            .find(|&(elem, _, c)| c == col && elem == value)
            .map(|(_, row, _)| row)
            .ok_or(Error::NotFound)
    }

    /// Iterates array elements in push order. Empty for table sections.
    pub fn array_values(&self) -> ArrayValues<'a> {
        match self.body() {
            SectionBody::Array(array) => ArrayValues {
                slots: array.elems.iter(),
                remaining: array.len,
            },
            SectionBody::Table(_) => ArrayValues {
                slots: SlotIter::empty(),
                remaining: 0,
            },
        }
    }

    /// Iterates array elements annotated with their `(row, col)` position.
    /// Empty for table sections.
    pub fn array_cells(&self) -> ArrayCells<'a> {
        let values = self.array_values();
        let next_row = match self.body() {
            // First row starts at 0 implicitly; track the next row start.
            // Safety: row nodes are arena-resident for 'a.
            SectionBody::Array(array) => unsafe { array.rows_head.as_ref() }.next,
            SectionBody::Table(_) => None,
        };
        ArrayCells {
            values,
            abs: 0,
            row: 0,
            col: 0,
            next_row,
        }
    }
}

impl std::fmt::Debug for Section<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("len", &self.len())
            .finish()
    }
}

/// Iterator over a document's sections in bucket order.
pub struct Sections<'a> {
    pub(crate) inner: MapIter<'a, SectionBody<'a>>,
}

impl<'a> Iterator for Sections<'a> {
    type Item = Section<'a>;

    fn next(&mut self) -> Option<Section<'a>> {
        self.inner.next().map(Section::from_node)
    }
}

/// Iterator over a table section's `(key, value)` pairs.
pub struct TableEntries<'a> {
    inner: Option<MapIter<'a, Str<'a>>>,
}

impl<'a> Iterator for TableEntries<'a> {
    type Item = (Str<'a>, Str<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.inner.as_mut()?.next()?;
        // Safety: nodes are arena-resident for 'a.
        let node = unsafe { node.as_ref() };
        Some((node.key, node.payload))
    }
}

/// Iterator over an array section's elements in push order.
pub struct ArrayValues<'a> {
    slots: SlotIter<'a, Option<Str<'a>>>,
    remaining: usize,
}

impl<'a> Iterator for ArrayValues<'a> {
    type Item = Str<'a>;

    fn next(&mut self) -> Option<Str<'a>> {
        if self.remaining == 0 {
            return None;
        }
        // Slots below `len` are always initialized.
        let value = self.slots.next().flatten()?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Iterator over an array section yielding `(value, row, col)`. `col` resets
/// to 0 at every row start and `row` follows the row-index list.
pub struct ArrayCells<'a> {
    values: ArrayValues<'a>,
    abs: usize,
    row: usize,
    col: usize,
    next_row: Option<NonNull<RowIndex>>,
}

impl<'a> Iterator for ArrayCells<'a> {
    type Item = (Str<'a>, usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.next()?;
        if self.abs > 0 {
            // Safety: row nodes are arena-resident for 'a.
            match self.next_row {
                Some(next) if unsafe { next.as_ref() }.index == self.abs => {
                    self.row += 1;
                    self.col = 0;
                    self.next_row = unsafe { next.as_ref() }.next;
                }
                _ => self.col += 1,
            }
        }
        self.abs += 1;
        Some((value, self.row, self.col))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

#[cfg(test)]
#[path = "./section_tests.rs"]
mod tests;
