#![allow(unsafe_code)]

use crate::arena::{Arena, TempStr};
use crate::error::Error;
use crate::map::{hash_bytes, ChunkedMap};
use crate::section::{
    ArrayBody, RowIndex, Section, SectionBody, SectionKind, Sections, TableBody,
};
use crate::str::{Str, StrHeader};
use crate::value;
use std::ptr::{self, NonNull};

/// An in-memory LSML document: a section store and a string-intern table,
/// both allocated out of one user-sized [`Arena`].
///
/// Everything the document hands out — [`Str`] values, [`Section`] handles,
/// iterators — stays valid until the arena itself is reset, which the borrow
/// checker only permits once the document and every handle are gone.
/// Sections and entries are append-only; there is no removal short of
/// resetting the arena.
pub struct Document<'a> {
    arena: &'a Arena,
    sections: ChunkedMap<'a, SectionBody<'a>>,
    strings: ChunkedMap<'a, ()>,
}

impl<'a> Document<'a> {
    /// Creates an empty document backed by `arena`.
    ///
    /// Allocates the initial bucket chunks for the section and string maps;
    /// fails with `OutOfMemory` if the arena cannot hold even those.
    pub fn new(arena: &'a Arena) -> Result<Self, Error> {
        Ok(Document {
            arena,
            sections: ChunkedMap::new_in(arena)?,
            strings: ChunkedMap::new_in(arena)?,
        })
    }

    #[inline]
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// Bytes of arena memory this document has consumed.
    #[inline]
    pub fn mem_usage(&self) -> usize {
        self.arena.used()
    }

    #[inline]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Looks a section up by name, regardless of kind.
    pub fn section(&self, name: &[u8]) -> Result<Section<'a>, Error> {
        if name.is_empty() {
            return Err(Error::InvalidKey);
        }
        match self.sections.get(hash_bytes(name), name) {
            Some(node) => Ok(Section::from_node(node)),
            None => Err(Error::NotFound),
        }
    }

    /// Looks up a section and requires it to be a table.
    pub fn table(&self, name: &[u8]) -> Result<Section<'a>, Error> {
        let section = self.section(name)?;
        match section.kind() {
            SectionKind::Table => Ok(section),
            SectionKind::Array => Err(Error::SectionType),
        }
    }

    /// Looks up a section and requires it to be an array.
    pub fn array(&self, name: &[u8]) -> Result<Section<'a>, Error> {
        let section = self.section(name)?;
        match section.kind() {
            SectionKind::Array => Ok(section),
            SectionKind::Table => Err(Error::SectionType),
        }
    }

    /// Iterates all sections. Bucket walk; no defined order.
    pub fn sections(&self) -> Sections<'a> {
        Sections {
            inner: self.sections.iter(),
        }
    }

    /// Creates a new, empty section.
    pub fn add_section(&mut self, kind: SectionKind, name: &[u8]) -> Result<Section<'a>, Error> {
        if name.is_empty() {
            return Err(Error::InvalidKey);
        }
        let name = self.intern(name)?;
        self.add_section_interned(name, kind)
    }

    /// Interprets `value` as a section reference and resolves the referent,
    /// requiring its kind to match the reference prefix.
    pub fn resolve_ref(&self, value: &[u8]) -> Result<Section<'a>, Error> {
        let reference = value::to_ref(value)?;
        if reference.name.is_empty() {
            return Err(Error::NotFound);
        }
        let section = self.section(reference.name)?;
        if section.kind() != reference.kind {
            return Err(Error::SectionType);
        }
        Ok(section)
    }

    /// Adds a key/value entry to a table section.
    pub fn table_add(
        &mut self,
        section: Section<'a>,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), Error> {
        self.check_owned(section)?;
        if section.kind() != SectionKind::Table {
            return Err(Error::SectionType);
        }
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        let key = self.intern(key)?;
        if section.table_get_interned(key).is_some() {
            return Err(Error::TableKeyReused);
        }
        let value = self.intern(value)?;
        self.table_insert(section, key, value)
    }

    /// Appends a value to an array section, optionally starting a new row.
    pub fn array_push(
        &mut self,
        section: Section<'a>,
        value: &[u8],
        new_row: bool,
    ) -> Result<(), Error> {
        self.check_owned(section)?;
        if section.kind() != SectionKind::Array {
            return Err(Error::SectionType);
        }
        let value = self.intern(value)?;
        self.array_push_interned(section, value, new_row)
    }

    fn check_owned(&self, section: Section<'a>) -> Result<(), Error> {
        if self.arena.owns(section.node_ptr()) {
            Ok(())
        } else {
            Err(Error::InvalidSection)
        }
    }

    /// Creates a section for an already-interned name. The caller-facing
    /// duplicate report is `SectionNameReused`.
    pub(crate) fn add_section_interned(
        &mut self,
        name: Str<'a>,
        kind: SectionKind,
    ) -> Result<Section<'a>, Error> {
        let arena = self.arena;
        self.sections.rehash_if_needed(arena)?;
        if self.sections.get_interned(name).is_some() {
            return Err(Error::SectionNameReused);
        }
        let body = match kind {
            SectionKind::Table => SectionBody::Table(TableBody {
                entries: ChunkedMap::empty(),
            }),
            SectionKind::Array => {
                let head = arena.alloc_value(RowIndex {
                    next: None,
                    index: 0,
                })?;
                SectionBody::Array(ArrayBody {
                    elems: crate::chunk::ChunkList::new(),
                    len: 0,
                    rows_head: head,
                    rows_tail: head,
                })
            }
        };
        let node = self.sections.insert_new(arena, name, body)?;
        Ok(Section::from_node(node))
    }

    /// Inserts a table entry whose key/value are already interned and whose
    /// key is known absent.
    pub(crate) fn table_insert(
        &mut self,
        section: Section<'a>,
        key: Str<'a>,
        value: Str<'a>,
    ) -> Result<(), Error> {
        let arena = self.arena;
        // Safety: &mut self gives exclusive access to the document's nodes;
        // the borrow ends inside this call.
        let SectionBody::Table(table) = (unsafe { section.body_mut() }) else {
            return Err(Error::SectionType);
        };
        table.entries.rehash_if_needed(arena)?;
        table.entries.insert_new(arena, key, value)?;
        Ok(())
    }

    /// Pushes an already-interned value onto an array section.
    pub(crate) fn array_push_interned(
        &mut self,
        section: Section<'a>,
        value: Str<'a>,
        new_row: bool,
    ) -> Result<(), Error> {
        let arena = self.arena;
        // Safety: as in table_insert.
        let SectionBody::Array(array) = (unsafe { section.body_mut() }) else {
            return Err(Error::SectionType);
        };
        array.push(arena, value, new_row)
    }

    /// Interns a byte string, copying it into the arena with a null
    /// terminator unless an equal string already exists.
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> Result<Str<'a>, Error> {
        let hash = hash_bytes(bytes);
        if let Some(node) = self.strings.get(hash, bytes) {
            // Safety: nodes are arena-resident for 'a.
            return Ok(unsafe { node.as_ref() }.key);
        }
        let arena = self.arena;
        let rollback = arena.cursor();
        let copied = arena.alloc(bytes.len() + 1, 1)?;
        // Safety: the allocation holds len + 1 bytes.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), copied.as_ptr(), bytes.len());
            copied.as_ptr().add(bytes.len()).write(0);
        }
        match self.register(copied, bytes.len(), hash) {
            Ok(interned) => {
                self.strings.rehash_if_needed(arena)?;
                Ok(interned)
            }
            Err(err) => {
                // Nothing was linked; abandon the partial copy.
                arena.set_cursor(rollback);
                Err(err)
            }
        }
    }

    /// Interns a temporary string already materialized at the arena tail.
    /// A duplicate (or a failed registration) is discarded by rolling the
    /// cursor back to the string's start.
    pub(crate) fn intern_temp(&mut self, temp: &TempStr) -> Result<Str<'a>, Error> {
        // Safety: the parser calls this right after commit, before any other
        // allocation.
        let bytes = unsafe { temp.as_bytes() };
        let hash = hash_bytes(bytes);
        if let Some(node) = self.strings.get(hash, bytes) {
            // Safety: nodes are arena-resident for 'a.
            let existing = unsafe { node.as_ref() }.key;
            self.arena.set_cursor(temp.start);
            return Ok(existing);
        }
        match self.register(temp.ptr, temp.len, hash) {
            Ok(interned) => {
                self.strings.rehash_if_needed(self.arena)?;
                Ok(interned)
            }
            Err(err) => {
                self.arena.set_cursor(temp.start);
                Err(err)
            }
        }
    }

    /// Discards an uninterned temporary string.
    pub(crate) fn discard_temp(&mut self, temp: &TempStr) {
        self.arena.set_cursor(temp.start);
    }

    /// Creates the header and intern-table node for arena-resident,
    /// null-terminated bytes. On `Err` nothing has been linked, so the
    /// caller may roll the cursor back past this call's allocations. The
    /// callers rehash the string table right after a successful return, once
    /// no cursor rollback can still happen.
    fn register(&mut self, bytes: NonNull<u8>, len: usize, hash: u32) -> Result<Str<'a>, Error> {
        let arena = self.arena;
        let header = arena.alloc_value(StrHeader::new(bytes, len, hash))?;
        let interned = Str::from_header(header);
        self.strings.insert_new(arena, interned, ())?;
        Ok(interned)
    }
}

impl std::fmt::Debug for Document<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("sections", &self.section_count())
            .field("mem_usage", &self.mem_usage())
            .finish()
    }
}

#[cfg(test)]
#[path = "./document_tests.rs"]
mod tests;
