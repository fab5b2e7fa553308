//! LSML ("Listed Sections Markup Language") is a line-oriented, flat
//! configuration format: named sections that are either key/value tables or
//! comma-separated arrays of rows.
//!
//! This crate is the core engine: a single-pass streaming parser that
//! recovers from every malformed line, an arena-backed document model whose
//! strings are interned once and never move, and exact value interpreters
//! for numbers, booleans, and section references.
//!
//! # Quick start
//!
//! A [`Document`] borrows a fixed-capacity [`Arena`]; parsing fills it in.
//!
//! ```
//! # fn main() -> Result<(), lsml::Error> {
//! let arena = lsml::Arena::with_capacity(16 * 1024);
//! let mut doc = lsml::Document::new(&arena)?;
//! lsml::parse_str(
//!     &mut doc,
//!     "{server}\nhost = example.com\nport = 8080\n\n[limits]\n10, 20, 30\n",
//!     lsml::ParseOptions::new(),
//! )?;
//!
//! let server = doc.table(b"server")?;
//! assert_eq!(server.table_get(b"host")?, "example.com");
//!
//! let limits = doc.array(b"limits")?;
//! assert_eq!(limits.array_get(2)?, "30");
//! # Ok(())
//! # }
//! ```
//!
//! # Parse resilience
//!
//! A malformed line never aborts the parse. Each error is delivered to the
//! logger callback with its line number and the line is discarded with
//! defined recovery semantics; the rest of the document parses normally.
//!
//! ```
//! # fn main() -> Result<(), lsml::Error> {
//! # use std::ops::ControlFlow;
//! let arena = lsml::Arena::with_capacity(16 * 1024);
//! let mut doc = lsml::Document::new(&arena)?;
//! let mut errors = Vec::new();
//! let mut logger = |err: lsml::Error, line: u32| {
//!     errors.push((err, line));
//!     ControlFlow::Continue(())
//! };
//! lsml::parse_str(
//!     &mut doc,
//!     "{t}\nbroken line\nkey = value\n",
//!     lsml::ParseOptions::new().with_logger(&mut logger),
//! )?;
//! assert_eq!(errors, vec![(lsml::Error::TableEntryMissingEquals, 2)]);
//! assert_eq!(doc.table(b"t")?.table_get(b"key")?, "value");
//! # Ok(())
//! # }
//! ```
//!
//! # Values
//!
//! Stored values are uninterpreted byte strings; the [`value`] module turns
//! them into typed scalars on demand, with base prefixes (`0x`/`0o`/`0b`),
//! a float fallback for forms like `1e3`, and clamping on range overflow.
//!
//! ```
//! use lsml::value::{to_i32, Parsed};
//!
//! assert_eq!(to_i32(b"1e3"), Ok(Parsed::Exact(1000)));
//! assert_eq!(to_i32(b"-0x80"), Ok(Parsed::Exact(-128)));
//! assert_eq!(to_i32(b"1.5"), Ok(Parsed::Clamped(1)));
//! ```

mod arena;
mod chunk;
mod document;
mod error;
mod map;
mod parser;
mod reader;
mod section;
mod str;
pub mod value;
mod writer;

pub use arena::Arena;
pub use document::Document;
pub use error::Error;
pub use parser::{parse, parse_str, sections_match, ParseOptions};
pub use reader::{ByteReader, IoReader, SliceReader};
pub use section::{ArrayCells, ArrayValues, Section, SectionKind, Sections, TableEntries};
pub use str::Str;
pub use value::{Parsed, Reference};
pub use writer::{
    write_document, write_section, ByteWriter, IoWriter, SliceWriter,
};

#[cfg(feature = "serde")]
pub mod impl_serde;
