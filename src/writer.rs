//! Byte sinks and serialization of documents back to LSML text.
//!
//! Output always re-parses to an equivalent document: strings that need no
//! escaping are written in quoted flavor, and anything else goes out as a
//! backtick string, the only flavor whose escapes the parser decodes.
//! Section and table-key order follow the bucket walk and are not defined;
//! array rows and columns are preserved exactly.

use crate::document::Document;
use crate::error::Error;
use crate::section::{Section, SectionKind};
use std::io::Write;

/// A single-byte push sink. A failed write reports [`Error::OutOfMemory`],
/// the incomplete-write condition of this API family.
pub trait ByteWriter {
    fn write_byte(&mut self, byte: u8) -> Result<(), Error>;
}

impl<W: ByteWriter + ?Sized> ByteWriter for &mut W {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        (**self).write_byte(byte)
    }
}

impl ByteWriter for Vec<u8> {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.push(byte);
        Ok(())
    }
}

/// Writes into a fixed byte buffer, failing once it is full.
#[derive(Debug)]
pub struct SliceWriter<'w> {
    buf: &'w mut [u8],
    written: usize,
}

impl<'w> SliceWriter<'w> {
    pub fn new(buf: &'w mut [u8]) -> Self {
        SliceWriter { buf, written: 0 }
    }

    /// The filled prefix of the buffer.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.written]
    }
}

impl ByteWriter for SliceWriter<'_> {
    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        let Some(slot) = self.buf.get_mut(self.written) else {
            return Err(Error::OutOfMemory);
        };
        *slot = byte;
        self.written += 1;
        Ok(())
    }
}

/// Adapts any [`std::io::Write`] into a [`ByteWriter`]. Writes go out a byte
/// at a time; wrap the sink in [`std::io::BufWriter`] for anything but a
/// test.
pub struct IoWriter<W> {
    inner: W,
}

impl<W: Write> IoWriter<W> {
    pub fn new(inner: W) -> Self {
        IoWriter { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteWriter for IoWriter<W> {
    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.inner
            .write_all(&[byte])
            .map_err(|_| Error::OutOfMemory)
    }
}

/// Serializes a whole document. With `ascii`, non-ASCII codepoints are
/// written as `\u`/`\U` escapes.
pub fn write_document<W: ByteWriter>(
    writer: &mut W,
    doc: &Document<'_>,
    ascii: bool,
) -> Result<(), Error> {
    for section in doc.sections() {
        write_section(writer, section, ascii)?;
    }
    Ok(())
}

/// Serializes one section, header and contents.
pub fn write_section<W: ByteWriter>(
    writer: &mut W,
    section: Section<'_>,
    ascii: bool,
) -> Result<(), Error> {
    match section.kind() {
        SectionKind::Table => {
            writer.write_byte(b'{')?;
            write_string(writer, &section.name(), ascii)?;
            writer.write_byte(b'}')?;
            writer.write_byte(b'\n')?;
            for (key, value) in section.table_entries() {
                write_string(writer, &key, ascii)?;
                writer.write_byte(b'=')?;
                write_string(writer, &value, ascii)?;
                writer.write_byte(b'\n')?;
            }
        }
        SectionKind::Array => {
            writer.write_byte(b'[')?;
            write_string(writer, &section.name(), ascii)?;
            writer.write_byte(b']')?;
            for (value, _, col) in section.array_cells() {
                if col == 0 {
                    writer.write_byte(b'\n')?;
                }
                write_string(writer, &value, ascii)?;
                writer.write_byte(b',')?;
            }
            writer.write_byte(b'\n')?;
        }
    }
    Ok(())
}

fn needs_backtick(bytes: &[u8], ascii: bool) -> bool {
    let mut has_double = false;
    let mut has_single = false;
    for &b in bytes {
        match b {
            0x00..=0x1F | 0x7F => return true,
            b'"' => has_double = true,
            b'\'' => has_single = true,
            0x80.. if ascii => return true,
            _ => {}
        }
    }
    has_double && has_single
}

/// Writes one string in the cheapest flavor that re-parses to the same
/// bytes: double quotes, single quotes when the content holds a `"`, and a
/// backtick string with escapes otherwise.
fn write_string<W: ByteWriter>(writer: &mut W, bytes: &[u8], ascii: bool) -> Result<(), Error> {
    if needs_backtick(bytes, ascii) {
        return write_backtick(writer, bytes, ascii);
    }
    let quote = if bytes.contains(&b'"') { b'\'' } else { b'"' };
    writer.write_byte(quote)?;
    for &b in bytes {
        writer.write_byte(b)?;
    }
    writer.write_byte(quote)
}

fn write_backtick<W: ByteWriter>(writer: &mut W, bytes: &[u8], ascii: bool) -> Result<(), Error> {
    writer.write_byte(b'`')?;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            // Named escapes the parser decodes back to the same byte.
            0x07 => write_pair(writer, b'a')?,
            0x08 => write_pair(writer, b'b')?,
            0x09 => write_pair(writer, b't')?,
            0x0A => write_pair(writer, b'n')?,
            0x0C => write_pair(writer, b'f')?,
            0x0D => write_pair(writer, b'r')?,
            0x1B => write_pair(writer, b'e')?,
            b'\\' => write_pair(writer, b'\\')?,
            b'`' => write_pair(writer, b'`')?,
            0x00..=0x1F | 0x7F => write_hex(writer, b)?,
            0x20..=0x7E => writer.write_byte(b)?,
            0x80.. => {
                match decode_utf8(&bytes[i..]) {
                    Some((cp, len)) if ascii => {
                        write_codepoint_escape(writer, cp)?;
                        i += len;
                        continue;
                    }
                    Some((_, len)) => {
                        for &raw in &bytes[i..i + len] {
                            writer.write_byte(raw)?;
                        }
                        i += len;
                        continue;
                    }
                    // Not valid UTF-8; escape the bare byte.
                    None => write_hex(writer, b)?,
                }
            }
        }
        i += 1;
    }
    writer.write_byte(b'`')
}

fn write_pair<W: ByteWriter>(writer: &mut W, letter: u8) -> Result<(), Error> {
    writer.write_byte(b'\\')?;
    writer.write_byte(letter)
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn write_hex<W: ByteWriter>(writer: &mut W, byte: u8) -> Result<(), Error> {
    writer.write_byte(b'\\')?;
    writer.write_byte(b'x')?;
    writer.write_byte(HEX_DIGITS[usize::from(byte >> 4)])?;
    writer.write_byte(HEX_DIGITS[usize::from(byte & 0x0F)])
}

fn write_codepoint_escape<W: ByteWriter>(writer: &mut W, cp: u32) -> Result<(), Error> {
    writer.write_byte(b'\\')?;
    let digits = if cp <= 0xFFFF {
        writer.write_byte(b'u')?;
        4
    } else {
        writer.write_byte(b'U')?;
        8
    };
    for shift in (0..digits).rev() {
        writer.write_byte(HEX_DIGITS[((cp >> (shift * 4)) & 0xF) as usize])?;
    }
    Ok(())
}

/// Decodes one UTF-8 sequence starting at `bytes[0]`, returning the
/// codepoint and its byte length.
fn decode_utf8(bytes: &[u8]) -> Option<(u32, usize)> {
    let len = match bytes[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return None,
    };
    let text = std::str::from_utf8(bytes.get(..len)?).ok()?;
    let cp = text.chars().next()?;
    Some((cp as u32, len))
}

#[cfg(test)]
#[path = "./writer_tests.rs"]
mod tests;
