#![allow(unsafe_code)]

use crate::arena::{Arena, Scratch, TempStr};
use crate::document::Document;
use crate::error::Error;
use crate::reader::{ByteReader, SliceReader};
use crate::section::{Section, SectionKind};
use std::ops::ControlFlow;

/// Options for a single [`parse`] call.
///
/// The callbacks borrow mutably for the duration of the parse:
///
/// * the **filter** sees every section header `(name, kind)` before the
///   section is created; returning `false` skips it silently,
/// * the **logger** receives every recoverable parse error with its line
///   number; returning [`ControlFlow::Break`] aborts the parse with
///   [`Error::ParseAborted`].
#[derive(Default)]
pub struct ParseOptions<'cb> {
    max_sections: usize,
    filter: Option<&'cb mut dyn FnMut(&[u8], SectionKind) -> bool>,
    logger: Option<&'cb mut dyn FnMut(Error, u32) -> ControlFlow<()>>,
}

impl<'cb> ParseOptions<'cb> {
    pub fn new() -> Self {
        ParseOptions {
            max_sections: 0,
            filter: None,
            logger: None,
        }
    }

    /// Stop after this many section headers (counting skipped ones);
    /// 0 means unlimited.
    pub fn with_max_sections(mut self, max_sections: usize) -> Self {
        self.max_sections = max_sections;
        self
    }

    pub fn with_filter(
        mut self,
        filter: &'cb mut dyn FnMut(&[u8], SectionKind) -> bool,
    ) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_logger(
        mut self,
        logger: &'cb mut dyn FnMut(Error, u32) -> ControlFlow<()>,
    ) -> Self {
        self.logger = Some(logger);
        self
    }
}

/// Builds a section filter admitting only sections that exist in `template`
/// with the same kind.
pub fn sections_match<'t>(
    template: &'t Document<'t>,
) -> impl FnMut(&[u8], SectionKind) -> bool + 't {
    move |name, kind| matches!(template.section(name), Ok(section) if section.kind() == kind)
}

/// Parses LSML text from `input` into `doc`. See [`parse`].
pub fn parse_str(
    doc: &mut Document<'_>,
    input: &str,
    options: ParseOptions<'_>,
) -> Result<(), Error> {
    parse(doc, SliceReader::from(input), options)
}

/// Parses the output of `reader` into `doc` until the reader ends.
///
/// Existing sections are kept; newly parsed sections are added. Malformed
/// lines never abort the parse: each is reported through the logger and
/// discarded with per-error recovery semantics, and parsing resumes at the
/// next line. Only [`Error::OutOfMemory`] and [`Error::ParseAborted`] are
/// returned.
pub fn parse<R: ByteReader>(
    doc: &mut Document<'_>,
    reader: R,
    options: ParseOptions<'_>,
) -> Result<(), Error> {
    let mut parser = Parser {
        reader,
        line: 1,
        cur: None,
        next: None,
        logger: options.logger,
    };
    let mut filter = options.filter;
    // Fill the two-byte window: cur = first byte, next = second.
    parser.advance();
    parser.advance();

    let mut section: Option<Section<'_>> = None;
    let mut headers_seen = 0usize;
    while parser.cur.is_some() {
        // Invariant: each iteration starts at column 0 of a logical line.
        parser.skip_whitespace();
        match parser.cur {
            None => break,
            // `{` not followed by `}` (and likewise `[`/`]`) opens a section
            // header; the two-byte forms are section-reference prefixes and
            // fall through to the entry parser.
            Some(c @ (b'{' | b'[')) if parser.next != Some(matching_close(c)) => {
                if options.max_sections != 0 && headers_seen >= options.max_sections {
                    return Ok(());
                }
                headers_seen += 1;
                section = parser.parse_section_header(doc, &mut filter)?;
            }
            Some(b'#') => parser.skip_comment(),
            Some(_) => match section {
                Some(current) => {
                    let outcome = match current.kind() {
                        SectionKind::Table => parser.parse_table_entry(doc, current),
                        SectionKind::Array => parser.parse_array_row(doc, current),
                    };
                    match outcome {
                        Ok(()) => {}
                        Err(fatal @ (Error::OutOfMemory | Error::ParseAborted)) => {
                            return Err(fatal)
                        }
                        Err(recoverable) => parser.log(recoverable)?,
                    }
                }
                // A section skipped over a bad or filtered header swallows
                // its entries silently; only text before any section at all
                // is an error.
                None => {
                    if doc.section_count() == 0 {
                        parser.log(Error::TextOutsideSection)?;
                    }
                }
            },
        }
        // Sub-parsers leave `cur` on the terminating newline, never past it.
        parser.skip_line();
    }
    Ok(())
}

fn matching_close(open: u8) -> u8 {
    if open == b'{' {
        b'}'
    } else {
        b']'
    }
}

#[inline]
fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

fn hex_val(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

enum Flavor {
    /// The string ended before any flavor started (empty or prefix-only).
    End,
    Unquoted,
    Quoted(u8),
    Escaped,
}

struct Parser<'cb, R> {
    reader: R,
    line: u32,
    cur: Option<u8>,
    next: Option<u8>,
    logger: Option<&'cb mut dyn FnMut(Error, u32) -> ControlFlow<()>>,
}

impl<R: ByteReader> Parser<'_, R> {
    /// Slides the two-byte window forward, counting lines as the old `cur`
    /// newline is passed. Returns the new `cur`.
    fn advance(&mut self) -> Option<u8> {
        if self.cur == Some(b'\n') {
            self.line += 1;
        }
        self.cur = self.next;
        self.next = self.reader.next_byte();
        self.cur
    }

    /// Reports a recoverable error through the logger. `Err(ParseAborted)`
    /// if the logger asked to stop.
    fn log(&mut self, error: Error) -> Result<(), Error> {
        if let Some(logger) = self.logger.as_mut() {
            if logger(error, self.line).is_break() {
                return Err(Error::ParseAborted);
            }
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.cur, Some(c) if is_space(c)) {
            self.advance();
        }
    }

    /// Skips spaces and tabs only, staying on the current line.
    fn skip_inline_whitespace(&mut self) {
        while matches!(self.cur, Some(b' ' | b'\t' | b'\r')) {
            self.advance();
        }
    }

    /// Consumes up to the newline, leaving `cur` on it.
    fn skip_comment(&mut self) {
        while !matches!(self.cur, None | Some(b'\n')) {
            self.advance();
        }
    }

    /// Consumes the rest of the line including its newline.
    fn skip_line(&mut self) {
        self.skip_comment();
        if self.cur == Some(b'\n') {
            self.advance();
        }
    }

    /// Parses one string of any flavor into a scratch region at the arena
    /// tail and commits it.
    ///
    /// On success `cur` rests on the string's terminator: the in-context
    /// `end_delim`, the newline, or end of input. With `is_name` an empty
    /// result is rejected with `InvalidKey` (callers translate it to the
    /// in-context error) and nothing is committed.
    ///
    /// The committed string is temporary: the caller must either intern it
    /// or discard it before any other arena allocation.
    fn parse_temp_string(
        &mut self,
        arena: &Arena,
        end_delim: Option<u8>,
        is_name: bool,
    ) -> Result<TempStr, Error> {
        if arena.cursor() >= arena.capacity().saturating_sub(1) {
            return Err(Error::OutOfMemory);
        }
        let mut scratch = arena.scratch();
        let flavor = loop {
            match self.cur {
                None | Some(b'\n') => break Flavor::End,
                Some(c) if end_delim == Some(c) => break Flavor::End,
                // A leading `{}` or `[]` is a section-reference prefix:
                // copied through verbatim, before the flavor is chosen.
                Some(c @ b'{') if scratch.is_empty() && self.next == Some(b'}') => {
                    scratch.push(c)?;
                    scratch.push(b'}')?;
                    self.advance();
                }
                Some(c @ b'[') if scratch.is_empty() && self.next == Some(b']') => {
                    scratch.push(c)?;
                    scratch.push(b']')?;
                    self.advance();
                }
                Some(b'`') => {
                    self.advance();
                    break Flavor::Escaped;
                }
                Some(q @ (b'"' | b'\'')) => {
                    self.advance();
                    break Flavor::Quoted(q);
                }
                Some(c) if !is_space(c) => break Flavor::Unquoted,
                Some(_) => {}
            }
            self.advance();
        };
        match flavor {
            Flavor::End => {}
            Flavor::Unquoted => self.scan_unquoted(&mut scratch, end_delim)?,
            Flavor::Quoted(quote) => self.scan_quoted(&mut scratch, quote, end_delim)?,
            Flavor::Escaped => self.scan_escaped(&mut scratch, end_delim)?,
        }
        if is_name && scratch.is_empty() {
            return Err(Error::InvalidKey);
        }
        Ok(scratch.commit())
    }

    fn scan_unquoted(
        &mut self,
        scratch: &mut Scratch<'_>,
        end_delim: Option<u8>,
    ) -> Result<(), Error> {
        loop {
            match self.cur {
                None | Some(b'\n') => break,
                Some(b'#') => {
                    self.skip_comment();
                    break;
                }
                Some(c) if end_delim == Some(c) => break,
                Some(c) => {
                    scratch.push(c)?;
                    self.advance();
                }
            }
        }
        let bytes = scratch.as_bytes();
        let mut keep = bytes.len();
        while keep > 0 && is_space(bytes[keep - 1]) {
            keep -= 1;
        }
        scratch.truncate(keep);
        Ok(())
    }

    fn scan_quoted(
        &mut self,
        scratch: &mut Scratch<'_>,
        quote: u8,
        end_delim: Option<u8>,
    ) -> Result<(), Error> {
        loop {
            match self.cur {
                // A quote cut off by the line end keeps what was read.
                None | Some(b'\n') => {
                    self.log(Error::MissingEndQuote)?;
                    break;
                }
                Some(c) if c == quote => break,
                Some(c) => {
                    scratch.push(c)?;
                    self.advance();
                }
            }
        }
        if self.cur == Some(quote) {
            self.advance();
        }
        self.trail_to_delim(end_delim)
    }

    /// After a closing quote, consume up to the in-context delimiter,
    /// newline, or comment; non-whitespace on the way is reported once and
    /// discarded.
    fn trail_to_delim(&mut self, end_delim: Option<u8>) -> Result<(), Error> {
        let Some(delim) = end_delim else {
            return Ok(());
        };
        let mut logged = false;
        loop {
            match self.cur {
                None | Some(b'\n') => break,
                Some(c) if c == delim => break,
                Some(b'#') => {
                    self.skip_comment();
                    break;
                }
                Some(c) => {
                    if !logged && !is_space(c) {
                        self.log(Error::TextAfterEndQuote)?;
                        logged = true;
                    }
                    self.advance();
                }
            }
        }
        Ok(())
    }

    fn scan_escaped(
        &mut self,
        scratch: &mut Scratch<'_>,
        end_delim: Option<u8>,
    ) -> Result<(), Error> {
        loop {
            match self.cur {
                None | Some(b'\n') => {
                    self.log(Error::MissingEndQuote)?;
                    break;
                }
                Some(b'`') => break,
                Some(b'\\') => self.scan_escape(scratch)?,
                Some(c) => {
                    scratch.push(c)?;
                    self.advance();
                }
            }
        }
        if self.cur == Some(b'`') {
            self.advance();
        }
        self.trail_to_delim(end_delim)
    }

    /// Decodes one escape sequence. `cur` is the backslash on entry and the
    /// first unprocessed byte on return.
    fn scan_escape(&mut self, scratch: &mut Scratch<'_>) -> Result<(), Error> {
        match self.next {
            Some(b'a') => self.push_escaped(scratch, 0x07)?,
            Some(b'b') => self.push_escaped(scratch, 0x08)?,
            Some(b'e') => self.push_escaped(scratch, 0x1B)?,
            Some(b'f') => self.push_escaped(scratch, 0x0C)?,
            Some(b'n') => self.push_escaped(scratch, 0x0A)?,
            Some(b'r') => self.push_escaped(scratch, 0x0D)?,
            Some(b't') => self.push_escaped(scratch, 0x09)?,
            Some(b'\\') => self.push_escaped(scratch, 0x5C)?,
            Some(b'\'') => self.push_escaped(scratch, 0x27)?,
            Some(b'"') => self.push_escaped(scratch, 0x22)?,
            Some(b'`') => self.push_escaped(scratch, 0x60)?,
            Some(b'?') => self.push_escaped(scratch, 0x3F)?,
            // \ooo — up to three octal digits, clamped to 255.
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                self.advance();
                for _ in 0..2 {
                    match self.next {
                        Some(d @ b'0'..=b'7') => {
                            value = (value << 3) + u32::from(d - b'0');
                            self.advance();
                        }
                        _ => break,
                    }
                }
                scratch.push(value.min(255) as u8)?;
                self.advance();
            }
            // \xH or \xHH — a missing first digit degrades to a literal
            // backslash and the `x` is reprocessed as a plain byte.
            Some(b'x') => {
                self.advance();
                match self.next.and_then(hex_val) {
                    Some(high) => {
                        let mut value = high;
                        self.advance();
                        if let Some(low) = self.next.and_then(hex_val) {
                            value = (value << 4) | low;
                            self.advance();
                        }
                        scratch.push(value)?;
                        self.advance();
                    }
                    None => {
                        scratch.push(b'\\')?;
                        self.log(Error::TextInvalidEscape)?;
                    }
                }
            }
            Some(kind @ (b'u' | b'U')) => self.scan_unicode_escape(scratch, kind)?,
            // Unknown escape: emit the backslash, reprocess the follow-up.
            _ => {
                self.log(Error::TextInvalidEscape)?;
                scratch.push(b'\\')?;
                self.advance();
            }
        }
        Ok(())
    }

    fn push_escaped(&mut self, scratch: &mut Scratch<'_>, byte: u8) -> Result<(), Error> {
        scratch.push(byte)?;
        self.advance();
        self.advance();
        Ok(())
    }

    /// Decodes `\uHHHH` or `\UHHHHHHHH` into UTF-8. A missing digit or a
    /// codepoint above U+10FFFF is reported and the sequence text read so
    /// far is emitted verbatim.
    fn scan_unicode_escape(&mut self, scratch: &mut Scratch<'_>, kind: u8) -> Result<(), Error> {
        let ndigits = if kind == b'U' { 8 } else { 4 };
        let mut raw = [0u8; 10];
        raw[0] = b'\\';
        raw[1] = kind;
        let mut got = 0usize;
        let mut cp: u32 = 0;
        self.advance(); // cur = 'u' | 'U'
        while got < ndigits {
            match self.next.map(|b| (b, hex_val(b))) {
                Some((b, Some(h))) => {
                    cp = (cp << 4) + u32::from(h);
                    raw[2 + got] = b;
                    got += 1;
                    self.advance();
                }
                _ => {
                    self.advance(); // cur = the offending byte, reprocessed by the caller
                    scratch.extend(&raw[..2 + got])?;
                    return self.log(Error::TextInvalidEscape);
                }
            }
        }
        self.advance(); // cur = first byte after the escape
        let encoded = match cp {
            0..=0x7F => {
                raw[0] = cp as u8;
                1
            }
            0x80..=0x7FF => {
                raw[0] = 0xC0 | (cp >> 6) as u8;
                raw[1] = 0x80 | (cp & 0x3F) as u8;
                2
            }
            0x800..=0xFFFF => {
                raw[0] = 0xE0 | (cp >> 12) as u8;
                raw[1] = 0x80 | ((cp >> 6) & 0x3F) as u8;
                raw[2] = 0x80 | (cp & 0x3F) as u8;
                3
            }
            0x1_0000..=0x10_FFFF => {
                raw[0] = 0xF0 | (cp >> 18) as u8;
                raw[1] = 0x80 | ((cp >> 12) & 0x3F) as u8;
                raw[2] = 0x80 | ((cp >> 6) & 0x3F) as u8;
                raw[3] = 0x80 | (cp & 0x3F) as u8;
                4
            }
            _ => {
                self.log(Error::TextInvalidEscape)?;
                scratch.extend(&raw[..2 + ndigits])?;
                return Ok(());
            }
        };
        scratch.extend(&raw[..encoded])?;
        Ok(())
    }

    /// Parses `{name}` / `[name]` and creates the section. `Ok(None)` means
    /// the section was skipped — filtered out, or unusable with the error
    /// already logged — and entries up to the next header are dropped.
    fn parse_section_header<'a>(
        &mut self,
        doc: &mut Document<'a>,
        filter: &mut Option<&mut dyn FnMut(&[u8], SectionKind) -> bool>,
    ) -> Result<Option<Section<'a>>, Error> {
        let (close, kind) = match self.cur {
            Some(b'{') => (b'}', SectionKind::Table),
            _ => (b']', SectionKind::Array),
        };
        self.advance();
        let temp = match self.parse_temp_string(doc.arena(), Some(close), true) {
            Ok(temp) => temp,
            Err(Error::InvalidKey) => {
                self.log(Error::SectionNameEmpty)?;
                return Ok(None);
            }
            Err(fatal) => return Err(fatal),
        };
        if self.cur == Some(close) {
            self.advance();
        } else {
            // Header cut off by the line end: keep the name as read.
            self.log(Error::SectionHeaderUnclosed)?;
        }
        let mut logged = false;
        loop {
            match self.cur {
                None | Some(b'\n') => break,
                Some(b'#') => {
                    self.skip_comment();
                    break;
                }
                Some(c) => {
                    if !logged && !is_space(c) {
                        self.log(Error::TextAfterSectionHeader)?;
                        logged = true;
                    }
                    self.advance();
                }
            }
        }
        if let Some(filter) = filter.as_mut() {
            // Safety: the temp string was just committed; no allocation has
            // happened since.
            let keep = filter(unsafe { temp.as_bytes() }, kind);
            if !keep {
                doc.discard_temp(&temp);
                return Ok(None);
            }
        }
        // Interning before the duplicate check wastes nothing: a duplicate
        // name is already interned, so the temp copy is discarded either way.
        let name = doc.intern_temp(&temp)?;
        match doc.add_section_interned(name, kind) {
            Ok(section) => Ok(Some(section)),
            Err(Error::SectionNameReused) => {
                self.log(Error::SectionNameReused)?;
                Ok(None)
            }
            Err(fatal) => Err(fatal),
        }
    }

    /// Parses `key = value`. A line without `=` and a reused key are logged
    /// and leave no partial entry.
    fn parse_table_entry<'a>(
        &mut self,
        doc: &mut Document<'a>,
        section: Section<'a>,
    ) -> Result<(), Error> {
        let temp_key = self.parse_temp_string(doc.arena(), Some(b'='), false)?;
        if self.cur == Some(b'=') {
            self.advance();
        } else {
            doc.discard_temp(&temp_key);
            self.log(Error::TableEntryMissingEquals)?;
            return Ok(());
        }
        let key = doc.intern_temp(&temp_key)?;
        if section.table_get_interned(key).is_some() {
            // The key stays interned; the value is never parsed.
            self.log(Error::TableKeyReused)?;
            return Ok(());
        }
        // Newline delimiter so trailing text after a quoted value is caught.
        let temp_value = self.parse_temp_string(doc.arena(), Some(b'\n'), false)?;
        let value = doc.intern_temp(&temp_value)?;
        doc.table_insert(section, key, value)
    }

    /// Parses one comma-separated row. The first value starts a new row; a
    /// trailing comma produces no empty element.
    fn parse_array_row<'a>(
        &mut self,
        doc: &mut Document<'a>,
        section: Section<'a>,
    ) -> Result<(), Error> {
        let mut new_row = true;
        while !matches!(self.cur, None | Some(b'\n') | Some(b'#')) {
            let temp = self.parse_temp_string(doc.arena(), Some(b','), false)?;
            let value = doc.intern_temp(&temp)?;
            doc.array_push_interned(section, value, new_row)?;
            new_row = false;
            if self.cur == Some(b',') {
                self.advance();
            }
            if self.cur == Some(b'\n') {
                break;
            }
            self.skip_inline_whitespace();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "./parser_tests.rs"]
mod tests;
