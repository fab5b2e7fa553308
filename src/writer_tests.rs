use crate::{
    parse_str, write_document, write_section, Arena, Document, Error, ParseOptions, SectionKind,
    SliceWriter,
};

fn parse_into<'a>(doc: &mut Document<'a>, input: &str) {
    parse_str(doc, input, ParseOptions::new()).unwrap();
}

fn render(doc: &Document<'_>, ascii: bool) -> Vec<u8> {
    let mut out = Vec::new();
    write_document(&mut out, doc, ascii).unwrap();
    out
}

/// Writes `doc`, reparses the output, and asserts the two documents hold the
/// same sections, entries, and row structure.
fn assert_roundtrip(doc: &Document<'_>, ascii: bool) {
    let text = render(doc, ascii);
    let arena = Arena::with_capacity(256 * 1024);
    let mut reparsed = Document::new(&arena).unwrap();
    let mut failed = None;
    let mut logger = |err: Error, line: u32| {
        failed = Some((err, line));
        std::ops::ControlFlow::Continue(())
    };
    crate::parse(
        &mut reparsed,
        crate::SliceReader::new(&text),
        ParseOptions::new().with_logger(&mut logger),
    )
    .unwrap();
    assert_eq!(
        failed,
        None,
        "output failed to reparse:\n{}",
        String::from_utf8_lossy(&text)
    );

    assert_eq!(reparsed.section_count(), doc.section_count());
    for section in doc.sections() {
        let twin = reparsed.section(section.name().as_bytes()).unwrap();
        assert_eq!(twin.kind(), section.kind());
        assert_eq!(twin.len(), section.len());
        match section.kind() {
            SectionKind::Table => {
                for (key, value) in section.table_entries() {
                    assert_eq!(twin.table_get(key.as_bytes()).unwrap(), value);
                }
            }
            SectionKind::Array => {
                let original: Vec<_> = section
                    .array_cells()
                    .map(|(v, r, c)| (v.as_bytes().to_vec(), r, c))
                    .collect();
                let reparsed_cells: Vec<_> = twin
                    .array_cells()
                    .map(|(v, r, c)| (v.as_bytes().to_vec(), r, c))
                    .collect();
                assert_eq!(original, reparsed_cells);
            }
        }
    }
}

#[test]
fn simple_document_roundtrips() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    parse_into(&mut doc, "{t}\nkey = value\nother = 42\n[a]\n1,2,3\n4,5\n6\n");
    assert_roundtrip(&doc, false);
    assert_roundtrip(&doc, true);
}

#[test]
fn plain_strings_use_quotes() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    let table = doc.add_section(SectionKind::Table, b"t").unwrap();
    doc.table_add(table, b"k", b"value").unwrap();

    let text = render(&doc, false);
    assert_eq!(String::from_utf8(text).unwrap(), "{\"t\"}\n\"k\"=\"value\"\n");
}

#[test]
fn array_layout_preserves_rows() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    let array = doc.add_section(SectionKind::Array, b"a").unwrap();
    doc.array_push(array, b"1", true).unwrap();
    doc.array_push(array, b"2", false).unwrap();
    doc.array_push(array, b"3", true).unwrap();

    let text = render(&doc, false);
    assert_eq!(
        String::from_utf8(text).unwrap(),
        "[\"a\"]\n\"1\",\"2\",\n\"3\",\n"
    );
}

#[test]
fn empty_sections_render() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    doc.add_section(SectionKind::Table, b"t").unwrap();
    doc.add_section(SectionKind::Array, b"a").unwrap();
    assert_roundtrip(&doc, false);
}

#[test]
fn specials_roundtrip_through_backtick_flavor() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    let table = doc.add_section(SectionKind::Table, b"t").unwrap();
    doc.table_add(table, b"newline", b"a\nb").unwrap();
    doc.table_add(table, b"tab", b"a\tb").unwrap();
    doc.table_add(table, b"backslash", b"a\\b").unwrap();
    doc.table_add(table, b"backtick", b"a`b\x01").unwrap();
    doc.table_add(table, b"quotes", b"both \" and '").unwrap();
    doc.table_add(table, b"double", b"say \"hi\"").unwrap();
    doc.table_add(table, b"comma_hash", b"a,b#c=d").unwrap();
    doc.table_add(table, b"del", b"\x7F").unwrap();
    doc.table_add(table, b"invalid_utf8", b"\xFF\xFEok").unwrap();
    assert_roundtrip(&doc, false);
    assert_roundtrip(&doc, true);
}

#[test]
fn unicode_roundtrips_in_both_modes() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    let table = doc.add_section(SectionKind::Table, b"t").unwrap();
    doc.table_add(table, "caf\u{e9}".as_bytes(), "sn\u{f6}".as_bytes())
        .unwrap();
    doc.table_add(table, b"emoji", "\u{1F171}".as_bytes()).unwrap();
    doc.table_add(table, b"bmp", "\u{2603}".as_bytes()).unwrap();
    assert_roundtrip(&doc, false);
    assert_roundtrip(&doc, true);

    // Ascii mode leaves no byte above 0x7F in the output.
    let text = render(&doc, true);
    assert!(text.iter().all(|&b| b < 0x80), "non-ascii byte in output");
}

#[test]
fn tricky_section_names_roundtrip() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    doc.add_section(SectionKind::Table, b"has } brace").unwrap();
    doc.add_section(SectionKind::Array, b"has ] bracket").unwrap();
    doc.add_section(SectionKind::Table, b"has = and , and #").unwrap();
    assert_roundtrip(&doc, false);
}

#[test]
fn empty_key_roundtrips() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    // The parser admits one empty key per table; the writer must keep it.
    parse_into(&mut doc, "{t}\n=empty\n");
    assert_eq!(doc.table(b"t").unwrap().table_get(b"").unwrap(), "empty");
    assert_roundtrip(&doc, false);
}

#[test]
fn slice_writer_reports_exhaustion() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    let table = doc.add_section(SectionKind::Table, b"table-name").unwrap();
    doc.table_add(table, b"key", b"value").unwrap();

    let mut buf = [0u8; 4];
    let mut writer = SliceWriter::new(&mut buf);
    assert_eq!(
        write_document(&mut writer, &doc, false),
        Err(Error::OutOfMemory)
    );

    let mut big = [0u8; 256];
    let mut writer = SliceWriter::new(&mut big);
    write_document(&mut writer, &doc, false).unwrap();
    assert!(writer.written().starts_with(b"{\"table-name\"}\n"));
}
