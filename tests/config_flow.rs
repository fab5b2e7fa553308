//! End-to-end flow over the public API: stream a config in, look values up,
//! interpret them, follow a section reference, and write the document back.

use lsml::value::{to_bool, to_f64, to_u16, Parsed};
use lsml::{Arena, Document, Error, IoReader, ParseOptions, SectionKind};
use std::ops::ControlFlow;

const CONFIG: &str = "\
# service configuration
{server}
host = internal.example.com
port = 8080
tls = true
timeout = 2.5
backends = []pool

[pool]
10.0.0.1, 10.0.0.2, 10.0.0.3
10.0.1.1, 10.0.1.2
";

#[test]
fn parse_interpret_and_reserialize() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();

    let mut errors = Vec::new();
    let mut logger = |err: Error, line: u32| {
        errors.push((err, line));
        ControlFlow::Continue(())
    };
    lsml::parse(
        &mut doc,
        IoReader::new(CONFIG.as_bytes()),
        ParseOptions::new().with_logger(&mut logger),
    )
    .unwrap();
    assert!(errors.is_empty(), "{errors:?}");

    let server = doc.table(b"server").unwrap();
    assert_eq!(server.table_get(b"host").unwrap(), "internal.example.com");
    assert_eq!(to_u16(&server.table_get(b"port").unwrap()), Ok(Parsed::Exact(8080)));
    assert_eq!(to_bool(&server.table_get(b"tls").unwrap()), Ok(true));
    assert_eq!(
        to_f64(&server.table_get(b"timeout").unwrap()),
        Ok(Parsed::Exact(2.5))
    );

    // Follow the backends reference to the pool array.
    let pool = doc.resolve_ref(&server.table_get(b"backends").unwrap()).unwrap();
    assert_eq!(pool.kind(), SectionKind::Array);
    assert_eq!(pool.array_size_2d(true).unwrap(), (2, 3));
    assert_eq!(pool.array_get_2d(1, 1).unwrap(), "10.0.1.2");
    assert_eq!(pool.array_find(b"10.0.0.3").unwrap(), 2);

    // Write it out and read it back in.
    let mut text = Vec::new();
    lsml::write_document(&mut text, &doc, false).unwrap();

    let arena2 = Arena::with_capacity(64 * 1024);
    let mut doc2 = Document::new(&arena2).unwrap();
    lsml::parse_str(
        &mut doc2,
        std::str::from_utf8(&text).unwrap(),
        ParseOptions::new(),
    )
    .unwrap();
    assert_eq!(doc2.section_count(), 2);
    let server2 = doc2.table(b"server").unwrap();
    assert_eq!(server2.table_get(b"backends").unwrap(), "[]pool");
    assert_eq!(doc2.array(b"pool").unwrap().len(), 5);
}

#[test]
fn template_filter_and_max_sections() {
    let template_arena = Arena::with_capacity(8 * 1024);
    let mut template = Document::new(&template_arena).unwrap();
    template.add_section(SectionKind::Table, b"server").unwrap();

    let arena = Arena::with_capacity(64 * 1024);
    let mut doc = Document::new(&arena).unwrap();
    let mut filter = lsml::sections_match(&template);
    lsml::parse_str(
        &mut doc,
        CONFIG,
        ParseOptions::new().with_filter(&mut filter),
    )
    .unwrap();
    assert_eq!(doc.section_count(), 1);
    assert!(doc.table(b"server").is_ok());
    assert!(doc.section(b"pool").is_err());

    let arena3 = Arena::with_capacity(64 * 1024);
    let mut doc3 = Document::new(&arena3).unwrap();
    lsml::parse_str(&mut doc3, CONFIG, ParseOptions::new().with_max_sections(1)).unwrap();
    assert_eq!(doc3.section_count(), 1);
}
