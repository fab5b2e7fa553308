use crate::{Arena, Document};

#[test]
fn handles_compare_by_content_and_identity() {
    let arena = Arena::with_capacity(4096);
    let mut doc = Document::new(&arena).unwrap();
    let a = doc.intern(b"shared").unwrap();
    let b = doc.intern(b"shared").unwrap();
    let c = doc.intern(b"other").unwrap();

    assert!(a.same(b));
    assert_eq!(a, b);
    assert!(!a.same(c));
    assert_ne!(a, c);
}

#[test]
fn byte_and_str_views() {
    let arena = Arena::with_capacity(4096);
    let mut doc = Document::new(&arena).unwrap();
    let s = doc.intern(b"caf\xC3\xA9").unwrap();

    assert_eq!(s.len(), 5);
    assert_eq!(s.as_bytes(), "café".as_bytes());
    assert_eq!(s.as_str(), Some("café"));
    assert_eq!(s.as_bytes_with_nul(), b"caf\xC3\xA9\0");
    assert_eq!(s, "café");
    assert_eq!(format!("{s}"), "café");

    let raw = doc.intern(b"\xFF\x00").unwrap();
    assert_eq!(raw.as_str(), None);
    assert_eq!(raw.as_bytes(), b"\xFF\x00");
    assert_eq!(raw.as_bytes_with_nul(), b"\xFF\x00\0");
}

#[test]
fn empty_string_interns() {
    let arena = Arena::with_capacity(4096);
    let mut doc = Document::new(&arena).unwrap();
    let empty = doc.intern(b"").unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.as_bytes_with_nul(), b"\0");
    assert!(empty.same(doc.intern(b"").unwrap()));
}
