use super::*;
use crate::error::Error;

// -- Allocation -------------------------------------------------------------

#[test]
fn alloc_returns_aligned_pointers() {
    let arena = Arena::with_capacity(1024);
    for align in [1, 2, 4, 8, 16] {
        let ptr = arena.alloc(24, align).unwrap();
        assert_eq!(ptr.as_ptr() as usize % align, 0, "align={align}");
    }
}

#[test]
fn alloc_multiple_no_overlap() {
    let arena = Arena::with_capacity(1024);
    let a = arena.alloc(64, 8).unwrap();
    let b = arena.alloc(64, 8).unwrap();

    let a_range = a.as_ptr() as usize..a.as_ptr() as usize + 64;
    assert!(!a_range.contains(&(b.as_ptr() as usize)));
}

#[test]
fn alloc_fails_when_exhausted() {
    let arena = Arena::with_capacity(64);
    arena.alloc(48, 8).unwrap();
    assert_eq!(arena.alloc(32, 8), Err(Error::OutOfMemory));
    // The failed allocation did not move the cursor.
    assert_eq!(arena.used(), 48);
    // A smaller request still fits.
    arena.alloc(8, 8).unwrap();
}

#[test]
fn zero_capacity_rejects_everything() {
    let arena = Arena::with_capacity(0);
    assert_eq!(arena.alloc(1, 1), Err(Error::OutOfMemory));
    assert_eq!(arena.used(), 0);
}

#[test]
fn alloc_value_roundtrip() {
    let arena = Arena::with_capacity(256);
    let ptr = arena.alloc_value(0xDEAD_BEEFu64).unwrap();
    assert_eq!(unsafe { *ptr.as_ptr() }, 0xDEAD_BEEF);
}

#[test]
fn used_is_monotone_across_allocs() {
    let arena = Arena::with_capacity(1024);
    let mut last = arena.used();
    for _ in 0..8 {
        arena.alloc(10, 2).unwrap();
        assert!(arena.used() > last);
        last = arena.used();
    }
}

// -- Cursor protocol --------------------------------------------------------

#[test]
fn set_cursor_rolls_back_an_allocation() {
    let arena = Arena::with_capacity(256);
    let before = arena.cursor();
    arena.alloc(32, 8).unwrap();
    arena.set_cursor(before);
    assert_eq!(arena.used(), before);

    // The space is handed out again.
    let again = arena.alloc(32, 8).unwrap();
    let reused = arena.alloc(1, 1);
    assert!(reused.is_ok());
    assert!(arena.owns(again.as_ptr()));
}

#[test]
fn owns_only_inside_buffer() {
    let arena = Arena::with_capacity(128);
    let inside = arena.alloc(16, 1).unwrap();
    assert!(arena.owns(inside.as_ptr()));

    let other = Arena::with_capacity(128);
    let foreign = other.alloc(16, 1).unwrap();
    assert!(!arena.owns(foreign.as_ptr()));

    let local = 0u8;
    assert!(!arena.owns(&local));
}

#[test]
fn reset_requires_exclusive_access() {
    let mut arena = Arena::with_capacity(128);
    arena.alloc(64, 8).unwrap();
    arena.reset();
    assert_eq!(arena.used(), 0);
    arena.alloc(64, 8).unwrap();
}

// -- Scratch ----------------------------------------------------------------

#[test]
fn scratch_commit_null_terminates_and_advances() {
    let arena = Arena::with_capacity(128);
    let mut scratch = arena.scratch();
    scratch.extend(b"hello").unwrap();
    let temp = scratch.commit();

    assert_eq!(unsafe { temp.as_bytes() }, b"hello");
    assert_eq!(unsafe { *temp.ptr.as_ptr().add(5) }, 0);
    assert_eq!(arena.used(), temp.start + 6);
}

#[test]
fn scratch_drop_without_commit_leaves_cursor() {
    let arena = Arena::with_capacity(128);
    let before = arena.used();
    {
        let mut scratch = arena.scratch();
        scratch.extend(b"discarded").unwrap();
    }
    assert_eq!(arena.used(), before);
}

#[test]
fn scratch_truncate_trims_tail() {
    let arena = Arena::with_capacity(128);
    let mut scratch = arena.scratch();
    scratch.extend(b"value   ").unwrap();
    scratch.truncate(5);
    let temp = scratch.commit();
    assert_eq!(unsafe { temp.as_bytes() }, b"value");
}

#[test]
fn scratch_reserves_terminator_byte() {
    let arena = Arena::with_capacity(8);
    let mut scratch = arena.scratch();
    // 7 content bytes fit (one byte held back for the terminator).
    scratch.extend(b"1234567").unwrap();
    assert_eq!(scratch.push(b'8'), Err(Error::OutOfMemory));
    let temp = scratch.commit();
    assert_eq!(unsafe { temp.as_bytes() }, b"1234567");
    assert_eq!(arena.used(), 8);
}

#[test]
fn discard_after_commit_reuses_space() {
    let arena = Arena::with_capacity(64);
    let mut scratch = arena.scratch();
    scratch.extend(b"temporary").unwrap();
    let temp = scratch.commit();
    arena.set_cursor(temp.start);
    assert_eq!(arena.used(), temp.start);

    let mut scratch = arena.scratch();
    scratch.extend(b"kept").unwrap();
    let kept = scratch.commit();
    assert_eq!(kept.start, temp.start);
    assert_eq!(unsafe { kept.as_bytes() }, b"kept");
}
