use super::*;
use crate::arena::Arena;
use crate::error::Error;

fn arena() -> Arena {
    Arena::with_capacity(64 * 1024)
}

#[test]
fn empty_list_has_no_capacity() {
    let list: ChunkList<Option<u32>> = ChunkList::new();
    assert_eq!(list.chunks(), 0);
    assert_eq!(list.capacity(), 0);
    assert_eq!(list.get(0), None);
}

#[test]
fn push_chunk_fills_slots() {
    let arena = arena();
    let mut list: ChunkList<Option<u32>> = ChunkList::new();
    list.push_chunk(&arena, None).unwrap();
    assert_eq!(list.chunks(), 1);
    assert_eq!(list.capacity(), CHUNK_LEN);
    for i in 0..CHUNK_LEN {
        assert_eq!(list.get(i), Some(None), "slot {i}");
    }
    assert_eq!(list.get(CHUNK_LEN), None);
}

#[test]
fn set_and_get_across_chunks() {
    let arena = arena();
    let mut list: ChunkList<Option<u32>> = ChunkList::new();
    list.push_chunk(&arena, None).unwrap();
    list.push_chunk(&arena, None).unwrap();

    list.set(3, Some(30));
    list.set(CHUNK_LEN + 5, Some(50));
    assert_eq!(list.get(3), Some(Some(30)));
    assert_eq!(list.get(CHUNK_LEN + 5), Some(Some(50)));
    assert_eq!(list.get(4), Some(None));
}

#[test]
fn elements_keep_their_address_as_the_list_grows() {
    let arena = arena();
    let mut list: ChunkList<Option<u32>> = ChunkList::new();
    list.push_chunk(&arena, None).unwrap();
    list.set(0, Some(7));
    let head = list.head().unwrap();

    for _ in 0..4 {
        list.push_chunk(&arena, None).unwrap();
    }
    assert_eq!(list.head().unwrap(), head);
    assert_eq!(list.get(0), Some(Some(7)));
}

#[test]
fn grow_double_doubles_and_preserves() {
    let arena = arena();
    let mut list: ChunkList<Option<u32>> = ChunkList::new();
    list.push_chunk(&arena, None).unwrap();
    list.set(1, Some(11));

    list.grow_double(&arena).unwrap();
    assert_eq!(list.chunks(), 2);
    assert_eq!(list.get(1), Some(Some(11)));
    assert_eq!(list.get(CHUNK_LEN), Some(None));

    list.grow_double(&arena).unwrap();
    assert_eq!(list.chunks(), 4);
}

#[test]
fn grow_double_failure_leaves_list_usable() {
    // Room for the first chunk but not for a doubling.
    let chunk_bytes = std::mem::size_of::<Chunk<Option<u32>>>();
    let arena = Arena::with_capacity(chunk_bytes + chunk_bytes / 2);
    let mut list: ChunkList<Option<u32>> = ChunkList::new();
    list.push_chunk(&arena, None).unwrap();
    list.set(2, Some(22));
    let used = arena.used();

    assert_eq!(list.grow_double(&arena), Err(Error::OutOfMemory));
    assert_eq!(list.chunks(), 1);
    assert_eq!(arena.used(), used, "failed grow rolled the cursor back");
    assert_eq!(list.get(2), Some(Some(22)));
    assert_eq!(list.get(CHUNK_LEN), None, "no partial chunk was linked");
}

#[test]
fn grow_double_on_empty_list_is_a_no_op() {
    let arena = arena();
    let mut list: ChunkList<Option<u32>> = ChunkList::new();
    list.grow_double(&arena).unwrap();
    assert_eq!(list.chunks(), 0);
}

#[test]
fn iter_walks_slots_in_order() {
    let arena = arena();
    let mut list: ChunkList<Option<u32>> = ChunkList::new();
    list.push_chunk(&arena, None).unwrap();
    list.push_chunk(&arena, None).unwrap();
    for i in 0..CHUNK_LEN + 3 {
        list.set(i, Some(i as u32));
    }

    let collected: Vec<_> = list.iter().take(CHUNK_LEN + 3).collect();
    assert_eq!(collected.len(), CHUNK_LEN + 3);
    for (i, slot) in collected.iter().enumerate() {
        assert_eq!(*slot, Some(i as u32));
    }
}
