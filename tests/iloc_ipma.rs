use bmffbox::entries::{
    association_essential, association_property_index, iloc, ipma, make_association, IpmaEntry,
};
use bmffbox::known_boxes::{new_iloc, new_ipma};
use bmffbox::{BitCursor, BoxKind, Error, Value, default_registry, parse_boxes};

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn full_header(out: &mut Vec<u8>, size: u32, tag: &[u8; 4], version: u8, flags: u32) {
    push_u32(out, size);
    out.extend_from_slice(tag);
    out.push(version);
    out.extend_from_slice(&flags.to_be_bytes()[1..]);
}

/// iloc version 1 with 4-byte offsets/lengths, no base offsets, no extent
/// indexes: 51 items of one extent each, as written in HEIC stills.
fn iloc_v1_bytes() -> Vec<u8> {
    let mut d = Vec::new();
    full_header(&mut d, 832, b"iloc", 1, 0);
    d.push(0x44); // offset_size=4, length_size=4
    d.push(0x00); // base_offset_size=0, index_size=0
    push_u16(&mut d, 51); // item_count
    for i in 0..51u16 {
        push_u16(&mut d, i + 1); // item_id
        push_u16(&mut d, 0); // reserved + construction_method
        push_u16(&mut d, 0); // data_reference_index
        push_u16(&mut d, 1); // extent_count
        push_u32(&mut d, 4096 + i as u32 * 1000); // extent_offset
        push_u32(&mut d, 900 + i as u32); // extent_length
    }
    d
}

#[test]
fn iloc_selector_width_zero_means_absent() {
    let data = iloc_v1_bytes();
    assert_eq!(data.len(), 832);

    let registry = default_registry();
    let mut boxes = parse_boxes(&data, &registry).unwrap();
    let b = &mut boxes[0];
    assert_eq!(b.kind, BoxKind::Iloc);

    let table = b.entries().unwrap().as_iloc().unwrap();
    assert_eq!(table.declared_count(), 51);
    assert_eq!(table.items().len(), 0);
    let w = table.widths();
    assert_eq!(
        (w.offset_size, w.length_size, w.base_offset_size, w.index_size),
        (4, 4, 0, 0)
    );

    let mut cur = BitCursor::new(&data);
    b.load(&mut cur).unwrap();

    let table = b.entries().unwrap().as_iloc().unwrap();
    assert_eq!(table.items().len(), 51);
    for (i, item) in table.items().iter().enumerate() {
        assert_eq!(item.item_id(), Some(i as u64 + 1));
        // base_offset_size == 0: the field does not exist on the wire
        assert_eq!(item.base_offset(), None);
        assert!(item.fields().is_absent(iloc::BASE_OFFSET));
        assert_eq!(item.extents().len(), 1);

        let extent = &item.extents()[0];
        assert!(extent.is_absent(iloc::EXTENT_INDEX));
        assert_eq!(extent.uint(iloc::EXTENT_OFFSET), Some(4096 + i as u64 * 1000));
        assert_eq!(extent.uint(iloc::EXTENT_LENGTH), Some(900 + i as u64));
    }

    assert_eq!(b.serialize().unwrap(), data);

    b.refresh_box_size();
    assert_eq!(b.header.box_size(), 832);
}

#[test]
fn iloc_item_and_extent_counts_stay_synced() {
    let mut b = new_iloc();
    b.header.set_version(1);
    {
        let table = b.entries_mut().unwrap().as_iloc_mut().unwrap();
        let f = table.fields_mut();
        f.set(iloc::OFFSET_SIZE, Value::Uint(4));
        f.set(iloc::LENGTH_SIZE, Value::Uint(4));
        f.set(iloc::BASE_OFFSET_SIZE, Value::Uint(0));
        f.set(iloc::INDEX_SIZE, Value::Uint(0));

        let mut item = table.new_item();
        let mut extent = item.new_extent();
        extent.set(iloc::EXTENT_OFFSET, Value::Uint(4096));
        extent.set(iloc::EXTENT_LENGTH, Value::Uint(100));
        item.push_extent(extent);
        assert_eq!(item.fields().uint(iloc::EXTENT_COUNT), Some(1));
        item.pop_extent();
        assert_eq!(item.fields().uint(iloc::EXTENT_COUNT), Some(0));

        table.push_item(item);
        assert_eq!(table.declared_count(), 1);
        table.pop_item();
        assert_eq!(table.declared_count(), 0);
    }
}

#[test]
fn ipma_narrow_association_index() {
    let mut d = Vec::new();
    full_header(&mut d, 20, b"ipma", 0, 0);
    push_u32(&mut d, 1); // entry_count
    push_u16(&mut d, 1); // item_id
    d.push(1); // association_count
    d.push(0x83); // essential=1, property_index=3

    let registry = default_registry();
    let mut boxes = parse_boxes(&d, &registry).unwrap();
    let mut cur = BitCursor::new(&d);
    boxes[0].load(&mut cur).unwrap();

    let table = boxes[0].entries().unwrap().as_ipma().unwrap();
    assert_eq!(table.entries().len(), 1);
    let entry = table.entry(0);
    assert_eq!(entry.item_id(), Some(1));
    assert_eq!(entry.associations().len(), 1);

    let assoc = &entry.associations()[0];
    assert_eq!(association_essential(assoc), Some(true));
    assert_eq!(association_property_index(assoc), Some(3));
    assert!(assoc.is_absent(ipma::INDEX_HIGH));

    assert_eq!(boxes[0].serialize().unwrap(), d);
}

#[test]
fn ipma_wide_association_index_recombines_big_endian() {
    // flags bit 0 set: 1-bit essential + 8-bit then 7-bit index halves
    let mut d = Vec::new();
    full_header(&mut d, 21, b"ipma", 0, 1);
    push_u32(&mut d, 1);
    push_u16(&mut d, 1);
    d.push(1);
    // essential=1, high8=1, low7=0 -> index (1 << 7) | 0 = 128
    d.extend_from_slice(&[0x80, 0x80]);

    let registry = default_registry();
    let mut boxes = parse_boxes(&d, &registry).unwrap();
    let mut cur = BitCursor::new(&d);
    boxes[0].load(&mut cur).unwrap();

    let table = boxes[0].entries().unwrap().as_ipma().unwrap();
    let assoc = &table.entry(0).associations()[0];
    assert_eq!(association_essential(assoc), Some(true));
    assert_eq!(assoc.uint(ipma::INDEX_HIGH), Some(1));
    assert_eq!(assoc.uint(ipma::INDEX_LOW), Some(0));
    assert_eq!(association_property_index(assoc), Some(128));

    assert_eq!(boxes[0].serialize().unwrap(), d);
}

#[test]
fn ipma_version_1_item_ids_are_32_bit() {
    let mut d = Vec::new();
    full_header(&mut d, 22, b"ipma", 1, 0);
    push_u32(&mut d, 1);
    push_u32(&mut d, 70000); // item_id
    d.push(1);
    d.push(0x02); // essential=0, property_index=2

    let registry = default_registry();
    let mut boxes = parse_boxes(&d, &registry).unwrap();
    let mut cur = BitCursor::new(&d);
    boxes[0].load(&mut cur).unwrap();

    let entry_table = boxes[0].entries().unwrap().as_ipma().unwrap();
    let entry = entry_table.entry(0);
    assert_eq!(entry.item_id(), Some(70000));
    let assoc = &entry.associations()[0];
    assert_eq!(association_essential(assoc), Some(false));
    assert_eq!(association_property_index(assoc), Some(2));
    assert_eq!(boxes[0].serialize().unwrap(), d);
}

#[test]
fn built_ipma_round_trips() {
    let mut b = new_ipma();
    b.header.set_flags(1);
    {
        let table = b.entries_mut().unwrap().as_ipma_mut().unwrap();
        let mut entry = IpmaEntry::new();
        entry
            .fields_mut()
            .set_with_width(ipma::ITEM_ID, Value::Uint(1), 16)
            .unwrap();
        entry.push_association(make_association(true, 128, true));
        entry.push_association(make_association(false, 2, true));
        assert_eq!(entry.fields().uint(ipma::ASSOCIATION_COUNT), Some(2));
        table.push_entry(entry);
    }
    b.refresh_box_size();
    // 12 header + 4 count + (2 id + 1 count + 2 + 2 associations)
    assert_eq!(b.header.box_size(), 23);

    let bytes = b.serialize().unwrap();
    let registry = default_registry();
    let mut reparsed = parse_boxes(&bytes, &registry).unwrap();
    let mut cur = BitCursor::new(&bytes);
    reparsed[0].load(&mut cur).unwrap();

    let table = reparsed[0].entries().unwrap().as_ipma().unwrap();
    let assocs = table.entry(0).associations();
    assert_eq!(association_property_index(&assocs[0]), Some(128));
    assert_eq!(association_essential(&assocs[0]), Some(true));
    assert_eq!(association_property_index(&assocs[1]), Some(2));
    assert_eq!(reparsed[0].serialize().unwrap(), bytes);
}

#[test]
fn ipma_desynced_association_count_fails_serialize() {
    let mut b = new_ipma();
    {
        let table = b.entries_mut().unwrap().as_ipma_mut().unwrap();
        let mut entry = IpmaEntry::new();
        entry
            .fields_mut()
            .set(ipma::ASSOCIATION_COUNT, Value::Uint(9));
        table.push_entry(entry);
    }
    assert!(matches!(
        b.serialize(),
        Err(Error::InconsistentCollectionState {
            declared: 9,
            actual: 0
        })
    ));
}
