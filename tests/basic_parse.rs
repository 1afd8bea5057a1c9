use bmffbox::known_boxes::ftyp;
use bmffbox::{BitCursor, BoxKind, Error, default_registry, is_bmff, parse_boxes};

#[test]
fn ftyp_box_decodes_and_round_trips() {
    let mut data = Vec::new();
    data.extend_from_slice(&28u32.to_be_bytes());
    data.extend_from_slice(b"ftyp");
    data.extend_from_slice(b"mp42");
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(b"mp42mp41iso4");

    let registry = default_registry();
    let boxes = parse_boxes(&data, &registry).unwrap();
    assert_eq!(boxes.len(), 1);

    let b = &boxes[0];
    assert_eq!(b.kind, BoxKind::Ftyp);
    assert_eq!(b.header.start_pos(), 0);
    assert_eq!(b.header.box_size(), 28);
    assert_eq!(b.header.header_size(), 8);

    let f = b.fields().unwrap();
    assert_eq!(f.uint(ftyp::MAJOR_BRAND), Some(1836069938)); // b"mp42"
    assert_eq!(f.uint(ftyp::MINOR_VERSION), Some(0));
    assert_eq!(
        f.uint_list(ftyp::COMPATIBLE_BRANDS),
        Some(&[1836069938u64, 1836069937, 1769172788][..])
    );

    assert_eq!(b.serialize().unwrap(), data);
}

#[test]
fn mdat_payload_is_deferred_until_load() {
    let mut data = Vec::new();
    data.extend_from_slice(&12u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(b"1234");

    let registry = default_registry();
    let mut boxes = parse_boxes(&data, &registry).unwrap();
    let b = &mut boxes[0];
    assert_eq!(b.kind, BoxKind::Mdat);
    assert_eq!(b.payload(), None);

    // writing a framed-but-unloaded payload would silently drop it
    assert!(matches!(
        b.serialize(),
        Err(Error::InconsistentCollectionState { .. })
    ));

    let mut cur = BitCursor::new(&data);
    b.load(&mut cur).unwrap();
    assert_eq!(b.payload(), Some(&b"1234"[..]));
    assert_eq!(b.serialize().unwrap(), data);
}

#[test]
fn unknown_type_falls_back_to_opaque_and_round_trips() {
    let mut data = Vec::new();
    data.extend_from_slice(&16u32.to_be_bytes());
    data.extend_from_slice(b"zzzz");
    data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04]);

    let registry = default_registry();
    let mut boxes = parse_boxes(&data, &registry).unwrap();
    let b = &mut boxes[0];
    assert_eq!(b.kind, BoxKind::Unknown);

    let mut cur = BitCursor::new(&data);
    b.load(&mut cur).unwrap();
    assert_eq!(b.payload().unwrap().len(), 8);
    assert_eq!(b.serialize().unwrap(), data);
}

#[test]
fn containers_recurse_into_children() {
    // moov [ trak [] , zzzz(payload) ]
    let mut data = Vec::new();
    data.extend_from_slice(&28u32.to_be_bytes());
    data.extend_from_slice(b"moov");
    data.extend_from_slice(&8u32.to_be_bytes());
    data.extend_from_slice(b"trak");
    data.extend_from_slice(&12u32.to_be_bytes());
    data.extend_from_slice(b"zzzz");
    data.extend_from_slice(b"abcd");

    let registry = default_registry();
    let mut boxes = parse_boxes(&data, &registry).unwrap();
    assert_eq!(boxes.len(), 1);

    let moov = &mut boxes[0];
    assert_eq!(moov.kind, BoxKind::Moov);
    assert_eq!(moov.children().len(), 2);
    assert_eq!(moov.children()[0].kind, BoxKind::Trak);
    assert_eq!(moov.children()[1].kind, BoxKind::Unknown);

    let mut cur = BitCursor::new(&data);
    moov.load(&mut cur).unwrap();
    assert_eq!(moov.serialize().unwrap(), data);
}

#[test]
fn container_stops_at_its_declared_boundary() {
    // moov declares 20 bytes, but its 12 content bytes look like the start
    // of a 16-byte child; the child would cross the boundary, so the bytes
    // stay with moov and the sibling after it parses cleanly.
    let mut data = Vec::new();
    data.extend_from_slice(&20u32.to_be_bytes());
    data.extend_from_slice(b"moov");
    data.extend_from_slice(&16u32.to_be_bytes());
    data.extend_from_slice(b"zzzz");
    data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
    data.extend_from_slice(&12u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(b"5678");

    let registry = default_registry();
    let boxes = parse_boxes(&data, &registry).unwrap();
    assert_eq!(boxes.len(), 2);

    let moov = &boxes[0];
    assert_eq!(moov.children().len(), 0);
    assert_eq!(moov.padding().len(), 12);

    let mdat = &boxes[1];
    assert_eq!(mdat.kind, BoxKind::Mdat);
    assert_eq!(mdat.header.start_pos(), 20);
    assert_eq!(mdat.header.box_size(), 12);
}

#[test]
fn truncated_header_is_fatal() {
    let data = [0u8, 0, 0, 28, b'f', b't'];
    let registry = default_registry();
    assert!(matches!(
        parse_boxes(&data, &registry),
        Err(Error::TruncatedInput { .. })
    ));
}

#[test]
fn is_bmff_takes_one_headers_only_step() {
    let mut good = Vec::new();
    good.extend_from_slice(&16u32.to_be_bytes());
    good.extend_from_slice(b"ftyp");
    good.extend_from_slice(b"mp42");
    good.extend_from_slice(&0u32.to_be_bytes());
    assert!(is_bmff(&good));

    // header claims more bytes than exist
    let mut short = Vec::new();
    short.extend_from_slice(&32u32.to_be_bytes());
    short.extend_from_slice(b"ftyp");
    assert!(!is_bmff(&short));

    assert!(!is_bmff(&[0x00, 0x01, 0x02]));
}
