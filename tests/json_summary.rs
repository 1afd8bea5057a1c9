use bmffbox::api::{hex_range, scan_boxes};
use bmffbox::default_registry;
use std::io::Cursor;

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn sample_file() -> Vec<u8> {
    let mut d = Vec::new();
    // ftyp
    push_u32(&mut d, 16);
    d.extend_from_slice(b"ftyp");
    d.extend_from_slice(b"mp42");
    push_u32(&mut d, 0);
    // moov [ mvhd(empty fields would be invalid; use a leaf-sized stub) ]
    push_u32(&mut d, 28);
    d.extend_from_slice(b"moov");
    push_u32(&mut d, 20);
    d.extend_from_slice(b"mvhd");
    d.push(0);
    d.extend_from_slice(&[0, 0, 0]);
    d.extend_from_slice(&[0u8; 8]);
    d
}

#[test]
fn scan_builds_a_summary_tree() {
    let data = sample_file();
    let mut r = Cursor::new(&data);
    let registry = default_registry();
    let boxes = scan_boxes(&mut r, data.len() as u64, &registry).unwrap();

    assert_eq!(boxes.len(), 2);
    assert_eq!(boxes[0].typ, "ftyp");
    assert_eq!(boxes[0].kind, "leaf");
    assert_eq!(boxes[0].size, 16);
    assert_eq!(boxes[0].header_size, 8);
    assert_eq!(boxes[0].full_name, "File Type Box");

    let moov = &boxes[1];
    assert_eq!(moov.typ, "moov");
    assert_eq!(moov.kind, "container");
    let kids = moov.children.as_ref().unwrap();
    assert_eq!(kids.len(), 1);
    assert_eq!(kids[0].typ, "mvhd");
    assert_eq!(kids[0].kind, "full");
    assert_eq!(kids[0].version, Some(0));
    assert_eq!(kids[0].flags, Some(0));
}

#[test]
fn summary_serializes_to_json() {
    let data = sample_file();
    let mut r = Cursor::new(&data);
    let registry = default_registry();
    let boxes = scan_boxes(&mut r, data.len() as u64, &registry).unwrap();

    let json = serde_json::to_value(&boxes).unwrap();
    assert_eq!(json[0]["typ"], "ftyp");
    assert_eq!(json[1]["children"][0]["typ"], "mvhd");
    assert_eq!(json[1]["children"][0]["version"], 0);
}

#[test]
fn unknown_and_uuid_boxes_are_classified() {
    let mut d = Vec::new();
    push_u32(&mut d, 12);
    d.extend_from_slice(b"zzzz");
    push_u32(&mut d, 0xAABBCCDD);
    push_u32(&mut d, 24);
    d.extend_from_slice(b"uuid");
    d.extend_from_slice(&[0x11; 16]);

    let mut r = Cursor::new(&d);
    let registry = default_registry();
    let boxes = scan_boxes(&mut r, d.len() as u64, &registry).unwrap();

    assert_eq!(boxes[0].kind, "unknown");
    assert_eq!(boxes[1].typ, "uuid");
    assert_eq!(boxes[1].uuid.as_deref(), Some("11111111111111111111111111111111"));
    assert_eq!(boxes[1].header_size, 24);
}

#[test]
fn hex_range_never_reads_past_end() {
    let data = sample_file();
    let mut r = Cursor::new(&data);
    let len = data.len() as u64;

    let dump = hex_range(&mut r, len, 4, 4).unwrap();
    assert_eq!(dump.length, 4);
    assert!(dump.hex.contains("ftyp"));

    let dump = hex_range(&mut r, len, len - 2, 100).unwrap();
    assert_eq!(dump.length, 2);

    let dump = hex_range(&mut r, len, len + 10, 16).unwrap();
    assert_eq!(dump.length, 0);
    assert_eq!(dump.hex, "");
}
