//! Summary surface for tools and UIs: a serde-serializable skim of a box
//! tree read from any `Read + Seek` source, plus a hex-range view. This
//! byte-oriented scan only frames headers; the bit-precise typed parse
//! lives in `parser` and works over an in-memory cursor.

use byteorder::{BigEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom};

use crate::headers::FourCC;
use crate::known_boxes::BoxKind;
use crate::registry::{BoxKey, Registry};
use crate::util::{hex_dump, read_slice};

/// A JSON-serializable skim of one box.
#[derive(Serialize)]
pub struct BoxSummary {
    /// Absolute byte offset of the box header.
    pub offset: u64,
    /// Effective box size including the header.
    pub size: u64,
    pub header_size: u64,
    /// Four-character type code (e.g. "ftyp").
    pub typ: String,
    /// Hex user type for `uuid` boxes.
    pub uuid: Option<String>,
    pub version: Option<u8>,
    pub flags: Option<u32>,
    /// "container", "full", "leaf", or "unknown".
    pub kind: String,
    pub full_name: String,
    pub children: Option<Vec<BoxSummary>>,
}

struct ScanHeader {
    size: u64,
    typ: FourCC,
    uuid: Option<[u8; 16]>,
    header_size: u64,
    start: u64,
}

fn read_scan_header<R: Read + Seek>(r: &mut R) -> anyhow::Result<ScanHeader> {
    let start = r.stream_position()?;
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;
    let mut size = size32 as u64;

    if size32 == 1 {
        size = r.read_u64::<BigEndian>()?;
    }

    let mut uuid = None;
    if &typ == b"uuid" {
        let mut u = [0u8; 16];
        r.read_exact(&mut u)?;
        uuid = Some(u);
    }

    let header_size = match (size32 == 1, &typ == b"uuid") {
        (true, true) => 8 + 8 + 16,
        (true, false) => 8 + 8,
        (false, true) => 8 + 16,
        (false, false) => 8,
    } as u64;

    if size != 0 && size < header_size {
        anyhow::bail!("invalid box size {} at offset {}", size, start);
    }

    Ok(ScanHeader {
        size,
        typ: FourCC(typ),
        uuid,
        header_size,
        start,
    })
}

/// Skim the box tree of `r` (`size` bytes total), recursing into
/// containers. Box payloads are never materialized.
pub fn scan_boxes<R: Read + Seek>(
    r: &mut R,
    size: u64,
    registry: &Registry,
) -> anyhow::Result<Vec<BoxSummary>> {
    let start = r.stream_position()?;
    scan_range(r, start, size, registry)
}

fn scan_range<R: Read + Seek>(
    r: &mut R,
    start: u64,
    end: u64,
    registry: &Registry,
) -> anyhow::Result<Vec<BoxSummary>> {
    let mut out = Vec::new();
    r.seek(SeekFrom::Start(start))?;
    while r.stream_position()? < end {
        let h = read_scan_header(r)?;
        let box_end = if h.size == 0 { end } else { h.start + h.size };

        let key = match h.uuid {
            Some(u) => BoxKey::Uuid(u),
            None => BoxKey::FourCC(h.typ),
        };
        let kind = registry.lookup(&key).unwrap_or(BoxKind::Unknown);

        // full boxes continue with version + flags
        let (version, flags) = if kind.is_full_box() {
            let version = r.read_u8()?;
            let mut fl = [0u8; 3];
            r.read_exact(&mut fl)?;
            let flags = ((fl[0] as u32) << 16) | ((fl[1] as u32) << 8) | (fl[2] as u32);
            (Some(version), Some(flags))
        } else {
            (None, None)
        };

        let (kind_str, children) = if kind.is_container() {
            let content_start = r.stream_position()?;
            let kids = scan_range(r, content_start, box_end, registry)?;
            ("container", Some(kids))
        } else if kind.is_full_box() {
            ("full", None)
        } else if kind == BoxKind::Unknown {
            ("unknown", None)
        } else {
            ("leaf", None)
        };

        out.push(BoxSummary {
            offset: h.start,
            size: h.size,
            header_size: h.header_size,
            typ: h.typ.to_string(),
            uuid: h.uuid.map(hex::encode),
            version,
            flags,
            kind: kind_str.to_string(),
            full_name: kind.full_name().to_string(),
            children,
        });

        r.seek(SeekFrom::Start(box_end))?;
    }
    Ok(out)
}

/// Result of a hex dump operation.
#[derive(Serialize)]
pub struct HexDump {
    pub offset: u64,
    /// Actual number of bytes read; never past end of data.
    pub length: u64,
    pub hex: String,
}

/// Hex-dump a byte range. Reads at most `max_len` bytes and never past
/// `size`, so the returned length can be smaller than requested.
pub fn hex_range<R: Read + Seek>(
    r: &mut R,
    size: u64,
    offset: u64,
    max_len: u64,
) -> anyhow::Result<HexDump> {
    let available = size.saturating_sub(offset);
    let to_read = available.min(max_len);

    if to_read == 0 {
        return Ok(HexDump {
            offset,
            length: 0,
            hex: String::new(),
        });
    }

    let data = read_slice(r, offset, to_read)?;
    Ok(HexDump {
        offset,
        length: to_read,
        hex: hex_dump(&data, offset),
    })
}
