use std::fmt;

use crate::bitio::BitCursor;
use crate::error::{Error, Result};
use crate::fields::{Field, FieldsList, Value};

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }
    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}
impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

// Wire order of the header fields list.
const SIZE: usize = 0;
const TYPE: usize = 1;
const EXT_SIZE: usize = 2;
const USER_TYPE: usize = 3;
const VERSION: usize = 4;
const FLAGS: usize = 5;

/// Universal box framing: 32-bit size + 4-byte type, the 64-bit extended
/// size (present iff the size field holds the sentinel 1), the 16-byte user
/// type (present iff the type is `uuid`), and for full boxes an 8-bit
/// version + 24-bit flags.
///
/// One type covers both plain and full headers; `extend_full` upgrades a
/// generically-parsed header in place once the dispatcher knows the concrete
/// box kind wants the extension.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    start_pos: u64,
    fields: FieldsList,
    is_full: bool,
    // derived caches, refreshed after every mutation
    box_type: FourCC,
    user_type: Option<[u8; 16]>,
    box_size: u64,
    header_size: u64,
}

fn header_fields() -> FieldsList {
    FieldsList::new(vec![
        Field::uint(32),
        Field::bytes(4),
        Field::uint(64),
        Field::bytes(16),
        Field::uint(8),
        Field::uint(24),
    ])
}

impl BoxHeader {
    pub fn new(box_type: FourCC) -> Self {
        let mut fields = header_fields();
        fields.set(TYPE, Value::Bytes(box_type.0.to_vec()));
        let mut hdr = BoxHeader {
            start_pos: 0,
            fields,
            is_full: false,
            box_type,
            user_type: None,
            box_size: 0,
            header_size: 0,
        };
        hdr.refresh_cache();
        hdr
    }

    pub fn full(box_type: FourCC, version: u8, flags: u32) -> Self {
        let mut hdr = BoxHeader::new(box_type);
        hdr.set_version(version);
        hdr.set_flags(flags);
        hdr
    }

    /// Parse the generic framing fields at the cursor's current position.
    pub fn parse(cur: &mut BitCursor<'_>) -> Result<Self> {
        let start_pos = cur.byte_pos();
        let mut fields = header_fields();
        fields.read(SIZE, cur)?;
        fields.read(TYPE, cur)?;

        // size == 1 escalates to the 64-bit extended size
        if fields.uint(SIZE) == Some(1) {
            fields.read(EXT_SIZE, cur)?;
        }
        if fields.bytes(TYPE) == Some(&b"uuid"[..]) {
            fields.read(USER_TYPE, cur)?;
        }

        let mut hdr = BoxHeader {
            start_pos,
            fields,
            is_full: false,
            box_type: FourCC(*b"????"),
            user_type: None,
            box_size: 0,
            header_size: 0,
        };
        hdr.refresh_cache();
        if hdr.box_size < hdr.header_size {
            return Err(Error::InvalidSize);
        }
        Ok(hdr)
    }

    /// Continue reading version + flags from the cursor, in place. The
    /// generic fields already parsed are reused, not re-read.
    pub fn extend_full(&mut self, cur: &mut BitCursor<'_>) -> Result<()> {
        self.fields.read(VERSION, cur)?;
        self.fields.read(FLAGS, cur)?;
        self.is_full = true;
        self.refresh_cache();
        Ok(())
    }

    pub fn start_pos(&self) -> u64 {
        self.start_pos
    }

    pub fn box_type(&self) -> FourCC {
        self.box_type
    }

    pub fn user_type(&self) -> Option<&[u8; 16]> {
        self.user_type.as_ref()
    }

    /// Effective box size: the extended field's value when present, else the
    /// declared 32-bit field's.
    pub fn box_size(&self) -> u64 {
        self.box_size
    }

    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    pub fn content_size(&self) -> u64 {
        self.box_size.saturating_sub(self.header_size)
    }

    pub fn end_pos(&self) -> u64 {
        self.start_pos + self.box_size
    }

    pub fn is_full(&self) -> bool {
        self.is_full
    }

    pub fn has_ext_size(&self) -> bool {
        !self.fields.is_absent(EXT_SIZE)
    }

    pub fn version(&self) -> Option<u8> {
        self.fields.uint(VERSION).map(|v| v as u8)
    }

    pub fn flags(&self) -> Option<u32> {
        self.fields.uint(FLAGS).map(|v| v as u32)
    }

    pub fn set_version(&mut self, version: u8) {
        self.fields.set(VERSION, Value::Uint(version as u64));
        self.is_full = true;
        self.refresh_cache();
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.fields.set(FLAGS, Value::Uint(flags as u64));
        self.is_full = true;
        self.refresh_cache();
    }

    pub fn set_type(&mut self, box_type: FourCC) {
        self.fields.set(TYPE, Value::Bytes(box_type.0.to_vec()));
        if box_type.0 != *b"uuid" {
            self.fields.clear(USER_TYPE);
        }
        self.refresh_cache();
    }

    pub fn set_user_type(&mut self, user_type: [u8; 16]) {
        self.fields.set(TYPE, Value::Bytes(b"uuid".to_vec()));
        self.fields.set(USER_TYPE, Value::Bytes(user_type.to_vec()));
        self.refresh_cache();
    }

    /// Force an effective size, escalating to the extended field when the
    /// 32-bit one cannot hold it.
    pub fn set_box_size(&mut self, size: u64) {
        if size > u32::MAX as u64 {
            self.fields.set(SIZE, Value::Uint(1));
            self.fields.set(EXT_SIZE, Value::Uint(size));
        } else {
            self.fields.set(SIZE, Value::Uint(size));
            self.fields.clear(EXT_SIZE);
        }
        self.refresh_cache();
    }

    /// Given the byte length of the box content (typed fields + children +
    /// padding), recompute and store the effective size. Single pass: the
    /// 8 bytes an escalation adds are accounted before the final value is
    /// written, and an already-extended header stays extended.
    pub fn update_box_size(&mut self, content_size: u64) {
        let mut header_size = self.fields.byte_len();
        if self.fields.is_absent(SIZE) {
            header_size += 4;
        }
        let escalating =
            self.fields.is_absent(EXT_SIZE) && header_size + content_size > u32::MAX as u64;
        if escalating {
            header_size += 8;
        }

        let box_size = header_size + content_size;
        if !self.fields.is_absent(EXT_SIZE) || box_size > u32::MAX as u64 {
            self.fields.set(SIZE, Value::Uint(1));
            self.fields.set(EXT_SIZE, Value::Uint(box_size));
        } else {
            self.fields.set(SIZE, Value::Uint(box_size));
        }
        self.refresh_cache();
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.fields.to_bytes()
    }

    pub(crate) fn write_into(&self, w: &mut crate::bitio::BitWriter) -> Result<()> {
        self.fields.write_into(w)
    }

    fn refresh_cache(&mut self) {
        if let Some(t) = self.fields.bytes(TYPE) {
            self.box_type = FourCC([t[0], t[1], t[2], t[3]]);
        }
        self.user_type = self.fields.bytes(USER_TYPE).map(|u| {
            let mut out = [0u8; 16];
            out.copy_from_slice(u);
            out
        });
        self.box_size = self
            .fields
            .uint(EXT_SIZE)
            .or_else(|| self.fields.uint(SIZE))
            .unwrap_or(0);
        self.header_size = self.fields.byte_len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_header() {
        let data = [0, 0, 0, 28, b'f', b't', b'y', b'p'];
        let mut cur = BitCursor::new(&data);
        let hdr = BoxHeader::parse(&mut cur).unwrap();
        assert_eq!(hdr.start_pos(), 0);
        assert_eq!(hdr.box_type(), FourCC(*b"ftyp"));
        assert_eq!(hdr.box_size(), 28);
        assert_eq!(hdr.header_size(), 8);
        assert_eq!(hdr.content_size(), 20);
        assert_eq!(hdr.to_bytes().unwrap(), data);
    }

    #[test]
    fn extended_size_header() {
        let mut data = vec![0, 0, 0, 1];
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&5_000_000_000u64.to_be_bytes());
        let mut cur = BitCursor::new(&data);
        let hdr = BoxHeader::parse(&mut cur).unwrap();
        assert_eq!(hdr.box_size(), 5_000_000_000);
        assert_eq!(hdr.header_size(), 16);
        assert!(hdr.has_ext_size());
        assert_eq!(hdr.to_bytes().unwrap(), data);
    }

    #[test]
    fn uuid_header() {
        let mut data = vec![0, 0, 0, 24];
        data.extend_from_slice(b"uuid");
        data.extend_from_slice(&[0xAA; 16]);
        let mut cur = BitCursor::new(&data);
        let hdr = BoxHeader::parse(&mut cur).unwrap();
        assert_eq!(hdr.box_type(), FourCC(*b"uuid"));
        assert_eq!(hdr.user_type(), Some(&[0xAA; 16]));
        assert_eq!(hdr.header_size(), 24);
        assert_eq!(hdr.to_bytes().unwrap(), data);
    }

    #[test]
    fn full_extension_reuses_parsed_fields() {
        let data = [0, 0, 0, 20, b'm', b'v', b'h', b'd', 1, 0, 0, 7];
        let mut cur = BitCursor::new(&data);
        let mut hdr = BoxHeader::parse(&mut cur).unwrap();
        assert_eq!(hdr.header_size(), 8);
        hdr.extend_full(&mut cur).unwrap();
        assert_eq!(hdr.version(), Some(1));
        assert_eq!(hdr.flags(), Some(7));
        assert_eq!(hdr.header_size(), 12);
        assert_eq!(cur.byte_pos(), 12);
    }

    #[test]
    fn declared_size_below_header_size_is_invalid() {
        let data = [0, 0, 0, 4, b'f', b'r', b'e', b'e'];
        let mut cur = BitCursor::new(&data);
        assert!(matches!(
            BoxHeader::parse(&mut cur),
            Err(Error::InvalidSize)
        ));
    }

    #[test]
    fn update_box_size_escalates_past_u32() {
        let mut hdr = BoxHeader::full(FourCC(*b"mdat"), 0, 0);
        let small_total = {
            let mut h = hdr.clone();
            h.update_box_size(100);
            h.header_size()
        };

        hdr.update_box_size((1u64 << 32) - 9);
        assert_eq!(hdr.fields.uint(SIZE), Some(1));
        assert!(hdr.has_ext_size());
        assert_eq!(hdr.box_size(), hdr.header_size() + (1u64 << 32) - 9);
        assert_eq!(hdr.header_size(), small_total + 8);
    }

    #[test]
    fn update_box_size_is_idempotent() {
        let mut hdr = BoxHeader::new(FourCC(*b"free"));
        hdr.update_box_size(16);
        assert_eq!(hdr.box_size(), 24);
        let first = hdr.to_bytes().unwrap();
        hdr.update_box_size(16);
        assert_eq!(hdr.to_bytes().unwrap(), first);
    }
}
