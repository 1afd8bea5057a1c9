use std::collections::HashMap;

use crate::headers::{BoxHeader, FourCC};
use crate::known_boxes::BoxKind;

/// Dispatch key: a 4CC, or the 16-byte user type of a `uuid` box.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxKey {
    FourCC(FourCC),
    Uuid([u8; 16]),
}

impl BoxKey {
    pub fn for_header(header: &BoxHeader) -> Self {
        match header.user_type() {
            Some(u) => BoxKey::Uuid(*u),
            None => BoxKey::FourCC(header.box_type()),
        }
    }
}

/// Immutable tag → box-kind map, built once before any parse and held by
/// the reader. A lookup miss is not an error; the reader falls back to the
/// opaque unknown box.
pub struct Registry {
    map: HashMap<BoxKey, BoxKind>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Return a new registry with the given kind added.
    pub fn with_box(mut self, tag: &[u8; 4], kind: BoxKind) -> Self {
        self.map.insert(BoxKey::FourCC(FourCC(*tag)), kind);
        self
    }

    pub fn with_uuid(mut self, user_type: [u8; 16], kind: BoxKind) -> Self {
        self.map.insert(BoxKey::Uuid(user_type), kind);
        self
    }

    pub fn lookup(&self, key: &BoxKey) -> Option<BoxKind> {
        self.map.get(key).copied()
    }

    pub fn lookup_header(&self, header: &BoxHeader) -> Option<BoxKind> {
        self.lookup(&BoxKey::for_header(header))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The full supported catalogue.
pub fn default_registry() -> Registry {
    Registry::new()
        // file-level
        .with_box(b"ftyp", BoxKind::Ftyp)
        .with_box(b"mdat", BoxKind::Mdat)
        .with_box(b"idat", BoxKind::Idat)
        // containers
        .with_box(b"moov", BoxKind::Moov)
        .with_box(b"meta", BoxKind::Meta)
        .with_box(b"trak", BoxKind::Trak)
        .with_box(b"mdia", BoxKind::Mdia)
        .with_box(b"minf", BoxKind::Minf)
        .with_box(b"stbl", BoxKind::Stbl)
        .with_box(b"dinf", BoxKind::Dinf)
        .with_box(b"edts", BoxKind::Edts)
        .with_box(b"iprp", BoxKind::Iprp)
        .with_box(b"ipco", BoxKind::Ipco)
        .with_box(b"iref", BoxKind::Iref)
        // fixed typed boxes
        .with_box(b"mvhd", BoxKind::Mvhd)
        .with_box(b"tkhd", BoxKind::Tkhd)
        .with_box(b"mdhd", BoxKind::Mdhd)
        .with_box(b"hdlr", BoxKind::Hdlr)
        .with_box(b"vmhd", BoxKind::Vmhd)
        .with_box(b"nmhd", BoxKind::Nmhd)
        .with_box(b"sthd", BoxKind::Sthd)
        .with_box(b"pitm", BoxKind::Pitm)
        // count-prefixed child arrays
        .with_box(b"stsd", BoxKind::Stsd)
        .with_box(b"dref", BoxKind::Dref)
        .with_box(b"iinf", BoxKind::Iinf)
        // count-prefixed entry tables
        .with_box(b"stts", BoxKind::Stts)
        .with_box(b"ctts", BoxKind::Ctts)
        .with_box(b"stsz", BoxKind::Stsz)
        .with_box(b"stsc", BoxKind::Stsc)
        .with_box(b"stco", BoxKind::Stco)
        .with_box(b"co64", BoxKind::Co64)
        .with_box(b"elst", BoxKind::Elst)
        // item tables
        .with_box(b"iloc", BoxKind::Iloc)
        .with_box(b"ipma", BoxKind::Ipma)
        .with_box(b"infe", BoxKind::Infe)
        // sample entries
        .with_box(b"avc1", BoxKind::Avc1)
        .with_box(b"stxt", BoxKind::Stxt)
        .with_box(b"mett", BoxKind::Mett)
        .with_box(b"sbtt", BoxKind::Sbtt)
        // visual sample entry children
        .with_box(b"pasp", BoxKind::Pasp)
        .with_box(b"clap", BoxKind::Clap)
        .with_box(b"hvcC", BoxKind::HvcC)
        // data entries
        .with_box(b"url ", BoxKind::Url)
        .with_box(b"urn ", BoxKind::Urn)
}
