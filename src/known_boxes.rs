//! The concrete box catalogue: one layout per kind, all built from the same
//! few shapes. Slot constants index each box's fields list in wire order.

use crate::bitio::BitCursor;
use crate::boxes::{BoxContent, Mp4Box};
use crate::entries::{EntryData, FlatKind, FlatTable, IlocTable, IpmaTable};
use crate::error::Result;
use crate::fields::{Encoding, Field, FieldsList, Value};
use crate::headers::{BoxHeader, FourCC};

/// Typed view over the supported box kinds. Anything not listed becomes
/// `BoxKind::Unknown` and round-trips as an opaque payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKind {
    // File-level
    Ftyp,
    Mdat,
    Idat,

    // Containers
    Moov,
    Meta,
    Trak,
    Mdia,
    Minf,
    Stbl,
    Dinf,
    Edts,
    Iprp,
    Ipco,
    Iref,

    // Fixed typed boxes
    Mvhd,
    Tkhd,
    Mdhd,
    Hdlr,
    Vmhd,
    Nmhd,
    Sthd,
    Pitm,

    // Count-prefixed child arrays
    Stsd,
    Dref,
    Iinf,

    // Count-prefixed entry tables
    Stts,
    Ctts,
    Stsz,
    Stsc,
    Stco,
    Co64,
    Elst,

    // Variable-width item tables
    Iloc,
    Ipma,

    // iinf entries
    Infe,

    // Sample entries
    Avc1,
    Stxt,
    Mett,
    Sbtt,

    // Visual sample entry children
    Pasp,
    Clap,
    HvcC,

    // Data entries
    Url,
    Urn,

    // iref children, dispatched by the container's version, not by tag
    ItemRef,
    ItemRefLarge,

    Unknown,
}

impl From<FourCC> for BoxKind {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => BoxKind::Ftyp,
            b"mdat" => BoxKind::Mdat,
            b"idat" => BoxKind::Idat,

            b"moov" => BoxKind::Moov,
            b"meta" => BoxKind::Meta,
            b"trak" => BoxKind::Trak,
            b"mdia" => BoxKind::Mdia,
            b"minf" => BoxKind::Minf,
            b"stbl" => BoxKind::Stbl,
            b"dinf" => BoxKind::Dinf,
            b"edts" => BoxKind::Edts,
            b"iprp" => BoxKind::Iprp,
            b"ipco" => BoxKind::Ipco,
            b"iref" => BoxKind::Iref,

            b"mvhd" => BoxKind::Mvhd,
            b"tkhd" => BoxKind::Tkhd,
            b"mdhd" => BoxKind::Mdhd,
            b"hdlr" => BoxKind::Hdlr,
            b"vmhd" => BoxKind::Vmhd,
            b"nmhd" => BoxKind::Nmhd,
            b"sthd" => BoxKind::Sthd,
            b"pitm" => BoxKind::Pitm,

            b"stsd" => BoxKind::Stsd,
            b"dref" => BoxKind::Dref,
            b"iinf" => BoxKind::Iinf,

            b"stts" => BoxKind::Stts,
            b"ctts" => BoxKind::Ctts,
            b"stsz" => BoxKind::Stsz,
            b"stsc" => BoxKind::Stsc,
            b"stco" => BoxKind::Stco,
            b"co64" => BoxKind::Co64,
            b"elst" => BoxKind::Elst,

            b"iloc" => BoxKind::Iloc,
            b"ipma" => BoxKind::Ipma,

            b"infe" => BoxKind::Infe,

            b"avc1" => BoxKind::Avc1,
            b"stxt" => BoxKind::Stxt,
            b"mett" => BoxKind::Mett,
            b"sbtt" => BoxKind::Sbtt,

            b"pasp" => BoxKind::Pasp,
            b"clap" => BoxKind::Clap,
            b"hvcC" => BoxKind::HvcC,

            b"url " => BoxKind::Url,
            b"urn " => BoxKind::Urn,

            _ => BoxKind::Unknown,
        }
    }
}

/// How a box's children, if any, are bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildPolicy {
    /// No children.
    None,
    /// Children fill the rest of the declared extent.
    ToEnd,
    /// Exactly `entry_count` children (the count field is slot 0).
    Counted,
    /// `infe`: one child, present only when an extension type is declared.
    ExtensionGated,
    /// `iref`: children's concrete layout chosen by this box's version.
    VersionDispatched,
}

impl BoxKind {
    /// Does the header carry the 8-bit version + 24-bit flags extension?
    pub fn is_full_box(&self) -> bool {
        matches!(
            self,
            BoxKind::Meta
                | BoxKind::Mvhd
                | BoxKind::Tkhd
                | BoxKind::Mdhd
                | BoxKind::Hdlr
                | BoxKind::Vmhd
                | BoxKind::Nmhd
                | BoxKind::Sthd
                | BoxKind::Pitm
                | BoxKind::Stsd
                | BoxKind::Dref
                | BoxKind::Iinf
                | BoxKind::Stts
                | BoxKind::Ctts
                | BoxKind::Stsz
                | BoxKind::Stsc
                | BoxKind::Stco
                | BoxKind::Co64
                | BoxKind::Elst
                | BoxKind::Iloc
                | BoxKind::Ipma
                | BoxKind::Infe
                | BoxKind::Iref
                | BoxKind::Url
                | BoxKind::Urn
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            BoxKind::Moov
                | BoxKind::Meta
                | BoxKind::Trak
                | BoxKind::Mdia
                | BoxKind::Minf
                | BoxKind::Stbl
                | BoxKind::Dinf
                | BoxKind::Edts
                | BoxKind::Iprp
                | BoxKind::Ipco
                | BoxKind::Iref
        )
    }

    /// Child arrays whose element count is a fields-list slot.
    pub fn has_counted_children(&self) -> bool {
        matches!(self, BoxKind::Stsd | BoxKind::Dref | BoxKind::Iinf)
    }

    pub fn child_policy(&self) -> ChildPolicy {
        match self {
            k if k.is_container() => {
                if *k == BoxKind::Iref {
                    ChildPolicy::VersionDispatched
                } else {
                    ChildPolicy::ToEnd
                }
            }
            BoxKind::Stsd | BoxKind::Dref | BoxKind::Iinf => ChildPolicy::Counted,
            BoxKind::Infe => ChildPolicy::ExtensionGated,
            BoxKind::Avc1 | BoxKind::Stxt | BoxKind::Mett | BoxKind::Sbtt => ChildPolicy::ToEnd,
            _ => ChildPolicy::None,
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            BoxKind::Ftyp => "File Type Box",
            BoxKind::Mdat => "Media Data Box",
            BoxKind::Idat => "Item Data Box",
            BoxKind::Moov => "Movie Box",
            BoxKind::Meta => "Meta Box",
            BoxKind::Trak => "Track Box",
            BoxKind::Mdia => "Media Box",
            BoxKind::Minf => "Media Information Box",
            BoxKind::Stbl => "Sample Table Box",
            BoxKind::Dinf => "Data Information Box",
            BoxKind::Edts => "Edit Box",
            BoxKind::Iprp => "Item Properties Box",
            BoxKind::Ipco => "Item Property Container Box",
            BoxKind::Iref => "Item Reference Box",
            BoxKind::Mvhd => "Movie Header Box",
            BoxKind::Tkhd => "Track Header Box",
            BoxKind::Mdhd => "Media Header Box",
            BoxKind::Hdlr => "Handler Reference Box",
            BoxKind::Vmhd => "Video Media Header Box",
            BoxKind::Nmhd => "Null Media Header Box",
            BoxKind::Sthd => "Subtitle Media Header Box",
            BoxKind::Pitm => "Primary Item Box",
            BoxKind::Stsd => "Sample Description Box",
            BoxKind::Dref => "Data Reference Box",
            BoxKind::Iinf => "Item Information Box",
            BoxKind::Stts => "Decoding Time to Sample Box",
            BoxKind::Ctts => "Composition Offset Box",
            BoxKind::Stsz => "Sample Size Box",
            BoxKind::Stsc => "Sample To Chunk Box",
            BoxKind::Stco => "Chunk Offset Box",
            BoxKind::Co64 => "64-bit Chunk Offset Box",
            BoxKind::Elst => "Edit List Box",
            BoxKind::Iloc => "Item Location Box",
            BoxKind::Ipma => "Item Property Association Box",
            BoxKind::Infe => "Item Info Entry Box",
            BoxKind::Avc1 => "AVC Sample Entry",
            BoxKind::Stxt => "Simple Text Sample Entry",
            BoxKind::Mett => "Text Metadata Sample Entry",
            BoxKind::Sbtt => "Text Subtitle Sample Entry",
            BoxKind::Pasp => "Pixel Aspect Ratio Box",
            BoxKind::Clap => "Clean Aperture Box",
            BoxKind::HvcC => "HEVC Configuration Box",
            BoxKind::Url => "Data Entry URL Box",
            BoxKind::Urn => "Data Entry URN Box",
            BoxKind::ItemRef => "Single Item Type Reference Box",
            BoxKind::ItemRefLarge => "Single Item Type Reference Box (large)",
            BoxKind::Unknown => "Unknown Box",
        }
    }
}

/// Read a box's own typed content (never its children, never deferred bulk).
pub(crate) fn parse_content(
    kind: BoxKind,
    cur: &mut BitCursor<'_>,
    header: &BoxHeader,
) -> Result<BoxContent> {
    Ok(match kind {
        BoxKind::Ftyp => BoxContent::Fields(ftyp::parse(cur, header)?),
        BoxKind::Mvhd => BoxContent::Fields(mvhd::parse(cur, header)?),
        BoxKind::Tkhd => BoxContent::Fields(tkhd::parse(cur, header)?),
        BoxKind::Mdhd => BoxContent::Fields(mdhd::parse(cur, header)?),
        BoxKind::Hdlr => BoxContent::Fields(hdlr::parse(cur)?),
        BoxKind::Vmhd => BoxContent::Fields(vmhd::parse(cur)?),
        BoxKind::Nmhd | BoxKind::Sthd => BoxContent::Fields(FieldsList::new(Vec::new())),
        BoxKind::Pitm => BoxContent::Fields(pitm::parse(cur, header)?),
        BoxKind::Pasp => BoxContent::Fields(pasp::parse(cur)?),
        BoxKind::Clap => BoxContent::Fields(clap::parse(cur)?),
        BoxKind::HvcC => BoxContent::Fields(hvcc::parse(cur)?),
        BoxKind::Url => BoxContent::Fields(url::parse(cur, header)?),
        BoxKind::Urn => BoxContent::Fields(urn::parse(cur, header)?),
        BoxKind::ItemRef => BoxContent::Fields(item_ref::parse(cur)?),
        BoxKind::ItemRefLarge => BoxContent::Fields(item_ref::parse_large(cur)?),

        BoxKind::Stsd | BoxKind::Dref => {
            BoxContent::FieldsAndChildren {
                fields: entry_counted::parse(cur)?,
                children: Vec::new(),
            }
        }
        BoxKind::Iinf => BoxContent::FieldsAndChildren {
            fields: iinf::parse(cur, header)?,
            children: Vec::new(),
        },
        BoxKind::Infe => BoxContent::FieldsAndChildren {
            fields: infe::parse(cur, header)?,
            children: Vec::new(),
        },
        BoxKind::Avc1 => BoxContent::FieldsAndChildren {
            fields: visual_sample_entry::parse(cur)?,
            children: Vec::new(),
        },
        BoxKind::Stxt | BoxKind::Mett | BoxKind::Sbtt => BoxContent::FieldsAndChildren {
            fields: text_sample_entry::parse(cur)?,
            children: Vec::new(),
        },

        BoxKind::Elst => entry_table(FlatKind::Elst, cur, header)?,
        BoxKind::Stts => entry_table(FlatKind::Stts, cur, header)?,
        BoxKind::Ctts => entry_table(FlatKind::Ctts, cur, header)?,
        BoxKind::Stsz => entry_table(FlatKind::Stsz, cur, header)?,
        BoxKind::Stsc => entry_table(FlatKind::Stsc, cur, header)?,
        BoxKind::Stco => entry_table(FlatKind::Stco, cur, header)?,
        BoxKind::Co64 => entry_table(FlatKind::Co64, cur, header)?,
        BoxKind::Iloc => {
            let mut data = EntryData::Iloc(IlocTable::new());
            data.parse_fixed(cur, header)?;
            BoxContent::Entries(data)
        }
        BoxKind::Ipma => {
            let mut data = EntryData::Ipma(IpmaTable::new());
            data.parse_fixed(cur, header)?;
            BoxContent::Entries(data)
        }

        k if k.is_container() => BoxContent::Container {
            children: Vec::new(),
        },

        _ => BoxContent::Opaque(None),
    })
}

fn entry_table(kind: FlatKind, cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<BoxContent> {
    let mut data = EntryData::Flat(FlatTable::new(kind));
    data.parse_fixed(cur, header)?;
    Ok(BoxContent::Entries(data))
}

pub mod ftyp {
    use super::*;

    pub const MAJOR_BRAND: usize = 0;
    pub const MINOR_VERSION: usize = 1;
    pub const COMPATIBLE_BRANDS: usize = 2;

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![Field::uint(32), Field::uint(32), Field::uint_list(32)])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        f.read(MAJOR_BRAND, cur)?;
        f.read(MINOR_VERSION, cur)?;
        f.read_list(COMPATIBLE_BRANDS, cur, header.end_pos() * 8)?;
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::new(FourCC(*b"ftyp")),
            BoxKind::Ftyp,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod mvhd {
    use super::*;

    pub const CREATION_TIME: usize = 0;
    pub const MODIFICATION_TIME: usize = 1;
    pub const TIMESCALE: usize = 2;
    pub const DURATION: usize = 3;
    pub const RATE: usize = 4;
    pub const VOLUME: usize = 5;
    pub const RESERVED0: usize = 6;
    pub const RESERVED1: usize = 7;
    pub const MATRIX: usize = 8;
    pub const PRE_DEFINED: usize = 9;
    pub const NEXT_TRACK_ID: usize = 10;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![
            Field::uint(64),
            Field::uint(64),
            Field::uint(32),
            Field::uint(64),
            Field::uint_list(16),
            Field::uint_list(8),
            Field::uint(16),
            Field::uint_list(32),
            Field::uint_list(32),
            Field::uint_list(32),
            Field::uint(32),
        ]);
        f.set(RESERVED0, Value::Uint(0));
        f.set(RESERVED1, Value::UintList(vec![0, 0]));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        if header.version() == Some(1) {
            f.read(CREATION_TIME, cur)?;
            f.read(MODIFICATION_TIME, cur)?;
            f.read(TIMESCALE, cur)?;
            f.read(DURATION, cur)?;
        } else {
            f.read_with(CREATION_TIME, cur, Encoding::Uint(32))?;
            f.read_with(MODIFICATION_TIME, cur, Encoding::Uint(32))?;
            f.read(TIMESCALE, cur)?;
            f.read_with(DURATION, cur, Encoding::Uint(32))?;
        }
        f.read_list_len(RATE, cur, 32)?;
        f.read_list_len(VOLUME, cur, 16)?;
        f.read(RESERVED0, cur)?;
        f.read_list_len(RESERVED1, cur, 64)?;
        f.read_list_len(MATRIX, cur, 32 * 9)?;
        f.read_list_len(PRE_DEFINED, cur, 32 * 6)?;
        f.read(NEXT_TRACK_ID, cur)?;
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"mvhd"), 0, 0),
            BoxKind::Mvhd,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod tkhd {
    use super::*;

    pub const CREATION_TIME: usize = 0;
    pub const MODIFICATION_TIME: usize = 1;
    pub const TRACK_ID: usize = 2;
    pub const RESERVED0: usize = 3;
    pub const DURATION: usize = 4;
    pub const RESERVED1: usize = 5;
    pub const LAYER: usize = 6;
    pub const ALTERNATE_GROUP: usize = 7;
    pub const VOLUME: usize = 8;
    pub const RESERVED2: usize = 9;
    pub const MATRIX: usize = 10;
    pub const WIDTH: usize = 11;
    pub const HEIGHT: usize = 12;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![
            Field::uint(64),
            Field::uint(64),
            Field::uint(32),
            Field::uint(32),
            Field::uint(64),
            Field::uint_list(32),
            Field::uint(16),
            Field::uint(16),
            Field::uint_list(8),
            Field::uint(16),
            Field::uint_list(32),
            Field::uint_list(16),
            Field::uint_list(16),
        ]);
        f.set(RESERVED0, Value::Uint(0));
        f.set(RESERVED1, Value::UintList(vec![0, 0]));
        f.set(RESERVED2, Value::Uint(0));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        if header.version() == Some(1) {
            f.read(CREATION_TIME, cur)?;
            f.read(MODIFICATION_TIME, cur)?;
            f.read(TRACK_ID, cur)?;
            f.read(RESERVED0, cur)?;
            f.read(DURATION, cur)?;
        } else {
            f.read_with(CREATION_TIME, cur, Encoding::Uint(32))?;
            f.read_with(MODIFICATION_TIME, cur, Encoding::Uint(32))?;
            f.read(TRACK_ID, cur)?;
            f.read(RESERVED0, cur)?;
            f.read_with(DURATION, cur, Encoding::Uint(32))?;
        }
        f.read_list_len(RESERVED1, cur, 64)?;
        f.read(LAYER, cur)?;
        f.read(ALTERNATE_GROUP, cur)?;
        f.read_list_len(VOLUME, cur, 16)?;
        f.read(RESERVED2, cur)?;
        f.read_list_len(MATRIX, cur, 32 * 9)?;
        f.read_list_len(WIDTH, cur, 32)?;
        f.read_list_len(HEIGHT, cur, 32)?;
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"tkhd"), 0, 0),
            BoxKind::Tkhd,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod mdhd {
    use super::*;

    pub const CREATION_TIME: usize = 0;
    pub const MODIFICATION_TIME: usize = 1;
    pub const TIMESCALE: usize = 2;
    pub const DURATION: usize = 3;
    pub const PAD: usize = 4;
    pub const LANGUAGE: usize = 5;
    pub const PRE_DEFINED: usize = 6;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![
            Field::uint(64),
            Field::uint(64),
            Field::uint(32),
            Field::uint(64),
            Field::uint(1),
            Field::uint_list(5),
            Field::uint(16),
        ]);
        f.set(PAD, Value::Uint(1));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        if header.version() == Some(1) {
            f.read(CREATION_TIME, cur)?;
            f.read(MODIFICATION_TIME, cur)?;
            f.read(TIMESCALE, cur)?;
            f.read(DURATION, cur)?;
        } else {
            f.read_with(CREATION_TIME, cur, Encoding::Uint(32))?;
            f.read_with(MODIFICATION_TIME, cur, Encoding::Uint(32))?;
            f.read(TIMESCALE, cur)?;
            f.read_with(DURATION, cur, Encoding::Uint(32))?;
        }
        f.read(PAD, cur)?;
        f.read_list_len(LANGUAGE, cur, 15)?;
        f.read(PRE_DEFINED, cur)?;
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"mdhd"), 0, 0),
            BoxKind::Mdhd,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod hdlr {
    use super::*;

    pub const PRE_DEFINED: usize = 0;
    pub const HANDLER_TYPE: usize = 1;
    pub const RESERVED: usize = 2;
    pub const NAME: usize = 3;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![
            Field::uint(32),
            Field::bytes(4),
            Field::uint_list(32),
            Field::cstring(),
        ]);
        f.set(RESERVED, Value::UintList(vec![0, 0, 0]));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        f.read(PRE_DEFINED, cur)?;
        f.read(HANDLER_TYPE, cur)?;
        f.read_list_len(RESERVED, cur, 32 * 3)?;
        f.read(NAME, cur)?;
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"hdlr"), 0, 0),
            BoxKind::Hdlr,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod vmhd {
    use super::*;

    pub const GRAPHICSMODE: usize = 0;
    pub const OPCOLOR: usize = 1;

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![Field::uint(16), Field::uint_list(16)])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        f.read(GRAPHICSMODE, cur)?;
        f.read_list_len(OPCOLOR, cur, 48)?;
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"vmhd"), 0, 1),
            BoxKind::Vmhd,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod pitm {
    use super::*;

    pub const ITEM_ID: usize = 0;

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![Field::uint(32)])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        if header.version() == Some(0) {
            f.read_with(ITEM_ID, cur, Encoding::Uint(16))?;
        } else {
            f.read(ITEM_ID, cur)?;
        }
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"pitm"), 0, 0),
            BoxKind::Pitm,
            BoxContent::Fields(fields()),
        )
    }
}

/// Shared layout of `stsd` and `dref`: a 32-bit entry count followed by the
/// counted child boxes.
pub mod entry_counted {
    use super::*;

    pub const ENTRY_COUNT: usize = 0;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![Field::uint(32)]);
        f.set(ENTRY_COUNT, Value::Uint(0));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        f.read(ENTRY_COUNT, cur)?;
        Ok(f)
    }
}

pub fn new_stsd() -> Mp4Box {
    Mp4Box::new(
        BoxHeader::full(FourCC(*b"stsd"), 0, 0),
        BoxKind::Stsd,
        BoxContent::FieldsAndChildren {
            fields: entry_counted::fields(),
            children: Vec::new(),
        },
    )
}

pub fn new_dref() -> Mp4Box {
    Mp4Box::new(
        BoxHeader::full(FourCC(*b"dref"), 0, 0),
        BoxKind::Dref,
        BoxContent::FieldsAndChildren {
            fields: entry_counted::fields(),
            children: Vec::new(),
        },
    )
}

pub mod iinf {
    use super::*;

    pub const ENTRY_COUNT: usize = 0;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![Field::uint(32)]);
        f.set(ENTRY_COUNT, Value::Uint(0));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        if header.version() == Some(0) {
            f.read_with(ENTRY_COUNT, cur, Encoding::Uint(16))?;
        } else {
            f.read(ENTRY_COUNT, cur)?;
        }
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"iinf"), 0, 0),
            BoxKind::Iinf,
            BoxContent::FieldsAndChildren {
                fields: fields(),
                children: Vec::new(),
            },
        )
    }
}

pub mod infe {
    use super::*;

    pub const ITEM_ID: usize = 0;
    pub const ITEM_PROTECTION_INDEX: usize = 1;
    pub const ITEM_TYPE: usize = 2;
    pub const ITEM_NAME: usize = 3;
    pub const ITEM_URI_TYPE: usize = 4;
    pub const CONTENT_TYPE: usize = 5;
    pub const CONTENT_ENCODING: usize = 6;
    pub const EXTENSION_TYPE: usize = 7;

    pub const ITEM_TYPE_MIME: u64 = 0x6D69_6D65; // b"mime"
    pub const ITEM_TYPE_URI: u64 = 0x7572_6920; // b"uri "

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![
            Field::uint(32),
            Field::uint(16),
            Field::uint(32),
            Field::cstring(),
            Field::cstring(),
            Field::cstring(),
            Field::cstring(),
            Field::uint(32),
        ])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        let version = header.version().unwrap_or(0);
        let end = header.end_pos();

        match version {
            0 | 1 => {
                f.read_with(ITEM_ID, cur, Encoding::Uint(16))?;
                f.read(ITEM_PROTECTION_INDEX, cur)?;
                f.read(ITEM_NAME, cur)?;
                f.read(CONTENT_TYPE, cur)?;
                if cur.byte_pos() < end {
                    f.read(CONTENT_ENCODING, cur)?;
                }
                if version == 1 && cur.byte_pos() < end {
                    f.read(EXTENSION_TYPE, cur)?;
                }
            }
            _ => {
                if version == 2 {
                    f.read_with(ITEM_ID, cur, Encoding::Uint(16))?;
                } else {
                    f.read(ITEM_ID, cur)?;
                }
                f.read(ITEM_PROTECTION_INDEX, cur)?;
                f.read(ITEM_TYPE, cur)?;
                f.read(ITEM_NAME, cur)?;
                match f.uint(ITEM_TYPE) {
                    Some(ITEM_TYPE_MIME) => {
                        f.read(CONTENT_TYPE, cur)?;
                        if cur.byte_pos() < end {
                            f.read(CONTENT_ENCODING, cur)?;
                        }
                    }
                    Some(ITEM_TYPE_URI) => {
                        f.read(ITEM_URI_TYPE, cur)?;
                    }
                    // hvc1 / grid / Exif item payloads stay as padding
                    _ => {}
                }
            }
        }
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"infe"), 2, 0),
            BoxKind::Infe,
            BoxContent::FieldsAndChildren {
                fields: fields(),
                children: Vec::new(),
            },
        )
    }
}

/// Visual sample entry (`avc1` and friends): the common sample-entry
/// preamble plus the visual geometry fields.
pub mod visual_sample_entry {
    use super::*;

    pub const RESERVED0: usize = 0;
    pub const DATA_REFERENCE_INDEX: usize = 1;
    pub const PRE_DEFINED0: usize = 2;
    pub const RESERVED1: usize = 3;
    pub const PRE_DEFINED1: usize = 4;
    pub const WIDTH: usize = 5;
    pub const HEIGHT: usize = 6;
    pub const HORIZRESOLUTION: usize = 7;
    pub const VERTRESOLUTION: usize = 8;
    pub const RESERVED2: usize = 9;
    pub const FRAME_COUNT: usize = 10;
    pub const COMPRESSORNAME: usize = 11;
    pub const DEPTH: usize = 12;
    pub const PRE_DEFINED2: usize = 13;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![
            Field::uint_list(8),
            Field::uint(16),
            Field::uint(16),
            Field::uint(16),
            Field::uint_list(32),
            Field::uint(16),
            Field::uint(16),
            Field::uint_list(16),
            Field::uint_list(16),
            Field::uint(32),
            Field::uint(16),
            Field::bytes(32),
            Field::uint(16),
            Field::uint(16),
        ]);
        f.set(RESERVED0, Value::UintList(vec![0; 6]));
        f.set(PRE_DEFINED0, Value::Uint(0));
        f.set(RESERVED1, Value::Uint(0));
        f.set(PRE_DEFINED1, Value::UintList(vec![0, 0, 0]));
        f.set(RESERVED2, Value::Uint(0));
        f.set(PRE_DEFINED2, Value::Uint(0xFFFF));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        f.read_list_len(RESERVED0, cur, 48)?;
        f.read(DATA_REFERENCE_INDEX, cur)?;
        f.read(PRE_DEFINED0, cur)?;
        f.read(RESERVED1, cur)?;
        f.read_list_len(PRE_DEFINED1, cur, 96)?;
        f.read(WIDTH, cur)?;
        f.read(HEIGHT, cur)?;
        f.read_list_len(HORIZRESOLUTION, cur, 32)?;
        f.read_list_len(VERTRESOLUTION, cur, 32)?;
        f.read(RESERVED2, cur)?;
        f.read(FRAME_COUNT, cur)?;
        f.read(COMPRESSORNAME, cur)?;
        f.read(DEPTH, cur)?;
        f.read(PRE_DEFINED2, cur)?;
        Ok(f)
    }

    pub fn new_avc1() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::new(FourCC(*b"avc1")),
            BoxKind::Avc1,
            BoxContent::FieldsAndChildren {
                fields: fields(),
                children: Vec::new(),
            },
        )
    }
}

/// `stxt` / `mett` / `sbtt`: sample-entry preamble + two terminated strings.
pub mod text_sample_entry {
    use super::*;

    pub const RESERVED0: usize = 0;
    pub const DATA_REFERENCE_INDEX: usize = 1;
    pub const CONTENT_ENCODING: usize = 2;
    pub const MIME_FORMAT: usize = 3;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![
            Field::uint_list(8),
            Field::uint(16),
            Field::cstring(),
            Field::cstring(),
        ]);
        f.set(RESERVED0, Value::UintList(vec![0; 6]));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        f.read_list_len(RESERVED0, cur, 48)?;
        f.read(DATA_REFERENCE_INDEX, cur)?;
        f.read(CONTENT_ENCODING, cur)?;
        f.read(MIME_FORMAT, cur)?;
        Ok(f)
    }

    pub fn new(tag: FourCC) -> Mp4Box {
        Mp4Box::new(
            BoxHeader::new(tag),
            BoxKind::from(tag),
            BoxContent::FieldsAndChildren {
                fields: fields(),
                children: Vec::new(),
            },
        )
    }
}

pub mod url {
    use super::*;

    pub const LOCATION: usize = 0;

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![Field::cstring()])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        // zero remaining bytes means the location was never written
        if cur.byte_pos() < header.end_pos() {
            f.read(LOCATION, cur)?;
        }
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"url "), 0, 1),
            BoxKind::Url,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod urn {
    use super::*;

    pub const NAME: usize = 0;
    pub const LOCATION: usize = 1;

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![Field::cstring(), Field::cstring()])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<FieldsList> {
        let mut f = fields();
        f.read(NAME, cur)?;
        if cur.byte_pos() < header.end_pos() {
            f.read(LOCATION, cur)?;
        }
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::full(FourCC(*b"urn "), 0, 0),
            BoxKind::Urn,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod pasp {
    use super::*;

    pub const H_SPACING: usize = 0;
    pub const V_SPACING: usize = 1;

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![Field::uint(32), Field::uint(32)])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        f.read(H_SPACING, cur)?;
        f.read(V_SPACING, cur)?;
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::new(FourCC(*b"pasp")),
            BoxKind::Pasp,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod clap {
    use super::*;

    pub const CLEAN_APERTURE_WIDTH_N: usize = 0;
    pub const CLEAN_APERTURE_WIDTH_D: usize = 1;
    pub const CLEAN_APERTURE_HEIGHT_N: usize = 2;
    pub const CLEAN_APERTURE_HEIGHT_D: usize = 3;
    pub const HORIZ_OFF_N: usize = 4;
    pub const HORIZ_OFF_D: usize = 5;
    pub const VERT_OFF_N: usize = 6;
    pub const VERT_OFF_D: usize = 7;

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![
            Field::uint(32),
            Field::uint(32),
            Field::uint(32),
            Field::uint(32),
            Field::int(32),
            Field::uint(32),
            Field::int(32),
            Field::uint(32),
        ])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        for i in 0..f.slot_count() {
            f.read(i, cur)?;
        }
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::new(FourCC(*b"clap")),
            BoxKind::Clap,
            BoxContent::Fields(fields()),
        )
    }
}

pub mod hvcc {
    use super::*;

    pub const CONFIGURATION_VERSION: usize = 0;
    pub const GENERAL_PROFILE_SPACE: usize = 1;
    pub const GENERAL_TIER_FLAG: usize = 2;
    pub const GENERAL_PROFILE_IDC: usize = 3;
    pub const GENERAL_PROFILE_COMPATIBILITY_FLAGS: usize = 4;
    pub const GENERAL_CONSTRAINT_INDICATOR_FLAGS: usize = 5;
    pub const GENERAL_LEVEL_IDC: usize = 6;
    pub const RESERVED0: usize = 7;
    pub const MIN_SPATIAL_SEGMENTATION_IDC: usize = 8;
    pub const RESERVED1: usize = 9;
    pub const PARALLELISM_TYPE: usize = 10;
    pub const RESERVED2: usize = 11;
    pub const CHROMA_FORMAT: usize = 12;
    pub const RESERVED3: usize = 13;
    pub const BIT_DEPTH_LUMA_MINUS_8: usize = 14;
    pub const RESERVED4: usize = 15;
    pub const BIT_DEPTH_CHROMA_MINUS_8: usize = 16;
    pub const AVG_FRAME_RATE: usize = 17;
    pub const CONSTANT_FRAME_RATE: usize = 18;
    pub const NUM_TEMPORAL_LAYERS: usize = 19;
    pub const TEMPORAL_ID_NESTED: usize = 20;
    pub const LENGTH_SIZE_MINUS_ONE: usize = 21;
    pub const NUM_OF_ARRAYS: usize = 22;

    pub fn fields() -> FieldsList {
        let mut f = FieldsList::new(vec![
            Field::uint(8),
            Field::uint(2),
            Field::uint(1),
            Field::uint(5),
            Field::uint(32),
            Field::uint(48),
            Field::uint(8),
            Field::uint(4),
            Field::uint(12),
            Field::uint(6),
            Field::uint(2),
            Field::uint(6),
            Field::uint(2),
            Field::uint(5),
            Field::uint(3),
            Field::uint(5),
            Field::uint(3),
            Field::uint(16),
            Field::uint(2),
            Field::uint(3),
            Field::uint(1),
            Field::uint(2),
            Field::uint(8),
        ]);
        f.set(RESERVED0, Value::Uint(0b1111));
        f.set(RESERVED1, Value::Uint(0b111111));
        f.set(RESERVED2, Value::Uint(0b111111));
        f.set(RESERVED3, Value::Uint(0b11111));
        f.set(RESERVED4, Value::Uint(0b11111));
        f.set(NUM_OF_ARRAYS, Value::Uint(0));
        f
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        for i in 0..f.slot_count() {
            f.read(i, cur)?;
        }
        Ok(f)
    }

    pub fn new() -> Mp4Box {
        Mp4Box::new(
            BoxHeader::new(FourCC(*b"hvcC")),
            BoxKind::HvcC,
            BoxContent::Fields(fields()),
        )
    }
}

/// `iref` children. Their tag names a reference kind (`dimg`, `thmb`, ...);
/// the 16- vs 32-bit item id layout is chosen by the parent's version.
pub mod item_ref {
    use super::*;

    pub const FROM_ITEM_ID: usize = 0;
    pub const REFERENCE_COUNT: usize = 1;
    pub const TO_ITEM_IDS: usize = 2;

    pub fn fields() -> FieldsList {
        FieldsList::new(vec![
            Field::uint(16),
            Field::uint(16),
            Field::uint_list(16),
        ])
    }

    pub fn fields_large() -> FieldsList {
        FieldsList::new(vec![
            Field::uint(32),
            Field::uint(16),
            Field::uint_list(32),
        ])
    }

    pub(crate) fn parse(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields();
        f.read(FROM_ITEM_ID, cur)?;
        f.read(REFERENCE_COUNT, cur)?;
        let count = f.uint(REFERENCE_COUNT).unwrap_or(0);
        f.read_list_len(TO_ITEM_IDS, cur, count * 16)?;
        Ok(f)
    }

    pub(crate) fn parse_large(cur: &mut BitCursor<'_>) -> Result<FieldsList> {
        let mut f = fields_large();
        f.read(FROM_ITEM_ID, cur)?;
        f.read(REFERENCE_COUNT, cur)?;
        let count = f.uint(REFERENCE_COUNT).unwrap_or(0);
        f.read_list_len(TO_ITEM_IDS, cur, count * 32)?;
        Ok(f)
    }

    pub fn new(tag: FourCC, large: bool) -> Mp4Box {
        let (kind, fields) = if large {
            (BoxKind::ItemRefLarge, fields_large())
        } else {
            (BoxKind::ItemRef, fields())
        };
        Mp4Box::new(BoxHeader::new(tag), kind, BoxContent::Fields(fields))
    }
}

pub fn new_container(tag: FourCC) -> Mp4Box {
    let kind = BoxKind::from(tag);
    let header = if kind.is_full_box() {
        BoxHeader::full(tag, 0, 0)
    } else {
        BoxHeader::new(tag)
    };
    Mp4Box::new(
        header,
        kind,
        BoxContent::Container {
            children: Vec::new(),
        },
    )
}

pub fn new_mdat() -> Mp4Box {
    let mut b = Mp4Box::new(
        BoxHeader::new(FourCC(*b"mdat")),
        BoxKind::Mdat,
        BoxContent::Opaque(None),
    );
    b.set_payload(Vec::new());
    b
}

pub fn new_elst() -> Mp4Box {
    new_flat_table(FourCC(*b"elst"), BoxKind::Elst, FlatKind::Elst)
}

pub fn new_stts() -> Mp4Box {
    new_flat_table(FourCC(*b"stts"), BoxKind::Stts, FlatKind::Stts)
}

pub fn new_ctts() -> Mp4Box {
    new_flat_table(FourCC(*b"ctts"), BoxKind::Ctts, FlatKind::Ctts)
}

pub fn new_stsz() -> Mp4Box {
    new_flat_table(FourCC(*b"stsz"), BoxKind::Stsz, FlatKind::Stsz)
}

pub fn new_stsc() -> Mp4Box {
    new_flat_table(FourCC(*b"stsc"), BoxKind::Stsc, FlatKind::Stsc)
}

pub fn new_stco() -> Mp4Box {
    new_flat_table(FourCC(*b"stco"), BoxKind::Stco, FlatKind::Stco)
}

pub fn new_co64() -> Mp4Box {
    new_flat_table(FourCC(*b"co64"), BoxKind::Co64, FlatKind::Co64)
}

fn new_flat_table(tag: FourCC, kind: BoxKind, flat: FlatKind) -> Mp4Box {
    Mp4Box::new(
        BoxHeader::full(tag, 0, 0),
        kind,
        BoxContent::Entries(EntryData::Flat(FlatTable::new(flat))),
    )
}

pub fn new_iloc() -> Mp4Box {
    Mp4Box::new(
        BoxHeader::full(FourCC(*b"iloc"), 0, 0),
        BoxKind::Iloc,
        BoxContent::Entries(EntryData::Iloc(IlocTable::new())),
    )
}

pub fn new_ipma() -> Mp4Box {
    Mp4Box::new(
        BoxHeader::full(FourCC(*b"ipma"), 0, 0),
        BoxKind::Ipma,
        BoxContent::Entries(EntryData::Ipma(IpmaTable::new())),
    )
}
