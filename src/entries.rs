//! Count-prefixed entry collections: the second-pass payloads of the sample
//! tables, the edit list, and the HEIF item tables.
//!
//! Fixed fields are read when the owning box is framed; the bulk entry rows
//! are read only by an explicit `load`, so scanning a file never
//! materializes megabyte-scale tables. Counts and collections move together
//! through `push`/`pop`/`clear` — the count field is never independently
//! settable once entries exist, and serialization re-checks the pairing for
//! hand-built boxes.

use crate::bitio::{BitCursor, BitWriter};
use crate::error::{Error, Result};
use crate::fields::{Encoding, Field, FieldsList, Value};
use crate::headers::BoxHeader;

/// Row-table boxes that share the single-level fixed-fields + N-rows layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatKind {
    Elst,
    Stts,
    Ctts,
    Stsz,
    Stsc,
    Stco,
    Co64,
}

pub mod elst {
    pub const ENTRY_COUNT: usize = 0;

    pub const SEGMENT_DURATION: usize = 0;
    pub const MEDIA_TIME: usize = 1;
    pub const MEDIA_RATE_INTEGER: usize = 2;
    pub const MEDIA_RATE_FRACTION: usize = 3;
}

pub mod stts {
    pub const ENTRY_COUNT: usize = 0;

    pub const SAMPLE_COUNT: usize = 0;
    pub const SAMPLE_DELTA: usize = 1;
}

pub mod ctts {
    pub const ENTRY_COUNT: usize = 0;

    pub const SAMPLE_COUNT: usize = 0;
    pub const SAMPLE_OFFSET: usize = 1;
}

pub mod stsz {
    pub const SAMPLE_SIZE: usize = 0;
    pub const SAMPLE_COUNT: usize = 1;

    pub const ENTRY_SIZE: usize = 0;
}

pub mod stsc {
    pub const ENTRY_COUNT: usize = 0;

    pub const FIRST_CHUNK: usize = 0;
    pub const SAMPLES_PER_CHUNK: usize = 1;
    pub const SAMPLE_DESCRIPTION_INDEX: usize = 2;
}

pub mod stco {
    pub const ENTRY_COUNT: usize = 0;

    pub const CHUNK_OFFSET: usize = 0;
}

impl FlatKind {
    fn fixed_fields(self) -> FieldsList {
        match self {
            FlatKind::Stsz => FieldsList::new(vec![Field::uint(32), Field::uint(32)]),
            _ => FieldsList::new(vec![Field::uint(32)]),
        }
    }

    fn count_slot(self) -> usize {
        match self {
            FlatKind::Stsz => stsz::SAMPLE_COUNT,
            _ => 0,
        }
    }

    fn entry_fields(self) -> FieldsList {
        match self {
            FlatKind::Elst => FieldsList::new(vec![
                Field::uint(64),
                Field::uint(64),
                Field::uint(16),
                Field::uint(16),
            ]),
            FlatKind::Stts => FieldsList::new(vec![Field::uint(32), Field::uint(32)]),
            FlatKind::Ctts => FieldsList::new(vec![Field::uint(32), Field::uint(32)]),
            FlatKind::Stsz => FieldsList::new(vec![Field::uint(32)]),
            FlatKind::Stsc => {
                FieldsList::new(vec![Field::uint(32), Field::uint(32), Field::uint(32)])
            }
            FlatKind::Stco => FieldsList::new(vec![Field::uint(32)]),
            FlatKind::Co64 => FieldsList::new(vec![Field::uint(64)]),
        }
    }

    fn parse_entry(self, cur: &mut BitCursor<'_>, version: u8) -> Result<FieldsList> {
        let mut row = self.entry_fields();
        match self {
            FlatKind::Elst => {
                if version == 0 {
                    row.read_with(elst::SEGMENT_DURATION, cur, Encoding::Uint(32))?;
                    row.read_with(elst::MEDIA_TIME, cur, Encoding::Uint(32))?;
                } else {
                    row.read(elst::SEGMENT_DURATION, cur)?;
                    row.read(elst::MEDIA_TIME, cur)?;
                }
                row.read(elst::MEDIA_RATE_INTEGER, cur)?;
                row.read(elst::MEDIA_RATE_FRACTION, cur)?;
            }
            FlatKind::Ctts => {
                row.read(ctts::SAMPLE_COUNT, cur)?;
                // composition offsets go signed in version 1
                if version == 1 {
                    row.read_with(ctts::SAMPLE_OFFSET, cur, Encoding::Int(32))?;
                } else {
                    row.read(ctts::SAMPLE_OFFSET, cur)?;
                }
            }
            _ => {
                for i in 0..row.slot_count() {
                    row.read(i, cur)?;
                }
            }
        }
        Ok(row)
    }
}

/// Fixed fields + a flat run of equally-shaped rows.
#[derive(Debug, Clone)]
pub struct FlatTable {
    kind: FlatKind,
    fields: FieldsList,
    entries: Vec<FieldsList>,
    entries_start: Option<u64>,
}

impl FlatTable {
    pub fn new(kind: FlatKind) -> Self {
        let mut fields = kind.fixed_fields();
        fields.set(kind.count_slot(), Value::Uint(0));
        FlatTable {
            kind,
            fields,
            entries: Vec::new(),
            entries_start: None,
        }
    }

    pub fn kind(&self) -> FlatKind {
        self.kind
    }

    pub fn fields(&self) -> &FieldsList {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldsList {
        &mut self.fields
    }

    pub fn declared_count(&self) -> u64 {
        self.fields.uint(self.kind.count_slot()).unwrap_or(0)
    }

    pub fn entries(&self) -> &[FieldsList] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> &FieldsList {
        &self.entries[index]
    }

    /// Blank row with this table's nominal entry encodings.
    pub fn new_entry(&self) -> FieldsList {
        self.kind.entry_fields()
    }

    pub fn push(&mut self, entry: FieldsList) {
        self.entries.push(entry);
        self.sync_count();
    }

    pub fn pop(&mut self) -> Option<FieldsList> {
        let entry = self.entries.pop();
        self.sync_count();
        entry
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.sync_count();
    }

    fn sync_count(&mut self) {
        let slot = self.kind.count_slot();
        self.fields.set(slot, Value::Uint(self.entries.len() as u64));
    }

    pub(crate) fn parse_fixed(&mut self, cur: &mut BitCursor<'_>) -> Result<()> {
        for i in 0..self.fields.slot_count() {
            self.fields.read(i, cur)?;
        }
        self.entries_start = Some(cur.byte_pos());
        Ok(())
    }

    pub(crate) fn load(&mut self, cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<()> {
        let start = match self.entries_start {
            Some(pos) => pos,
            None => return Ok(()),
        };
        cur.set_byte_pos(start)?;
        // a constant sample size means there is no per-sample array
        if self.kind == FlatKind::Stsz && self.fields.uint(stsz::SAMPLE_SIZE) != Some(0) {
            return Ok(());
        }
        let version = header.version().unwrap_or(0);
        let kind = self.kind;
        let count = self.declared_count();
        self.entries = Vec::with_capacity(count.min(1 << 20) as usize);
        for _ in 0..count {
            self.entries.push(kind.parse_entry(cur, version)?);
        }
        Ok(())
    }

    fn check_counts(&self) -> Result<()> {
        if self.kind == FlatKind::Stsz
            && self.fields.uint(stsz::SAMPLE_SIZE) != Some(0)
            && self.entries.is_empty()
        {
            return Ok(());
        }
        let declared = self.declared_count();
        if declared != self.entries.len() as u64 {
            return Err(Error::InconsistentCollectionState {
                declared,
                actual: self.entries.len(),
            });
        }
        Ok(())
    }

    fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        self.fields.write_into(w)?;
        for entry in &self.entries {
            entry.write_into(w)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> u64 {
        self.fields.byte_len() + self.entries.iter().map(|e| e.byte_len()).sum::<u64>()
    }
}

pub mod iloc {
    pub const OFFSET_SIZE: usize = 0;
    pub const LENGTH_SIZE: usize = 1;
    pub const BASE_OFFSET_SIZE: usize = 2;
    pub const INDEX_SIZE: usize = 3;
    pub const RESERVED: usize = 4;
    pub const ITEM_COUNT: usize = 5;

    pub const ITEM_ID: usize = 0;
    pub const ITEM_RESERVED: usize = 1;
    pub const CONSTRUCTION_METHOD: usize = 2;
    pub const DATA_REFERENCE_INDEX: usize = 3;
    pub const BASE_OFFSET: usize = 4;
    pub const EXTENT_COUNT: usize = 5;

    pub const EXTENT_INDEX: usize = 0;
    pub const EXTENT_OFFSET: usize = 1;
    pub const EXTENT_LENGTH: usize = 2;
}

/// The four width selectors of an `iloc` box, in bytes. A selector of 0
/// means the corresponding field does not exist on the wire at all — not
/// that it is zero-valued.
#[derive(Debug, Clone, Copy)]
pub struct IlocWidths {
    pub offset_size: u8,
    pub length_size: u8,
    pub base_offset_size: u8,
    pub index_size: u8,
}

/// One located item: its fixed fields plus its extent rows.
#[derive(Debug, Clone)]
pub struct IlocItem {
    fields: FieldsList,
    extents: Vec<FieldsList>,
    widths: IlocWidths,
}

impl IlocItem {
    fn new(widths: IlocWidths) -> Self {
        IlocItem {
            fields: FieldsList::new(vec![
                Field::uint(32),
                Field::uint(12),
                Field::uint(4),
                Field::uint(16),
                Field::uint(64),
                Field::uint(16),
            ]),
            extents: Vec::new(),
            widths,
        }
    }

    fn parse(
        cur: &mut BitCursor<'_>,
        version: u8,
        widths: IlocWidths,
    ) -> Result<Self> {
        let mut item = IlocItem::new(widths);
        let f = &mut item.fields;
        if version < 2 {
            f.read_with(iloc::ITEM_ID, cur, Encoding::Uint(16))?;
        } else {
            f.read(iloc::ITEM_ID, cur)?;
        }
        if version == 1 || version == 2 {
            f.read(iloc::ITEM_RESERVED, cur)?;
            f.read(iloc::CONSTRUCTION_METHOD, cur)?;
        }
        f.read(iloc::DATA_REFERENCE_INDEX, cur)?;
        if widths.base_offset_size > 0 {
            f.read_with(
                iloc::BASE_OFFSET,
                cur,
                Encoding::Uint(widths.base_offset_size as u32 * 8),
            )?;
        }
        f.read(iloc::EXTENT_COUNT, cur)?;

        let extent_count = item.fields.uint(iloc::EXTENT_COUNT).unwrap_or(0);
        for _ in 0..extent_count {
            item.extents.push(Self::parse_extent(cur, version, widths)?);
        }
        Ok(item)
    }

    fn parse_extent(
        cur: &mut BitCursor<'_>,
        version: u8,
        widths: IlocWidths,
    ) -> Result<FieldsList> {
        let mut row = Self::extent_fields();
        if (version == 1 || version == 2) && widths.index_size > 0 {
            row.read_with(
                iloc::EXTENT_INDEX,
                cur,
                Encoding::Uint(widths.index_size as u32 * 8),
            )?;
        }
        if widths.offset_size > 0 {
            row.read_with(
                iloc::EXTENT_OFFSET,
                cur,
                Encoding::Uint(widths.offset_size as u32 * 8),
            )?;
        }
        if widths.length_size > 0 {
            row.read_with(
                iloc::EXTENT_LENGTH,
                cur,
                Encoding::Uint(widths.length_size as u32 * 8),
            )?;
        }
        Ok(row)
    }

    fn extent_fields() -> FieldsList {
        FieldsList::new(vec![Field::uint(64), Field::uint(64), Field::uint(64)])
    }

    pub fn fields(&self) -> &FieldsList {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldsList {
        &mut self.fields
    }

    pub fn item_id(&self) -> Option<u64> {
        self.fields.uint(iloc::ITEM_ID)
    }

    pub fn base_offset(&self) -> Option<u64> {
        self.fields.uint(iloc::BASE_OFFSET)
    }

    pub fn extents(&self) -> &[FieldsList] {
        &self.extents
    }

    /// Blank extent row with the table's selector widths pre-resolved;
    /// fields whose selector is 0 stay absent unless explicitly assigned.
    pub fn new_extent(&self) -> FieldsList {
        let mut row = Self::extent_fields();
        let w = self.widths;
        if w.index_size > 0 {
            row.set_encoding(iloc::EXTENT_INDEX, Encoding::Uint(w.index_size as u32 * 8));
        }
        if w.offset_size > 0 {
            row.set_encoding(iloc::EXTENT_OFFSET, Encoding::Uint(w.offset_size as u32 * 8));
        }
        if w.length_size > 0 {
            row.set_encoding(iloc::EXTENT_LENGTH, Encoding::Uint(w.length_size as u32 * 8));
        }
        row
    }

    pub fn push_extent(&mut self, extent: FieldsList) {
        self.extents.push(extent);
        self.sync_count();
    }

    pub fn pop_extent(&mut self) -> Option<FieldsList> {
        let extent = self.extents.pop();
        self.sync_count();
        extent
    }

    pub fn clear_extents(&mut self) {
        self.extents.clear();
        self.sync_count();
    }

    fn sync_count(&mut self) {
        self.fields
            .set(iloc::EXTENT_COUNT, Value::Uint(self.extents.len() as u64));
    }

    fn check_counts(&self) -> Result<()> {
        let declared = self.fields.uint(iloc::EXTENT_COUNT).unwrap_or(0);
        if declared != self.extents.len() as u64 {
            return Err(Error::InconsistentCollectionState {
                declared,
                actual: self.extents.len(),
            });
        }
        Ok(())
    }

    fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        self.fields.write_into(w)?;
        for extent in &self.extents {
            extent.write_into(w)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> u64 {
        self.fields.byte_len() + self.extents.iter().map(|e| e.byte_len()).sum::<u64>()
    }
}

/// Item-location table: width selectors + item count, then the deferred
/// item/extent rows.
#[derive(Debug, Clone)]
pub struct IlocTable {
    fields: FieldsList,
    items: Vec<IlocItem>,
    items_start: Option<u64>,
}

impl IlocTable {
    pub fn new() -> Self {
        let mut fields = Self::fixed_fields();
        fields.set(iloc::ITEM_COUNT, Value::Uint(0));
        IlocTable {
            fields,
            items: Vec::new(),
            items_start: None,
        }
    }

    fn fixed_fields() -> FieldsList {
        FieldsList::new(vec![
            Field::uint(4),
            Field::uint(4),
            Field::uint(4),
            Field::uint(4),
            Field::uint(4),
            Field::uint(32),
        ])
    }

    pub fn fields(&self) -> &FieldsList {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldsList {
        &mut self.fields
    }

    pub fn widths(&self) -> IlocWidths {
        IlocWidths {
            offset_size: self.fields.uint(iloc::OFFSET_SIZE).unwrap_or(0) as u8,
            length_size: self.fields.uint(iloc::LENGTH_SIZE).unwrap_or(0) as u8,
            base_offset_size: self.fields.uint(iloc::BASE_OFFSET_SIZE).unwrap_or(0) as u8,
            index_size: self.fields.uint(iloc::INDEX_SIZE).unwrap_or(0) as u8,
        }
    }

    pub fn declared_count(&self) -> u64 {
        self.fields.uint(iloc::ITEM_COUNT).unwrap_or(0)
    }

    pub fn items(&self) -> &[IlocItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> &IlocItem {
        &self.items[index]
    }

    pub fn item_mut(&mut self, index: usize) -> &mut IlocItem {
        &mut self.items[index]
    }

    pub fn new_item(&self) -> IlocItem {
        IlocItem::new(self.widths())
    }

    pub fn push_item(&mut self, item: IlocItem) {
        self.items.push(item);
        self.sync_count();
    }

    pub fn pop_item(&mut self) -> Option<IlocItem> {
        let item = self.items.pop();
        self.sync_count();
        item
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
        self.sync_count();
    }

    fn sync_count(&mut self) {
        self.fields
            .set(iloc::ITEM_COUNT, Value::Uint(self.items.len() as u64));
    }

    pub(crate) fn parse_fixed(
        &mut self,
        cur: &mut BitCursor<'_>,
        header: &BoxHeader,
    ) -> Result<()> {
        let version = header.version().unwrap_or(0);
        let f = &mut self.fields;
        f.read(iloc::OFFSET_SIZE, cur)?;
        f.read(iloc::LENGTH_SIZE, cur)?;
        f.read(iloc::BASE_OFFSET_SIZE, cur)?;
        if version == 1 || version == 2 {
            f.read(iloc::INDEX_SIZE, cur)?;
        } else {
            f.read(iloc::RESERVED, cur)?;
        }
        if version < 2 {
            f.read_with(iloc::ITEM_COUNT, cur, Encoding::Uint(16))?;
        } else {
            f.read(iloc::ITEM_COUNT, cur)?;
        }
        self.items_start = Some(cur.byte_pos());
        Ok(())
    }

    pub(crate) fn load(&mut self, cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<()> {
        let start = match self.items_start {
            Some(pos) => pos,
            None => return Ok(()),
        };
        cur.set_byte_pos(start)?;
        let version = header.version().unwrap_or(0);
        let widths = self.widths();
        let count = self.declared_count();
        self.items = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            self.items.push(IlocItem::parse(cur, version, widths)?);
        }
        Ok(())
    }

    fn check_counts(&self) -> Result<()> {
        let declared = self.declared_count();
        if declared != self.items.len() as u64 {
            return Err(Error::InconsistentCollectionState {
                declared,
                actual: self.items.len(),
            });
        }
        for item in &self.items {
            item.check_counts()?;
        }
        Ok(())
    }

    fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        self.fields.write_into(w)?;
        for item in &self.items {
            item.write_into(w)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> u64 {
        self.fields.byte_len() + self.items.iter().map(|i| i.byte_len()).sum::<u64>()
    }
}

impl Default for IlocTable {
    fn default() -> Self {
        Self::new()
    }
}

pub mod ipma {
    pub const ENTRY_COUNT: usize = 0;

    pub const ITEM_ID: usize = 0;
    pub const ASSOCIATION_COUNT: usize = 1;

    pub const ESSENTIAL: usize = 0;
    pub const INDEX_HIGH: usize = 1;
    pub const INDEX_LOW: usize = 2;
}

/// One item's property associations.
#[derive(Debug, Clone)]
pub struct IpmaEntry {
    fields: FieldsList,
    associations: Vec<FieldsList>,
}

impl IpmaEntry {
    pub fn new() -> Self {
        let mut fields = FieldsList::new(vec![Field::uint(32), Field::uint(8)]);
        fields.set(ipma::ASSOCIATION_COUNT, Value::Uint(0));
        IpmaEntry {
            fields,
            associations: Vec::new(),
        }
    }

    fn parse(cur: &mut BitCursor<'_>, version: u8, wide_index: bool) -> Result<Self> {
        let mut entry = IpmaEntry::new();
        if version < 1 {
            entry
                .fields
                .read_with(ipma::ITEM_ID, cur, Encoding::Uint(16))?;
        } else {
            entry.fields.read(ipma::ITEM_ID, cur)?;
        }
        entry.fields.read(ipma::ASSOCIATION_COUNT, cur)?;

        let count = entry.fields.uint(ipma::ASSOCIATION_COUNT).unwrap_or(0);
        for _ in 0..count {
            entry
                .associations
                .push(parse_association(cur, wide_index)?);
        }
        Ok(entry)
    }

    pub fn fields(&self) -> &FieldsList {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldsList {
        &mut self.fields
    }

    pub fn item_id(&self) -> Option<u64> {
        self.fields.uint(ipma::ITEM_ID)
    }

    pub fn associations(&self) -> &[FieldsList] {
        &self.associations
    }

    pub fn push_association(&mut self, association: FieldsList) {
        self.associations.push(association);
        self.sync_count();
    }

    pub fn pop_association(&mut self) -> Option<FieldsList> {
        let association = self.associations.pop();
        self.sync_count();
        association
    }

    pub fn clear_associations(&mut self) {
        self.associations.clear();
        self.sync_count();
    }

    fn sync_count(&mut self) {
        self.fields.set(
            ipma::ASSOCIATION_COUNT,
            Value::Uint(self.associations.len() as u64),
        );
    }

    fn check_counts(&self) -> Result<()> {
        let declared = self.fields.uint(ipma::ASSOCIATION_COUNT).unwrap_or(0);
        if declared != self.associations.len() as u64 {
            return Err(Error::InconsistentCollectionState {
                declared,
                actual: self.associations.len(),
            });
        }
        Ok(())
    }

    fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        self.fields.write_into(w)?;
        for association in &self.associations {
            association.write_into(w)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> u64 {
        self.fields.byte_len() + self.associations.iter().map(|a| a.byte_len()).sum::<u64>()
    }
}

impl Default for IpmaEntry {
    fn default() -> Self {
        Self::new()
    }
}

fn association_fields() -> FieldsList {
    FieldsList::new(vec![Field::uint(1), Field::uint(8), Field::uint(7)])
}

fn parse_association(cur: &mut BitCursor<'_>, wide_index: bool) -> Result<FieldsList> {
    let mut row = association_fields();
    row.read(ipma::ESSENTIAL, cur)?;
    if wide_index {
        row.read(ipma::INDEX_HIGH, cur)?;
        row.read(ipma::INDEX_LOW, cur)?;
    } else {
        row.read(ipma::INDEX_LOW, cur)?;
    }
    Ok(row)
}

/// Build an association row. With `wide_index` the 15-bit property index is
/// split big-endian across the 8-bit then 7-bit fields; without it the
/// index must fit 7 bits.
pub fn make_association(essential: bool, property_index: u16, wide_index: bool) -> FieldsList {
    let mut row = association_fields();
    row.set(ipma::ESSENTIAL, Value::Uint(essential as u64));
    if wide_index {
        row.set(ipma::INDEX_HIGH, Value::Uint((property_index >> 7) as u64));
        row.set(ipma::INDEX_LOW, Value::Uint((property_index & 0x7F) as u64));
    } else {
        row.set(ipma::INDEX_LOW, Value::Uint((property_index & 0x7F) as u64));
    }
    row
}

pub fn association_essential(row: &FieldsList) -> Option<bool> {
    row.uint(ipma::ESSENTIAL).map(|v| v == 1)
}

/// Recombined property index: `(high8 << 7) | low7` when the wide split is
/// present, else the plain 7-bit value.
pub fn association_property_index(row: &FieldsList) -> Option<u64> {
    let low = row.uint(ipma::INDEX_LOW)?;
    match row.uint(ipma::INDEX_HIGH) {
        Some(high) => Some((high << 7) | low),
        None => Some(low),
    }
}

/// Item-property-association table.
#[derive(Debug, Clone)]
pub struct IpmaTable {
    fields: FieldsList,
    entries: Vec<IpmaEntry>,
    entries_start: Option<u64>,
}

impl IpmaTable {
    pub fn new() -> Self {
        let mut fields = FieldsList::new(vec![Field::uint(32)]);
        fields.set(ipma::ENTRY_COUNT, Value::Uint(0));
        IpmaTable {
            fields,
            entries: Vec::new(),
            entries_start: None,
        }
    }

    pub fn fields(&self) -> &FieldsList {
        &self.fields
    }

    pub fn declared_count(&self) -> u64 {
        self.fields.uint(ipma::ENTRY_COUNT).unwrap_or(0)
    }

    pub fn entries(&self) -> &[IpmaEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> &IpmaEntry {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut IpmaEntry {
        &mut self.entries[index]
    }

    pub fn push_entry(&mut self, entry: IpmaEntry) {
        self.entries.push(entry);
        self.sync_count();
    }

    pub fn pop_entry(&mut self) -> Option<IpmaEntry> {
        let entry = self.entries.pop();
        self.sync_count();
        entry
    }

    pub fn clear_entries(&mut self) {
        self.entries.clear();
        self.sync_count();
    }

    fn sync_count(&mut self) {
        self.fields
            .set(ipma::ENTRY_COUNT, Value::Uint(self.entries.len() as u64));
    }

    pub(crate) fn parse_fixed(&mut self, cur: &mut BitCursor<'_>) -> Result<()> {
        self.fields.read(ipma::ENTRY_COUNT, cur)?;
        self.entries_start = Some(cur.byte_pos());
        Ok(())
    }

    pub(crate) fn load(&mut self, cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<()> {
        let start = match self.entries_start {
            Some(pos) => pos,
            None => return Ok(()),
        };
        cur.set_byte_pos(start)?;
        let version = header.version().unwrap_or(0);
        let wide_index = header.flags().unwrap_or(0) & 1 != 0;
        let count = self.declared_count();
        self.entries = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            self.entries.push(IpmaEntry::parse(cur, version, wide_index)?);
        }
        Ok(())
    }

    fn check_counts(&self) -> Result<()> {
        let declared = self.declared_count();
        if declared != self.entries.len() as u64 {
            return Err(Error::InconsistentCollectionState {
                declared,
                actual: self.entries.len(),
            });
        }
        for entry in &self.entries {
            entry.check_counts()?;
        }
        Ok(())
    }

    fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        self.fields.write_into(w)?;
        for entry in &self.entries {
            entry.write_into(w)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> u64 {
        self.fields.byte_len() + self.entries.iter().map(|e| e.byte_len()).sum::<u64>()
    }
}

impl Default for IpmaTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The variable sub-structure of one entry-table box.
#[derive(Debug, Clone)]
pub enum EntryData {
    Flat(FlatTable),
    Iloc(IlocTable),
    Ipma(IpmaTable),
}

impl EntryData {
    pub(crate) fn parse_fixed(
        &mut self,
        cur: &mut BitCursor<'_>,
        header: &BoxHeader,
    ) -> Result<()> {
        match self {
            EntryData::Flat(t) => t.parse_fixed(cur),
            EntryData::Iloc(t) => t.parse_fixed(cur, header),
            EntryData::Ipma(t) => t.parse_fixed(cur),
        }
    }

    pub(crate) fn load(&mut self, cur: &mut BitCursor<'_>, header: &BoxHeader) -> Result<()> {
        match self {
            EntryData::Flat(t) => t.load(cur, header),
            EntryData::Iloc(t) => t.load(cur, header),
            EntryData::Ipma(t) => t.load(cur, header),
        }
    }

    pub(crate) fn check_counts(&self) -> Result<()> {
        match self {
            EntryData::Flat(t) => t.check_counts(),
            EntryData::Iloc(t) => t.check_counts(),
            EntryData::Ipma(t) => t.check_counts(),
        }
    }

    pub(crate) fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        match self {
            EntryData::Flat(t) => t.write_into(w),
            EntryData::Iloc(t) => t.write_into(w),
            EntryData::Ipma(t) => t.write_into(w),
        }
    }

    pub(crate) fn byte_len(&self) -> u64 {
        match self {
            EntryData::Flat(t) => t.byte_len(),
            EntryData::Iloc(t) => t.byte_len(),
            EntryData::Ipma(t) => t.byte_len(),
        }
    }

    pub fn as_flat(&self) -> Option<&FlatTable> {
        match self {
            EntryData::Flat(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_flat_mut(&mut self) -> Option<&mut FlatTable> {
        match self {
            EntryData::Flat(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_iloc(&self) -> Option<&IlocTable> {
        match self {
            EntryData::Iloc(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_iloc_mut(&mut self) -> Option<&mut IlocTable> {
        match self {
            EntryData::Iloc(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_ipma(&self) -> Option<&IpmaTable> {
        match self {
            EntryData::Ipma(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_ipma_mut(&mut self) -> Option<&mut IpmaTable> {
        match self {
            EntryData::Ipma(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_table_count_tracks_entries() {
        let mut table = FlatTable::new(FlatKind::Stts);
        assert_eq!(table.declared_count(), 0);

        let mut row = table.new_entry();
        row.set(stts::SAMPLE_COUNT, Value::Uint(100));
        row.set(stts::SAMPLE_DELTA, Value::Uint(1024));
        table.push(row);
        assert_eq!(table.declared_count(), 1);

        table.pop();
        assert_eq!(table.declared_count(), 0);
    }

    #[test]
    fn hand_desynced_count_is_rejected() {
        let mut table = FlatTable::new(FlatKind::Stco);
        table.fields_mut().set(stco::ENTRY_COUNT, Value::Uint(3));
        assert!(matches!(
            table.check_counts(),
            Err(Error::InconsistentCollectionState {
                declared: 3,
                actual: 0
            })
        ));
    }

    #[test]
    fn association_index_recombines_big_endian() {
        let row = make_association(true, 0x83, true);
        assert_eq!(association_property_index(&row), Some(0x83));
        assert_eq!(row.uint(ipma::INDEX_HIGH), Some(1));
        assert_eq!(row.uint(ipma::INDEX_LOW), Some(3));

        let narrow = make_association(false, 3, false);
        assert_eq!(association_property_index(&narrow), Some(3));
        assert!(narrow.is_absent(ipma::INDEX_HIGH));
    }
}
