use crate::bitio::{BitCursor, BitWriter};
use crate::entries::EntryData;
use crate::error::{Error, Result};
use crate::fields::{FieldsList, Value};
use crate::headers::BoxHeader;
use crate::known_boxes::BoxKind;

/// The typed payload of a box, one of a small set of shapes shared by the
/// whole catalogue.
#[derive(Debug)]
pub enum BoxContent {
    /// A fields list and nothing else (`ftyp`, `mvhd`, `tkhd`, ...).
    Fields(FieldsList),
    /// Child boxes only (`moov`, `trak`, `stbl`, ...).
    Container { children: Vec<Mp4Box> },
    /// Leading fields followed by child boxes: count-prefixed child arrays
    /// (`stsd`, `dref`, `iinf`), sample entries, `infe`.
    FieldsAndChildren {
        fields: FieldsList,
        children: Vec<Mp4Box>,
    },
    /// Fixed fields + a deferred entry table (`elst`, sample tables,
    /// `iloc`, `ipma`).
    Entries(EntryData),
    /// Raw payload, deferred until `load` (`mdat`, `idat`, unknown types).
    Opaque(Option<Vec<u8>>),
}

/// One node of the box tree: a header, a typed content shape, and any
/// trailing bytes of the declared extent no field claimed, preserved
/// verbatim so partially-understood boxes still re-serialize.
#[derive(Debug)]
pub struct Mp4Box {
    pub header: BoxHeader,
    pub kind: BoxKind,
    pub content: BoxContent,
    pub(crate) children_start: Option<u64>,
    padding: Vec<u8>,
}

impl Mp4Box {
    pub fn new(header: BoxHeader, kind: BoxKind, content: BoxContent) -> Self {
        Mp4Box {
            header,
            kind,
            content,
            children_start: None,
            padding: Vec::new(),
        }
    }

    pub fn padding(&self) -> &[u8] {
        &self.padding
    }

    pub fn set_padding(&mut self, padding: Vec<u8>) {
        self.padding = padding;
    }

    pub fn fields(&self) -> Option<&FieldsList> {
        match &self.content {
            BoxContent::Fields(f) => Some(f),
            BoxContent::FieldsAndChildren { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut FieldsList> {
        match &mut self.content {
            BoxContent::Fields(f) => Some(f),
            BoxContent::FieldsAndChildren { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Mp4Box] {
        match &self.content {
            BoxContent::Container { children } => children,
            BoxContent::FieldsAndChildren { children, .. } => children,
            _ => &[],
        }
    }

    pub(crate) fn children_vec_mut(&mut self) -> Option<&mut Vec<Mp4Box>> {
        match &mut self.content {
            BoxContent::Container { children } => Some(children),
            BoxContent::FieldsAndChildren { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&EntryData> {
        match &self.content {
            BoxContent::Entries(data) => Some(data),
            _ => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut EntryData> {
        match &mut self.content {
            BoxContent::Entries(data) => Some(data),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match &self.content {
            BoxContent::Opaque(p) => p.as_deref(),
            _ => None,
        }
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        if let BoxContent::Opaque(p) = &mut self.content {
            *p = Some(payload);
        }
    }

    /// Append a child; for count-prefixed child arrays the count field
    /// follows the collection.
    pub fn add_child(&mut self, child: Mp4Box) {
        let counted = self.kind.has_counted_children();
        match &mut self.content {
            BoxContent::FieldsAndChildren { fields, children } => {
                children.push(child);
                if counted {
                    fields.set(0, Value::Uint(children.len() as u64));
                }
            }
            BoxContent::Container { children } => children.push(child),
            _ => {}
        }
    }

    pub fn pop_child(&mut self) -> Option<Mp4Box> {
        let counted = self.kind.has_counted_children();
        match &mut self.content {
            BoxContent::FieldsAndChildren { fields, children } => {
                let child = children.pop();
                if counted {
                    fields.set(0, Value::Uint(children.len() as u64));
                }
                child
            }
            BoxContent::Container { children } => children.pop(),
            _ => None,
        }
    }

    pub fn clear_children(&mut self) {
        let counted = self.kind.has_counted_children();
        match &mut self.content {
            BoxContent::FieldsAndChildren { fields, children } => {
                children.clear();
                if counted {
                    fields.set(0, Value::Uint(0));
                }
            }
            BoxContent::Container { children } => children.clear(),
            _ => {}
        }
    }

    /// Materialize whatever the framing pass deferred: opaque payloads and
    /// entry tables. Containers recurse into every child.
    pub fn load(&mut self, cur: &mut BitCursor<'_>) -> Result<()> {
        match &mut self.content {
            BoxContent::Opaque(payload) => {
                cur.set_byte_pos(self.header.start_pos() + self.header.header_size())?;
                let content = cur.read_bytes(self.header.content_size() as usize)?;
                *payload = Some(content);
                Ok(())
            }
            BoxContent::Entries(data) => {
                data.load(cur, &self.header)?;
                self.capture_padding(cur)
            }
            BoxContent::Container { children } | BoxContent::FieldsAndChildren { children, .. } => {
                for child in children {
                    child.load(cur)?;
                }
                Ok(())
            }
            BoxContent::Fields(_) => Ok(()),
        }
    }

    /// Claim the rest of this box's declared extent as verbatim padding.
    pub(crate) fn capture_padding(&mut self, cur: &mut BitCursor<'_>) -> Result<()> {
        let end = self.header.end_pos();
        let pos = cur.byte_pos();
        if pos < end {
            self.padding = cur.read_bytes((end - pos) as usize)?;
        }
        Ok(())
    }

    fn content_byte_len(&self) -> u64 {
        match &self.content {
            BoxContent::Fields(f) => f.byte_len(),
            BoxContent::Container { children } => {
                children.iter().map(|c| c.header.box_size()).sum()
            }
            BoxContent::FieldsAndChildren { fields, children } => {
                fields.byte_len() + children.iter().map(|c| c.header.box_size()).sum::<u64>()
            }
            BoxContent::Entries(data) => data.byte_len(),
            BoxContent::Opaque(payload) => match payload {
                Some(p) => p.len() as u64,
                None => self.header.content_size(),
            },
        }
    }

    /// Recompute every size in the subtree, children first, so each parent
    /// sums already-correct child sizes. Idempotent: a second call with no
    /// mutation in between produces identical header bytes.
    pub fn refresh_box_size(&mut self) {
        if let Some(children) = self.children_vec_mut() {
            for child in children {
                child.refresh_box_size();
            }
        }
        let content = self.content_byte_len();
        let padding = self.padding.len() as u64;
        self.header.update_box_size(content + padding);
    }

    fn check_counts(&self) -> Result<()> {
        match &self.content {
            BoxContent::Entries(data) => data.check_counts()?,
            BoxContent::FieldsAndChildren { fields, children } => {
                if self.kind.has_counted_children() {
                    let declared = fields.uint(0).unwrap_or(0);
                    if declared != children.len() as u64 {
                        return Err(Error::InconsistentCollectionState {
                            declared,
                            actual: children.len(),
                        });
                    }
                }
            }
            BoxContent::Opaque(None) => {
                // framed but never loaded; writing now would drop the payload
                if self.header.content_size() > 0 {
                    return Err(Error::InconsistentCollectionState {
                        declared: self.header.content_size(),
                        actual: 0,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        self.check_counts()?;
        self.header.write_into(w)?;
        match &self.content {
            BoxContent::Fields(f) => f.write_into(w)?,
            BoxContent::Container { children } => {
                for child in children {
                    child.write_into(w)?;
                }
            }
            BoxContent::FieldsAndChildren { fields, children } => {
                fields.write_into(w)?;
                for child in children {
                    child.write_into(w)?;
                }
            }
            BoxContent::Entries(data) => data.write_into(w)?,
            BoxContent::Opaque(payload) => {
                if let Some(p) = payload {
                    w.write_bytes(p)?;
                }
            }
        }
        w.write_bytes(&self.padding)?;
        Ok(())
    }

    /// Header bytes ++ content bytes ++ padding bytes. No implicit size
    /// refresh: call `refresh_box_size` first after mutating content.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut w = BitWriter::new();
        self.write_into(&mut w)?;
        Ok(w.finish())
    }
}
