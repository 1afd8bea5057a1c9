use log::{debug, warn};

use crate::bitio::BitCursor;
use crate::boxes::{BoxContent, Mp4Box};
use crate::error::Result;
use crate::headers::BoxHeader;
use crate::known_boxes::{self, BoxKind, ChildPolicy, infe};
use crate::registry::{BoxKey, Registry};

/// Explicit iterator over the top-level boxes of a byte source: one
/// `next_box` (or `next_header`) call per box, consuming the cursor
/// monotonically. The sequence is finite and not restartable.
pub struct BoxReader<'a, 'd> {
    cur: &'a mut BitCursor<'d>,
    registry: &'a Registry,
    recursive: bool,
}

impl<'a, 'd> BoxReader<'a, 'd> {
    pub fn new(cur: &'a mut BitCursor<'d>, registry: &'a Registry) -> Self {
        BoxReader {
            cur,
            registry,
            recursive: true,
        }
    }

    /// Frame each child's own fields but do not descend into containers.
    pub fn non_recursive(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// Frame the next top-level box, dispatching on its type tag.
    pub fn next_box(&mut self) -> Result<Option<Mp4Box>> {
        if self.cur.remaining_bits() == 0 {
            return Ok(None);
        }
        let header = BoxHeader::parse(self.cur)?;
        debug!(
            "box {} at {} ({} bytes)",
            header.box_type(),
            header.start_pos(),
            header.box_size()
        );
        let parsed = parse_one(self.cur, header, self.registry, None, self.recursive)?;
        Ok(Some(parsed))
    }

    /// Framing information only: read one header and skip straight to the
    /// next sibling using the declared size. No per-type constructor runs.
    pub fn next_header(&mut self) -> Result<Option<BoxHeader>> {
        if self.cur.remaining_bits() == 0 {
            return Ok(None);
        }
        let header = BoxHeader::parse(self.cur)?;
        if let Err(e) = self.cur.set_byte_pos(header.end_pos()) {
            warn!("premature end of data after {} header", header.box_type());
            return Err(e);
        }
        Ok(Some(header))
    }
}

/// Frame every top-level box of `data`. Deferred payloads stay unread;
/// call `load` per box to materialize them.
pub fn parse_boxes(data: &[u8], registry: &Registry) -> Result<Vec<Mp4Box>> {
    let mut cur = BitCursor::new(data);
    let mut reader = BoxReader::new(&mut cur, registry);
    let mut boxes = Vec::new();
    while let Some(b) = reader.next_box()? {
        boxes.push(b);
    }
    Ok(boxes)
}

/// One successful headers-only step is what makes a plausible container.
pub fn is_bmff(data: &[u8]) -> bool {
    let mut cur = BitCursor::new(data);
    let registry = Registry::new();
    let mut reader = BoxReader::new(&mut cur, &registry);
    matches!(reader.next_header(), Ok(Some(_)))
}

/// Dispatch one already-read header: look the tag up, upgrade the header if
/// the kind is a full box, read the typed fields, then descend or skip. The
/// cursor always lands on the box's declared end, regardless of how many
/// bytes the layout consumed.
pub fn parse_one(
    cur: &mut BitCursor<'_>,
    mut header: BoxHeader,
    registry: &Registry,
    fallback: Option<BoxKind>,
    recursive: bool,
) -> Result<Mp4Box> {
    let kind = registry
        .lookup(&BoxKey::for_header(&header))
        .or(fallback)
        .unwrap_or(BoxKind::Unknown);

    if kind.is_full_box() {
        header.extend_full(cur)?;
    }

    let content = known_boxes::parse_content(kind, cur, &header)?;
    let mut parsed = Mp4Box::new(header, kind, content);

    let is_parent = matches!(
        parsed.content,
        BoxContent::Container { .. } | BoxContent::FieldsAndChildren { .. }
    );
    if is_parent {
        parsed.children_start = Some(cur.byte_pos());
        if recursive {
            parsed.parse_children(cur, registry, recursive)?;
        }
    } else if matches!(parsed.content, BoxContent::Fields(_)) {
        parsed.capture_padding(cur)?;
    }
    // entry rows and opaque payloads wait for an explicit load

    // re-sync to the declared end
    cur.set_byte_pos(parsed.header.end_pos())?;
    Ok(parsed)
}

/// Frame the next child header inside a parent's extent. A remainder too
/// short to hold a header, or a child whose declared end crosses the
/// parent's boundary, ends the child sequence: those bytes stay for the
/// parent to keep as padding, never read as a sibling's.
fn next_child_header(cur: &mut BitCursor<'_>, parent_end: u64) -> Result<Option<BoxHeader>> {
    let pos = cur.byte_pos();
    if pos >= parent_end || parent_end - pos < 8 {
        return Ok(None);
    }
    let header = BoxHeader::parse(cur)?;
    if header.end_pos() > parent_end {
        cur.set_byte_pos(pos)?;
        return Ok(None);
    }
    Ok(Some(header))
}

impl Mp4Box {
    /// Re-seek to where this box's child sequence begins and read children
    /// up to the declared extent; whatever the children leave unconsumed
    /// becomes padding, never a read into a sibling's bytes.
    pub fn parse_children(
        &mut self,
        cur: &mut BitCursor<'_>,
        registry: &Registry,
        recursive: bool,
    ) -> Result<()> {
        let start = self
            .children_start
            .unwrap_or(self.header.start_pos() + self.header.header_size());
        cur.set_byte_pos(start)?;
        let end = self.header.end_pos();

        match self.kind.child_policy() {
            ChildPolicy::None => Ok(()),
            ChildPolicy::ToEnd => {
                while let Some(child_header) = next_child_header(cur, end)? {
                    let child = parse_one(cur, child_header, registry, None, recursive)?;
                    if let Some(children) = self.children_vec_mut() {
                        children.push(child);
                    }
                }
                self.capture_padding(cur)
            }
            ChildPolicy::Counted => {
                let count = self.fields().and_then(|f| f.uint(0)).unwrap_or(0);
                for _ in 0..count {
                    let child_header = BoxHeader::parse(cur)?;
                    let child = parse_one(cur, child_header, registry, None, recursive)?;
                    if let Some(children) = self.children_vec_mut() {
                        children.push(child);
                    }
                }
                self.capture_padding(cur)
            }
            ChildPolicy::ExtensionGated => {
                let gated = self
                    .fields()
                    .and_then(|f| f.uint(infe::EXTENSION_TYPE))
                    .unwrap_or(0);
                if gated != 0 {
                    let child_header = BoxHeader::parse(cur)?;
                    let child = parse_one(cur, child_header, registry, None, recursive)?;
                    if let Some(children) = self.children_vec_mut() {
                        children.push(child);
                    }
                }
                self.capture_padding(cur)
            }
            ChildPolicy::VersionDispatched => {
                // iref children carry reference-kind tags; their layout is
                // picked by this container's version
                let fallback = match self.header.version() {
                    Some(0) => Some(BoxKind::ItemRef),
                    Some(1) => Some(BoxKind::ItemRefLarge),
                    _ => None,
                };
                while let Some(child_header) = next_child_header(cur, end)? {
                    let child = parse_one(cur, child_header, registry, fallback, recursive)?;
                    if let Some(children) = self.children_vec_mut() {
                        children.push(child);
                    }
                }
                self.capture_padding(cur)
            }
        }
    }
}
