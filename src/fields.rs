use crate::bitio::{BitCursor, BitWriter};
use crate::error::{Error, Result};

/// Wire encoding of a single field. A field's nominal encoding is a default:
/// every read and every width-carrying setter may override it, because many
/// boxes pick 16/32/64-bit widths from their header version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Unsigned big-endian integer of N bits.
    Uint(u32),
    /// Signed big-endian integer of N bits.
    Int(u32),
    /// Raw byte run of a fixed length, or unbounded (read to the limit).
    Bytes(Option<usize>),
}

/// A decoded wire value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(u64),
    Int(i64),
    Bytes(Vec<u8>),
    UintList(Vec<u64>),
    IntList(Vec<i64>),
}

/// One scalar or repeated wire value. A field with no value is absent: it
/// contributes nothing to serialization, which is how version-conditional
/// and selector-width-zero fields are modeled.
#[derive(Debug, Clone)]
pub struct Field {
    value: Option<Value>,
    encoding: Encoding,
    is_list: bool,
    is_terminated: bool,
}

impl Field {
    pub fn uint(bits: u32) -> Self {
        debug_assert!((1..=64).contains(&bits));
        Field {
            value: None,
            encoding: Encoding::Uint(bits),
            is_list: false,
            is_terminated: false,
        }
    }

    pub fn int(bits: u32) -> Self {
        debug_assert!((1..=64).contains(&bits));
        Field {
            value: None,
            encoding: Encoding::Int(bits),
            is_list: false,
            is_terminated: false,
        }
    }

    pub fn bytes(len: usize) -> Self {
        Field {
            value: None,
            encoding: Encoding::Bytes(Some(len)),
            is_list: false,
            is_terminated: false,
        }
    }

    /// NUL-terminated byte string; the stored value keeps its terminator.
    pub fn cstring() -> Self {
        Field {
            value: None,
            encoding: Encoding::Bytes(None),
            is_list: false,
            is_terminated: true,
        }
    }

    pub fn uint_list(bits: u32) -> Self {
        debug_assert!((1..=64).contains(&bits));
        Field {
            value: None,
            encoding: Encoding::Uint(bits),
            is_list: true,
            is_terminated: false,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Consume this field's bits from the cursor. `encoding` overrides the
    /// nominal encoding and, like the original model, becomes the field's
    /// encoding from then on so a later write emits the same width. List
    /// fields repeat until the cursor reaches `until_bit` (or end of data).
    pub fn read(
        &mut self,
        cur: &mut BitCursor<'_>,
        encoding: Option<Encoding>,
        until_bit: Option<u64>,
    ) -> Result<()> {
        if let Some(enc) = encoding {
            self.encoding = enc;
        }
        if self.is_terminated {
            self.value = Some(Value::Bytes(cur.read_to_nul()?));
            return Ok(());
        }
        if self.is_list {
            let limit = until_bit.unwrap_or_else(|| cur.len_bits());
            match self.encoding {
                Encoding::Uint(bits) => {
                    let mut items = Vec::new();
                    while cur.bit_pos() < limit {
                        items.push(cur.read_uint(bits)?);
                    }
                    self.value = Some(Value::UintList(items));
                }
                Encoding::Int(bits) => {
                    let mut items = Vec::new();
                    while cur.bit_pos() < limit {
                        items.push(cur.read_int(bits)?);
                    }
                    self.value = Some(Value::IntList(items));
                }
                Encoding::Bytes(_) => unreachable!("byte-run list fields are not declared"),
            }
            return Ok(());
        }
        self.value = Some(match self.encoding {
            Encoding::Uint(bits) => Value::Uint(cur.read_uint(bits)?),
            Encoding::Int(bits) => Value::Int(cur.read_int(bits)?),
            Encoding::Bytes(Some(len)) => Value::Bytes(cur.read_bytes(len)?),
            Encoding::Bytes(None) => {
                let limit = until_bit.unwrap_or_else(|| cur.len_bits());
                let len = limit.saturating_sub(cur.bit_pos()) / 8;
                Value::Bytes(cur.read_bytes(len as usize)?)
            }
        });
        Ok(())
    }

    /// Append this field's wire encoding; list fields expand every
    /// repetition with the field's single encoding.
    pub fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        let value = match &self.value {
            Some(v) => v,
            None => return Ok(()),
        };
        match (value, self.encoding) {
            (Value::Uint(v), Encoding::Uint(bits)) => w.write_uint(*v, bits),
            (Value::Int(v), Encoding::Int(bits)) => w.write_int(*v, bits),
            (Value::Bytes(b), _) => w.write_bytes(b),
            (Value::UintList(items), Encoding::Uint(bits)) => {
                for v in items {
                    w.write_uint(*v, bits)?;
                }
                Ok(())
            }
            (Value::IntList(items), Encoding::Int(bits)) => {
                for v in items {
                    w.write_int(*v, bits)?;
                }
                Ok(())
            }
            // A value whose shape no longer matches the encoding can only be
            // produced by hand; emit it as its natural kind.
            (Value::Uint(v), Encoding::Int(bits)) => w.write_uint(*v, bits),
            (Value::Int(v), Encoding::Uint(bits)) => w.write_int(*v, bits),
            (Value::UintList(items), Encoding::Int(bits)) => {
                for v in items {
                    w.write_uint(*v, bits)?;
                }
                Ok(())
            }
            (Value::IntList(items), Encoding::Uint(bits)) => {
                for v in items {
                    w.write_int(*v, bits)?;
                }
                Ok(())
            }
            (_, Encoding::Bytes(_)) => Ok(()),
        }
    }

    /// Encoded length of the current value, in bits. Absent fields are zero.
    pub fn bit_len(&self) -> u64 {
        let value = match &self.value {
            Some(v) => v,
            None => return 0,
        };
        let unit = match self.encoding {
            Encoding::Uint(bits) | Encoding::Int(bits) => bits as u64,
            Encoding::Bytes(_) => 0,
        };
        match value {
            Value::Uint(_) | Value::Int(_) => unit,
            Value::Bytes(b) => b.len() as u64 * 8,
            Value::UintList(items) => unit * items.len() as u64,
            Value::IntList(items) => unit * items.len() as u64,
        }
    }
}

/// Ordered, fixed-shape collection of fields: the literal byte layout of one
/// box payload. Serialization emits the populated slots below the active
/// length in declaration order; assigning a slot past the active length
/// grows it, which is how trailing optional fields stay off the wire until
/// first assignment.
#[derive(Debug, Clone)]
pub struct FieldsList {
    slots: Vec<Field>,
    active: usize,
}

impl FieldsList {
    pub fn new(slots: Vec<Field>) -> Self {
        FieldsList { slots, active: 0 }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn active_len(&self) -> usize {
        self.active
    }

    fn activate(&mut self, index: usize) {
        debug_assert!(index < self.slots.len());
        if index >= self.active {
            self.active = index + 1;
        }
    }

    /// Read slot `index` from the cursor with its nominal encoding.
    pub fn read(&mut self, index: usize, cur: &mut BitCursor<'_>) -> Result<()> {
        self.activate(index);
        self.slots[index].read(cur, None, None)
    }

    /// Read slot `index` with an overriding encoding (version-width dispatch).
    pub fn read_with(
        &mut self,
        index: usize,
        cur: &mut BitCursor<'_>,
        encoding: Encoding,
    ) -> Result<()> {
        self.activate(index);
        self.slots[index].read(cur, Some(encoding), None)
    }

    /// Read a list slot, repeating until the cursor reaches `until_bit`.
    pub fn read_list(
        &mut self,
        index: usize,
        cur: &mut BitCursor<'_>,
        until_bit: u64,
    ) -> Result<()> {
        self.activate(index);
        self.slots[index].read(cur, None, Some(until_bit))
    }

    /// Read a fixed-length list slot spanning the next `len_bits` bits.
    pub fn read_list_len(
        &mut self,
        index: usize,
        cur: &mut BitCursor<'_>,
        len_bits: u64,
    ) -> Result<()> {
        let until = cur.bit_pos() + len_bits;
        self.read_list(index, cur, until)
    }

    /// Assign a value with the slot's current encoding.
    pub fn set(&mut self, index: usize, value: Value) {
        self.activate(index);
        self.slots[index].value = Some(value);
    }

    /// Assign a value and re-encode the slot as an integer of `bits` bits.
    pub fn set_with_width(&mut self, index: usize, value: Value, bits: u32) -> Result<()> {
        if bits == 0 || bits > 64 {
            return Err(Error::InvalidFieldWidth(bits));
        }
        self.activate(index);
        let slot = &mut self.slots[index];
        slot.encoding = match slot.encoding {
            Encoding::Int(_) => Encoding::Int(bits),
            _ => Encoding::Uint(bits),
        };
        slot.value = Some(value);
        Ok(())
    }

    /// Re-encode a slot without assigning a value. Used when a width
    /// selector is known before the value is (absent fields stay absent).
    pub fn set_encoding(&mut self, index: usize, encoding: Encoding) {
        self.slots[index].encoding = encoding;
    }

    /// Drop a slot's value: it no longer serializes, but indices never
    /// compact and the active length never shrinks.
    pub fn clear(&mut self, index: usize) {
        self.slots[index].value = None;
    }

    pub fn field(&self, index: usize) -> &Field {
        &self.slots[index]
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots[index].value()
    }

    pub fn is_absent(&self, index: usize) -> bool {
        self.slots[index].value.is_none()
    }

    pub fn uint(&self, index: usize) -> Option<u64> {
        match self.get(index) {
            Some(Value::Uint(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        match self.get(index) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn bytes(&self, index: usize) -> Option<&[u8]> {
        match self.get(index) {
            Some(Value::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    pub fn uint_list(&self, index: usize) -> Option<&[u64]> {
        match self.get(index) {
            Some(Value::UintList(v)) => Some(v),
            _ => None,
        }
    }

    pub fn write_into(&self, w: &mut BitWriter) -> Result<()> {
        for field in &self.slots[..self.active] {
            field.write_into(w)?;
        }
        Ok(())
    }

    /// Wire bytes of every active field in declaration order.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = BitWriter::new();
        self.write_into(&mut w)?;
        Ok(w.finish())
    }

    pub fn byte_len(&self) -> u64 {
        let bits: u64 = self.slots[..self.active].iter().map(|f| f.bit_len()).sum();
        bits.div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_length_grows_on_first_assignment() {
        let mut fl = FieldsList::new(vec![Field::uint(32), Field::uint(32), Field::uint(16)]);
        assert_eq!(fl.active_len(), 0);
        assert_eq!(fl.to_bytes().unwrap(), b"");

        fl.set(0, Value::Uint(7));
        assert_eq!(fl.active_len(), 1);
        assert_eq!(fl.to_bytes().unwrap(), vec![0, 0, 0, 7]);

        // skipping slot 1 leaves it absent but raises the active length
        fl.set(2, Value::Uint(3));
        assert_eq!(fl.active_len(), 3);
        assert_eq!(fl.to_bytes().unwrap(), vec![0, 0, 0, 7, 0, 3]);
    }

    #[test]
    fn clearing_removes_from_serialization_without_compacting() {
        let mut fl = FieldsList::new(vec![Field::uint(8), Field::uint(8)]);
        fl.set(0, Value::Uint(1));
        fl.set(1, Value::Uint(2));
        fl.clear(0);
        assert_eq!(fl.to_bytes().unwrap(), vec![2]);
        assert!(fl.is_absent(0));
        assert_eq!(fl.uint(1), Some(2));
    }

    #[test]
    fn read_override_sticks_for_the_write_path() {
        let data = [0x00u8, 0x2A];
        let mut cur = BitCursor::new(&data);
        let mut fl = FieldsList::new(vec![Field::uint(64)]);
        fl.read_with(0, &mut cur, Encoding::Uint(16)).unwrap();
        assert_eq!(fl.uint(0), Some(42));
        assert_eq!(fl.to_bytes().unwrap(), vec![0x00, 0x2A]);
    }

    #[test]
    fn set_with_width_rejects_bad_widths() {
        let mut fl = FieldsList::new(vec![Field::uint(32)]);
        assert!(matches!(
            fl.set_with_width(0, Value::Uint(1), 0),
            Err(Error::InvalidFieldWidth(0))
        ));
        assert!(matches!(
            fl.set_with_width(0, Value::Uint(1), 65),
            Err(Error::InvalidFieldWidth(65))
        ));
        fl.set_with_width(0, Value::Uint(1), 16).unwrap();
        assert_eq!(fl.to_bytes().unwrap(), vec![0, 1]);
    }

    #[test]
    fn list_fields_read_until_the_limit() {
        let data = [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3];
        let mut cur = BitCursor::new(&data);
        let mut fl = FieldsList::new(vec![Field::uint_list(32)]);
        fl.read_list(0, &mut cur, 96).unwrap();
        assert_eq!(fl.uint_list(0), Some(&[1u64, 2, 3][..]));
    }

    #[test]
    fn terminated_string_keeps_its_nul() {
        let data = b"vide\0rest";
        let mut cur = BitCursor::new(data);
        let mut fl = FieldsList::new(vec![Field::cstring()]);
        fl.read(0, &mut cur).unwrap();
        assert_eq!(fl.bytes(0), Some(&b"vide\0"[..]));
        assert_eq!(fl.to_bytes().unwrap(), b"vide\0");
    }
}
