use std::io::{Read, Seek, SeekFrom};

/// Read `len` bytes at an absolute offset.
pub fn read_slice<R: Read + Seek>(r: &mut R, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut v = vec![0u8; len as usize];
    r.read_exact(&mut v)?;
    Ok(v)
}

/// Classic 16-byte-per-row hex view with an ASCII gutter.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, row) in bytes.chunks(16).enumerate() {
        let offs = start_offset + i as u64 * 16;
        let hexs = row
            .iter()
            .map(|b| hex::encode([*b]))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = row
            .iter()
            .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{offs:08x}  {hexs:<47}  |{ascii}|\n"));
    }
    out
}
