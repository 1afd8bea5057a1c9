/// Errors produced by the box/field codec.
///
/// An unknown box type is *not* an error: the parser falls back to an opaque
/// box that preserves the payload verbatim.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The cursor ran out of bits before a field, header, or declared box
    /// extent could be read.
    #[error("truncated input at bit {at}: {needed} more bits required")]
    TruncatedInput { at: u64, needed: u64 },

    /// A box header declares a size smaller than the header itself.
    #[error("invalid box size")]
    InvalidSize,

    /// A field setter was given a width outside 1..=64 bits.
    #[error("invalid field width: {0} bits")]
    InvalidFieldWidth(u32),

    /// A count field and its backing collection diverged. Prevented by
    /// construction through the table APIs, but checked on serialize of
    /// hand-built boxes.
    #[error("count field says {declared} entries but collection holds {actual}")]
    InconsistentCollectionState { declared: u64, actual: usize },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
