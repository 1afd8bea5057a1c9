pub mod api;
pub mod bitio;
pub mod boxes;
pub mod entries;
pub mod error;
pub mod fields;
pub mod headers;
pub mod known_boxes;
pub mod parser;
pub mod registry;
pub mod util;

pub use bitio::{BitCursor, BitWriter};
pub use boxes::{BoxContent, Mp4Box};
pub use error::{Error, Result};
pub use fields::{Encoding, Field, FieldsList, Value};
pub use headers::{BoxHeader, FourCC};
pub use known_boxes::BoxKind;
pub use parser::{BoxReader, is_bmff, parse_boxes};
pub use registry::{BoxKey, Registry, default_registry};
