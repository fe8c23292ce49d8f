//! Protocol Layer: Binary Codec
//!
//! Prinsip desain:
//! - Little-endian: semua field fixed-width, termasuk float
//! - Compact integers: varint dengan group 7 atau 15 bit dan byte budget
//! - No framing: string tanpa length prefix, caller yang melakukan framing

mod reader;
mod text;
pub mod varint;
mod writer;

pub use reader::BinaryReader;
pub use text::TextEncoding;
pub use varint::GroupWidth;
pub use writer::BinaryWriter;
