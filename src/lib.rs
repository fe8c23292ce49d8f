//! ringsock - Non-blocking socket reads di atas ring buffer
//!
//! Architecture:
//! - Ring Buffer: byte FIFO dengan kapasitas tetap, data yang tidak muat di-drop
//! - Connection: background thread menguras blocking stream ke buffer
//! - Binary Codec: primitive little-endian, string dan varint di atas
//!   `Read`/`Write` apa saja, termasuk `Connection`
//!
//! ```no_run
//! use std::net::TcpStream;
//! use ringsock::network::Connection;
//! use ringsock::protocol::{BinaryReader, BinaryWriter};
//!
//! # fn main() -> ringsock::Result<()> {
//! let conn = Connection::new(TcpStream::connect("127.0.0.1:9999")?)?;
//!
//! let mut writer = BinaryWriter::new(&conn);
//! writer.write_u32(42)?;
//! writer.write_varuint7(300, 9)?;
//!
//! let mut reader = BinaryReader::new(&conn);
//! let reply = reader.read_u32()?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod protocol;

pub use config::ConnectionConfig;
pub use error::{Error, Result};
