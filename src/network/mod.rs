//! Network Layer: buffered, non-blocking reads di atas blocking stream
//!
//! Setiap connection punya satu background thread yang mengisi ring buffer
//! dari socket. Consumer melakukan polling tanpa block, dan fault dari reader
//! dilaporkan pada panggilan consumer berikutnya.

mod connection;
mod transport;

pub use connection::Connection;
pub use transport::Transport;
