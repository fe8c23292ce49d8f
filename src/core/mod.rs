//! Core module: bounded byte storage
//!
//! Prinsip desain:
//! - Fixed capacity: alokasi sekali saat konstruksi
//! - Drop-on-full: write tidak pernah block dan buffer tidak pernah tumbuh
//! - Single lock: storage dan indeks berubah bersamaan

mod ring_buffer;

pub use ring_buffer::RingBuffer;
