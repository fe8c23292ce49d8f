//! Bounded circular byte buffer
//!
//! Satu mutex menjaga storage beserta kedua indeks, sehingga invariant
//! `len <= capacity` selalu terlihat konsisten. Write yang tidak muat
//! dipotong: kelebihannya di-drop, tidak pernah diantrikan.

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Storage plus indices, only ever touched under the lock.
struct Inner {
    storage: Box<[u8]>,
    // Index byte berikutnya yang akan dibaca
    head: usize,
    // Jumlah byte terisi mulai dari head
    len: usize,
}

impl Inner {
    #[inline]
    fn capacity(&self) -> usize {
        self.storage.len()
    }

    fn copy_out(&mut self, dest: &mut [u8]) -> usize {
        let count = dest.len().min(self.len);
        if count == 0 {
            return 0;
        }

        // Maksimal dua run kontigu: head..end, lalu 0..
        let first = count.min(self.capacity() - self.head);
        dest[..first].copy_from_slice(&self.storage[self.head..self.head + first]);
        dest[first..count].copy_from_slice(&self.storage[..count - first]);

        self.head = (self.head + count) % self.capacity();
        self.len -= count;
        count
    }

    fn copy_in(&mut self, src: &[u8]) -> usize {
        let count = src.len().min(self.capacity() - self.len);
        if count == 0 {
            return 0;
        }

        let tail = (self.head + self.len) % self.capacity();
        let first = count.min(self.capacity() - tail);
        self.storage[tail..tail + first].copy_from_slice(&src[..first]);
        self.storage[..count - first].copy_from_slice(&src[first..count]);

        self.len += count;
        count
    }
}

/// Fixed-capacity byte FIFO shared between one producer and its consumers.
pub struct RingBuffer {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl RingBuffer {
    /// Alokasi buffer sekali. Tidak ada alokasi setelah ini.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument("ring buffer capacity must be at least 1"));
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                storage: vec![0u8; capacity].into_boxed_slice(),
                head: 0,
                len: 0,
            }),
            capacity,
        })
    }

    /// Occupied bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Total bytes this buffer can hold.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes a write could store right now.
    #[inline]
    pub fn free_space(&self) -> usize {
        self.capacity - self.len()
    }

    /// Pindahkan maksimal `dest.len()` bytes keluar dari buffer.
    ///
    /// Return jumlah yang dicopy, 0 jika kosong. Tidak pernah menunggu data.
    pub fn read(&self, dest: &mut [u8]) -> usize {
        self.inner.lock().copy_out(dest)
    }

    /// Reads up to `max_len` bytes into `dest[offset..offset + max_len]`.
    pub fn read_at(&self, dest: &mut [u8], offset: usize, max_len: usize) -> Result<usize> {
        let dest_len = dest.len();
        let span = offset
            .checked_add(max_len)
            .and_then(|end| dest.get_mut(offset..end))
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "range {}..{}+{} out of bounds for destination of {} bytes",
                    offset,
                    offset,
                    max_len,
                    dest_len
                ))
            })?;
        Ok(self.read(span))
    }

    /// Fills `dest` completely or leaves the buffer untouched.
    ///
    /// Returns `false` if fewer than `dest.len()` bytes are buffered.
    pub fn read_exact_or_none(&self, dest: &mut [u8]) -> bool {
        let mut inner = self.inner.lock();
        if inner.len < dest.len() {
            return false;
        }
        inner.copy_out(dest);
        true
    }

    /// Stores as much of `src` as fits and discards the rest.
    ///
    /// Returns the number of bytes stored.
    pub fn write(&self, src: &[u8]) -> usize {
        self.inner.lock().copy_in(src)
    }

    /// Length-addressed write.
    ///
    /// A non-negative `length` writes `src[..length]`; a negative one writes
    /// everything except the last `-length` bytes of `src`. The same drop
    /// policy as [`write`](Self::write) applies.
    pub fn write_len(&self, src: &[u8], length: isize) -> Result<usize> {
        let magnitude = length.unsigned_abs();
        if magnitude > src.len() {
            return Err(Error::invalid_argument(format!(
                "length {} exceeds source of {} bytes",
                length,
                src.len()
            )));
        }

        let count = if length < 0 {
            src.len() - magnitude
        } else {
            magnitude
        };
        Ok(self.write(&src[..count]))
    }

    /// Buang semua isi buffer.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.head = 0;
        inner.len = 0;
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
