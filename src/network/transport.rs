//! Native stream handles a [`Connection`](super::Connection) can wrap.
//!
//! Semua method menerima `&self`: background reader melakukan receive sementara
//! thread consumer melakukan send dan close lewat handle yang sama.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// An already connected, bidirectional, blocking byte stream.
pub trait Transport: Send + Sync + 'static {
    /// Blocking read bounded by the timeout set via `set_read_timeout`.
    ///
    /// A timeout surfaces as `WouldBlock` or `TimedOut`; `Ok(0)` means the
    /// peer closed its side.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Tulis semua byte dari `buf`.
    fn send_all(&self, buf: &[u8]) -> io::Result<()>;

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Kernel receive buffer size hint. Transports without one ignore it.
    fn set_recv_buffer_size(&self, _size: usize) -> io::Result<()> {
        Ok(())
    }

    /// Shutdown kedua arah, membuka `recv` yang sedang block.
    fn shutdown(&self) -> io::Result<()>;
}

impl Transport for TcpStream {
    #[inline]
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }

    #[inline]
    fn send_all(&self, buf: &[u8]) -> io::Result<()> {
        (&*self).write_all(buf)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_recv_buffer_size(&self, size: usize) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            let optval = libc::c_int::try_from(size).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "receive buffer size too large")
            })?;
            // SAFETY: fd is a live socket owned by self; optval outlives the call
            let rc = unsafe {
                libc::setsockopt(
                    self.as_raw_fd(),
                    libc::SOL_SOCKET,
                    libc::SO_RCVBUF,
                    &optval as *const _ as *const libc::c_void,
                    std::mem::size_of::<libc::c_int>() as libc::socklen_t,
                )
            };
            if rc != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        #[cfg(not(unix))]
        let _ = size;
        Ok(())
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    #[inline]
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }

    #[inline]
    fn send_all(&self, buf: &[u8]) -> io::Result<()> {
        (&*self).write_all(buf)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }

    fn shutdown(&self) -> io::Result<()> {
        std::os::unix::net::UnixStream::shutdown(self, Shutdown::Both)
    }
}

/// Whether a read error only means "nothing arrived within the timeout".
#[inline]
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
