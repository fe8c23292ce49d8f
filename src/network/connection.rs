//! Buffered connection with a background reader
//!
//! Thread khusus menguras blocking transport ke [`RingBuffer`], sehingga
//! consumer bisa polling `available()` dan `receive()` tanpa block di socket.
//! Fault yang dialami thread tersebut disimpan di mailbox satu slot dan
//! diserahkan ke panggilan consumer berikutnya.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use super::transport::{is_timeout, Transport};
use crate::config::ConnectionConfig;
use crate::core::RingBuffer;
use crate::error::{Error, Result};

/// State shared between the owner and the background reader.
struct Shared<T> {
    transport: T,
    buffer: RingBuffer,
    // Maksimal satu fault pending dari reader thread
    deferred: Mutex<Option<io::Error>>,
    closed: AtomicBool,
    input_shutdown: AtomicBool,
}

impl<T: Transport> Shared<T> {
    #[inline]
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[inline]
    fn input_done(&self) -> bool {
        self.input_shutdown.load(Ordering::Acquire) || self.is_closed()
    }

    /// Parks `err` unless a fault is already waiting.
    fn defer(&self, err: io::Error) {
        let mut slot = self.deferred.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    /// Hands a parked fault to the caller exactly once.
    #[inline]
    fn take_deferred(&self) -> Result<()> {
        match self.deferred.lock().take() {
            Some(err) => Err(Error::Io(err)),
            None => Ok(()),
        }
    }

    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Close bukan error path
        let _ = self.transport.shutdown();
        true
    }
}

/// Non-blocking read surface over a blocking stream.
///
/// Outbound bytes go straight to the transport; only inbound bytes are
/// buffered. Dropping the connection closes it and joins the reader thread.
pub struct Connection<T: Transport = TcpStream> {
    shared: Arc<Shared<T>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    send_lock: Mutex<()>,
    config: ConnectionConfig,
}

impl Connection<TcpStream> {
    /// Wraps a connected TCP stream with the default configuration.
    pub fn new(stream: TcpStream) -> Result<Self> {
        Self::with_config(stream, ConnectionConfig::default())
    }
}

impl<T: Transport> Connection<T> {
    /// Wraps `transport` and starts the background reader.
    pub fn with_config(transport: T, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;

        transport.set_read_timeout(Some(config.read_timeout))?;
        if let Some(size) = config.recv_buffer_size {
            transport.set_recv_buffer_size(size)?;
        }

        let shared = Arc::new(Shared {
            transport,
            buffer: RingBuffer::new(config.buffer_capacity)?,
            deferred: Mutex::new(None),
            closed: AtomicBool::new(false),
            input_shutdown: AtomicBool::new(false),
        });

        let reader = {
            let shared = Arc::clone(&shared);
            let backoff = config.full_backoff;
            thread::Builder::new()
                .name(config.thread_name.clone())
                .spawn(move || reader_loop(&shared, backoff))?
        };

        debug!(
            capacity = config.buffer_capacity,
            read_timeout_ms = config.read_timeout.as_millis() as u64,
            "connection reader started"
        );

        Ok(Self {
            shared,
            reader: Mutex::new(Some(reader)),
            send_lock: Mutex::new(()),
            config,
        })
    }

    /// Buffered byte count, or the pending reader fault if there is one.
    pub fn available(&self) -> Result<usize> {
        self.shared.take_deferred()?;
        Ok(self.shared.buffer.len())
    }

    /// Polls until at least one byte is buffered or a fault surfaces.
    ///
    /// Returns `Ok(0)` once the input side is finished and the buffer is
    /// drained, since nothing more can arrive. Latency is bounded below by
    /// `poll_interval`.
    pub fn wait_available(&self) -> Result<usize> {
        loop {
            let available = self.available()?;
            if available > 0 {
                return Ok(available);
            }
            if self.shared.input_done() {
                // Flag di-set setelah write terakhir, jadi cek sekali lagi
                return self.available();
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// `available()` or `wait_available()` depending on `block`.
    pub fn available_with(&self, block: bool) -> Result<usize> {
        if block {
            self.wait_available()
        } else {
            self.available()
        }
    }

    /// Copies buffered bytes into `dest`.
    ///
    /// Not a full-read primitive: returns what is buffered right now, which
    /// may be fewer bytes than `dest.len()`, including zero.
    pub fn receive(&self, dest: &mut [u8]) -> Result<usize> {
        self.shared.take_deferred()?;
        Ok(self.shared.buffer.read(dest))
    }

    /// Copies up to `len` buffered bytes into `dest[offset..offset + len]`.
    pub fn receive_at(&self, dest: &mut [u8], offset: usize, len: usize) -> Result<usize> {
        self.shared.take_deferred()?;
        self.shared.buffer.read_at(dest, offset, len)
    }

    /// Fills `dest` entirely from what is buffered right now.
    ///
    /// Fails with `TimedOut` (consuming nothing) when fewer than `dest.len()`
    /// bytes are buffered. There is no retry: callers that need a full frame
    /// across several arrivals loop on `wait_available` themselves.
    pub fn receive_exact(&self, dest: &mut [u8]) -> Result<usize> {
        self.shared.take_deferred()?;
        if self.shared.buffer.read_exact_or_none(dest) {
            return Ok(dest.len());
        }
        Err(Error::TimedOut {
            expected: dest.len(),
            buffered: self.shared.buffer.len(),
        })
    }

    /// Writes all of `src` to the transport, bypassing the ring buffer.
    ///
    /// A write fault closes the connection.
    pub fn send(&self, src: &[u8]) -> Result<usize> {
        if self.shared.is_closed() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is closed",
            )));
        }

        let _guard = self.send_lock.lock();
        if let Err(err) = self.shared.transport.send_all(src) {
            warn!(error = %err, "send failed, closing connection");
            self.shared.close();
            return Err(Error::Io(err));
        }
        Ok(src.len())
    }

    /// Whether the handle is still open. Says nothing about the peer.
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.shared.is_closed()
    }

    /// Whether the peer has finished sending.
    #[inline]
    pub fn is_input_shutdown(&self) -> bool {
        self.shared.input_shutdown.load(Ordering::Acquire)
    }

    /// Kapasitas ring buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.buffer.capacity()
    }

    /// The wrapped transport.
    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Closes the handle. Idempotent; shutdown errors are swallowed.
    pub fn close(&self) {
        if self.shared.close() {
            debug!("connection closed");
        }
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.close();
        if let Some(handle) = self.reader.get_mut().take() {
            let _ = handle.join();
        }
    }
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("buffer", &self.shared.buffer)
            .field("connected", &self.is_connected())
            .field("input_shutdown", &self.is_input_shutdown())
            .finish()
    }
}

/// Background thread body: fill free space, defer the first real fault.
fn reader_loop<T: Transport>(shared: &Shared<T>, backoff: std::time::Duration) {
    let mut scratch = vec![0u8; shared.buffer.capacity()].into_boxed_slice();

    while !shared.input_done() {
        let free = shared.buffer.free_space();
        if free == 0 {
            // Baca nol byte tidak berguna, lebih dari free space akan di-drop
            thread::sleep(backoff);
            continue;
        }

        match shared.transport.recv(&mut scratch[..free]) {
            Ok(0) => {
                shared.input_shutdown.store(true, Ordering::Release);
                debug!("peer closed its side");
                break;
            }
            Ok(n) => {
                let stored = shared.buffer.write(&scratch[..n]);
                if stored < n {
                    warn!(received = n, stored, "ring buffer full, bytes dropped");
                }
                trace!(bytes = stored, buffered = shared.buffer.len(), "received");
            }
            Err(ref err) if is_timeout(err) => {}
            Err(err) => {
                if shared.is_closed() {
                    // Fault caused by our own shutdown
                    break;
                }
                error!(error = %err, "read failed, closing connection");
                shared.defer(err);
                shared.close();
                break;
            }
        }
    }

    debug!("connection reader stopped");
}

impl<T: Transport> Read for &Connection<T> {
    /// Waits for data, then copies what is buffered. Returns 0 only at the
    /// end of input.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.wait_available()? == 0 {
            return Ok(0);
        }
        Ok(self.receive(buf)?)
    }
}

impl<T: Transport> Read for Connection<T> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

impl<T: Transport> Write for &Connection<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.send(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Transport> Write for Connection<T> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::{Duration, Instant};

    /// Transport that replays a script of read results, then times out.
    struct Scripted {
        script: Mutex<VecDeque<io::Result<Vec<u8>>>>,
        sent: Mutex<Vec<u8>>,
        fail_send: bool,
    }

    impl Scripted {
        fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                sent: Mutex::new(Vec::new()),
                fail_send: false,
            }
        }
    }

    impl Transport for Scripted {
        fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
            let next = self.script.lock().pop_front();
            match next {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.script.lock().push_front(Ok(bytes[n..].to_vec()));
                    }
                    Ok(n)
                }
                Some(Err(err)) => Err(err),
                None => {
                    thread::sleep(Duration::from_millis(5));
                    Err(io::Error::new(io::ErrorKind::WouldBlock, "timeout"))
                }
            }
        }

        fn send_all(&self, buf: &[u8]) -> io::Result<()> {
            if self.fail_send {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken"));
            }
            self.sent.lock().extend_from_slice(buf);
            Ok(())
        }

        fn set_read_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }

        fn shutdown(&self) -> io::Result<()> {
            Ok(())
        }
    }

    fn fast_config(capacity: usize) -> ConnectionConfig {
        ConnectionConfig::default()
            .with_buffer_capacity(capacity)
            .with_poll_interval(Duration::from_millis(5))
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_receive_scripted_bytes() {
        let transport = Scripted::new(vec![Ok(b"hello ".to_vec()), Ok(b"world".to_vec())]);
        let conn = Connection::with_config(transport, fast_config(64)).unwrap();

        wait_until(|| conn.available().unwrap() == 11);

        let mut out = [0u8; 32];
        let n = conn.receive(&mut out).unwrap();
        assert_eq!(&out[..n], b"hello world");
        assert_eq!(conn.receive(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_deferred_error_surfaces_once() {
        let transport = Scripted::new(vec![
            Ok(b"ab".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let conn = Connection::with_config(transport, fast_config(64)).unwrap();

        wait_until(|| !conn.is_connected());

        match conn.available() {
            Err(Error::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected deferred reset, got {:?}", other),
        }

        // Slot is cleared: buffered bytes are still readable afterwards
        assert_eq!(conn.available().unwrap(), 2);
        let mut out = [0u8; 2];
        assert_eq!(conn.receive(&mut out).unwrap(), 2);
        assert_eq!(&out, b"ab");
    }

    #[test]
    fn test_wait_available_surfaces_fault() {
        let transport = Scripted::new(vec![
            Err(io::Error::new(io::ErrorKind::WouldBlock, "idle")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let conn = Connection::with_config(transport, fast_config(16)).unwrap();
        assert_eq!(conn.config().buffer_capacity, 16);

        match conn.available_with(true) {
            Err(Error::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected reset from blocking wait, got {:?}", other),
        }
        assert!(!conn.is_connected());
        assert_eq!(conn.wait_available().unwrap(), 0);
    }

    #[test]
    fn test_deferred_error_seen_by_receive() {
        let transport = Scripted::new(vec![Err(io::Error::new(
            io::ErrorKind::ConnectionAborted,
            "aborted",
        ))]);
        let conn = Connection::with_config(transport, fast_config(16)).unwrap();
        wait_until(|| !conn.is_connected());

        let mut out = [0u8; 4];
        assert!(matches!(conn.receive(&mut out), Err(Error::Io(_))));
        assert_eq!(conn.receive(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_full_buffer_is_not_overrun() {
        // 10 bytes offered to a 4 byte buffer: reader only takes what fits
        let transport = Scripted::new(vec![Ok(b"0123456789".to_vec())]);
        let conn = Connection::with_config(transport, fast_config(4)).unwrap();

        let mut collected = Vec::new();
        let mut chunk = [0u8; 3];
        while collected.len() < 10 {
            if conn.wait_available().unwrap() > 0 {
                let n = conn.receive(&mut chunk).unwrap();
                collected.extend_from_slice(&chunk[..n]);
            }
        }
        assert_eq!(collected, b"0123456789");
    }

    #[test]
    fn test_receive_exact_times_out_without_consuming() {
        let transport = Scripted::new(vec![Ok(b"abc".to_vec())]);
        let conn = Connection::with_config(transport, fast_config(16)).unwrap();
        wait_until(|| conn.available().unwrap() == 3);

        let mut four = [0u8; 4];
        match conn.receive_exact(&mut four) {
            Err(Error::TimedOut { expected, buffered }) => {
                assert_eq!(expected, 4);
                assert_eq!(buffered, 3);
            }
            other => panic!("expected TimedOut, got {:?}", other),
        }
        assert!(conn.is_connected());

        let mut three = [0u8; 3];
        assert_eq!(conn.receive_exact(&mut three).unwrap(), 3);
        assert_eq!(&three, b"abc");
    }

    #[test]
    fn test_wait_available_returns_zero_at_eof() {
        let transport = Scripted::new(vec![Ok(b"z".to_vec()), Ok(Vec::new())]);
        let conn = Connection::with_config(transport, fast_config(8)).unwrap();

        assert_eq!(conn.wait_available().unwrap(), 1);
        let mut out = [0u8; 1];
        conn.receive(&mut out).unwrap();

        wait_until(|| conn.is_input_shutdown());
        assert_eq!(conn.wait_available().unwrap(), 0);
        assert_eq!((&conn).read(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_send_bypasses_buffer() {
        let conn = Connection::with_config(Scripted::new(Vec::new()), fast_config(8)).unwrap();

        assert_eq!(conn.send(b"outbound").unwrap(), 8);
        assert_eq!(&*conn.transport().sent.lock(), b"outbound");
        assert_eq!(conn.available().unwrap(), 0);
    }

    #[test]
    fn test_send_failure_closes() {
        let mut transport = Scripted::new(Vec::new());
        transport.fail_send = true;
        let conn = Connection::with_config(transport, fast_config(8)).unwrap();

        assert!(matches!(conn.send(b"x"), Err(Error::Io(_))));
        assert!(!conn.is_connected());
        assert!(matches!(conn.send(b"x"), Err(Error::Io(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let conn = Connection::with_config(Scripted::new(Vec::new()), fast_config(8)).unwrap();
        assert!(conn.is_connected());
        conn.close();
        conn.close();
        assert!(!conn.is_connected());
        assert_eq!(conn.available().unwrap(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Connection::with_config(Scripted::new(Vec::new()), fast_config(0));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
