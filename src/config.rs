//! Konfigurasi tuning untuk connection.

use std::time::Duration;

use crate::error::{Error, Result};

/// Ukuran default ring buffer per connection.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024; // 8KB
/// Per-call timeout on the background reader's socket read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Sleep between checks in `Connection::wait_available`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Sleep background reader selama ring buffer penuh.
pub const DEFAULT_FULL_BACKOFF: Duration = Duration::from_millis(1);

/// Configuration for a [`Connection`](crate::network::Connection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Ring buffer capacity in bytes.
    pub buffer_capacity: usize,
    /// Timeout applied to each blocking read of the background thread.
    pub read_timeout: Duration,
    /// Poll granularity of `wait_available`.
    pub poll_interval: Duration,
    /// Backoff of the background thread when the ring buffer is full.
    pub full_backoff: Duration,
    /// Kernel receive buffer size (SO_RCVBUF). `None` keeps the OS default.
    pub recv_buffer_size: Option<usize>,
    /// Name given to the background reader thread.
    pub thread_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            read_timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            full_backoff: DEFAULT_FULL_BACKOFF,
            recv_buffer_size: None,
            thread_name: "ringsock-reader".to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_full_backoff(mut self, backoff: Duration) -> Self {
        self.full_backoff = backoff;
        self
    }

    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Rejects values the connection cannot run with.
    ///
    /// A zero read timeout is refused because the standard library treats it
    /// as an invalid socket option rather than "no timeout".
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::invalid_argument("buffer_capacity must be at least 1"));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::invalid_argument("read_timeout must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::invalid_argument("poll_interval must be non-zero"));
        }
        if self.full_backoff.is_zero() {
            return Err(Error::invalid_argument("full_backoff must be non-zero"));
        }
        if self.recv_buffer_size == Some(0) {
            return Err(Error::invalid_argument("recv_buffer_size must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ConnectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_capacity, 8192);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_rejects_zero_values() {
        let config = ConnectionConfig::default().with_buffer_capacity(0);
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let config = ConnectionConfig::default().with_read_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let config = ConnectionConfig::default().with_recv_buffer_size(0);
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }
}
