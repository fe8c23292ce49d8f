//! Taksonomi error untuk ring buffer, connection, dan codec.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in `ringsock`.
#[derive(Debug, Error)]
pub enum Error {
    /// The source ran dry before a fixed-size read completed.
    #[error("end of stream: needed {expected} bytes, got {read}")]
    EndOfStream {
        /// Bytes the caller asked for.
        expected: usize,
        /// Bytes actually obtained before the source was exhausted.
        read: usize,
    },

    /// Fault I/O native. Fatal untuk connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A full receive could not be served from the data buffered right now.
    #[error("timed out: needed {expected} bytes, {buffered} buffered")]
    TimedOut {
        /// Bytes the caller asked for.
        expected: usize,
        /// Bytes that were available at the time of the call.
        buffered: usize,
    },

    /// Malformed call parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A variable-length value does not fit its byte budget.
    #[error("variable-length value exceeds its {max_len} byte budget")]
    Overflow {
        /// The byte budget that was exceeded.
        max_len: usize,
    },

    /// Encoded input that no valid encoder would produce.
    #[error("invalid data: {0}")]
    InvalidData(&'static str),
}

impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::EndOfStream { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            Error::TimedOut { .. } => io::Error::new(io::ErrorKind::TimedOut, err),
            Error::InvalidArgument(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            Error::Overflow { .. } | Error::InvalidData(_) => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_passes_through() {
        let err: io::Error = Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone")).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_kind_mapping() {
        let eos: io::Error = Error::EndOfStream { expected: 4, read: 1 }.into();
        assert_eq!(eos.kind(), io::ErrorKind::UnexpectedEof);

        let overflow: io::Error = Error::Overflow { max_len: 2 }.into();
        assert_eq!(overflow.kind(), io::ErrorKind::InvalidData);

        let timed_out: io::Error = Error::TimedOut { expected: 8, buffered: 3 }.into();
        assert_eq!(timed_out.kind(), io::ErrorKind::TimedOut);
    }
}
