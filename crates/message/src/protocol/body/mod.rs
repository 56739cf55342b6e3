//! Message bodies.
//!
//! A body is a [`ByteStream`]: a shared, stateful wrapper around one owned [`Handle`]
//! (a file, an in-memory buffer, or a read-only input such as standard input).
//!
//! # Lifecycle
//!
//! ```text
//!          detach()
//!   OPEN ───────────▶ DETACHED
//!     │
//!     │ close()
//!     ▼
//!   CLOSED
//! ```
//!
//! Every operation checks the lifecycle first. Reads and writes on a stream that is no
//! longer open fail with a runtime error, while the capability queries
//! (`is_readable`, `is_writable`, `is_seekable`, `eof`, `size`) answer conservatively
//! instead of failing.
//!
//! # Capabilities
//!
//! Readability and writability derive from the `fopen`-like mode string the handle was
//! opened with: a stream is writable if the mode contains any of `x w c a +`, and
//! readable if it contains `r` or `+`.
//!
//! # Example
//!
//! ```
//! use micro_message::protocol::body::ByteStream;
//!
//! let stream = ByteStream::from_content("hello");
//! stream.seek(std::io::SeekFrom::End(0)).unwrap();
//! stream.write(" world").unwrap();
//!
//! assert_eq!(stream.to_string(), "hello world");
//! ```

mod handle;
mod metadata;
mod stream;

pub use handle::Handle;
pub use metadata::StreamMetadata;
pub use stream::ByteStream;

pub(crate) use handle::{INPUT_LOCATION, MEMORY_LOCATION};

use crate::protocol::MessageError;

/// The ways a body can be supplied to a message builder.
#[derive(Debug)]
pub enum BodySource {
    /// A location, opened `wb+` (`input://` is always opened read-only).
    Location(String),
    /// An owned handle, wrapped in a new stream.
    Handle(Handle),
    /// An existing stream, shared as is.
    Stream(ByteStream),
}

impl BodySource {
    pub(crate) fn into_stream(self) -> Result<ByteStream, MessageError> {
        match self {
            BodySource::Location(location) if location.starts_with(INPUT_LOCATION) => ByteStream::open(&location, "r"),
            BodySource::Location(location) => ByteStream::open(&location, "wb+"),
            BodySource::Handle(handle) => Ok(ByteStream::new(handle)),
            BodySource::Stream(stream) => Ok(stream),
        }
    }
}

impl From<&str> for BodySource {
    fn from(location: &str) -> Self {
        BodySource::Location(location.to_string())
    }
}

impl From<String> for BodySource {
    fn from(location: String) -> Self {
        BodySource::Location(location)
    }
}

impl From<Handle> for BodySource {
    fn from(handle: Handle) -> Self {
        BodySource::Handle(handle)
    }
}

impl From<ByteStream> for BodySource {
    fn from(stream: ByteStream) -> Self {
        BodySource::Stream(stream)
    }
}
