use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use serde_json::Value;
use tracing::{trace, warn};
use triomphe::Arc;

use super::{Handle, StreamMetadata};
use crate::protocol::{MessageError, RuntimeError};

enum Lifecycle {
    Open(Handle),
    Detached,
    Closed,
}

/// A shared, stateful byte stream used as message body.
///
/// Clones refer to the same underlying handle. The stream starts open and ends either
/// detached (the handle was handed out by [`detach`](ByteStream::detach)) or closed;
/// neither state can be left again.
#[derive(Clone)]
pub struct ByteStream {
    inner: Arc<Mutex<Lifecycle>>,
}

impl ByteStream {
    pub fn new(handle: Handle) -> Self {
        Self { inner: Arc::new(Mutex::new(Lifecycle::Open(handle))) }
    }

    /// Opens a stream from a location and mode, see [`Handle::open`].
    ///
    /// # Errors
    ///
    /// An empty location is an invalid-argument error, a failure to open is a runtime error.
    pub fn open(location: &str, mode: &str) -> Result<Self, MessageError> {
        let handle = Handle::open(location, mode)?;
        trace!(location, mode, "opened stream");
        Ok(Self::new(handle))
    }

    /// A readable and writable in-memory stream holding `content`, positioned at its start.
    pub fn from_content<C: Into<Vec<u8>>>(content: C) -> Self {
        Self::new(Handle::memory(content))
    }

    /// Returns true if both values refer to the same underlying stream.
    #[inline]
    pub fn ptr_eq(&self, other: &ByteStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_open<T, F>(&self, operation: &'static str, f: F) -> Result<T, MessageError>
    where
        F: FnOnce(&mut Handle) -> Result<T, MessageError>,
    {
        match &mut *self.lock() {
            Lifecycle::Open(handle) => f(handle),
            Lifecycle::Detached => Err(RuntimeError::Detached { operation }.into()),
            Lifecycle::Closed => Err(RuntimeError::Closed { operation }.into()),
        }
    }

    fn inspect<T>(&self, closed: T, f: impl FnOnce(&Handle) -> T) -> T {
        match &*self.lock() {
            Lifecycle::Open(handle) => f(handle),
            Lifecycle::Detached | Lifecycle::Closed => closed,
        }
    }

    /// Reads up to `len` bytes from the current position.
    ///
    /// # Errors
    ///
    /// Runtime error if the stream is not open, not readable, or the read fails.
    pub fn read(&self, len: usize) -> Result<Bytes, MessageError> {
        self.with_open("read", |handle| {
            if !handle.mode().is_readable() {
                return Err(RuntimeError::NotReadable.into());
            }

            Ok(Bytes::from(handle.read_up_to(len)?))
        })
    }

    /// Writes `data` at the current position and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Runtime error if the stream is not open, not writable, or the write fails.
    pub fn write<D: AsRef<[u8]>>(&self, data: D) -> Result<usize, MessageError> {
        let data = data.as_ref();
        self.with_open("write", |handle| {
            if !handle.mode().is_writable() {
                return Err(RuntimeError::NotWritable.into());
            }

            handle.write_all(data)?;
            Ok(data.len())
        })
    }

    /// Moves the stream position.
    ///
    /// # Errors
    ///
    /// Runtime error if the stream is not open, not seekable, or the seek fails.
    pub fn seek(&self, pos: SeekFrom) -> Result<u64, MessageError> {
        self.with_open("seek", |handle| {
            if !handle.is_seekable() {
                return Err(RuntimeError::NotSeekable.into());
            }

            let position = handle.seek(pos)?;
            trace!(?pos, position, "seeked stream");
            Ok(position)
        })
    }

    /// Seeks to the start of the stream.
    ///
    /// # Errors
    ///
    /// Same as [`seek`](ByteStream::seek).
    pub fn rewind(&self) -> Result<(), MessageError> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Returns the current position.
    ///
    /// # Errors
    ///
    /// Runtime error if the stream is not open or the position cannot be determined.
    pub fn tell(&self) -> Result<u64, MessageError> {
        self.with_open("tell", |handle| Ok(handle.position()?))
    }

    /// Returns true once a read hit the end of the data; always true when not open.
    pub fn eof(&self) -> bool {
        self.inspect(true, Handle::is_eof)
    }

    pub fn is_seekable(&self) -> bool {
        self.inspect(false, Handle::is_seekable)
    }

    pub fn is_readable(&self) -> bool {
        self.inspect(false, |handle| handle.mode().is_readable())
    }

    pub fn is_writable(&self) -> bool {
        self.inspect(false, |handle| handle.mode().is_writable())
    }

    /// Returns the size in bytes, `None` when not open or unknown.
    pub fn size(&self) -> Option<u64> {
        self.inspect(None, Handle::size)
    }

    /// Reads everything from the current position to the end.
    ///
    /// # Errors
    ///
    /// Runtime error if the stream is not open, not readable, or the read fails.
    pub fn contents(&self) -> Result<Bytes, MessageError> {
        self.with_open("read contents", read_remaining)
    }

    /// # Errors
    ///
    /// Runtime error if the stream is not open.
    pub fn metadata(&self) -> Result<StreamMetadata, MessageError> {
        self.with_open("read metadata", |handle| {
            Ok(StreamMetadata {
                uri: handle.location().map(str::to_string),
                mode: handle.mode().as_str().to_string(),
                seekable: handle.is_seekable(),
                eof: handle.is_eof(),
                stream_type: handle.kind_name(),
            })
        })
    }

    /// Returns a single metadata field, `None` for unknown keys.
    ///
    /// # Errors
    ///
    /// Runtime error if the stream is not open.
    pub fn metadata_value(&self, key: &str) -> Result<Option<Value>, MessageError> {
        let metadata = self.metadata()?;
        let value = serde_json::to_value(metadata).map_err(RuntimeError::io)?;
        Ok(value.get(key).cloned())
    }

    /// Hands out the underlying handle, leaving the stream detached.
    ///
    /// Returns `None` if the stream is no longer open.
    pub fn detach(&self) -> Option<Handle> {
        let handle = self.take(Lifecycle::Detached)?;
        trace!(?handle, "detached stream");
        Some(handle)
    }

    /// Releases the underlying handle; a no-op unless the stream is open.
    pub fn close(&self) {
        if let Some(mut handle) = self.take(Lifecycle::Closed) {
            if let Err(e) = handle.flush() {
                warn!(cause = %e, "failed to flush stream on close");
            }
            trace!(?handle, "closed stream");
        }
    }

    fn take(&self, next: Lifecycle) -> Option<Handle> {
        let mut guard = self.lock();
        if !matches!(*guard, Lifecycle::Open(_)) {
            return None;
        }

        match std::mem::replace(&mut *guard, next) {
            Lifecycle::Open(handle) => Some(handle),
            Lifecycle::Detached | Lifecycle::Closed => None,
        }
    }

    fn read_all(&self) -> Result<Bytes, MessageError> {
        self.with_open("read contents", |handle| {
            if handle.is_seekable() {
                handle.seek(SeekFrom::Start(0))?;
            }
            read_remaining(handle)
        })
    }
}

fn read_remaining(handle: &mut Handle) -> Result<Bytes, MessageError> {
    if !handle.mode().is_readable() {
        return Err(RuntimeError::NotReadable.into());
    }

    let mut buf = Vec::new();
    handle.read_to_end(&mut buf)?;
    Ok(Bytes::from(buf))
}

impl From<Handle> for ByteStream {
    fn from(handle: Handle) -> Self {
        ByteStream::new(handle)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.lock() {
            Lifecycle::Open(handle) => f.debug_tuple("ByteStream").field(handle).finish(),
            Lifecycle::Detached => f.write_str("ByteStream(detached)"),
            Lifecycle::Closed => f.write_str("ByteStream(closed)"),
        }
    }
}

/// Best effort: rewinds and renders the whole stream, empty if it can not be read.
impl fmt::Display for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_readable() {
            return Ok(());
        }

        match self.read_all() {
            Ok(bytes) => f.write_str(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                warn!(cause = %e, "failed to render stream, using empty string");
                Ok(())
            }
        }
    }
}
