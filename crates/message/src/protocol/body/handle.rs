//! Owned byte handles backing a [`ByteStream`](super::ByteStream).
//!
//! A [`Handle`] is the resource a stream wraps and the value handed back by
//! [`ByteStream::detach`](super::ByteStream::detach). It implements the std io traits, so
//! a detached handle stays usable on its own.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::protocol::{ArgumentError, MessageError, RuntimeError};

pub(crate) const MEMORY_LOCATION: &str = "memory://";
pub(crate) const INPUT_LOCATION: &str = "input://";
const FILE_SCHEME: &str = "file://";

/// Access mode of a handle, spelled like `fopen` modes (`r`, `w+`, `rb`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mode {
    raw: String,
    primary: char,
}

impl Mode {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        let primary = chars.next().filter(|c| matches!(c, 'r' | 'w' | 'a' | 'x' | 'c'))?;

        chars.all(|c| matches!(c, '+' | 'b' | 't')).then(|| Self { raw: raw.to_string(), primary })
    }

    #[inline]
    pub(crate) fn as_str(&self) -> &str {
        &self.raw
    }

    pub(crate) fn is_readable(&self) -> bool {
        self.raw.contains(['r', '+'])
    }

    pub(crate) fn is_writable(&self) -> bool {
        self.raw.contains(['x', 'w', 'c', 'a', '+'])
    }

    fn is_append(&self) -> bool {
        self.primary == 'a'
    }

    fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.is_readable()).write(self.is_writable());

        match self.primary {
            'w' => {
                options.create(true).truncate(true);
            }
            'a' => {
                options.create(true).append(true);
            }
            'x' => {
                options.create_new(true);
            }
            'c' => {
                options.create(true);
            }
            _ => {}
        }

        options
    }
}

enum HandleKind {
    File(File),
    Memory(Cursor<Vec<u8>>),
    Input { reader: Box<dyn Read + Send>, consumed: u64 },
}

/// An owned, byte-addressable resource: a file, an in-memory buffer or a read-only input.
pub struct Handle {
    kind: HandleKind,
    mode: Mode,
    location: Option<String>,
    eof: bool,
}

impl Handle {
    /// Opens a handle from a location and an `fopen`-like mode.
    ///
    /// Locations are `memory://`, `input://` (standard input), `file://<path>` or a plain path.
    ///
    /// # Errors
    ///
    /// An empty location is an invalid-argument error. An unknown mode or a failure to
    /// open the file is a runtime error.
    pub fn open(location: &str, mode: &str) -> Result<Self, MessageError> {
        if location.is_empty() {
            return Err(ArgumentError::invalid_stream("stream location can not be empty").into());
        }

        let parsed = Mode::parse(mode).ok_or_else(|| RuntimeError::open(location, mode, "invalid mode"))?;

        let kind = if location.starts_with(MEMORY_LOCATION) {
            HandleKind::Memory(Cursor::new(Vec::new()))
        } else if location.starts_with(INPUT_LOCATION) {
            HandleKind::Input { reader: Box::new(io::stdin()), consumed: 0 }
        } else {
            let path = location.strip_prefix(FILE_SCHEME).unwrap_or(location);
            let file = parsed.open_options().open(path).map_err(|e| RuntimeError::open(location, mode, e))?;
            HandleKind::File(file)
        };

        Ok(Self { kind, mode: parsed, location: Some(location.to_string()), eof: false })
    }

    /// Opens a file at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`Handle::open`].
    pub fn open_path<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self, MessageError> {
        let path = path.as_ref();
        let location = path.to_str().ok_or_else(|| ArgumentError::invalid_stream(format!("non utf-8 path {}", path.display())))?;

        if location.starts_with(MEMORY_LOCATION) || location.starts_with(INPUT_LOCATION) {
            return Err(ArgumentError::invalid_stream(format!("{location} is not a file path")).into());
        }

        Self::open(location, mode)
    }

    /// Wraps an already opened file.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if `mode` is not a valid mode.
    pub fn from_file(file: File, mode: &str) -> Result<Self, MessageError> {
        let mode = Mode::parse(mode).ok_or_else(|| RuntimeError::open("file", mode, "invalid mode"))?;
        Ok(Self { kind: HandleKind::File(file), mode, location: None, eof: false })
    }

    /// A readable and writable in-memory buffer positioned at its start.
    pub fn memory<C: Into<Vec<u8>>>(content: C) -> Self {
        Self {
            kind: HandleKind::Memory(Cursor::new(content.into())),
            mode: Mode { raw: "w+b".to_string(), primary: 'w' },
            location: Some(MEMORY_LOCATION.to_string()),
            eof: false,
        }
    }

    /// A read-only, non-seekable handle over any reader.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            kind: HandleKind::Input { reader: Box::new(reader), consumed: 0 },
            mode: Mode { raw: "r".to_string(), primary: 'r' },
            location: None,
            eof: false,
        }
    }

    pub(crate) fn mode(&self) -> &Mode {
        &self.mode
    }

    pub(crate) fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self.kind {
            HandleKind::File(_) => "file",
            HandleKind::Memory(_) => "memory",
            HandleKind::Input { .. } => "input",
        }
    }

    #[inline]
    pub(crate) fn is_eof(&self) -> bool {
        self.eof
    }

    pub(crate) fn is_seekable(&self) -> bool {
        !matches!(self.kind, HandleKind::Input { .. })
    }

    pub(crate) fn size(&self) -> Option<u64> {
        match &self.kind {
            HandleKind::File(file) => file.metadata().ok().map(|metadata| metadata.len()),
            HandleKind::Memory(cursor) => u64::try_from(cursor.get_ref().len()).ok(),
            HandleKind::Input { .. } => None,
        }
    }

    pub(crate) fn position(&mut self) -> io::Result<u64> {
        match &mut self.kind {
            HandleKind::File(file) => file.stream_position(),
            HandleKind::Memory(cursor) => Ok(cursor.position()),
            HandleKind::Input { consumed, .. } => Ok(*consumed),
        }
    }

    /// Reads up to `len` bytes, marking end of data when the source runs dry.
    ///
    /// The buffer grows with the bytes actually read, not with `len`.
    pub(crate) fn read_up_to(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let limit = u64::try_from(len).unwrap_or(u64::MAX);
        let mut buf = Vec::new();
        Read::by_ref(self).take(limit).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match &mut self.kind {
            HandleKind::File(file) => file.read(buf)?,
            HandleKind::Memory(cursor) => cursor.read(buf)?,
            HandleKind::Input { reader, consumed } => {
                let n = reader.read(buf)?;
                *consumed += n as u64;
                n
            }
        };

        if n == 0 && !buf.is_empty() {
            self.eof = true;
        }

        Ok(n)
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.kind {
            HandleKind::File(file) => file.write(buf),
            HandleKind::Memory(cursor) => {
                if self.mode.is_append() {
                    cursor.seek(SeekFrom::End(0))?;
                }
                cursor.write(buf)
            }
            HandleKind::Input { .. } => Err(io::Error::new(io::ErrorKind::Unsupported, "input handles are read-only")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.kind {
            HandleKind::File(file) => file.flush(),
            HandleKind::Memory(_) | HandleKind::Input { .. } => Ok(()),
        }
    }
}

impl Seek for Handle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let position = match &mut self.kind {
            HandleKind::File(file) => file.seek(pos)?,
            HandleKind::Memory(cursor) => cursor.seek(pos)?,
            HandleKind::Input { .. } => return Err(io::Error::new(io::ErrorKind::Unsupported, "input handles are not seekable")),
        };

        self.eof = false;
        Ok(position)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind_name())
            .field("mode", &self.mode.as_str())
            .field("location", &self.location)
            .field("eof", &self.eof)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_capabilities() {
        let cases = [
            ("r", true, false),
            ("rb", true, false),
            ("r+", true, true),
            ("w", false, true),
            ("wb+", true, true),
            ("a", false, true),
            ("a+", true, true),
            ("x", false, true),
            ("c+", true, true),
        ];

        for (raw, readable, writable) in cases {
            let mode = Mode::parse(raw).unwrap();
            assert_eq!(mode.is_readable(), readable, "{raw}");
            assert_eq!(mode.is_writable(), writable, "{raw}");
        }
    }

    #[test]
    fn invalid_modes() {
        for raw in ["", "z", "+r", "rw", "r?"] {
            assert!(Mode::parse(raw).is_none(), "{raw:?}");
        }
    }

    #[test]
    fn open_rejects_empty_location() {
        let err = Handle::open("", "r").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn open_rejects_invalid_mode() {
        let err = Handle::open(MEMORY_LOCATION, "q").unwrap_err();
        assert!(err.is_runtime());
    }

    #[test]
    fn open_missing_file_is_runtime_error() {
        let path = std::env::temp_dir().join("micro-message-handle-missing").join("nope.txt");
        let err = Handle::open_path(&path, "r").unwrap_err();
        assert!(err.is_runtime());
    }

    #[test]
    fn memory_handle_round_trip() {
        let mut handle = Handle::memory("hello");
        assert_eq!(handle.size(), Some(5));
        assert_eq!(handle.read_up_to(3).unwrap(), b"hel");
        assert!(!handle.is_eof());
        assert_eq!(handle.read_up_to(10).unwrap(), b"lo");
        assert!(handle.is_eof());

        handle.seek(SeekFrom::Start(0)).unwrap();
        assert!(!handle.is_eof());
    }

    #[test]
    fn read_up_to_huge_length_reads_what_is_there() {
        let mut handle = Handle::memory("abc");
        assert_eq!(handle.read_up_to(usize::MAX).unwrap(), b"abc");
        assert!(handle.is_eof());
    }

    #[test]
    fn reader_handle_is_not_seekable() {
        let mut handle = Handle::from_reader(&b"abc"[..]);
        assert!(!handle.is_seekable());
        assert_eq!(handle.size(), None);
        assert!(handle.seek(SeekFrom::Start(0)).is_err());
        assert!(handle.write(b"x").is_err());

        assert_eq!(handle.read_up_to(2).unwrap(), b"ab");
        assert_eq!(handle.position().unwrap(), 2);
    }
}
