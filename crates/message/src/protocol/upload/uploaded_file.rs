use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::UploadError;
use crate::ensure;
use crate::protocol::{ArgumentError, ByteStream, Handle, MessageError, RuntimeError};

const COPY_CHUNK_SIZE: usize = 4096;

/// Where the content of an uploaded file lives.
#[derive(Debug)]
pub enum UploadSource {
    /// A file on disk, opened lazily; empty for uploads that failed.
    Path(PathBuf),
    Handle(Handle),
    Stream(ByteStream),
}

impl From<&str> for UploadSource {
    fn from(path: &str) -> Self {
        UploadSource::Path(PathBuf::from(path))
    }
}

impl From<String> for UploadSource {
    fn from(path: String) -> Self {
        UploadSource::Path(PathBuf::from(path))
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        UploadSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::Path(path)
    }
}

impl From<Handle> for UploadSource {
    fn from(handle: Handle) -> Self {
        UploadSource::Handle(handle)
    }
}

impl From<ByteStream> for UploadSource {
    fn from(stream: ByteStream) -> Self {
        UploadSource::Stream(stream)
    }
}

#[derive(Debug, Default)]
struct UploadState {
    stream: Option<ByteStream>,
    moved: bool,
}

/// A file received through a multipart upload.
///
/// The file can be moved exactly once; afterwards neither its stream nor another move
/// is available. Client supplied name and media type are untrusted.
#[derive(Debug)]
pub struct UploadedFile {
    path: Option<PathBuf>,
    size: Option<u64>,
    error: UploadError,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    state: Mutex<UploadState>,
}

impl UploadedFile {
    /// # Errors
    ///
    /// Returns an invalid-argument error for an undefined error code, or for a successful
    /// upload whose source is an empty path.
    pub fn new<S: Into<UploadSource>>(source: S, size: Option<u64>, error: i32) -> Result<Self, MessageError> {
        let error = UploadError::from_code(error)?;

        let mut path = None;
        let mut state = UploadState::default();

        if error.is_ok() {
            match source.into() {
                UploadSource::Path(file) => {
                    ensure!(!file.as_os_str().is_empty(), ArgumentError::InvalidUploadSource);
                    path = Some(file);
                }
                UploadSource::Handle(handle) => state.stream = Some(ByteStream::new(handle)),
                UploadSource::Stream(stream) => state.stream = Some(stream),
            }
        }

        Ok(Self { path, size, error, client_filename: None, client_media_type: None, state: Mutex::new(state) })
    }

    pub fn with_client_filename(mut self, filename: impl Into<String>) -> Self {
        self.client_filename = Some(filename.into());
        self
    }

    pub fn with_client_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.client_media_type = Some(media_type.into());
        self
    }

    #[inline]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    #[inline]
    pub fn error(&self) -> UploadError {
        self.error
    }

    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    /// The client media type, if it parses as a mime type.
    pub fn client_media_type_mime(&self) -> Option<mime::Mime> {
        self.client_media_type.as_deref().and_then(|media_type| media_type.parse().ok())
    }

    pub fn is_moved(&self) -> bool {
        self.lock().moved
    }

    /// Returns the content stream, opening the backing file read-only on first use.
    ///
    /// # Errors
    ///
    /// Runtime error if the upload failed, the file was moved, or it cannot be opened.
    pub fn stream(&self) -> Result<ByteStream, MessageError> {
        self.ensure_uploaded()?;

        let mut state = self.lock();
        ensure!(!state.moved, RuntimeError::StreamAfterMove);

        self.stream_of(&mut state)
    }

    /// Moves the file to `target`. Succeeds at most once.
    ///
    /// Files on disk are renamed (copied when the rename crosses devices); stream backed
    /// files are copied in chunks.
    ///
    /// # Errors
    ///
    /// Runtime error if already moved, if the upload failed, if the target directory is
    /// missing or read-only, or on io failure. Invalid-argument error for an empty target.
    /// A read-only directory is recognized by its permission bits; a directory that is
    /// writable by mode but not by this process fails later with an io error. A failed
    /// copy leaves no file at `target`.
    pub fn move_to<P: AsRef<Path>>(&self, target: P) -> Result<(), MessageError> {
        let target = target.as_ref();

        let mut state = self.lock();
        ensure!(!state.moved, RuntimeError::AlreadyMoved);
        self.ensure_uploaded()?;
        ensure!(!target.as_os_str().is_empty(), ArgumentError::EmptyTargetPath);

        let directory = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        ensure!(is_writable_dir(directory), RuntimeError::target_directory(directory.display()));

        match &self.path {
            Some(path) => match fs::rename(path, target) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                    debug!(cause = %e, "rename crosses devices, copying uploaded file");
                    let stream = self.stream_of(&mut state)?;
                    copy_stream(&stream, target)?;
                    fs::remove_file(path)?;
                }
                Err(e) => return Err(e.into()),
            },
            None => {
                let stream = self.stream_of(&mut state)?;
                copy_stream(&stream, target)?;
            }
        }

        state.moved = true;
        debug!(path = %target.display(), size = ?self.size, "moved uploaded file");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, UploadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_uploaded(&self) -> Result<(), MessageError> {
        ensure!(self.error.is_ok(), RuntimeError::Upload { message: self.error.message() });
        Ok(())
    }

    fn stream_of(&self, state: &mut UploadState) -> Result<ByteStream, MessageError> {
        if let Some(stream) = &state.stream {
            return Ok(stream.clone());
        }

        let path = self.path.as_deref().ok_or(ArgumentError::InvalidUploadSource)?;
        let stream = ByteStream::new(Handle::open_path(path, "r")?);
        state.stream = Some(stream.clone());
        Ok(stream)
    }
}

/// Checks the permission bits only; whether this process may write there is only known
/// once the rename or copy runs, and a failure then surfaces as an io error.
fn is_writable_dir(directory: &Path) -> bool {
    fs::metadata(directory).is_ok_and(|metadata| metadata.is_dir() && !metadata.permissions().readonly())
}

/// Copies `stream` into a new file at `target`; the target is removed again if the copy fails.
fn copy_stream(stream: &ByteStream, target: &Path) -> Result<(), MessageError> {
    ensure!(stream.is_readable(), RuntimeError::NotReadable);

    let mut file = File::create(target).map_err(|e| RuntimeError::open(target.display(), "wb+", e))?;

    if let Err(e) = write_chunks(stream, &mut file) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(target) {
            warn!(cause = %cleanup, path = %target.display(), "failed to remove partial upload target");
        }
        return Err(e);
    }

    Ok(())
}

fn write_chunks<W: Write>(stream: &ByteStream, out: &mut W) -> Result<(), MessageError> {
    if stream.is_seekable() {
        stream.rewind()?;
    }

    while !stream.eof() {
        let chunk = stream.read(COPY_CHUNK_SIZE)?;
        if chunk.is_empty() {
            break;
        }
        out.write_all(&chunk)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        std::env::temp_dir().join(format!("micro-message-upload-{name}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn accessors() {
        let file = UploadedFile::new(ByteStream::from_content("foo"), Some(3), 0)
            .unwrap()
            .with_client_filename("foo.txt")
            .with_client_media_type("text/plain; charset=utf-8");

        assert_eq!(file.size(), Some(3));
        assert_eq!(file.error(), UploadError::Ok);
        assert_eq!(file.client_filename(), Some("foo.txt"));
        assert_eq!(file.client_media_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(file.client_media_type_mime().unwrap().essence_str(), "text/plain");
        assert!(!file.is_moved());
    }

    #[test]
    fn unparsable_media_type_has_no_mime() {
        let file = UploadedFile::new(ByteStream::from_content(""), None, 0).unwrap().with_client_media_type("not a mime");
        assert!(file.client_media_type_mime().is_none());
    }

    #[test]
    fn invalid_error_codes() {
        for code in [-1, 5, 9] {
            let err = UploadedFile::new("/tmp/file", None, code).unwrap_err();
            assert!(err.is_invalid_argument(), "{code}");
        }
    }

    #[test]
    fn successful_upload_needs_a_source() {
        let err = UploadedFile::new("", None, 0).unwrap_err();
        assert!(err.is_invalid_argument());

        assert!(UploadedFile::new("", None, 4).is_ok());
    }

    #[test]
    fn failed_upload_has_no_stream() {
        let file = UploadedFile::new("", None, 4).unwrap();

        let err = file.stream().unwrap_err();
        assert!(err.is_runtime());
        assert!(err.to_string().contains("No file was uploaded"));

        let err = file.move_to(temp_path("failed")).unwrap_err();
        assert!(err.is_runtime());
    }

    #[test]
    fn stream_backed_file_moves_once() {
        let file = UploadedFile::new(ByteStream::from_content("uploaded content"), Some(16), 0).unwrap();
        let target = temp_path("stream");

        file.move_to(&target).unwrap();
        assert!(file.is_moved());
        assert_eq!(fs::read_to_string(&target).unwrap(), "uploaded content");

        let err = file.move_to(temp_path("again")).unwrap_err();
        assert!(matches!(err, MessageError::Runtime { source: RuntimeError::AlreadyMoved }));

        let err = file.stream().unwrap_err();
        assert!(matches!(err, MessageError::Runtime { source: RuntimeError::StreamAfterMove }));

        fs::remove_file(&target).unwrap();
    }

    #[test]
    fn stream_copy_spans_many_chunks() {
        let content = "x".repeat(COPY_CHUNK_SIZE * 3 + 7);
        let stream = ByteStream::from_content(content.clone());
        stream.read(10).unwrap();

        let file = UploadedFile::new(stream, None, 0).unwrap();
        let target = temp_path("chunks");
        file.move_to(&target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), content);
        fs::remove_file(&target).unwrap();
    }

    #[test]
    fn path_backed_file_is_renamed() {
        let source = temp_path("source");
        fs::write(&source, "on disk").unwrap();

        let file = UploadedFile::new(source.as_path(), Some(7), 0).unwrap();
        assert_eq!(file.stream().unwrap().to_string(), "on disk");

        let target = temp_path("renamed");
        file.move_to(&target).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "on disk");
        fs::remove_file(&target).unwrap();
    }

    #[test]
    fn stream_is_memoized() {
        let source = temp_path("memoized");
        fs::write(&source, "abc").unwrap();

        let file = UploadedFile::new(source.clone(), None, 0).unwrap();
        assert!(file.stream().unwrap().ptr_eq(&file.stream().unwrap()));

        fs::remove_file(&source).unwrap();
    }

    #[test]
    fn empty_target_is_invalid_argument() {
        let file = UploadedFile::new(ByteStream::from_content("foo"), None, 0).unwrap();
        let err = file.move_to("").unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(!file.is_moved());
    }

    #[test]
    fn missing_target_directory() {
        let file = UploadedFile::new(ByteStream::from_content("foo"), None, 0).unwrap();
        let target = temp_path("missing-dir").join("file.txt");

        let err = file.move_to(&target).unwrap_err();
        assert!(matches!(err, MessageError::Runtime { source: RuntimeError::TargetDirectory { .. } }));
        assert!(!file.is_moved());
    }

    #[cfg(unix)]
    #[test]
    fn read_only_target_directory() {
        use std::os::unix::fs::PermissionsExt;

        let directory = temp_path("read-only-dir");
        fs::create_dir(&directory).unwrap();
        fs::set_permissions(&directory, fs::Permissions::from_mode(0o555)).unwrap();

        let file = UploadedFile::new(ByteStream::from_content("foo"), None, 0).unwrap();
        let target = directory.join("file.txt");
        let err = file.move_to(&target).unwrap_err();

        fs::set_permissions(&directory, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(err, MessageError::Runtime { source: RuntimeError::TargetDirectory { .. } }));
        assert!(!file.is_moved());
        assert!(!target.exists());
        fs::remove_dir(&directory).unwrap();
    }

    #[test]
    fn unreadable_stream_creates_no_target() {
        let file = UploadedFile::new(ByteStream::open("memory://", "w").unwrap(), None, 0).unwrap();
        let target = temp_path("write-only");

        let err = file.move_to(&target).unwrap_err();
        assert!(matches!(err, MessageError::Runtime { source: RuntimeError::NotReadable }));
        assert!(!target.exists());
        assert!(!file.is_moved());
    }

    struct Broken;

    impl io::Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("connection reset"))
        }
    }

    #[test]
    fn failed_copy_removes_partial_target() {
        let source = io::Read::chain(io::Read::take(io::repeat(b'x'), COPY_CHUNK_SIZE as u64), Broken);
        let file = UploadedFile::new(Handle::from_reader(source), None, 0).unwrap();
        let target = temp_path("partial");

        let err = file.move_to(&target).unwrap_err();
        assert!(matches!(err, MessageError::Runtime { source: RuntimeError::Io { .. } }));
        assert!(!target.exists());
        assert!(!file.is_moved());
    }
}
