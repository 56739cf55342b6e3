use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid argument: {source}")]
    InvalidArgument {
        #[from]
        source: ArgumentError,
    },

    #[error("runtime error: {source}")]
    Runtime {
        #[from]
        source: RuntimeError,
    },
}

impl MessageError {
    /// Returns true if the caller supplied invalid input
    #[inline]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, MessageError::InvalidArgument { .. })
    }

    /// Returns true if a valid value failed at operation time
    #[inline]
    pub fn is_runtime(&self) -> bool {
        matches!(self, MessageError::Runtime { .. })
    }
}

#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("the source uri string appears to be malformed: {reason}")]
    MalformedUri { reason: String },

    #[error("invalid uri scheme \"{scheme}\" provided, must be one of: {allowed}")]
    InvalidScheme { scheme: String, allowed: String },

    #[error("invalid uri port {port} provided, must be a valid tcp/udp port")]
    InvalidPort { port: u32 },

    #[error("invalid uri path provided: {reason}")]
    InvalidPath { reason: &'static str },

    #[error("invalid uri query string provided, must not contain a uri fragment")]
    InvalidQuery,

    #[error("invalid header name {name:?}, must be an rfc 7230 compatible token")]
    InvalidHeaderName { name: String },

    #[error("invalid header value {value:?}, must be an rfc 7230 compatible string")]
    InvalidHeaderValue { value: String },

    #[error("invalid header value, must be a value or a non-empty list of values")]
    EmptyHeaderValues,

    #[error("http protocol version can not be empty")]
    EmptyProtocolVersion,

    #[error("unsupported http protocol version \"{version}\" provided")]
    InvalidProtocolVersion { version: String },

    #[error("invalid http method {method:?} provided")]
    InvalidMethod { method: String },

    #[error("invalid request target {target:?} provided, cannot contain whitespace")]
    InvalidRequestTarget { target: String },

    #[error("invalid status code {code}, must be in range 100..=599")]
    InvalidStatusCode { code: u16 },

    #[error("invalid stream provided: {reason}")]
    InvalidStream { reason: String },

    #[error("invalid upload error status {code}, must be one of the defined upload outcomes")]
    InvalidUploadError { code: i32 },

    #[error("invalid stream or file provided for uploaded file")]
    InvalidUploadSource,

    #[error("invalid path provided for move operation, must be a non-empty path")]
    EmptyTargetPath,

    #[error("invalid body data provided, must be null, an object or an array, \"{kind}\" given")]
    InvalidParsedBody { kind: &'static str },

    #[error("can not convert message: {reason}")]
    Conversion { reason: String },
}

impl ArgumentError {
    pub fn malformed_uri<S: ToString>(str: S) -> Self {
        Self::MalformedUri { reason: str.to_string() }
    }

    pub fn header_name<S: ToString>(name: S) -> Self {
        Self::InvalidHeaderName { name: name.to_string() }
    }

    pub fn header_value<S: ToString>(value: S) -> Self {
        Self::InvalidHeaderValue { value: value.to_string() }
    }

    pub fn method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn invalid_stream<S: ToString>(str: S) -> Self {
        Self::InvalidStream { reason: str.to_string() }
    }

    pub fn conversion<S: ToString>(str: S) -> Self {
        Self::Conversion { reason: str.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("no resource available, cannot {operation}")]
    Detached { operation: &'static str },

    #[error("stream is closed, cannot {operation}")]
    Closed { operation: &'static str },

    #[error("stream is not seekable")]
    NotSeekable,

    #[error("stream is not readable")]
    NotReadable,

    #[error("stream is not writable")]
    NotWritable,

    #[error("unable to open stream \"{location}\" with mode \"{mode}\": {reason}")]
    Open { location: String, mode: String, reason: String },

    #[error("{message}")]
    Upload { message: &'static str },

    #[error("cannot move file, already moved")]
    AlreadyMoved,

    #[error("cannot retrieve stream after it has already moved")]
    StreamAfterMove,

    #[error("the target directory \"{directory}\" does not exist or is not writable")]
    TargetDirectory { directory: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl RuntimeError {
    pub fn open<L: ToString, M: ToString, R: ToString>(location: L, mode: M, reason: R) -> Self {
        Self::Open { location: location.to_string(), mode: mode.to_string(), reason: reason.to_string() }
    }

    pub fn target_directory<S: ToString>(directory: S) -> Self {
        Self::TargetDirectory { directory: directory.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

impl From<io::Error> for MessageError {
    fn from(e: io::Error) -> Self {
        RuntimeError::io(e).into()
    }
}
