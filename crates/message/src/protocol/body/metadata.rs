use serde::Serialize;

/// A snapshot of the properties of an open stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMetadata {
    /// The location the handle was opened from, if any.
    pub uri: Option<String>,
    pub mode: String,
    pub seekable: bool,
    pub eof: bool,
    /// One of `file`, `memory` or `input`.
    pub stream_type: &'static str,
}
