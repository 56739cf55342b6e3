//! Files received through multipart uploads.
//!
//! An [`UploadedFile`] carries the outcome of the upload ([`UploadError`]), the untrusted
//! client supplied name and media type, and its content: either a file on disk or a
//! stream. Successful uploads can be moved to their final location exactly once.
//!
//! A request exposes its uploads as [`UploadedFiles`], a tree of [`UploadNode`]s whose
//! leaves can only be uploaded files.

mod error_code;
mod tree;
mod uploaded_file;

pub use error_code::UploadError;
pub use tree::{UploadNode, UploadedFiles};
pub use uploaded_file::{UploadSource, UploadedFile};
