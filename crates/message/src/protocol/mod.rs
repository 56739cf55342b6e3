//! Immutable http message value objects.
//!
//! # Architecture
//!
//! The protocol module is organized bottom-up:
//!
//! - **Uri** ([`Uri`]): parsing, normalization and percent-encoding of uri references
//!
//! - **Headers** ([`header`]): validated, case-insensitive header storage
//!   - [`HeaderSet`]: ordered multi-map guarding against header injection
//!   - [`HeaderValues`]: single value or list accepted at the api boundary
//!
//! - **Bodies** ([`body`]): stateful byte streams
//!   - [`ByteStream`]: shared stream with an open / detached / closed lifecycle
//!   - [`Handle`]: the owned file, memory or input resource behind a stream
//!
//! - **Messages**: composition of the pieces above
//!   - [`Message`] and the [`HttpMessage`] trait: protocol version, headers, body
//!   - [`Request`]: method, uri and request target with `Host` header synchronization
//!   - [`ServerRequest`]: server, cookie and query parameters, attributes, parsed body
//!     and uploaded files on top of a request
//!   - [`Response`]: status code and reason phrase
//!
//! - **Uploads** ([`upload`]): [`UploadedFile`] with its move-once lifecycle
//!
//! - **Error Handling** ([`error`]):
//!   - [`MessageError`]: top-level error type
//!   - [`ArgumentError`]: the caller supplied invalid input
//!   - [`RuntimeError`]: a valid value failed at operation time
//!
//! # Immutability
//!
//! Every `with_*` method takes `&self` and returns a new value; the original never
//! changes. Unchanged parts are shared through reference counted pointers, and a
//! mutation that would not change anything returns a value sharing all storage with
//! the original (see the `ptr_eq` methods).

mod uri;
pub use uri::Uri;

pub mod header;
pub use header::HeaderSet;
pub use header::HeaderValues;

mod version;
pub use version::ProtocolVersion;

pub mod body;
pub use body::BodySource;
pub use body::ByteStream;
pub use body::Handle;
pub use body::StreamMetadata;

mod message;
pub use message::HttpMessage;
pub use message::Message;

mod request;
pub use request::Request;
pub use request::RequestBuilder;
pub use request::UriSource;

mod server_request;
pub use server_request::Params;
pub use server_request::ServerRequest;
pub use server_request::ServerRequestBuilder;

mod response;
pub use response::Response;
pub use response::ResponseBuilder;

pub mod upload;
pub use upload::UploadError;
pub use upload::UploadNode;
pub use upload::UploadSource;
pub use upload::UploadedFile;
pub use upload::UploadedFiles;

pub mod error;
pub use error::ArgumentError;
pub use error::MessageError;
pub use error::RuntimeError;

pub type Result<T> = std::result::Result<T, MessageError>;
