//! Immutable, validated HTTP message value objects
//!
//! This crate models requests, server requests, responses, uris, byte streams and file
//! uploads as immutable values. It performs no network I/O itself: it gives HTTP
//! handling code an authoritative, validated representation of a message to work with.
//!
//! # Features
//!
//! - RFC 3986 uri parsing with idempotent percent-encoding
//! - Case-insensitive headers with CRLF injection defense
//! - Byte streams over files, memory or standard input with an explicit lifecycle
//! - `Host` header synchronization between a request and its uri
//! - Uploaded files that can be moved exactly once
//! - Conversion from and to the `http` crate types
//!
//! # Example
//!
//! ```no_run
//! use tracing::{info, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use micro_message::protocol::{ByteStream, HttpMessage, Request, Response, Uri};
//!
//! fn main() -> micro_message::protocol::Result<()> {
//!     // Initialize logging
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::TRACE)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     let request = Request::builder()
//!         .method("POST")
//!         .uri("https://example.com:8443/items?page=1")
//!         .header("Content-Type", "application/json")
//!         .body(ByteStream::from_content(r#"{"name":"micro"}"#))
//!         .build()?;
//!
//!     // the Host header follows the uri
//!     info!(host = %request.header_line("host"), target = %request.request_target(), "built request");
//!
//!     let moved = request.with_uri(Uri::parse("https://zaphyr.org/items")?, false)?;
//!     assert_eq!(moved.header_line("host"), "zaphyr.org");
//!
//!     let response = Response::builder()
//!         .status(201)
//!         .header("Location", "/items/1")
//!         .build()?;
//!     info!(status = %response.status(), reason = response.reason_phrase(), "built response");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Everything lives in the [`protocol`] module:
//!
//! - [`protocol::Uri`]: uri value object
//! - [`protocol::HeaderSet`]: validated header storage
//! - [`protocol::ByteStream`]: message bodies
//! - [`protocol::Request`], [`protocol::ServerRequest`], [`protocol::Response`]: messages
//! - [`protocol::UploadedFile`]: multipart uploads
//!
//! # Error Handling
//!
//! Every fallible operation returns [`protocol::MessageError`], which tells apart input
//! the caller got wrong ([`protocol::ArgumentError`]) from failures at operation time
//! ([`protocol::RuntimeError`]). The only operation that swallows errors is rendering a
//! [`protocol::ByteStream`] with `Display`, which yields an empty string instead.
//!
//! # Logging
//!
//! The crate emits `tracing` events (stream lifecycle, `Host` synchronization, upload
//! moves) and never installs a subscriber itself.

pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
