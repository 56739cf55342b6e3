//! The part every http message shares: protocol version, headers and body.
//!
//! [`Message`] is composed by value into [`Request`](super::Request),
//! [`ServerRequest`](super::ServerRequest) and [`Response`](super::Response). The
//! [`HttpMessage`] trait exposes its accessors and pure mutators on all of them, so a
//! header or body can be swapped on any message type without knowing which one it is.

use std::borrow::Cow;

use crate::protocol::{ByteStream, HeaderSet, HeaderValues, MessageError, ProtocolVersion};

/// Protocol version, headers and body of a message.
///
/// Cloning is cheap: headers and body are shared.
#[derive(Debug, Clone)]
pub struct Message {
    version: ProtocolVersion,
    headers: HeaderSet,
    body: ByteStream,
}

impl Message {
    pub fn new(body: ByteStream) -> Self {
        Self { version: ProtocolVersion::default(), headers: HeaderSet::default(), body }
    }

    pub fn from_parts(version: ProtocolVersion, headers: HeaderSet, body: ByteStream) -> Self {
        Self { version, headers, body }
    }

    /// Returns true if both messages carry the same version and share headers and body.
    pub fn ptr_eq(&self, other: &Message) -> bool {
        self.version == other.version && self.headers.ptr_eq(&other.headers) && self.body.ptr_eq(&other.body)
    }

    #[inline]
    pub fn header_set(&self) -> &HeaderSet {
        &self.headers
    }

    fn with_version(&self, version: ProtocolVersion) -> Self {
        Self { version, headers: self.headers.clone(), body: self.body.clone() }
    }

    fn with_headers(&self, headers: HeaderSet) -> Self {
        Self { version: self.version, headers, body: self.body.clone() }
    }

    fn with_body_stream(&self, body: ByteStream) -> Self {
        Self { version: self.version, headers: self.headers.clone(), body }
    }
}

/// Accessors and pure mutators shared by every message type.
///
/// Implementors only provide [`message`](HttpMessage::message) and
/// [`with_message`](HttpMessage::with_message). Mutators that would not change anything
/// return a clone sharing all storage with `self`.
pub trait HttpMessage: Clone {
    fn message(&self) -> &Message;

    /// Returns a copy of `self` carrying `message`.
    fn with_message(&self, message: Message) -> Self;

    fn protocol_version(&self) -> ProtocolVersion {
        self.message().version
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error for an empty or unsupported version.
    fn with_protocol_version(&self, version: &str) -> Result<Self, MessageError> {
        let version = ProtocolVersion::parse(version)?;
        if version == self.protocol_version() {
            return Ok(self.clone());
        }

        Ok(self.with_message(self.message().with_version(version)))
    }

    /// All headers in insertion order.
    fn headers(&self) -> HeaderSet {
        self.message().headers.clone()
    }

    /// Returns true if the header is stored; lookup is case-insensitive.
    fn has_header(&self, name: &str) -> bool {
        self.message().headers.contains(name)
    }

    /// The values of a header, empty if absent.
    fn header(&self, name: &str) -> Cow<'_, [String]> {
        Cow::Borrowed(self.message().headers.get(name))
    }

    /// The values of a header joined by `,`, empty if absent.
    fn header_line(&self, name: &str) -> String {
        self.header(name).join(",")
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error for an invalid name, value or an empty list.
    fn with_header(&self, name: &str, values: impl Into<HeaderValues>) -> Result<Self, MessageError> {
        let headers = self.message().headers.with(name, values)?;
        Ok(self.with_message(self.message().with_headers(headers)))
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error for an invalid name, value or an empty list.
    fn with_added_header(&self, name: &str, values: impl Into<HeaderValues>) -> Result<Self, MessageError> {
        let headers = self.message().headers.with_added(name, values)?;
        Ok(self.with_message(self.message().with_headers(headers)))
    }

    fn without_header(&self, name: &str) -> Self {
        if !self.has_header(name) {
            return self.clone();
        }

        let headers = self.message().headers.without(name);
        self.with_message(self.message().with_headers(headers))
    }

    fn body(&self) -> &ByteStream {
        &self.message().body
    }

    fn with_body(&self, body: ByteStream) -> Self {
        if body.ptr_eq(self.body()) {
            return self.clone();
        }

        self.with_message(self.message().with_body_stream(body))
    }
}

impl HttpMessage for Message {
    fn message(&self) -> &Message {
        self
    }

    fn with_message(&self, message: Message) -> Self {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message::new(ByteStream::from_content(""))
    }

    #[test]
    fn defaults() {
        let message = message();
        assert_eq!(message.protocol_version().as_str(), "1.1");
        assert!(message.headers().is_empty());
        assert_eq!(message.header_line("x-foo"), "");
    }

    #[test]
    fn with_protocol_version() {
        let original = message();

        let changed = original.with_protocol_version("2").unwrap();
        assert_eq!(changed.protocol_version().as_str(), "2");
        assert_eq!(original.protocol_version().as_str(), "1.1");

        assert!(original.with_protocol_version("1.1").unwrap().ptr_eq(&original));
        assert!(original.with_protocol_version("").unwrap_err().is_invalid_argument());
        assert!(original.with_protocol_version("1.2").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn header_mutators() {
        let original = message();
        let with = original.with_header("X-Foo", "bar").unwrap();

        assert!(with.has_header("x-foo"));
        assert_eq!(&*with.header("X-FOO"), ["bar"]);
        assert!(!original.has_header("x-foo"));

        let added = with.with_added_header("x-foo", "baz").unwrap();
        assert_eq!(added.header_line("x-foo"), "bar,baz");

        let removed = added.without_header("X-Foo");
        assert!(!removed.has_header("x-foo"));
        assert!(removed.without_header("X-Foo").ptr_eq(&removed));
    }

    #[test]
    fn with_body() {
        let original = message();
        assert!(original.with_body(original.body().clone()).ptr_eq(&original));

        let body = ByteStream::from_content("new");
        let changed = original.with_body(body.clone());
        assert!(changed.body().ptr_eq(&body));
        assert!(!changed.ptr_eq(&original));
        assert!(changed.header_set().ptr_eq(original.header_set()));
    }
}
