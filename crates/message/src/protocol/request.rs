//! Client side request with Host header synchronization.
//!
//! The `Host` header of a [`Request`] follows its [`Uri`]:
//!
//! - when a request is built without a `Host` header and the uri has a host, the header
//!   is stored at construction time
//! - reading headers synthesizes `Host` from the uri whenever no `Host` header is
//!   stored (for example after `without_header("host")`); the synthesized header is
//!   never persisted
//! - [`Request::with_uri`] rewrites the stored `Host` header from the new uri, unless
//!   asked to preserve an existing one or the new uri has no host

use std::borrow::Cow;

use bytes::Bytes;
use http::Method;
use tracing::trace;
use triomphe::Arc;

use crate::ensure;
use crate::protocol::body::MEMORY_LOCATION;
use crate::protocol::header::is_tchar;
use crate::protocol::{
    ArgumentError, BodySource, ByteStream, HeaderSet, HeaderValues, HttpMessage, Message, MessageError, ProtocolVersion, Uri,
};

const HOST: &str = "Host";

/// A uri given either parsed or as a raw string.
#[derive(Debug, Clone)]
pub enum UriSource {
    Uri(Uri),
    Raw(String),
}

impl UriSource {
    pub(crate) fn into_uri(self) -> Result<Uri, MessageError> {
        match self {
            UriSource::Uri(uri) => Ok(uri),
            UriSource::Raw(raw) => Uri::parse(&raw),
        }
    }
}

impl From<Uri> for UriSource {
    fn from(uri: Uri) -> Self {
        UriSource::Uri(uri)
    }
}

impl From<&Uri> for UriSource {
    fn from(uri: &Uri) -> Self {
        UriSource::Uri(uri.clone())
    }
}

impl From<&str> for UriSource {
    fn from(raw: &str) -> Self {
        UriSource::Raw(raw.to_string())
    }
}

impl From<String> for UriSource {
    fn from(raw: String) -> Self {
        UriSource::Raw(raw)
    }
}

#[derive(Debug, Clone)]
struct RequestParts {
    message: Message,
    uri: Uri,
    method: Method,
    target: Option<String>,
}

/// An immutable outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
    parts: Arc<RequestParts>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Builds a request with the given method and uri and default everything else.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for an invalid method or uri.
    pub fn new<U: Into<UriSource>>(method: &str, uri: U) -> Result<Self, MessageError> {
        Self::builder().method(method).uri(uri).build()
    }

    /// Returns true if both values share the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &Request) -> bool {
        Arc::ptr_eq(&self.parts, &other.parts)
    }

    /// The method as given, case preserved.
    #[inline]
    pub fn method(&self) -> &str {
        self.parts.method.as_str()
    }

    #[inline]
    pub fn http_method(&self) -> &Method {
        &self.parts.method
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error if `method` is empty or not a token.
    pub fn with_method(&self, method: &str) -> Result<Self, MessageError> {
        let method = parse_method(method)?;
        if method == self.parts.method {
            return Ok(self.clone());
        }

        Ok(self.update(|parts| parts.method = method))
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns a request for `uri`, keeping the `Host` header in sync.
    ///
    /// With `preserve_host` an existing `Host` header is left alone. A uri without host
    /// never touches the headers.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the uri host is not a valid header value.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Result<Self, MessageError> {
        let message = if preserve_host && self.has_header(HOST) {
            self.parts.message.clone()
        } else {
            match uri.host_header() {
                Some(host) => {
                    trace!(%host, "synchronizing host header with uri");
                    self.parts.message.with_header(HOST, host)?
                }
                None => self.parts.message.clone(),
            }
        };

        Ok(self.update(|parts| {
            parts.uri = uri;
            parts.message = message;
        }))
    }

    /// The explicit request target, else `path[?query]` of the uri, else `/`.
    pub fn request_target(&self) -> Cow<'_, str> {
        if let Some(target) = &self.parts.target {
            return Cow::Borrowed(target.as_str());
        }

        let uri = self.uri();
        let mut target = uri.path().to_string();
        if !uri.query().is_empty() {
            target.push('?');
            target.push_str(uri.query());
        }

        if target.is_empty() {
            target.push('/');
        }

        Cow::Owned(target)
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error if `target` contains whitespace.
    pub fn with_request_target(&self, target: &str) -> Result<Self, MessageError> {
        ensure!(!target.contains(char::is_whitespace), ArgumentError::InvalidRequestTarget { target: target.to_string() });

        let target = target.to_string();
        Ok(self.update(|parts| parts.target = Some(target)))
    }

    /// Exports the request, synthesized `Host` header included. The body stream is shared.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the `http` types reject a component.
    pub fn to_http(&self) -> Result<http::Request<ByteStream>, MessageError> {
        let uri = self.uri();
        let target = self.request_target();

        let mut uri_builder = http::Uri::builder();
        if !uri.scheme().is_empty()
            && let Some(authority) = uri.host_header()
        {
            uri_builder = uri_builder.scheme(uri.scheme()).authority(authority.as_str());
        }
        let http_uri = uri_builder.path_and_query(&*ascii_target(&target)).build().map_err(ArgumentError::conversion)?;

        let mut builder = http::Request::builder().method(self.http_method().clone()).uri(http_uri).version(self.protocol_version().to_http());
        for (name, values) in self.headers().iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }

        Ok(builder.body(self.body().clone()).map_err(ArgumentError::conversion)?)
    }

    /// Imports a request, validating every component. The body is copied into memory.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for an unsupported version, a non utf-8 header
    /// value or any component this crate rejects.
    pub fn from_http<B: Into<Bytes>>(request: http::Request<B>) -> Result<Self, MessageError> {
        let (head, body) = request.into_parts();
        let body: Bytes = body.into();

        let mut builder = Request::builder()
            .method(head.method.as_str())
            .uri(head.uri.to_string())
            .protocol_version(ProtocolVersion::from_http(head.version)?.as_str())
            .body(ByteStream::from_content(body));

        for (name, value) in &head.headers {
            let value = value.to_str().map_err(ArgumentError::conversion)?;
            builder = builder.added_header(name.as_str(), value);
        }

        builder.build()
    }

    fn update(&self, f: impl FnOnce(&mut RequestParts)) -> Self {
        let mut parts = (*self.parts).clone();
        f(&mut parts);
        Self { parts: Arc::new(parts) }
    }

    fn synthesized_host(&self) -> Option<String> {
        if self.has_header(HOST) {
            return None;
        }

        self.uri().host_header()
    }
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.parts.message
    }

    fn with_message(&self, message: Message) -> Self {
        self.update(|parts| parts.message = message)
    }

    fn headers(&self) -> HeaderSet {
        let headers = self.parts.message.header_set();
        match self.synthesized_host() {
            Some(host) => headers.with(HOST, host).unwrap_or_else(|_| headers.clone()),
            None => headers.clone(),
        }
    }

    fn header(&self, name: &str) -> Cow<'_, [String]> {
        if name.eq_ignore_ascii_case(HOST)
            && let Some(host) = self.synthesized_host()
        {
            return Cow::Owned(vec![host]);
        }

        Cow::Borrowed(self.parts.message.header_set().get(name))
    }
}

/// Percent-encodes the non-ascii bytes kept verbatim in iri style targets, `http::Uri` only takes ascii.
fn ascii_target(target: &str) -> Cow<'_, str> {
    if target.is_ascii() {
        return Cow::Borrowed(target);
    }

    let mut out = String::with_capacity(target.len() * 3);
    for byte in target.bytes() {
        if byte.is_ascii() {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }

    Cow::Owned(out)
}

fn parse_method(method: &str) -> Result<Method, ArgumentError> {
    ensure!(!method.is_empty() && method.bytes().all(is_tchar), ArgumentError::method(method));

    match Method::from_bytes(method.as_bytes()) {
        Ok(method) => Ok(method),
        Err(_) => Err(ArgumentError::method(method)),
    }
}

/// Builder for [`Request`]; every field has a default.
#[derive(Debug)]
pub struct RequestBuilder {
    method: String,
    uri: Option<UriSource>,
    body: Option<BodySource>,
    headers: Vec<(String, HeaderValues)>,
    protocol: String,
}

impl RequestBuilder {
    fn new() -> Self {
        Self { method: "GET".to_string(), uri: None, body: None, headers: Vec::new(), protocol: "1.1".to_string() }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn uri(mut self, uri: impl Into<UriSource>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets the body, an in-memory stream by default.
    pub fn body(mut self, body: impl Into<BodySource>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a header, replacing values previously given for the same name.
    pub fn header(mut self, name: impl Into<String>, values: impl Into<HeaderValues>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, values.into()));
        self
    }

    /// Adds header values, keeping values previously given for the same name.
    pub fn added_header(mut self, name: impl Into<String>, values: impl Into<HeaderValues>) -> Self {
        self.headers.push((name.into(), values.into()));
        self
    }

    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol = version.into();
        self
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error for any invalid component, or a runtime error
    /// if the body location cannot be opened.
    pub fn build(self) -> Result<Request, MessageError> {
        self.build_with_default_body(MEMORY_LOCATION)
    }

    pub(crate) fn build_with_default_body(self, location: &str) -> Result<Request, MessageError> {
        let method = parse_method(&self.method)?;
        let uri = self.uri.map(UriSource::into_uri).transpose()?.unwrap_or_default();
        let version = ProtocolVersion::parse(&self.protocol)?;

        let mut headers = HeaderSet::from_pairs(self.headers)?;
        if !headers.contains(HOST)
            && let Some(host) = uri.host_header()
        {
            headers = headers.with(HOST, host)?;
        }

        let body = self.body.unwrap_or_else(|| BodySource::Location(location.to_string())).into_stream()?;

        let message = Message::from_parts(version, headers, body);
        Ok(Request { parts: Arc::new(RequestParts { message, uri, method, target: None }) })
    }
}
