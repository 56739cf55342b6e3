use bytes::Bytes;
use http::StatusCode;
use triomphe::Arc;

use crate::ensure;
use crate::protocol::body::MEMORY_LOCATION;
use crate::protocol::{ArgumentError, BodySource, ByteStream, HeaderSet, HeaderValues, HttpMessage, Message, MessageError, ProtocolVersion};

#[derive(Debug, Clone)]
struct ResponseParts {
    message: Message,
    status: StatusCode,
    reason: String,
}

/// An immutable response with status code and reason phrase.
#[derive(Debug, Clone)]
pub struct Response {
    parts: Arc<ResponseParts>,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// A `200 OK` response with an empty in-memory body.
    pub fn new() -> Self {
        let message = Message::new(ByteStream::from_content(""));
        Self { parts: Arc::new(ResponseParts { message, status: StatusCode::OK, reason: canonical_reason(StatusCode::OK) }) }
    }

    /// Returns true if both values share the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &Response) -> bool {
        Arc::ptr_eq(&self.parts, &other.parts)
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    #[inline]
    pub fn reason_phrase(&self) -> &str {
        &self.parts.reason
    }

    /// Returns a response with the given status; an empty `reason` picks the canonical phrase.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for codes outside `100..=599`.
    pub fn with_status(&self, code: u16, reason: &str) -> Result<Self, MessageError> {
        let (status, reason) = status_and_reason(code, reason)?;
        if status == self.parts.status && reason == self.parts.reason {
            return Ok(self.clone());
        }

        Ok(self.update(|parts| {
            parts.status = status;
            parts.reason = reason;
        }))
    }

    /// Exports the response. The body stream is shared.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the `http` types reject a header.
    pub fn to_http(&self) -> Result<http::Response<ByteStream>, MessageError> {
        let mut builder = http::Response::builder().status(self.status()).version(self.protocol_version().to_http());
        for (name, values) in self.headers().iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }

        Ok(builder.body(self.body().clone()).map_err(ArgumentError::conversion)?)
    }

    /// Imports a response, validating every header. The body is copied into memory.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for an unsupported version, a non utf-8 header
    /// value or any header this crate rejects.
    pub fn from_http<B: Into<Bytes>>(response: http::Response<B>) -> Result<Self, MessageError> {
        let (head, body) = response.into_parts();
        let body: Bytes = body.into();

        let mut builder = Response::builder()
            .status(head.status.as_u16())
            .protocol_version(ProtocolVersion::from_http(head.version)?.as_str())
            .body(ByteStream::from_content(body));

        for (name, value) in &head.headers {
            let value = value.to_str().map_err(ArgumentError::conversion)?;
            builder = builder.added_header(name.as_str(), value);
        }

        builder.build()
    }

    fn update(&self, f: impl FnOnce(&mut ResponseParts)) -> Self {
        let mut parts = (*self.parts).clone();
        f(&mut parts);
        Self { parts: Arc::new(parts) }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.parts.message
    }

    fn with_message(&self, message: Message) -> Self {
        self.update(|parts| parts.message = message)
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

fn status_and_reason(code: u16, reason: &str) -> Result<(StatusCode, String), ArgumentError> {
    ensure!((100..=599).contains(&code), ArgumentError::InvalidStatusCode { code });

    let status = StatusCode::from_u16(code).map_err(|e| ArgumentError::conversion(format!("status {code}: {e}")))?;
    let reason = if reason.is_empty() { canonical_reason(status) } else { reason.to_string() };

    Ok((status, reason))
}

/// Builder for [`Response`].
#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    reason: String,
    body: Option<BodySource>,
    headers: Vec<(String, HeaderValues)>,
    protocol: String,
}

impl ResponseBuilder {
    fn new() -> Self {
        Self { status: 200, reason: String::new(), body: None, headers: Vec::new(), protocol: "1.1".to_string() }
    }

    pub fn status(mut self, code: u16) -> Self {
        self.status = code;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
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
    pub fn build(self) -> Result<Response, MessageError> {
        let (status, reason) = status_and_reason(self.status, &self.reason)?;
        let version = ProtocolVersion::parse(&self.protocol)?;
        let headers = HeaderSet::from_pairs(self.headers)?;
        let body = self.body.unwrap_or_else(|| BodySource::Location(MEMORY_LOCATION.to_string())).into_stream()?;

        let message = Message::from_parts(version, headers, body);
        Ok(Response { parts: Arc::new(ResponseParts { message, status, reason }) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let response = Response::new();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.reason_phrase(), "OK");
        assert_eq!(response.protocol_version().as_str(), "1.1");
        assert!(response.body().is_writable());
    }

    #[test]
    fn with_status_resolves_canonical_reason() {
        let response = Response::new();

        let not_found = response.with_status(404, "").unwrap();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.reason_phrase(), "Not Found");

        let custom = response.with_status(404, "Nope").unwrap();
        assert_eq!(custom.reason_phrase(), "Nope");

        let unknown = response.with_status(599, "").unwrap();
        assert_eq!(unknown.reason_phrase(), "");

        assert!(response.with_status(200, "").unwrap().ptr_eq(&response));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn invalid_status_codes() {
        for code in [0, 99, 600, 1000] {
            let err = Response::new().with_status(code, "").unwrap_err();
            assert!(err.is_invalid_argument(), "{code}");
        }

        assert!(Response::builder().status(42).build().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn builder() {
        let response = Response::builder()
            .status(201)
            .header("Location", "/items/1")
            .added_header("Set-Cookie", ["a=1", "b=2"])
            .body(ByteStream::from_content("created"))
            .build()
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.reason_phrase(), "Created");
        assert_eq!(response.header_line("location"), "/items/1");
        assert_eq!(response.header("set-cookie").len(), 2);
        assert_eq!(response.body().to_string(), "created");
    }

    #[test]
    fn http_round_trip() {
        let response = Response::builder().status(418).header("X-Tea", "earl grey").body(ByteStream::from_content("short and stout")).build().unwrap();

        let exported = response.to_http().unwrap();
        assert_eq!(exported.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(exported.headers()["x-tea"], "earl grey");

        let imported = Response::from_http(http::Response::builder().status(503).header("retry-after", "120").body("down").unwrap()).unwrap();
        assert_eq!(imported.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(imported.reason_phrase(), "Service Unavailable");
        assert_eq!(imported.header_line("Retry-After"), "120");
        assert_eq!(imported.body().to_string(), "down");
    }
}
