//! Server side view of an incoming request.
//!
//! A [`ServerRequest`] layers read-only request metadata over a [`Request`]: a snapshot
//! of server parameters fixed at construction, cookie and query parameters, the parsed
//! body, the uploaded-file tree and a free-form attribute bag for values derived while
//! handling the request (route parameters, session data, ...).

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use triomphe::Arc;

use crate::protocol::body::INPUT_LOCATION;
use crate::protocol::{
    ArgumentError, BodySource, HeaderSet, HeaderValues, HttpMessage, Message, MessageError, Request, RequestBuilder, UploadNode, UploadedFiles,
    Uri, UriSource,
};

/// String keyed parameters such as cookies, query or server parameters.
pub type Params = Map<String, Value>;

#[derive(Debug, Clone)]
struct ServerParts {
    server_params: Arc<Params>,
    cookie_params: Params,
    query_params: Params,
    attributes: HashMap<String, Value>,
    parsed_body: Option<Value>,
    uploaded_files: UploadedFiles,
}

/// An immutable incoming request.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    request: Request,
    parts: Arc<ServerParts>,
}

impl ServerRequest {
    pub fn builder() -> ServerRequestBuilder {
        ServerRequestBuilder::new()
    }

    /// Returns true if both values share the same storage.
    pub fn ptr_eq(&self, other: &ServerRequest) -> bool {
        self.request.ptr_eq(&other.request) && Arc::ptr_eq(&self.parts, &other.parts)
    }

    /// The underlying request.
    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[inline]
    pub fn method(&self) -> &str {
        self.request.method()
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error if `method` is empty or not a token.
    pub fn with_method(&self, method: &str) -> Result<Self, MessageError> {
        Ok(self.with_request(self.request.with_method(method)?))
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// See [`Request::with_uri`].
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the uri host is not a valid header value.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Result<Self, MessageError> {
        Ok(self.with_request(self.request.with_uri(uri, preserve_host)?))
    }

    pub fn request_target(&self) -> Cow<'_, str> {
        self.request.request_target()
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error if `target` contains whitespace.
    pub fn with_request_target(&self, target: &str) -> Result<Self, MessageError> {
        Ok(self.with_request(self.request.with_request_target(target)?))
    }

    /// The server parameters captured at construction.
    pub fn server_params(&self) -> &Params {
        &self.parts.server_params
    }

    pub fn cookie_params(&self) -> &Params {
        &self.parts.cookie_params
    }

    pub fn with_cookie_params(&self, cookies: Params) -> Self {
        self.update(|parts| parts.cookie_params = cookies)
    }

    pub fn query_params(&self) -> &Params {
        &self.parts.query_params
    }

    pub fn with_query_params(&self, query: Params) -> Self {
        self.update(|parts| parts.query_params = query)
    }

    pub fn uploaded_files(&self) -> &UploadedFiles {
        &self.parts.uploaded_files
    }

    pub fn with_uploaded_files(&self, files: UploadedFiles) -> Self {
        self.update(|parts| parts.uploaded_files = files)
    }

    /// The parsed body: `None`, or a json object or array.
    pub fn parsed_body(&self) -> Option<&Value> {
        self.parts.parsed_body.as_ref()
    }

    /// Deserializes the parsed body into `T`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the body does not match `T`.
    pub fn parsed_body_as<T: DeserializeOwned>(&self) -> Result<Option<T>, MessageError> {
        self.parts
            .parsed_body
            .as_ref()
            .map(|body| T::deserialize(body).map_err(ArgumentError::conversion))
            .transpose()
            .map_err(MessageError::from)
    }

    /// Returns a request with the given parsed body; `null` clears it.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for scalar values.
    pub fn with_parsed_body(&self, data: Value) -> Result<Self, MessageError> {
        let body = check_parsed_body(data)?;
        Ok(self.update(|parts| parts.parsed_body = body))
    }

    /// Serializes `data` and uses it as parsed body, see [`with_parsed_body`](Self::with_parsed_body).
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if `data` fails to serialize or is a scalar.
    pub fn with_parsed_body_from<T: Serialize + ?Sized>(&self, data: &T) -> Result<Self, MessageError> {
        let value = serde_json::to_value(data).map_err(ArgumentError::conversion)?;
        self.with_parsed_body(value)
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.parts.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.parts.attributes.get(name)
    }

    /// The attribute `name`, or `default` if it is not set.
    pub fn attribute_or(&self, name: &str, default: impl Into<Value>) -> Value {
        self.attribute(name).cloned().unwrap_or_else(|| default.into())
    }

    pub fn with_attribute(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let (name, value) = (name.into(), value.into());
        self.update(|parts| {
            parts.attributes.insert(name, value);
        })
    }

    /// Returns a request without the attribute; shares storage if it is not set.
    pub fn without_attribute(&self, name: &str) -> Self {
        if !self.parts.attributes.contains_key(name) {
            return self.clone();
        }

        self.update(|parts| {
            parts.attributes.remove(name);
        })
    }

    fn with_request(&self, request: Request) -> Self {
        Self { request, parts: Arc::clone(&self.parts) }
    }

    fn update(&self, f: impl FnOnce(&mut ServerParts)) -> Self {
        let mut parts = (*self.parts).clone();
        f(&mut parts);
        Self { request: self.request.clone(), parts: Arc::new(parts) }
    }
}

impl HttpMessage for ServerRequest {
    fn message(&self) -> &Message {
        self.request.message()
    }

    fn with_message(&self, message: Message) -> Self {
        self.with_request(self.request.with_message(message))
    }

    fn headers(&self) -> HeaderSet {
        self.request.headers()
    }

    fn header(&self, name: &str) -> Cow<'_, [String]> {
        self.request.header(name)
    }
}

fn check_parsed_body(data: Value) -> Result<Option<Value>, ArgumentError> {
    let kind = match data {
        Value::Null => return Ok(None),
        Value::Object(_) | Value::Array(_) => return Ok(Some(data)),
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    };

    Err(ArgumentError::InvalidParsedBody { kind })
}

fn query_from_uri(uri: &Uri) -> Result<Params, ArgumentError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(uri.query()).map_err(ArgumentError::conversion)?;
    Ok(pairs.into_iter().map(|(key, value)| (key, Value::String(value))).collect())
}

/// Builder for [`ServerRequest`].
///
/// The body defaults to `input://` (standard input, read-only) and the query parameters
/// default to the decoded query string of the uri.
#[derive(Debug)]
pub struct ServerRequestBuilder {
    request: RequestBuilder,
    server_params: Params,
    cookie_params: Params,
    query_params: Option<Params>,
    parsed_body: Option<Value>,
    uploaded_files: UploadedFiles,
}

impl ServerRequestBuilder {
    fn new() -> Self {
        Self {
            request: Request::builder(),
            server_params: Params::new(),
            cookie_params: Params::new(),
            query_params: None,
            parsed_body: None,
            uploaded_files: UploadedFiles::new(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request = self.request.method(method);
        self
    }

    pub fn uri(mut self, uri: impl Into<UriSource>) -> Self {
        self.request = self.request.uri(uri);
        self
    }

    pub fn body(mut self, body: impl Into<BodySource>) -> Self {
        self.request = self.request.body(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, values: impl Into<HeaderValues>) -> Self {
        self.request = self.request.header(name, values);
        self
    }

    pub fn added_header(mut self, name: impl Into<String>, values: impl Into<HeaderValues>) -> Self {
        self.request = self.request.added_header(name, values);
        self
    }

    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.request = self.request.protocol_version(version);
        self
    }

    pub fn server_params(mut self, params: Params) -> Self {
        self.server_params = params;
        self
    }

    pub fn server_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.server_params.insert(name.into(), value.into());
        self
    }

    pub fn cookie_params(mut self, params: Params) -> Self {
        self.cookie_params = params;
        self
    }

    pub fn query_params(mut self, params: Params) -> Self {
        self.query_params = Some(params);
        self
    }

    pub fn parsed_body(mut self, body: Value) -> Self {
        self.parsed_body = Some(body);
        self
    }

    pub fn uploaded_files(mut self, files: UploadedFiles) -> Self {
        self.uploaded_files = files;
        self
    }

    pub fn uploaded_file(mut self, field: impl Into<String>, node: impl Into<UploadNode>) -> Self {
        self.uploaded_files.insert(field.into(), node.into());
        self
    }

    /// # Errors
    ///
    /// Returns an invalid-argument error for any invalid component or a scalar parsed
    /// body, or a runtime error if the body location cannot be opened.
    pub fn build(self) -> Result<ServerRequest, MessageError> {
        let parsed_body = self.parsed_body.map(check_parsed_body).transpose()?.flatten();
        let request = self.request.build_with_default_body(INPUT_LOCATION)?;

        let query_params = match self.query_params {
            Some(params) => params,
            None => query_from_uri(request.uri())?,
        };

        let parts = ServerParts {
            server_params: Arc::new(self.server_params),
            cookie_params: self.cookie_params,
            query_params,
            attributes: HashMap::new(),
            parsed_body,
            uploaded_files: self.uploaded_files,
        };

        Ok(ServerRequest { request, parts: Arc::new(parts) })
    }
}
