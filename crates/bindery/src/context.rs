//! Request snapshot handed to the binding engine.
//!
//! A [`RequestSnapshot`] bundles everything the engine reads: the
//! router-resolved [`PathVars`], the decoded [`QueryValues`], the header map
//! and the single-use request [`Body`].

use std::fmt;
use std::io::{self, Read};
use std::time::Instant;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Uri};

use crate::{PathVars, QueryValues};

/// Request body as delivered by the transport.
///
/// The body is single-use: [`Body::read_to_end`] consumes it, and the
/// underlying reader is dropped when the read finishes, whether it succeeded
/// or not.
#[derive(Default)]
pub enum Body {
    /// No body was sent.
    #[default]
    Empty,
    /// A body that is already buffered.
    Bytes(Bytes),
    /// A body that still has to be read from a stream.
    Reader(Box<dyn Read + Send>),
}

impl Body {
    /// Wraps a blocking reader.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Reads the whole body, refusing to buffer more than `limit` bytes.
    ///
    /// Returns `Ok(Err(actual))` when the body is larger than `limit`, where
    /// `actual` is the number of bytes seen before reading stopped.
    pub fn read_to_end(self, limit: usize) -> io::Result<Result<Bytes, usize>> {
        match self {
            Self::Empty => Ok(Ok(Bytes::new())),
            Self::Bytes(bytes) if bytes.len() > limit => Ok(Err(bytes.len())),
            Self::Bytes(bytes) => Ok(Ok(bytes)),
            Self::Reader(reader) => {
                let mut buf = Vec::new();
                let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
                reader.take(cap).read_to_end(&mut buf)?;
                if buf.len() > limit {
                    Ok(Err(buf.len()))
                } else {
                    Ok(Ok(Bytes::from(buf)))
                }
            }
        }
    }

    /// Reads the body to its end without keeping it.
    ///
    /// Returns the number of bytes drained. No size limit applies.
    pub fn discard(self) -> io::Result<u64> {
        match self {
            Self::Empty => Ok(0),
            Self::Bytes(bytes) => Ok(u64::try_from(bytes.len()).unwrap_or(u64::MAX)),
            Self::Reader(mut reader) => io::copy(&mut reader, &mut io::sink()),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Body::Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Body::Bytes").field(&bytes.len()).finish(),
            Self::Reader(_) => f.write_str("Body::Reader(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Bytes(Bytes::from(text))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// Everything the binding engine reads from one HTTP request.
///
/// The router must have resolved the path variables and must not have
/// consumed the body before the engine runs.
///
/// # Example
///
/// ```rust
/// use bindery::RequestSnapshot;
/// use http::{Method, Uri};
///
/// let request = RequestSnapshot::builder()
///     .method(Method::POST)
///     .uri(Uri::from_static("/users/adam?active=true"))
///     .path_var("user", "adam")
///     .header("content-type", "application/json")
///     .body(r#"{"state":"idle"}"#)
///     .build();
///
/// assert_eq!(request.path(), "/users/adam");
/// assert_eq!(request.query().get("active"), Some("true"));
/// assert_eq!(request.path_vars().get("user"), Some("adam"));
/// assert_eq!(request.content_type(), Some("application/json"));
/// ```
#[derive(Debug)]
pub struct RequestSnapshot {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: QueryValues,
    path_vars: PathVars,
    body: Body,
    deadline: Option<Instant>,
}

impl RequestSnapshot {
    /// Creates a snapshot; the query string is decoded from `uri`.
    #[must_use]
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: impl Into<Body>,
        path_vars: PathVars,
    ) -> Self {
        let query = QueryValues::parse(uri.query().unwrap_or(""));
        Self {
            method,
            uri,
            headers,
            query,
            path_vars,
            body: body.into(),
            deadline: None,
        }
    }

    /// Starts building a snapshot.
    #[must_use]
    pub fn builder() -> RequestSnapshotBuilder {
        RequestSnapshotBuilder::new()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the decoded query parameters.
    #[must_use]
    pub fn query(&self) -> &QueryValues {
        &self.query
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the router-resolved path variables.
    #[must_use]
    pub fn path_vars(&self) -> &PathVars {
        &self.path_vars
    }

    /// Returns the declared `Content-Type`, if it is valid text.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the deadline after which the body must not be read.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Sets a deadline for reading the body.
    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Takes the body out of the snapshot, leaving [`Body::Empty`] behind.
    ///
    /// A second call returns an empty body; nothing else guards against
    /// reading the payload twice.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }
}

/// Builder for constructing a [`RequestSnapshot`].
#[derive(Debug, Default)]
pub struct RequestSnapshotBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Body,
    path_vars: PathVars,
    deadline: Option<Instant>,
}

impl RequestSnapshotBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method (defaults to `GET`).
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI (defaults to `/`).
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Sets the headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a header occurrence. Invalid names or values are skipped.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the path variables.
    #[must_use]
    pub fn path_vars(mut self, vars: PathVars) -> Self {
        self.path_vars = vars;
        self
    }

    /// Adds a single path variable.
    #[must_use]
    pub fn path_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_vars.insert(name, value);
        self
    }

    /// Sets a deadline for reading the body.
    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builds the snapshot.
    #[must_use]
    pub fn build(self) -> RequestSnapshot {
        let mut snapshot = RequestSnapshot::new(
            self.method.unwrap_or(Method::GET),
            self.uri.unwrap_or_else(|| Uri::from_static("/")),
            self.headers,
            self.body,
            self.path_vars,
        );
        snapshot.deadline = self.deadline;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
        }
    }

    #[test]
    fn test_snapshot_creation() {
        let mut vars = PathVars::new();
        vars.insert("userId", "42");

        let request = RequestSnapshot::new(
            Method::GET,
            Uri::from_static("/users/42?active=true"),
            HeaderMap::new(),
            Body::Empty,
            vars,
        );

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/users/42");
        assert_eq!(request.query().get("active"), Some("true"));
        assert_eq!(request.path_vars().get("userId"), Some("42"));
        assert_eq!(request.content_type(), None);
    }

    #[test]
    fn test_builder_appends_repeated_headers() {
        let request = RequestSnapshot::builder()
            .header("x-tag", "a")
            .header("X-Tag", "b")
            .build();

        let values: Vec<_> = request
            .headers()
            .get_all("x-tag")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_take_body_is_single_use() {
        let mut request = RequestSnapshot::builder().body("payload").build();

        let first = request.take_body().read_to_end(1024).unwrap().unwrap();
        let second = request.take_body().read_to_end(1024).unwrap().unwrap();

        assert_eq!(&first[..], b"payload");
        assert!(second.is_empty());
    }

    #[test]
    fn test_reader_body_is_buffered() {
        let body = Body::from_reader(Cursor::new(b"streamed".to_vec()));

        let bytes = body.read_to_end(1024).unwrap().unwrap();
        assert_eq!(&bytes[..], b"streamed");
    }

    #[test]
    fn test_body_over_limit() {
        let body = Body::from_reader(Cursor::new(vec![b'x'; 64]));
        assert_eq!(body.read_to_end(16).unwrap(), Err(17));

        let body = Body::from(vec![b'x'; 64]);
        assert_eq!(body.read_to_end(16).unwrap(), Err(64));
    }

    #[test]
    fn test_reader_error_propagates() {
        let body = Body::from_reader(FailingReader);

        let err = body.read_to_end(1024).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_discard_ignores_limit() {
        let body = Body::from_reader(Cursor::new(vec![b'x'; 64]));
        assert_eq!(body.discard().unwrap(), 64);

        assert_eq!(Body::from(vec![b'x'; 5]).discard().unwrap(), 5);
        assert_eq!(Body::Empty.discard().unwrap(), 0);
        assert!(Body::from_reader(FailingReader).discard().is_err());
    }
}
