//! The request value threaded through middleware and handlers.

use std::collections::BTreeMap;

use hyper::body::Bytes;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::{Body, Method, Uri, Version};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::path;
use crate::pattern::Params;

/// An incoming request.
///
/// Requests are values: every `with_*` and `without_*` method consumes the
/// request and returns the changed one. Middleware hands the request it wants
/// the rest of the pipeline to see back to the router, so each dispatch owns
/// its own lineage of requests.
///
/// ```rust
/// use scoperoute::Request;
/// use hyper::Method;
///
/// let req = Request::new(Method::GET, "/users/1?tab=posts".parse().unwrap())
///     .with_attribute("id", "1");
///
/// assert_eq!(req.path(), "/users/1");
/// assert_eq!(req.query_param("tab").as_deref(), Some("posts"));
/// assert_eq!(req.attribute("id"), Some("1"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    parsed_body: Option<Value>,
    attributes: BTreeMap<String, String>,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            parsed_body: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Builds a request from a raw method token and request target.
    ///
    /// The method token is case-insensitive. The path of the target is
    /// cleaned first, so `""` becomes `/` and `a//b/` becomes `/a/b`; the
    /// query is kept and the fragment dropped.
    ///
    /// ```rust
    /// use scoperoute::Request;
    ///
    /// let req = Request::parse("get", "a//b/?x=1#top").unwrap();
    /// assert_eq!(req.uri(), "/a/b?x=1");
    /// ```
    pub fn parse(method: &str, target: &str) -> Result<Self, Error> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidMethod(method.to_owned()))?;

        let without_fragment = target.split('#').next().unwrap_or_default();
        let (raw_path, query) = match without_fragment.split_once('?') {
            Some((raw_path, query)) => (raw_path, Some(query)),
            None => (without_fragment, None),
        };

        let mut normalized = path::clean(raw_path).into_owned();
        if let Some(query) = query {
            normalized.push('?');
            normalized.push_str(query);
        }

        let uri = normalized.parse::<Uri>().map_err(|source| Error::InvalidUri {
            target: target.to_owned(),
            source,
        })?;

        Ok(Self::new(method, uri))
    }

    /// Buffers a hyper request and parses its body.
    ///
    /// JSON bodies and url-encoded forms become the [parsed body](Request::parsed_body).
    pub async fn from_hyper(req: hyper::Request<Body>) -> hyper::Result<Self> {
        let (parts, body) = req.into_parts();
        let body = hyper::body::to_bytes(body).await?;

        let mut req = Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            parsed_body: None,
            attributes: BTreeMap::new(),
        };
        req.parsed_body = parse_body(&req.headers, &req.body);

        Ok(req)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// The path component of the request target.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Decoded query parameters, in the order they appear.
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// The first decoded query parameter called `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// The value of the first `name` header, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replaces every `name` header with `value`.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds `value` to the `name` header, keeping existing values.
    pub fn with_added_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        self
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the raw body. The parsed body is left untouched.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn parsed_body(&self) -> Option<&Value> {
        self.parsed_body.as_ref()
    }

    pub fn with_parsed_body(mut self, data: Value) -> Self {
        self.parsed_body = Some(data);
        self
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn without_attribute(mut self, name: &str) -> Self {
        self.attributes.remove(name);
        self
    }

    /// Merges matched route parameters in as attributes.
    pub(crate) fn with_params(self, params: Params) -> Self {
        params
            .into_iter()
            .fold(self, |req, (name, value)| req.with_attribute(name, value))
    }
}

fn parse_body(headers: &HeaderMap, body: &Bytes) -> Option<Value> {
    if body.is_empty() {
        return None;
    }

    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next().unwrap_or_default().trim();

    if mime.eq_ignore_ascii_case("application/json") {
        serde_json::from_slice(body).ok()
    } else if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        let form: Map<String, Value> = url::form_urlencoded::parse(body)
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Some(Value::Object(form))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_method_and_target() {
        let req = Request::parse("get", "/search?q=rust+router&page=2").unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query(), Some("q=rust+router&page=2"));
        assert_eq!(
            req.query_params(),
            vec![
                ("q".to_owned(), "rust router".to_owned()),
                ("page".to_owned(), "2".to_owned())
            ]
        );
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_parse_cleans_the_target() {
        let cases = [
            ("", "/"),
            ("a//b/", "/a/b"),
            ("users", "/users"),
            ("//users//?page=2", "/users?page=2"),
            ("/docs#intro", "/docs"),
            ("?q=1", "/?q=1"),
        ];
        for (target, expected) in cases {
            let req = Request::parse("GET", target).unwrap();
            assert_eq!(req.uri(), expected, "parse({:?})", target);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Request::parse("GE T", "/"), Err(Error::InvalidMethod(_))));
        assert!(matches!(Request::parse("GET", "/a b"), Err(Error::InvalidUri { .. })));
    }

    #[test]
    fn test_mutators_return_new_values() {
        let original = Request::parse("POST", "/").unwrap();
        let changed = original
            .clone()
            .with_attribute("user", "alice")
            .with_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"))
            .with_parsed_body(json!({ "a": 1 }));

        assert!(original.attributes().is_empty());
        assert!(!original.has_header("authorization"));
        assert_eq!(changed.attribute("user"), Some("alice"));
        assert_eq!(changed.header("authorization"), Some("Bearer t"));
        assert_eq!(changed.parsed_body(), Some(&json!({ "a": 1 })));

        let stripped = changed.without_attribute("user").without_header("authorization");
        assert_eq!(stripped.attribute("user"), None);
        assert_eq!(stripped.header("authorization"), None);
    }

    #[test]
    fn test_parse_body() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert_eq!(
            parse_body(&headers, &Bytes::from_static(br#"{"name":"x"}"#)),
            Some(json!({ "name": "x" }))
        );
        assert_eq!(parse_body(&headers, &Bytes::from_static(b"{oops")), None);

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        assert_eq!(
            parse_body(&headers, &Bytes::from_static(b"name=a+b&age=3")),
            Some(json!({ "name": "a b", "age": "3" }))
        );

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(parse_body(&headers, &Bytes::from_static(b"hello")), None);
    }
}
