//! The response accumulated while a request is dispatched.

use hyper::body::Bytes;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::{Body, StatusCode};
use serde::Serialize;

use crate::error::Error;

/// A response under construction.
///
/// Handlers write into it through `&mut Response`; the router turns it into
/// the final hyper response exactly once, with [`Response::into_hyper`].
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Appends `data` to the body and sets the status.
    ///
    /// ```rust
    /// use scoperoute::Response;
    /// use hyper::StatusCode;
    ///
    /// let mut res = Response::new();
    /// res.send("Hello ", StatusCode::OK).send("World!", StatusCode::CREATED);
    ///
    /// assert_eq!(res.text(), "Hello World!");
    /// assert_eq!(res.status(), StatusCode::CREATED);
    /// ```
    pub fn send(&mut self, data: impl AsRef<[u8]>, status: StatusCode) -> &mut Self {
        self.status = status;
        self.body.extend_from_slice(data.as_ref());
        self
    }

    /// Serializes `data` as the JSON body, replacing whatever was there.
    pub fn json<T>(&mut self, data: &T, status: StatusCode) -> Result<&mut Self, Error>
    where
        T: Serialize + ?Sized,
    {
        self.body = serde_json::to_vec(data)?;
        self.status = status;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    /// Points the client at `location` with `302 Found`.
    pub fn redirect(&mut self, location: &str) -> Result<&mut Self, Error> {
        let value = HeaderValue::from_str(location).map_err(|e| Error::Handler(e.into()))?;
        self.headers.insert(header::LOCATION, value);
        self.status = StatusCode::FOUND;
        Ok(self)
    }

    /// Discards everything written so far.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Consumes the response, producing the hyper response sent on the wire.
    pub fn into_hyper(self) -> hyper::Response<Body> {
        let mut res = hyper::Response::new(Body::from(Bytes::from(self.body)));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let res = Response::new();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().is_empty());
        assert!(res.headers().is_empty());
    }

    #[test]
    fn test_json() {
        let mut res = Response::new();
        res.send("partial", StatusCode::OK);
        res.json(&json!({ "users": ["Alice", "Bob"] }), StatusCode::CREATED)
            .unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.text(), r#"{"users":["Alice","Bob"]}"#);
    }

    #[test]
    fn test_redirect() {
        let mut res = Response::new();
        res.redirect("/login?next=%2F").unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.header("location"), Some("/login?next=%2F"));

        assert!(res.redirect("/bad\nheader").is_err());
    }

    #[test]
    fn test_reset() {
        let mut res = Response::new();
        res.send("x", StatusCode::UNAUTHORIZED)
            .set_header(header::SERVER, HeaderValue::from_static("test"));
        res.reset();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().is_empty());
        assert!(res.headers().is_empty());
    }

    #[tokio::test]
    async fn test_into_hyper() {
        let mut res = Response::new();
        res.send("gone", StatusCode::GONE);
        let res = res.into_hyper();

        assert_eq!(res.status(), StatusCode::GONE);
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        assert_eq!(&body[..], b"gone");
    }
}
