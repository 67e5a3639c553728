//! Replayable request descriptor

use super::ClientError;
use reqwest::{Method, Url};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// An outgoing request, captured as a value
///
/// The descriptor is turned into a fresh wire request on every attempt, so
/// replaying it after a token refresh sends exactly the same method, URL,
/// query, headers and body with only the bearer credential swapped.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Create a request for `path`, relative to the base URL or absolute
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub const fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Whether `path` is an absolute URL, such as a pagination link
    pub fn is_absolute(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }

    /// Whether the target shares scheme, host and port with `base_url`
    ///
    /// Relative paths always do. Absolute links that cannot be parsed do not.
    pub fn shares_origin(&self, base_url: &str) -> bool {
        if !self.is_absolute() {
            return true;
        }
        match (Url::parse(&self.path), Url::parse(base_url)) {
            (Ok(target), Ok(base)) => target.origin() == base.origin(),
            _ => false,
        }
    }

    /// Resolve the target URL against `base_url` (which has no trailing slash)
    pub fn url(&self, base_url: &str) -> String {
        if self.is_absolute() {
            self.path.clone()
        } else if self.path.starts_with('/') {
            format!("{base_url}{}", self.path)
        } else {
            format!("{base_url}/{}", self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_resolution() {
        let base = "http://127.0.0.1:8000";
        assert_eq!(
            ApiRequest::get("/journaling/").url(base),
            "http://127.0.0.1:8000/journaling/"
        );
        assert_eq!(
            ApiRequest::get("journaling/").url(base),
            "http://127.0.0.1:8000/journaling/"
        );
        assert_eq!(
            ApiRequest::get("https://api.example.com/journaling/?page=2").url(base),
            "https://api.example.com/journaling/?page=2"
        );
    }

    #[test]
    fn test_origin_check() {
        let base = "http://127.0.0.1:8000";
        assert!(ApiRequest::get("/journaling/").shares_origin(base));
        assert!(ApiRequest::get("http://127.0.0.1:8000/journaling/?page=2").shares_origin(base));
        assert!(!ApiRequest::get("https://127.0.0.1:8000/journaling/").shares_origin(base));
        assert!(!ApiRequest::get("http://127.0.0.1:9000/journaling/").shares_origin(base));
        assert!(!ApiRequest::get("http://tracker.example.com/journaling/").shares_origin(base));
        assert!(
            ApiRequest::get("https://api.example.com/x/")
                .shares_origin("https://api.example.com:443")
        );
    }

    #[test]
    fn test_clone_is_identical_replay() {
        let request = ApiRequest::post("/journaling/")
            .query("source", "cli")
            .json(&serde_json::json!({"entry_text": "hello"}))
            .unwrap();
        let replay = request.clone();

        assert_eq!(replay.method(), request.method());
        assert_eq!(replay.path(), request.path());
        assert_eq!(replay.query_pairs(), request.query_pairs());
        assert_eq!(replay.body(), request.body());
    }
}
