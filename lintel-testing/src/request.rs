// Request builder for lifecycle tests

use lintel_core::{Error, HttpRequest};
use serde::Serialize;
use std::time::SystemTime;

/// Builds an [`HttpRequest`] the way a client would send it.
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl TestRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    pub fn put(path: &str) -> Self {
        Self::new("PUT", path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new("DELETE", path)
    }

    /// Repeated names are joined with `, ` as a proxy would.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn page(self, offset: u64, size: u64) -> Self {
        self.query("offset", offset).query("size", size)
    }

    pub fn accept(self, media_type: &str) -> Self {
        self.header("Accept", media_type)
    }

    pub fn content_type(self, media_type: &str) -> Self {
        self.header("Content-Type", media_type)
    }

    pub fn host(self, host: &str) -> Self {
        self.header("Host", host)
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn api_key(self, key: &str) -> Self {
        self.header(lintel_core::DEFAULT_API_KEY_HEADER, key)
    }

    pub fn if_match(self, etag: &str) -> Self {
        self.header("If-Match", etag)
    }

    pub fn if_none_match(self, etag: &str) -> Self {
        self.header("If-None-Match", etag)
    }

    pub fn if_modified_since(self, time: SystemTime) -> Self {
        self.header("If-Modified-Since", httpdate::fmt_http_date(time))
    }

    pub fn if_unmodified_since(self, time: SystemTime) -> Self {
        self.header("If-Unmodified-Since", httpdate::fmt_http_date(time))
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body; sets `Content-Type` unless one was given.
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        if !self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
            self.headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        Ok(self)
    }

    pub fn build(self) -> HttpRequest {
        let target = if self.query.is_empty() {
            self.path
        } else {
            let query = serde_urlencoded::to_string(&self.query).unwrap_or_default();
            format!("{}?{}", self.path, query)
        };

        let mut request = HttpRequest::new(self.method, target).with_body(self.body);
        for (name, value) in self.headers {
            let key = request
                .headers
                .keys()
                .find(|k| k.eq_ignore_ascii_case(&name))
                .cloned();
            match key {
                Some(key) => {
                    if let Some(existing) = request.headers.get_mut(&key) {
                        existing.push_str(", ");
                        existing.push_str(&value);
                    }
                }
                None => {
                    request.headers.insert(name, value);
                }
            }
        }
        request
    }
}

impl From<TestRequest> for HttpRequest {
    fn from(request: TestRequest) -> Self {
        request.build()
    }
}
