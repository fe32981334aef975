use std::fmt;
use std::future::Future;

use bytes::Bytes;

/// HTTP methods the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// A fully buffered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add the header only when a value is present.
    #[must_use]
    pub fn header_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.header(name, v),
            None => self,
        }
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Asynchronous HTTP client abstraction.
///
/// The engine awaits every call before issuing the next one, so an
/// implementation never sees two requests from the same transfer in flight.
///
/// Implementations must hand 3xx responses without a `Location` header (in
/// particular `308 Resume Incomplete`) back to the caller instead of treating
/// them as redirects.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - scripted doubles in tests
pub trait HttpClient: Send + Sync {
    /// Transport-level failure (DNS, TLS, connection reset, ...).
    type Error: std::error::Error + Send + 'static;

    /// Send `request` and buffer the whole response.
    ///
    /// Non-2xx statuses are not errors; they come back as responses.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = std::result::Result<HttpResponse, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use super::*;
    use crate::error::{Error, Result};

    const MAX_REDIRECTS: usize = 10;

    /// Production HTTP client implementation using reqwest.
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Create a client that follows ordinary redirects but returns 308
        /// responses to the caller, since upload servers use 308 for
        /// "send the next chunk".
        pub fn new() -> Result<Self> {
            let policy = reqwest::redirect::Policy::custom(|attempt| {
                if attempt.status().as_u16() == crate::core::RESUME_INCOMPLETE {
                    attempt.stop()
                } else if attempt.previous().len() > MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else {
                    attempt.follow()
                }
            });
            let client = reqwest::Client::builder()
                .redirect(policy)
                .connect_timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| Error::Network(e.to_string()))?;
            Ok(Self { client })
        }

        /// Wrap an already configured client.
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, Self::Error> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Put => reqwest::Method::PUT,
            };
            let mut builder = self.client.request(method, request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if request.method != Method::Get {
                builder = builder.body(request.body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| {
                    v.to_str()
                        .ok()
                        .map(|v| (k.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.bytes().await?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let response = HttpResponse::new(206)
            .header("content-range", "bytes 0-1/10")
            .header("Content-Type", "video/mp4");
        assert_eq!(response.header_value("Content-Range"), Some("bytes 0-1/10"));
        assert_eq!(response.header_value("CONTENT-TYPE"), Some("video/mp4"));
        assert_eq!(response.header_value("Location"), None);
    }

    #[test]
    fn optional_headers_are_skipped() {
        let request = HttpRequest::get("https://h.example/a")
            .header_opt("Authorization", None)
            .header_opt("Range", Some("bytes=0-1"));
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header_value("range"), Some("bytes=0-1"));
        assert_eq!(request.method.to_string(), "GET");
    }
}
