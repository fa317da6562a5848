//! HTTP backend
//!
//! Maps the client contract onto a REST resource per entry:
//!
//! | operation          | request                     |
//! |--------------------|-----------------------------|
//! | put                | `PUT {cache}/{key}`         |
//! | put if absent      | `POST {cache}/{key}`        |
//! | get                | `GET {cache}/{key}`         |
//! | exists / version   | `HEAD {cache}/{key}`        |
//! | delete             | `DELETE {cache}/{key}`      |
//! | clear              | `DELETE {cache}`            |
//!
//! Versions are entity tags: read from `ETag`, sent back in `If-Match`.

use std::time::Duration;

use reqwest::blocking::{Client as HttpTransport, RequestBuilder, Response};
use reqwest::header::{HeaderValue, CONTENT_TYPE, ETAG, IF_MATCH};
use reqwest::{Method, StatusCode, Url};

use super::{CacheClient, Entry, PutOptions, VersionToken, WriteMode};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Path segment used when no cache name is configured
pub const DEFAULT_CACHE_SEGMENT: &str = "___defaultcache";

/// Request header carrying the lifespan in seconds
pub const LIFESPAN_HEADER: &str = "timeToLiveSeconds";

/// Request header carrying the max idle time in seconds
pub const MAX_IDLE_HEADER: &str = "maxIdleTimeSeconds";

pub struct HttpClient {
    http: HttpTransport,

    /// URL of the cache collection
    cache_url: Url,

    content_type: String,
}

impl HttpClient {
    pub fn connect(config: &Config) -> Result<Self> {
        let mut builder = HttpTransport::builder();
        if config.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.timeout_ms));
        }
        let http = builder.build()?;

        let base = format!("http://{}{}", config.server_addr(), config.rest_server_url);
        let mut cache_url = Url::parse(&base)
            .map_err(|e| CacheError::Config(format!("invalid REST url {}: {}", base, e)))?;

        let cache = if config.cache_name.is_empty() {
            DEFAULT_CACHE_SEGMENT
        } else {
            config.cache_name.as_str()
        };
        cache_url
            .path_segments_mut()
            .map_err(|_| CacheError::Config(format!("REST url cannot take a path: {}", base)))?
            .pop_if_empty()
            .push(cache);

        tracing::debug!("REST cache url: {}", cache_url);

        Ok(Self {
            http,
            cache_url,
            content_type: config.rest_content_type.clone(),
        })
    }

    /// URL of a single entry; the key becomes one percent-encoded segment
    fn entry_url(&self, key: &[u8]) -> Result<Url> {
        // An empty segment would address the whole cache
        if key.is_empty() {
            return Err(CacheError::Validation("key must not be empty".to_string()));
        }
        let key = std::str::from_utf8(key).map_err(|_| {
            CacheError::Validation("HTTP client requires UTF-8 keys".to_string())
        })?;

        let mut url = self.cache_url.clone();
        url.path_segments_mut()
            .map_err(|_| CacheError::Config("REST url cannot take a path".to_string()))?
            .push(key);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!("HTTP {} {}", method, url);
        self.http
            .request(method, url)
            .header(CONTENT_TYPE, self.content_type.as_str())
    }

    fn head(&self, key: &[u8]) -> Result<Response> {
        let response = self.request(Method::HEAD, self.entry_url(key)?).send()?;
        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::NOT_FOUND => Err(CacheError::NotFound),
            other => Err(unexpected_status(other)),
        }
    }
}

fn if_match(token: &VersionToken) -> Result<HeaderValue> {
    HeaderValue::from_str(token.as_str()).map_err(|_| {
        CacheError::Validation(format!("version is not a valid entity tag: {}", token))
    })
}

fn etag(response: &Response) -> Option<VersionToken> {
    response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(VersionToken::from)
}

fn missing_version() -> CacheError {
    CacheError::Transport("couldn't obtain version info from the REST server".to_string())
}

fn unexpected_status(status: StatusCode) -> CacheError {
    CacheError::Transport(format!("Unexpected HTTP status: {}", status.as_u16()))
}

impl CacheClient for HttpClient {
    fn put(&mut self, key: &[u8], value: &[u8], options: &PutOptions) -> Result<()> {
        let url = self.entry_url(key)?;

        // POST makes the server answer 409 when the entry already exists
        let (method, condition) = match options.write_mode() {
            WriteMode::Versioned(token) => (Method::PUT, Some(if_match(token)?)),
            WriteMode::IfAbsent => (Method::POST, None),
            WriteMode::Unconditional => (Method::PUT, None),
        };

        let mut request = self.request(method, url).body(value.to_vec());
        if let Some(lifespan) = options.lifespan {
            request = request.header(LIFESPAN_HEADER, lifespan.to_string());
        }
        if let Some(max_idle) = options.max_idle {
            request = request.header(MAX_IDLE_HEADER, max_idle.to_string());
        }
        if let Some(condition) = condition {
            request = request.header(IF_MATCH, condition);
        }

        let response = request.send()?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(CacheError::NotFound),
            StatusCode::CONFLICT => Err(CacheError::Conflict),
            other => Err(unexpected_status(other)),
        }
    }

    fn get(&mut self, key: &[u8], want_version: bool) -> Result<Entry> {
        let response = self.request(Method::GET, self.entry_url(key)?).send()?;
        match response.status() {
            StatusCode::OK => {
                let version = if want_version {
                    Some(etag(&response).ok_or_else(missing_version)?)
                } else {
                    None
                };
                let value = response.bytes()?.to_vec();
                Ok(Entry { value, version })
            }
            StatusCode::NOT_FOUND => Err(CacheError::NotFound),
            other => Err(unexpected_status(other)),
        }
    }

    fn version(&mut self, key: &[u8]) -> Result<VersionToken> {
        let response = self.head(key)?;
        etag(&response).ok_or_else(missing_version)
    }

    fn exists(&mut self, key: &[u8]) -> Result<()> {
        self.head(key).map(|_| ())
    }

    fn delete(&mut self, key: &[u8], version: Option<&VersionToken>) -> Result<()> {
        let mut request = self.http.request(Method::DELETE, self.entry_url(key)?);
        if let Some(token) = version {
            request = request.header(IF_MATCH, if_match(token)?);
        }

        let response = request.send()?;
        match response.status() {
            StatusCode::OK => Ok(()),
            // The server answers a delete of a missing entry with no content
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Err(CacheError::NotFound),
            StatusCode::CONFLICT => Err(CacheError::Conflict),
            other => Err(unexpected_status(other)),
        }
    }

    fn clear(&mut self) -> Result<()> {
        tracing::debug!("HTTP DELETE {}", self.cache_url);
        let response = self
            .http
            .request(Method::DELETE, self.cache_url.clone())
            .send()?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            other => Err(unexpected_status(other)),
        }
    }
}
