//! OpenStack Swift client over libcurl.
//!
//! Authenticates with a pre-issued token (`X-Auth-Token`) against a storage
//! URL, as `swift stat -v` reports them. Transient failures are retried with
//! the configured `RetryPolicy`; every request runs in the calling thread.

mod parse;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str;
use std::time::Duration;

use url::Url;

use super::{ObjectStore, PutResponse, StoreError};
use crate::config::HttpConfig;
use crate::manifest::{self, ManifestEntry};
use crate::retry::{run_with_retry, RetryPolicy};

/// Timeouts applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Abort if throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard wall-clock limit per request.
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
        }
    }
}

impl From<&HttpConfig> for HttpOptions {
    fn from(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Head,
    Put,
}

struct Response {
    status: u32,
    headers: Vec<String>,
    body: Vec<u8>,
}

/// Swift object store reached through a storage URL and auth token.
#[derive(Debug, Clone)]
pub struct SwiftClient {
    storage_url: Url,
    auth_token: String,
    retry: RetryPolicy,
    http: HttpOptions,
}

impl SwiftClient {
    /// `storage_url` is the account URL, e.g. `https://swift.example.org/v1/AUTH_abc`.
    pub fn new(storage_url: &str, auth_token: &str) -> Result<Self, StoreError> {
        let storage_url = Url::parse(storage_url)?;
        if storage_url.cannot_be_a_base() {
            return Err(StoreError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(Self {
            storage_url,
            auth_token: auth_token.to_string(),
            retry: RetryPolicy::default(),
            http: HttpOptions::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_http_options(mut self, http: HttpOptions) -> Self {
        self.http = http;
        self
    }

    /// URL of `container`, or of `object` inside it. Each `/`-separated part
    /// of the object name becomes one percent-encoded path segment.
    pub fn object_url(&self, container: &str, object: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.storage_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            segments.pop_if_empty().push(container);
            if let Some(object) = object {
                segments.extend(object.split('/'));
            }
        }
        Ok(url)
    }

    /// Check the token and that `container` exists (HEAD on the container).
    pub fn head_container(&self, container: &str) -> Result<(), StoreError> {
        let url = self.object_url(container, None)?;
        run_with_retry(&self.retry, || {
            self.send(Method::Head, &url, &[], Box::new(io::empty()), 0)
                .map(|_| ())
        })
    }

    fn send(
        &self,
        method: Method,
        url: &Url,
        extra_headers: &[(&str, &str)],
        mut body: Box<dyn Read + '_>,
        body_len: u64,
    ) -> Result<Response, StoreError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.connect_timeout(self.http.connect_timeout)?;
        easy.low_speed_limit(self.http.low_speed_limit)?;
        easy.low_speed_time(self.http.low_speed_time)?;
        easy.timeout(self.http.timeout)?;
        match method {
            Method::Head => easy.nobody(true)?,
            Method::Put => {
                easy.upload(true)?;
                easy.in_filesize(body_len)?;
            }
        }

        let mut list = curl::easy::List::new();
        list.append(&format!("X-Auth-Token: {}", self.auth_token))?;
        // No `Expect: 100-continue`.
        list.append("Expect:")?;
        for (k, v) in extra_headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;

        let mut headers: Vec<String> = Vec::new();
        let mut response_body: Vec<u8> = Vec::new();
        let mut read_error: Option<io::Error> = None;
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    headers.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                response_body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.read_function(|buf| {
                body.read(buf).map_err(|e| {
                    read_error = Some(e);
                    curl::easy::ReadError::Abort
                })
            })?;
            if let Err(e) = transfer.perform() {
                drop(transfer);
                if let Some(io_err) = read_error {
                    return Err(StoreError::Io(io_err));
                }
                return Err(StoreError::Curl(e));
            }
        }

        let status = easy.response_code()?;
        tracing::trace!(?method, url = %url, status, "swift request");
        if !(200..300).contains(&status) {
            return Err(StoreError::Http {
                status,
                body: parse::body_excerpt(&response_body),
            });
        }
        Ok(Response {
            status,
            headers,
            body: response_body,
        })
    }
}

impl ObjectStore for SwiftClient {
    fn create_container(&self, container: &str) -> Result<(), StoreError> {
        let url = self.object_url(container, None)?;
        let resp = run_with_retry(&self.retry, || {
            self.send(Method::Put, &url, &[], Box::new(io::empty()), 0)
        })?;
        // 201 Created, or 202 Accepted when it already exists.
        tracing::debug!(container, status = resp.status, "container ready");
        Ok(())
    }

    fn put_object(
        &self,
        container: &str,
        object: &str,
        source: &Path,
    ) -> Result<PutResponse, StoreError> {
        let url = self.object_url(container, Some(object))?;
        let (resp, size_bytes) = run_with_retry(&self.retry, || {
            let file = File::open(source)?;
            let len = file.metadata()?.len();
            let resp = self.send(Method::Put, &url, &[], Box::new(file), len)?;
            Ok((resp, len))
        })?;
        let etag = parse::etag(&resp.headers).ok_or_else(|| StoreError::MissingEtag {
            object: object.to_string(),
        })?;
        Ok(PutResponse { size_bytes, etag })
    }

    fn put_manifest(
        &self,
        container: &str,
        object: &str,
        entries: &[ManifestEntry],
    ) -> Result<(), StoreError> {
        let mut url = self.object_url(container, Some(object))?;
        url.set_query(Some("multipart-manifest=put"));
        let json = manifest::to_json(entries)?;
        let resp = run_with_retry(&self.retry, || {
            self.send(
                Method::Put,
                &url,
                &[("Content-Type", "application/json")],
                Box::new(json.as_slice()),
                json.len() as u64,
            )
        })?;
        if !resp.body.is_empty() {
            tracing::debug!(body = %parse::body_excerpt(&resp.body), "manifest response");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_urls_are_segment_encoded() {
        let c = SwiftClient::new("https://swift.example.org/v1/AUTH_abc/", "tok").unwrap();
        assert_eq!(
            c.object_url("backups", None).unwrap().as_str(),
            "https://swift.example.org/v1/AUTH_abc/backups"
        );
        assert_eq!(
            c.object_url("backups_segments", Some("my file.img/42/1048576/00000003"))
                .unwrap()
                .as_str(),
            "https://swift.example.org/v1/AUTH_abc/backups_segments/my%20file.img/42/1048576/00000003"
        );
    }

    #[test]
    fn storage_url_without_trailing_slash() {
        let c = SwiftClient::new("http://127.0.0.1:8080/v1/AUTH_test", "tok").unwrap();
        assert_eq!(
            c.object_url("c", Some("o")).unwrap().as_str(),
            "http://127.0.0.1:8080/v1/AUTH_test/c/o"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            SwiftClient::new("mailto:ops@example.org", "tok"),
            Err(StoreError::Url(_))
        ));
        assert!(matches!(SwiftClient::new("not a url", "tok"), Err(StoreError::Url(_))));
    }
}
