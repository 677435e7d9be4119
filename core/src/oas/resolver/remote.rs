#![deny(missing_docs)]

//! # Remote Documents
//!
//! Retrieval of external documents named by `$ref` locators, and the per-pass
//! cache that guarantees each locator is fetched and parsed at most once.
//!
//! Credentials are opaque to the resolver: they are handed to the fetcher
//! exactly as supplied, on every fetch.

use crate::error::ResolveError;
use crate::oas::parse::parse_document;
use crate::oas::ref_utils::is_http_locator;
use derive_more::{Display, From};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
#[cfg(feature = "client")]
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Where a credential is attached to an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthLocation {
    /// Sent as an HTTP header.
    Header,
    /// Sent as a query parameter.
    Query,
}

/// A credential forwarded verbatim to the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationValue {
    /// Header or query parameter name.
    pub key_name: String,
    /// Value, sent as is.
    pub value: String,
    /// Header or query.
    pub location: AuthLocation,
}

impl AuthorizationValue {
    /// A header credential, e.g. `Authorization: Bearer ...`.
    pub fn header(key_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            value: value.into(),
            location: AuthLocation::Header,
        }
    }

    /// A query parameter credential, e.g. `?api_key=...`.
    pub fn query(key_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            value: value.into(),
            location: AuthLocation::Query,
        }
    }
}

/// Parses `header:Name:Value` or `query:name:value`.
impl FromStr for AuthorizationValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (location, key, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(location), Some(key), Some(value)) if !key.is_empty() => (location, key, value),
            _ => {
                return Err(format!(
                    "Expected 'header:NAME:VALUE' or 'query:NAME:VALUE', got '{}'",
                    s
                ))
            }
        };
        match location.to_ascii_lowercase().as_str() {
            "header" => Ok(Self::header(key, value)),
            "query" => Ok(Self::query(key, value)),
            other => Err(format!(
                "Unknown credential location '{}' (expected 'header' or 'query')",
                other
            )),
        }
    }
}

/// Failure reported by a [`DocumentFetcher`].
#[derive(Debug, Display, From)]
pub enum FetchError {
    /// Local file access failed.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Network failure, timeout or non-success status.
    #[display("Transport Error: {_0}")]
    #[from(ignore)]
    Transport(String),

    /// No fetcher handles this kind of locator.
    #[display("Unsupported locator: {_0}")]
    #[from(ignore)]
    Unsupported(String),
}

impl std::error::Error for FetchError {}

/// Retrieves the raw bytes of an external document.
pub trait DocumentFetcher {
    /// Fetches `locator`, attaching every credential unchanged.
    fn fetch_bytes(
        &self,
        locator: &str,
        credentials: &[AuthorizationValue],
    ) -> Result<Vec<u8>, FetchError>;
}

/// Reads plain filesystem paths and `file://` URLs. Credentials are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileFetcher;

impl DocumentFetcher for FileFetcher {
    fn fetch_bytes(
        &self,
        locator: &str,
        _credentials: &[AuthorizationValue],
    ) -> Result<Vec<u8>, FetchError> {
        if locator.starts_with("file:") {
            let path = Url::parse(locator)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| FetchError::Unsupported(locator.to_string()))?;
            return Ok(std::fs::read(path)?);
        }
        if Url::parse(locator).is_ok_and(|url| url.scheme().len() > 1) {
            return Err(FetchError::Unsupported(locator.to_string()));
        }
        Ok(std::fs::read(Path::new(locator))?)
    }
}

/// Blocking HTTP(S) fetcher.
#[cfg(feature = "client")]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpFetcher {
    timeout: Option<Duration>,
}

#[cfg(feature = "client")]
impl HttpFetcher {
    /// Creates a fetcher without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an overall per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(feature = "client")]
impl DocumentFetcher for HttpFetcher {
    fn fetch_bytes(
        &self,
        locator: &str,
        credentials: &[AuthorizationValue],
    ) -> Result<Vec<u8>, FetchError> {
        let mut request = ureq::get(locator);
        for credential in credentials {
            request = match credential.location {
                AuthLocation::Header => {
                    request.header(credential.key_name.as_str(), credential.value.as_str())
                }
                AuthLocation::Query => {
                    request.query(credential.key_name.as_str(), credential.value.as_str())
                }
            };
        }
        if let Some(timeout) = self.timeout {
            request = request.config().timeout_global(Some(timeout)).build();
        }

        let mut response = request
            .call()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

/// Sends `http(s)` locators to the HTTP fetcher and everything else to the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultFetcher {
    files: FileFetcher,
    #[cfg(feature = "client")]
    http: HttpFetcher,
}

impl DefaultFetcher {
    /// Creates the default fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP timeout.
    #[cfg(feature = "client")]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }
}

impl DocumentFetcher for DefaultFetcher {
    fn fetch_bytes(
        &self,
        locator: &str,
        credentials: &[AuthorizationValue],
    ) -> Result<Vec<u8>, FetchError> {
        if is_http_locator(locator) {
            #[cfg(feature = "client")]
            return self.http.fetch_bytes(locator, credentials);
            #[cfg(not(feature = "client"))]
            return Err(FetchError::Unsupported(format!(
                "{} (built without the 'client' feature)",
                locator
            )));
        }
        self.files.fetch_bytes(locator, credentials)
    }
}

/// In-memory fetcher serving fixed texts; records how often each locator was asked for.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, String>,
    fetches: RefCell<HashMap<String, usize>>,
    credentials_seen: RefCell<Vec<AuthorizationValue>>,
}

impl MemoryFetcher {
    /// Creates an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryFetcher::insert`].
    pub fn with_document(mut self, locator: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(locator, text);
        self
    }

    /// Serves `text` for `locator`.
    pub fn insert(&mut self, locator: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(locator.into(), text.into());
    }

    /// How many times `locator` was fetched.
    pub fn fetch_count(&self, locator: &str) -> usize {
        self.fetches.borrow().get(locator).copied().unwrap_or(0)
    }

    /// Total fetches across all locators.
    pub fn total_fetches(&self) -> usize {
        self.fetches.borrow().values().sum()
    }

    /// Every credential received, in order.
    pub fn credentials_seen(&self) -> Vec<AuthorizationValue> {
        self.credentials_seen.borrow().clone()
    }
}

impl DocumentFetcher for MemoryFetcher {
    fn fetch_bytes(
        &self,
        locator: &str,
        credentials: &[AuthorizationValue],
    ) -> Result<Vec<u8>, FetchError> {
        *self
            .fetches
            .borrow_mut()
            .entry(locator.to_string())
            .or_insert(0) += 1;
        self.credentials_seen
            .borrow_mut()
            .extend(credentials.iter().cloned());
        self.documents
            .get(locator)
            .map(|text| text.clone().into_bytes())
            .ok_or_else(|| FetchError::Transport(format!("404 Not Found: {}", locator)))
    }
}

/// Per-pass map from document locator to its parsed tree (or the failure).
pub struct RemoteDocumentCache<'a> {
    fetcher: &'a dyn DocumentFetcher,
    credentials: &'a [AuthorizationValue],
    documents: HashMap<String, Result<Value, ResolveError>>,
}

impl<'a> RemoteDocumentCache<'a> {
    /// Creates an empty cache over a fetcher and the credentials for this pass.
    pub fn new(fetcher: &'a dyn DocumentFetcher, credentials: &'a [AuthorizationValue]) -> Self {
        Self {
            fetcher,
            credentials,
            documents: HashMap::new(),
        }
    }

    /// Returns the parsed document at `locator`, fetching it on first use.
    ///
    /// Failures are cached too: a locator that failed once fails again without
    /// another fetch.
    pub fn fetch(&mut self, locator: &str) -> Result<&Value, ResolveError> {
        let fetcher = self.fetcher;
        let credentials = self.credentials;
        let entry = match self.documents.entry(locator.to_string()) {
            Entry::Occupied(entry) => {
                debug!("Remote document cache hit: {}", locator);
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                debug!("Remote document cache miss, fetching: {}", locator);
                entry.insert(load(fetcher, credentials, locator))
            }
        };
        entry.as_ref().map_err(Clone::clone)
    }

    /// Number of distinct locators requested so far.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when nothing has been requested.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn load(
    fetcher: &dyn DocumentFetcher,
    credentials: &[AuthorizationValue],
    locator: &str,
) -> Result<Value, ResolveError> {
    let bytes = fetcher
        .fetch_bytes(locator, credentials)
        .map_err(|e| ResolveError::RemoteFetch {
            locator: locator.to_string(),
            message: e.to_string(),
        })?;
    parse_document(&bytes).map_err(|e| ResolveError::RemoteParse {
        locator: locator.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const USER: &str = r#"
User:
  type: object
  properties:
    id:
      type: integer
      format: int64
"#;

    #[test]
    fn test_authorization_value_from_str() {
        let header: AuthorizationValue = "header:Authorization:Bearer a:b".parse().unwrap();
        assert_eq!(header, AuthorizationValue::header("Authorization", "Bearer a:b"));

        let query: AuthorizationValue = "QUERY:api_key:secret".parse().unwrap();
        assert_eq!(query.location, AuthLocation::Query);

        assert!("cookie:a:b".parse::<AuthorizationValue>().is_err());
        assert!("header:only".parse::<AuthorizationValue>().is_err());
    }

    #[test]
    fn test_cache_fetches_once() {
        let fetcher = MemoryFetcher::new().with_document("http://example.com/user.yaml", USER);
        let credentials = vec![AuthorizationValue::header("X-Token", "t0k3n")];
        let mut cache = RemoteDocumentCache::new(&fetcher, &credentials);

        let first = cache.fetch("http://example.com/user.yaml").unwrap().clone();
        let second = cache.fetch("http://example.com/user.yaml").unwrap();
        assert_eq!(&first, second);
        assert_eq!(first["User"]["type"], "object");
        assert_eq!(fetcher.fetch_count("http://example.com/user.yaml"), 1);
        assert_eq!(fetcher.credentials_seen(), credentials);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_remembers_failures() {
        let fetcher = MemoryFetcher::new().with_document("http://example.com/bad.yaml", "a: [");
        let mut cache = RemoteDocumentCache::new(&fetcher, &[]);

        let missing = cache.fetch("http://example.com/missing.yaml").unwrap_err();
        assert!(matches!(missing, ResolveError::RemoteFetch { .. }));
        let again = cache.fetch("http://example.com/missing.yaml").unwrap_err();
        assert_eq!(missing, again);
        assert_eq!(fetcher.fetch_count("http://example.com/missing.yaml"), 1);

        let bad = cache.fetch("http://example.com/bad.yaml").unwrap_err();
        assert!(matches!(bad, ResolveError::RemoteParse { .. }));
        assert!(bad.is_remote());
    }

    #[test]
    fn test_file_fetcher_reads_paths_and_file_urls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user.yaml");
        fs::write(&path, USER).unwrap();

        let by_path = FileFetcher.fetch_bytes(path.to_str().unwrap(), &[]).unwrap();
        assert_eq!(by_path, USER.as_bytes());

        let url = Url::from_file_path(&path).unwrap();
        let by_url = FileFetcher.fetch_bytes(url.as_str(), &[]).unwrap();
        assert_eq!(by_url, USER.as_bytes());

        let missing = FileFetcher.fetch_bytes(dir.path().join("nope.yaml").to_str().unwrap(), &[]);
        assert!(matches!(missing, Err(FetchError::Io(_))));
    }

    #[test]
    fn test_file_fetcher_rejects_other_schemes() {
        let err = FileFetcher
            .fetch_bytes("ftp://example.com/doc.yaml", &[])
            .unwrap_err();
        assert!(matches!(err, FetchError::Unsupported(_)));
    }

    /// Serves `body` to the first connection and hands back the request head.
    #[cfg(feature = "client")]
    fn serve_once(body: &'static str) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .unwrap();
            head
        });
        (base, handle)
    }

    #[cfg(feature = "client")]
    #[test]
    fn test_http_fetcher_sends_credentials() {
        let (base, server) = serve_once(USER);
        let credentials = vec![
            AuthorizationValue::header("Authorization", "Bearer abc"),
            AuthorizationValue::query("api_key", "s3cr3t"),
        ];
        let bytes = HttpFetcher::new()
            .fetch_bytes(&format!("{}/user.yaml", base), &credentials)
            .unwrap();
        assert_eq!(bytes, USER.as_bytes());

        let head = server.join().unwrap().to_lowercase();
        assert!(
            head.starts_with("get /user.yaml?api_key=s3cr3t http/1.1"),
            "{}",
            head
        );
        assert!(head.contains("authorization: bearer abc"), "{}", head);
    }

    #[cfg(feature = "client")]
    #[test]
    fn test_http_fetcher_times_out() {
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let locator = format!("http://{}/slow.yaml", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_secs(3));
        });

        let err = DefaultFetcher::new()
            .with_timeout(Duration::from_millis(200))
            .fetch_bytes(&locator, &[])
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
