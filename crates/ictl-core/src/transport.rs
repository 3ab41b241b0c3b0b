//! Authenticated HTTP transport shared by the platform and deployment clients.
//!
//! Every request goes through [`Transport::send`]: the URL is built from
//! percent-encoded path segments, credentials are attached by
//! [`apply_auth`], and the reply body is read up to a size cap. Non-2xx
//! replies become errors carrying the server's own message (see
//! [`extract_server_message`]).

use crate::cancel::CancelToken;
use crate::error::{IctlError, Result};
use crate::session::Cookie;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub const ERROR_BODY_LIMIT: usize = 4 * 1024;
pub const OBJECT_BODY_LIMIT: usize = 64 * 1024;
pub const COLLECTION_BODY_LIMIT: usize = 1024 * 1024;

/// How often a waiting call looks at the cancel token.
pub const CANCEL_POLL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// What the transport authenticates with. An API key always wins over
/// cookies.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// `publicKey:secretKey`, sent as HTTP Basic.
    pub api_key: String,
    pub cookies: Vec<Cookie>,
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials {
            api_key: key.into(),
            cookies: Vec::new(),
        }
    }

    pub fn cookies(cookies: Vec<Cookie>) -> Self {
        Credentials {
            api_key: String::new(),
            cookies,
        }
    }

    pub fn uses_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Attach credentials to a request.
///
/// A non-empty `api_key` becomes `Authorization: Basic <base64(api_key)>` and
/// cookies are ignored. Otherwise every named cookie goes into one `Cookie`
/// header. With neither, the request is refused.
pub fn apply_auth(req: RequestBuilder, api_key: &str, cookies: &[Cookie]) -> Result<RequestBuilder> {
    let api_key = api_key.trim();
    if !api_key.is_empty() {
        let token = BASE64.encode(api_key.as_bytes());
        return Ok(req.header(AUTHORIZATION, format!("Basic {token}")));
    }
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| !c.name.is_empty())
        .map(Cookie::header_pair)
        .collect();
    if pairs.is_empty() {
        return Err(IctlError::Unauthenticated);
    }
    Ok(req.header(COOKIE, pairs.join("; ")))
}

// ---------------------------------------------------------------------------
// Server messages
// ---------------------------------------------------------------------------

/// Best-effort human-readable reason from a reply body.
///
/// JSON `message` (trimmed, non-blank) first, then `detail`, then the
/// trimmed raw body, which may be empty.
pub fn extract_server_message(body: &[u8]) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(body) {
        for field in ["message", "detail"] {
            if let Some(text) = map.get(field).and_then(|v| v.as_str()) {
                let text = text.trim();
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    String::from_utf8_lossy(body).trim().to_string()
}

/// Map a non-2xx reply to the error taxonomy.
pub fn status_error(status: StatusCode, body: &[u8]) -> IctlError {
    let mut message = extract_server_message(body);
    if message.is_empty() {
        message = format!("HTTP {status}");
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => IctlError::AuthRejected(message),
        _ => IctlError::Remote {
            status: status.as_u16(),
            message,
        },
    }
}

/// Accept strings, numbers, and booleans where the server is loose about
/// types; null becomes empty.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize as _;
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

enum Payload {
    Empty,
    Json(Vec<u8>),
    Raw {
        content_type: &'static str,
        body: reqwest::blocking::Body,
    },
}

/// One API call: method, path segments (encoded individually), query pairs,
/// optional payload, and per-call limits.
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    payload: Payload,
    timeout: Option<Duration>,
    body_limit: usize,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ApiRequest {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            payload: Payload::Empty,
            timeout: None,
            body_limit: OBJECT_BODY_LIMIT,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.payload = Payload::Json(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub fn raw(mut self, content_type: &'static str, body: impl Into<reqwest::blocking::Body>) -> Self {
        self.payload = Payload::Raw {
            content_type,
            body: body.into(),
        };
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap for the success body; collections need more room than objects.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Slash-joined, unencoded path for log lines.
    pub fn display_path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a non-2xx reply into an error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(status_error(self.status, &self.body))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode a collection sent either as a bare array or wrapped as
    /// `{"<field>": [...]}`. A null or missing field is an empty list.
    pub fn json_list<T: DeserializeOwned>(&self, field: &str) -> Result<Vec<T>> {
        let value: serde_json::Value = self.json()?;
        let items = match value {
            serde_json::Value::Object(mut map) => map.remove(field).unwrap_or_default(),
            other => other,
        };
        if items.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(items)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub struct Transport {
    base: Url,
    client: Client,
    streaming: Client,
    credentials: Credentials,
    cancel: CancelToken,
}

impl Transport {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| IctlError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(IctlError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent())
            .build()
            .map_err(|e| IctlError::Network(format!("failed to build HTTP client: {e}")))?;
        // Log streams stay open as long as the server writes; only the
        // connect phase is bounded.
        let streaming = Client::builder()
            .timeout(None::<Duration>)
            .connect_timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent())
            .build()
            .map_err(|e| IctlError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Transport {
            base,
            client,
            streaming,
            credentials,
            cancel: CancelToken::new(),
        })
    }

    /// Refuse new requests once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Issue a request and return the reply whatever its status.
    ///
    /// Success bodies are capped at the request's limit, error bodies at
    /// [`ERROR_BODY_LIMIT`]; anything beyond is dropped. Cancelling the
    /// token abandons the call, body read included.
    pub fn send(&self, req: ApiRequest) -> Result<Response> {
        let limit = req.body_limit;
        let builder = self.prepare(&self.client, req)?;
        self.interruptible(move || {
            let mut resp = execute(builder)?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let cap = if status.is_success() { limit } else { ERROR_BODY_LIMIT };
            let body = read_capped(&mut resp, cap)?;
            Ok(Response {
                status,
                headers,
                body,
            })
        })
    }

    /// [`send`](Self::send) and fail on any non-2xx status.
    pub fn request(&self, req: ApiRequest) -> Result<Response> {
        self.send(req)?.error_for_status()
    }

    /// Decode a successful JSON reply.
    pub fn request_json<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T> {
        self.request(req)?.json()
    }

    /// Open a long-lived reply whose body the caller reads incrementally.
    pub fn open_stream(&self, req: ApiRequest) -> Result<reqwest::blocking::Response> {
        let builder = self.prepare(&self.streaming, req)?;
        self.interruptible(move || {
            let mut resp = execute(builder)?;
            let status = resp.status();
            if !status.is_success() {
                let body = read_capped(&mut resp, ERROR_BODY_LIMIT)?;
                return Err(status_error(status, &body));
            }
            Ok(resp)
        })
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn prepare(&self, client: &Client, req: ApiRequest) -> Result<RequestBuilder> {
        self.cancel.check()?;
        let url = self.url_for(&req.segments, &req.query)?;
        tracing::debug!(method = %req.method, path = %req.display_path(), "request");

        let mut builder = client.request(req.method.clone(), url);
        builder = apply_auth(builder, &self.credentials.api_key, &self.credentials.cookies)?;
        builder = match req.payload {
            Payload::Empty => builder,
            Payload::Json(bytes) => builder.header(CONTENT_TYPE, "application/json").body(bytes),
            Payload::Raw { content_type, body } => builder.header(CONTENT_TYPE, content_type).body(body),
        };
        if let Some(timeout) = req.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder)
    }

    /// Run a blocking call on a worker thread and wait for it, returning
    /// `Cancelled` as soon as the token is set. An abandoned worker drops
    /// its connection when its call returns.
    fn interruptible<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(call());
        });
        loop {
            match rx.recv_timeout(CANCEL_POLL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    if self.cancel.is_cancelled() {
                        tracing::debug!("request abandoned");
                        return Err(IctlError::Cancelled);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(IctlError::Network("request worker exited".to_string()));
                }
            }
        }
    }

    fn url_for(&self, segments: &[String], query: &[(String, String)]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| IctlError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

fn user_agent() -> String {
    format!("ictl/{}", env!("CARGO_PKG_VERSION"))
}

fn execute(builder: RequestBuilder) -> Result<reqwest::blocking::Response> {
    let resp = builder.send().map_err(map_reqwest_error)?;
    tracing::debug!(status = resp.status().as_u16(), "response");
    Ok(resp)
}

fn read_capped(resp: &mut reqwest::blocking::Response, cap: usize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    resp.take(cap as u64)
        .read_to_end(&mut body)
        .map_err(map_io_error)?;
    Ok(body)
}

fn map_reqwest_error(e: reqwest::Error) -> IctlError {
    if e.is_timeout() {
        IctlError::Timeout
    } else {
        IctlError::Network(e.to_string())
    }
}

/// The blocking body reader reports an expired deadline as an io error
/// wrapping a `reqwest::Error`, so the wrapped error is inspected too.
fn map_io_error(e: std::io::Error) -> IctlError {
    let inner_timeout = e
        .get_ref()
        .is_some_and(|inner| caused_by_timeout(inner));
    if e.kind() == std::io::ErrorKind::TimedOut || inner_timeout {
        IctlError::Timeout
    } else {
        IctlError::Network(e.to_string())
    }
}

fn caused_by_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<reqwest::Error>().is_some_and(reqwest::Error::is_timeout) {
            return true;
        }
        if e.downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
        {
            return true;
        }
        current = e.source();
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
