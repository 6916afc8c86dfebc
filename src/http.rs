//! Minimal HTTP/1.1 transport for the JSON-RPC endpoint.
//!
//! One request per connection, parsed with httparse over any tokio stream.
//! Surface:
//! - `POST /` and `POST /rpc` carry JSON-RPC bodies
//! - No keep-alive, no chunked transfer encoding
//! - POST requires Content-Length
//! - Request head at most 32 KiB, body at most 1 MiB
//! - The whole request must arrive within the configured request timeout

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::types::ServerError;

const HEAD_LIMIT: usize = 32 * 1024;
const BODY_LIMIT: usize = 1024 * 1024;
const MAX_HEADERS: usize = 64;
const READ_CHUNK: usize = 4096;

/// Unread bytes swallowed after rejecting a request, before closing
const DISCARD_LIMIT: u64 = 256 * 1024;
const DISCARD_WINDOW: Duration = Duration::from_millis(500);

/// Open connections beyond this are closed on accept
const MAX_CONNECTIONS: usize = 1024;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Paths that accept JSON-RPC
const RPC_PATHS: [&str; 2] = ["/", "/rpc"];

/// Parsed HTTP request
#[derive(Debug)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// HTTP response to write back
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Plain-text response carrying the reason phrase or a short message
    pub fn text(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![(
                "Content-Type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: message.into().into_bytes(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Failures while reading one HTTP request
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Connection closed mid-request")]
    Truncated,

    #[error("Request not received within {0:?}")]
    Timeout(Duration),

    #[error("Headers too large")]
    HeadersTooLarge,

    #[error("HTTP parse error: {0}")]
    Malformed(String),

    #[error("Chunked transfer encoding not supported")]
    Chunked,

    #[error("POST requires Content-Length")]
    LengthRequired,

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpError {
    /// Status code reported to the client for this failure
    pub fn status(&self) -> u16 {
        match self {
            HttpError::Timeout(_) => 408,
            HttpError::HeadersTooLarge => 431,
            HttpError::LengthRequired => 411,
            HttpError::BodyTooLarge => 413,
            HttpError::Truncated
            | HttpError::Malformed(_)
            | HttpError::Chunked
            | HttpError::Io(_) => 400,
        }
    }

    /// Rejections sent while the client may still be writing its request
    fn leaves_unread_input(&self) -> bool {
        matches!(
            self,
            HttpError::HeadersTooLarge | HttpError::LengthRequired | HttpError::BodyTooLarge
        )
    }
}

/// Reason phrase for the status codes this server emits
fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        411 => "Length Required",
        413 => "Payload Too Large",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Request line and the headers that shape body handling
#[derive(Debug)]
struct RequestHead {
    method: String,
    path: String,
    content_length: Option<usize>,
    /// Bytes taken by the head, blank line included
    len: usize,
}

/// Try to parse a request head from the bytes received so far.
///
/// `Ok(None)` means the head is not complete yet.
fn parse_head(buf: &[u8]) -> Result<Option<RequestHead>, HttpError> {
    let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut slots);

    let len = match req
        .parse(buf)
        .map_err(|e| HttpError::Malformed(e.to_string()))?
    {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Ok(None),
    };

    let mut content_length = None;
    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case("Content-Length") {
            let raw = String::from_utf8_lossy(header.value);
            let parsed = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| HttpError::Malformed(format!("bad Content-Length '{}'", raw)))?;
            content_length = Some(parsed);
        } else if header.name.eq_ignore_ascii_case("Transfer-Encoding")
            && String::from_utf8_lossy(header.value)
                .to_ascii_lowercase()
                .contains("chunked")
        {
            return Err(HttpError::Chunked);
        }
    }

    Ok(Some(RequestHead {
        method: req.method.unwrap_or_default().to_string(),
        path: req.path.unwrap_or("/").to_string(),
        content_length,
        len,
    }))
}

/// Read and parse one HTTP request from a stream.
///
/// Returns None if the connection closed before any bytes arrived.
pub async fn read_request<R>(stream: &mut R) -> Option<Result<HttpRequest, HttpError>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    let head = loop {
        let n = match stream.read(&mut chunk).await {
            Ok(n) => n,
            Err(_) if buf.is_empty() => return None,
            Err(e) => return Some(Err(HttpError::Io(e))),
        };
        if n == 0 {
            return if buf.is_empty() {
                None
            } else {
                Some(Err(HttpError::Truncated))
            };
        }
        buf.extend_from_slice(&chunk[..n]);

        match parse_head(&buf) {
            Ok(Some(head)) if head.len <= HEAD_LIMIT => break head,
            Ok(Some(_)) => return Some(Err(HttpError::HeadersTooLarge)),
            Ok(None) if buf.len() > HEAD_LIMIT => return Some(Err(HttpError::HeadersTooLarge)),
            Ok(None) => {}
            Err(e) => return Some(Err(e)),
        }
    };

    Some(read_body(stream, head, buf).await)
}

/// Collect the body declared by `head`; `buf` holds everything read so far
async fn read_body<R>(
    stream: &mut R,
    head: RequestHead,
    mut buf: Vec<u8>,
) -> Result<HttpRequest, HttpError>
where
    R: AsyncRead + Unpin,
{
    let expected = match head.content_length {
        Some(len) if len > BODY_LIMIT => return Err(HttpError::BodyTooLarge),
        Some(len) => len,
        None if head.method == "POST" => return Err(HttpError::LengthRequired),
        None => 0,
    };

    let mut body = buf.split_off(head.len);
    // Bytes past the declared length are ignored; one request per connection
    body.truncate(expected);

    let missing = expected - body.len();
    if missing > 0 {
        let read = stream.take(missing as u64).read_to_end(&mut body).await?;
        if read < missing {
            return Err(HttpError::Truncated);
        }
    }

    Ok(HttpRequest {
        method: head.method,
        path: head.path,
        body,
    })
}

/// Swallow what the client is still sending so closing does not reset the
/// connection before it reads the rejection
async fn discard_unread<R>(stream: &mut R)
where
    R: AsyncRead + Unpin,
{
    let mut limited = stream.take(DISCARD_LIMIT);
    let mut sink = tokio::io::sink();
    match tokio::time::timeout(DISCARD_WINDOW, tokio::io::copy(&mut limited, &mut sink)).await {
        Ok(Ok(bytes)) => debug!(bytes, "discarded unread request bytes"),
        Ok(Err(e)) => debug!(error = %e, "error while discarding request bytes"),
        Err(_) => debug!("client still sending after rejection"),
    }
}

/// Write an HTTP response to a stream.
pub async fn write_response<W>(stream: &mut W, response: &HttpResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason(response.status)
    );
    if response.status != 204 {
        head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    }
    head.push_str("Connection: close\r\n");
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    if !response.body.is_empty() {
        stream.write_all(&response.body).await?;
    }
    stream.flush().await
}

/// Map one HTTP request to its response
pub fn route(dispatcher: &Dispatcher, request: &HttpRequest) -> HttpResponse {
    let path = request.path.split('?').next().unwrap_or_default();
    if !RPC_PATHS.contains(&path) {
        return HttpResponse::text(404, reason(404));
    }
    if request.method != "POST" {
        return HttpResponse::text(405, reason(405)).with_header("Allow", "POST");
    }

    match dispatcher.handle_body(&request.body).to_body() {
        Ok(Some(body)) => HttpResponse::json(body),
        Ok(None) => HttpResponse::no_content(),
        Err(e) => {
            warn!(error = %e, "failed to serialize reply");
            HttpResponse::text(500, reason(500))
        }
    }
}

/// Serve a single request on `stream`, then close it.
///
/// A client that has not delivered its full request within
/// `request_timeout` gets a 408.
pub async fn handle_connection<S>(
    stream: S,
    dispatcher: &Dispatcher,
    request_timeout: Duration,
) -> Result<(), HttpError>
where
    S: AsyncRead + AsyncWrite,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let outcome = tokio::time::timeout(request_timeout, read_request(&mut reader))
        .await
        .unwrap_or_else(|_| Some(Err(HttpError::Timeout(request_timeout))));

    let (response, drain) = match outcome {
        None => return Ok(()),
        Some(Ok(request)) => {
            debug!(method = %request.method, path = %request.path, "http request");
            (route(dispatcher, &request), false)
        }
        Some(Err(e)) => {
            warn!(error = %e, "rejecting HTTP request");
            (
                HttpResponse::text(e.status(), e.to_string()),
                e.leaves_unread_input(),
            )
        }
    };

    write_response(&mut writer, &response).await?;
    if drain {
        discard_unread(&mut reader).await;
    }
    writer.shutdown().await?;
    Ok(())
}

// ============================================================================
// Listener
// ============================================================================

/// TCP listener serving the JSON-RPC endpoint
pub struct HttpServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    request_timeout: Duration,
}

impl HttpServer {
    /// Bind the configured address
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = config.bind_addr()?;
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            dispatcher: Arc::new(Dispatcher::new()),
            request_timeout: config.request_timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process exits
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// The listener closes at once; connections already accepted get up to
    /// one request timeout to finish before they are aborted.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let local = self.local_addr()?;
        info!(addr = %local, "listening");
        tokio::pin!(shutdown);

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        warn!(error = %e, "connection task failed");
                    }
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    if connections.len() >= MAX_CONNECTIONS {
                        warn!(%peer, limit = MAX_CONNECTIONS, "too many open connections, closing");
                        continue;
                    }
                    let dispatcher = Arc::clone(&self.dispatcher);
                    let request_timeout = self.request_timeout;
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, &dispatcher, request_timeout).await {
                            debug!(%peer, error = %e, "connection closed with error");
                        }
                    });
                }
            }
        }

        drop(self.listener);

        if !connections.is_empty() {
            info!(open = connections.len(), "waiting for open connections");
            let drained = tokio::time::timeout(self.request_timeout + DISCARD_WINDOW, async {
                while connections.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!(
                    open = connections.len(),
                    "aborting connections still open after the grace period"
                );
                connections.shutdown().await;
            }
        }

        Ok(())
    }
}
