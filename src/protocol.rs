//! HTTP/1.1 primitives for the control endpoint.
//!
//! One request per connection: a request line, header lines up to a blank
//! line, and an optional body sized strictly by `Content-Length`. Chunked
//! bodies and keep-alive are not supported. Responses are fully buffered and
//! always announce `Connection: close`.

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::Result;
use crate::constants::MAX_LINE_BYTES;

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// A parsed request. Header keys are lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl Request {
    /// Build a request from a method and a raw request target (`/path?query`).
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = split_target(target);
        Request {
            method: method.trim().to_ascii_uppercase(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: parse_query(query),
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Outcome of reading the head of a connection.
#[derive(Debug, PartialEq, Eq)]
pub enum Incoming {
    /// The peer sent nothing usable (EOF or a blank request line).
    Closed,
    /// The request line has fewer than two space-separated tokens.
    Malformed,
    Request(Request),
}

/// Read one request from `reader`.
pub async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Incoming> {
    let Some(request_line) = read_line(reader).await? else {
        return Ok(Incoming::Closed);
    };
    if request_line.trim().is_empty() {
        return Ok(Incoming::Closed);
    }

    let mut parts = request_line.splitn(3, ' ');
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(Incoming::Malformed);
    };
    let target = target.trim();
    if target.is_empty() {
        return Ok(Incoming::Malformed);
    }
    let mut request = Request::new(method, target);

    while let Some(line) = read_line(reader).await? {
        if line.is_empty() {
            break;
        }
        // A colon at index 0 is as useless as no colon at all.
        match line.find(':') {
            Some(idx) if idx > 0 => {
                let key = line[..idx].trim().to_ascii_lowercase();
                let value = line[idx + 1..].trim().to_string();
                request.headers.insert(key, value);
            }
            _ => continue,
        }
    }

    let content_length = request
        .headers
        .get("content-length")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    if content_length > 0 {
        let mut body = Vec::new();
        // A slow or short peer yields whatever arrived before EOF.
        (&mut *reader)
            .take(content_length)
            .read_to_end(&mut body)
            .await?;
        request.body = Bytes::from(body);
    }

    Ok(Incoming::Request(request))
}

/// Read one line terminated by `\n`, `\r\n` or a bare `\r`.
///
/// Returns `None` on EOF before any byte. Lines longer than
/// [`MAX_LINE_BYTES`] are cut; the remainder is read as the next line.
pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<String>> {
    let mut line: Vec<u8> = Vec::with_capacity(64);
    let mut got_any = false;

    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            break;
        }
        got_any = true;

        let limit = buf.len().min(MAX_LINE_BYTES - line.len());
        match buf[..limit].iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) => {
                let terminator = buf[i];
                line.extend_from_slice(&buf[..i]);
                reader.consume(i + 1);
                if terminator == b'\r' {
                    let next = reader.fill_buf().await?;
                    if next.first() == Some(&b'\n') {
                        reader.consume(1);
                    }
                }
                return Ok(Some(decode_line(line)));
            }
            None => {
                line.extend_from_slice(&buf[..limit]);
                reader.consume(limit);
                if line.len() >= MAX_LINE_BYTES {
                    return Ok(Some(decode_line(line)));
                }
            }
        }
    }

    Ok(got_any.then(|| decode_line(line)))
}

fn decode_line(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Split a request target on the first `?` into path and raw query.
pub fn split_target(target: &str) -> (&str, &str) {
    target.split_once('?').unwrap_or((target, ""))
}

/// Parse `a=1&b=2` pairs, URL-decoding keys and values.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            (url_decode(key), url_decode(value))
        })
        .collect()
}

/// Form-style URL decoding (`+` is a space). Undecodable input is returned raw.
pub fn url_decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s.to_string(),
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Response {
            status,
            content_type,
            body: body.into(),
        }
    }

    pub fn plain(status: u16, text: &str) -> Self {
        Response::new(status, CONTENT_TYPE_TEXT, text.to_string())
    }

    pub fn html(page: &'static str) -> Self {
        Response::new(200, CONTENT_TYPE_HTML, Bytes::from_static(page.as_bytes()))
    }

    /// A 200 response carrying a JSON document.
    pub fn json(value: &serde_json::Value) -> Self {
        Response::new(200, CONTENT_TYPE_JSON, value.to_string())
    }

    /// A 200 response carrying `{"ok":false,"error":<message>}`.
    pub fn json_error(message: &str) -> Self {
        Response::json(&serde_json::json!({ "ok": false, "error": message }))
    }

    pub fn reason(&self) -> &'static str {
        status_text(self.status)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Write status line, headers and body.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Cache-Control: no-store\r\n\
             Connection: close\r\n\
             Content-Length: {}\r\n\
             \r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len()
        );
        buf.put_slice(head.as_bytes());
        buf.put_slice(&self.body);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(160 + self.body.len());
        self.write_to(&mut buf);
        buf.freeze()
    }
}

/// Reason phrase for the status codes this server emits.
pub fn status_text(code: u16) -> &'static str {
    match code {
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "OK",
    }
}
