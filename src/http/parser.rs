use std::collections::HashMap;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::http::error::HttpError;
use crate::http::headers::Headers;
use crate::http::request::{Method, Request, split_target};

/// Hard cap on a request body.
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
/// Longest accepted request or header line, excluding the terminator.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;
/// Most header lines accepted in one request.
pub const MAX_HEADERS: usize = 100;

const BODY_CHUNK_SIZE: usize = 4096;

/// The three tokens of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub target: String,
    pub version: String,
}

/// Reads one request from the stream.
///
/// Returns `Ok(None)` when the stream ends before the first byte of a
/// request line, which is how a keep-alive peer hangs up between exchanges.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    // Stray blank lines between pipelined requests are skipped.
    let line = loop {
        match read_line(reader).await? {
            None => return Ok(None),
            Some(line) if line.is_empty() => continue,
            Some(line) => break line,
        }
    };

    let RequestLine { method, target, version } = parse_request_line(&line)?;
    let headers = read_headers(reader).await?;
    let cookies = parse_cookies(headers.get("Cookie"));

    let body = if method.has_body() {
        read_body(reader, &headers).await?
    } else {
        Vec::new()
    };

    let (path, query) = split_target(&target);

    Ok(Some(Request {
        method,
        path,
        query,
        version,
        headers,
        cookies,
        body,
    }))
}

/// Reads one line terminated by `\n`, dropping any `\r`.
///
/// `Ok(None)` means the stream ended before any byte was read. A stream
/// that ends part way through a line is `PeerDisconnected`.
pub async fn read_line<R>(reader: &mut R) -> Result<Option<String>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    // Room for the content plus `\r\n`.
    let limit = MAX_LINE_LENGTH as u64 + 2;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return Ok(None);
    }

    let terminated = buf.last() == Some(&b'\n');
    if terminated {
        buf.pop();
    }
    buf.retain(|b| *b != b'\r');

    if buf.len() > MAX_LINE_LENGTH {
        return Err(HttpError::MalformedRequest(format!(
            "line exceeds {} bytes",
            MAX_LINE_LENGTH
        )));
    }
    if !terminated {
        return Err(HttpError::PeerDisconnected);
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Splits a request line into exactly three space-separated tokens.
pub fn parse_request_line(line: &str) -> Result<RequestLine, HttpError> {
    let tokens: Vec<&str> = line.split(' ').collect();

    if tokens.len() != 3 || tokens.iter().any(|t| t.is_empty()) {
        return Err(HttpError::MalformedRequest(format!(
            "invalid request line: {:?}",
            line
        )));
    }

    Ok(RequestLine {
        method: Method::parse(tokens[0]),
        target: tokens[1].to_string(),
        version: tokens[2].to_string(),
    })
}

/// Splits `Name: value` at the first colon.
pub fn parse_header_line(line: &str) -> Result<(String, String), HttpError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| HttpError::MalformedRequest(format!("invalid header: {:?}", line)))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(HttpError::MalformedRequest(format!(
            "empty header name: {:?}",
            line
        )));
    }

    Ok((name.to_string(), value.trim().to_string()))
}

/// Reads header lines up to and including the blank separator line.
pub async fn read_headers<R>(reader: &mut R) -> Result<Headers, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = Headers::new();
    let mut count = 0;

    loop {
        let line = read_line(reader)
            .await?
            .ok_or(HttpError::PeerDisconnected)?;

        if line.trim().is_empty() {
            return Ok(headers);
        }

        count += 1;
        if count > MAX_HEADERS {
            return Err(HttpError::MalformedRequest(format!(
                "more than {} headers",
                MAX_HEADERS
            )));
        }

        let (name, value) = parse_header_line(&line)?;
        headers.insert(name, value);
    }
}

/// Parses a `Cookie` header value into name/value pairs.
///
/// Pairs are separated by `;` with or without a following space and split
/// at the first `=`. Pairs without `=` are ignored.
pub fn parse_cookies(header: Option<&str>) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    let Some(header) = header else {
        return cookies;
    };

    for pair in header.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        if let Some((name, value)) = pair.split_once('=') {
            cookies.insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    cookies
}

/// Parses `Content-Length`, `None` when the header is absent.
pub fn content_length(headers: &Headers) -> Result<Option<usize>, HttpError> {
    headers
        .get("Content-Length")
        .map(|v| {
            v.trim().parse::<usize>().map_err(|_| {
                HttpError::MalformedRequest(format!("invalid Content-Length: {:?}", v))
            })
        })
        .transpose()
}

/// Reads exactly `Content-Length` bytes of body.
///
/// The cap is checked before any body byte is consumed.
pub async fn read_body<R>(reader: &mut R, headers: &Headers) -> Result<Vec<u8>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let length = match content_length(headers)? {
        Some(length) => length,
        None => return Ok(Vec::new()),
    };

    if length > MAX_BODY_SIZE {
        return Err(HttpError::PayloadTooLarge {
            declared: length,
            limit: MAX_BODY_SIZE,
        });
    }

    let mut body = Vec::with_capacity(length);
    let mut chunk = [0u8; BODY_CHUNK_SIZE];

    while body.len() < length {
        let want = (length - body.len()).min(BODY_CHUNK_SIZE);
        let n = reader.read(&mut chunk[..want]).await?;

        if n == 0 {
            return Err(HttpError::PeerDisconnected);
        }

        body.extend_from_slice(&chunk[..n]);
    }

    Ok(body)
}
