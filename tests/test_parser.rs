use tinyrest::http::error::HttpError;
use tinyrest::http::parser::{
    MAX_BODY_SIZE, MAX_LINE_LENGTH, parse_cookies, parse_request_line, read_headers, read_line,
    read_request,
};
use tinyrest::http::request::Method;
use tokio::io::{AsyncWriteExt, BufReader};

#[tokio::test]
async fn test_parse_simple_get_request() {
    let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let parsed = read_request(&mut input).await.unwrap().unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.header("Host"), Some("example.com"));
    assert!(parsed.body.is_empty());
}

#[tokio::test]
async fn test_parse_post_request_with_body() {
    let mut input: &[u8] = b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let parsed = read_request(&mut input).await.unwrap().unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.path, "/api");
    assert_eq!(parsed.body, b"hello".to_vec());
    assert!(input.is_empty());
}

#[tokio::test]
async fn test_parse_bare_newline_terminators() {
    let mut input: &[u8] = b"GET /x HTTP/1.1\nAccept: */*\n\n";
    let parsed = read_request(&mut input).await.unwrap().unwrap();

    assert_eq!(parsed.path, "/x");
    assert_eq!(parsed.header("Accept"), Some("*/*"));
}

#[test]
fn test_request_line_tokens_extracted_exactly() {
    let line = parse_request_line("DELETE /rest/teams/42?force=1 HTTP/1.0").unwrap();

    assert_eq!(line.method, Method::DELETE);
    assert_eq!(line.target, "/rest/teams/42?force=1");
    assert_eq!(line.version, "HTTP/1.0");
}

#[test]
fn test_request_line_wrong_token_count_is_malformed() {
    for line in ["GET /", "GET / HTTP/1.1 extra", "", "GET", "GET  / HTTP/1.1"] {
        let result = parse_request_line(line);
        assert!(
            matches!(result, Err(HttpError::MalformedRequest(_))),
            "expected malformed for {:?}",
            line
        );
    }
}

#[test]
fn test_unknown_method_falls_back_to_trace() {
    let line = parse_request_line("PATCH /rest/teams HTTP/1.1").unwrap();
    assert_eq!(line.method, Method::TRACE);
}

#[test]
fn test_method_names_are_case_insensitive() {
    let methods = vec![
        ("get", Method::GET),
        ("Post", Method::POST),
        ("PUT", Method::PUT),
        ("delete", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("options", Method::OPTIONS),
        ("TRACE", Method::TRACE),
    ];

    for (name, expected) in methods {
        let line = parse_request_line(&format!("{} / HTTP/1.1", name)).unwrap();
        assert_eq!(line.method, expected);
    }
}

#[tokio::test]
async fn test_parse_malformed_header() {
    let mut input: &[u8] = b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n";
    let result = read_request(&mut input).await;

    assert!(matches!(result, Err(HttpError::MalformedRequest(_))));
}

#[tokio::test]
async fn test_repeated_header_last_value_wins() {
    let mut input: &[u8] = b"X-Team: 1\r\nAccept: text/html\r\nx-team: 2\r\nX-TEAM: 3\r\n\r\n";
    let headers = read_headers(&mut input).await.unwrap();

    let pairs: Vec<_> = headers.iter().collect();
    assert_eq!(pairs, vec![("X-Team", "3"), ("Accept", "text/html")]);
}

#[tokio::test]
async fn test_header_value_may_contain_colons() {
    let mut input: &[u8] = b"Host: localhost:8080\r\n\r\n";
    let headers = read_headers(&mut input).await.unwrap();

    assert_eq!(headers.get("host"), Some("localhost:8080"));
}

#[test]
fn test_cookies_spaced_and_unspaced_parse_identically() {
    let spaced = parse_cookies(Some("a=1; b=2"));
    let unspaced = parse_cookies(Some("a=1;b=2"));

    assert_eq!(spaced.len(), 2);
    assert_eq!(spaced.get("a").map(String::as_str), Some("1"));
    assert_eq!(spaced.get("b").map(String::as_str), Some("2"));
    assert_eq!(spaced, unspaced);
}

#[test]
fn test_absent_cookie_header_is_empty() {
    assert!(parse_cookies(None).is_empty());
}

#[tokio::test]
async fn test_cookies_parsed_into_request() {
    let mut input: &[u8] = b"GET / HTTP/1.1\r\nCookie: session=abc; theme=dark\r\n\r\n";
    let parsed = read_request(&mut input).await.unwrap().unwrap();

    assert_eq!(parsed.cookie("session"), Some("abc"));
    assert_eq!(parsed.cookie("theme"), Some("dark"));
}

#[tokio::test]
async fn test_body_read_in_full_across_chunks() {
    let body: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let mut raw = format!("PUT /upload HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
    raw.extend_from_slice(&body);

    let (mut client, server) = tokio::io::duplex(64);
    tokio::spawn(async move {
        for chunk in raw.chunks(37) {
            client.write_all(chunk).await.unwrap();
            tokio::task::yield_now().await;
        }
    });

    let mut reader = BufReader::new(server);
    let parsed = read_request(&mut reader).await.unwrap().unwrap();

    assert_eq!(parsed.method, Method::PUT);
    assert_eq!(parsed.body, body);
}

#[tokio::test]
async fn test_oversized_body_rejected_before_reading() {
    let raw = format!(
        "POST /api HTTP/1.1\r\nContent-Length: {}\r\n\r\nabc",
        MAX_BODY_SIZE + 1
    );
    let mut input: &[u8] = raw.as_bytes();

    let result = read_request(&mut input).await;

    assert!(matches!(
        result,
        Err(HttpError::PayloadTooLarge { declared, limit })
            if declared == MAX_BODY_SIZE + 1 && limit == MAX_BODY_SIZE
    ));
    assert_eq!(input, b"abc");
}

#[tokio::test]
async fn test_body_at_cap_is_accepted() {
    let mut raw = format!("POST /api HTTP/1.1\r\nContent-Length: {}\r\n\r\n", MAX_BODY_SIZE).into_bytes();
    raw.resize(raw.len() + MAX_BODY_SIZE, b'x');
    let mut input: &[u8] = &raw;

    let parsed = read_request(&mut input).await.unwrap().unwrap();
    assert_eq!(parsed.body.len(), MAX_BODY_SIZE);
}

#[tokio::test]
async fn test_short_body_is_peer_disconnected() {
    let mut input: &[u8] = b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello";
    let result = read_request(&mut input).await;

    assert!(matches!(result, Err(HttpError::PeerDisconnected)));
}

#[tokio::test]
async fn test_missing_content_length_yields_empty_body() {
    let mut input: &[u8] = b"POST /api HTTP/1.1\r\nHost: a\r\n\r\n";
    let parsed = read_request(&mut input).await.unwrap().unwrap();

    assert!(parsed.body.is_empty());
}

#[tokio::test]
async fn test_invalid_content_length_is_malformed() {
    let mut input: &[u8] = b"POST /api HTTP/1.1\r\nContent-Length: ten\r\n\r\n";
    let result = read_request(&mut input).await;

    assert!(matches!(result, Err(HttpError::MalformedRequest(_))));
}

#[tokio::test]
async fn test_get_body_is_not_read() {
    let mut input: &[u8] = b"GET / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
    let parsed = read_request(&mut input).await.unwrap().unwrap();

    assert!(parsed.body.is_empty());
    assert_eq!(input, b"abc");
}

#[tokio::test]
async fn test_eof_before_request_is_clean_close() {
    let mut input: &[u8] = b"";
    assert!(read_request(&mut input).await.unwrap().is_none());
}

#[tokio::test]
async fn test_eof_mid_headers_is_peer_disconnected() {
    let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com\r\n";
    let result = read_request(&mut input).await;

    assert!(matches!(result, Err(HttpError::PeerDisconnected)));
}

#[tokio::test]
async fn test_keep_alive_requests_parse_back_to_back() {
    let mut input: &[u8] =
        b"POST /a HTTP/1.1\r\nContent-Length: 2\r\n\r\nhiGET /b HTTP/1.1\r\n\r\n";

    let first = read_request(&mut input).await.unwrap().unwrap();
    let second = read_request(&mut input).await.unwrap().unwrap();

    assert_eq!(first.body, b"hi".to_vec());
    assert_eq!(second.path, "/b");
    assert!(read_request(&mut input).await.unwrap().is_none());
}

#[tokio::test]
async fn test_line_at_length_limit_accepted_with_crlf() {
    let mut raw = vec![b'a'; MAX_LINE_LENGTH];
    raw.extend_from_slice(b"\r\nnext\r\n");
    let mut input: &[u8] = &raw;

    let line = read_line(&mut input).await.unwrap().unwrap();
    assert_eq!(line.len(), MAX_LINE_LENGTH);
    assert_eq!(read_line(&mut input).await.unwrap().as_deref(), Some("next"));
}

#[tokio::test]
async fn test_line_over_length_limit_is_malformed() {
    let mut raw = vec![b'a'; MAX_LINE_LENGTH + 1];
    raw.extend_from_slice(b"\r\n");
    let mut input: &[u8] = &raw;

    let result = read_line(&mut input).await;
    assert!(matches!(result, Err(HttpError::MalformedRequest(_))));
}
