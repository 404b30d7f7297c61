//! Request-line and header parsing, and the small header-value matchers
//! the body-length and connection-persistence algorithms need.
use std::slice;
use std::str::from_utf8;
#[allow(unused_imports)]
use std::ascii::AsciiExt;

use httparse;

use enums::Version;
use super::Error;
use super::request_target::RequestTarget;
use super::websocket::WebsocketHandshake;

/// Number of headers to allocate on the stack before falling back to a
/// heap-allocated buffer.
const MIN_HEADERS: usize = 16;
/// A hard limit on the number of headers a single request may carry.
const MAX_HEADERS: usize = 1024;

/// How the length of a request body was determined.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyKind {
    /// `Content-Length: n`, or no body-length header at all (`n == 0`).
    Fixed(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
}

/// An owned snapshot of a request's headers.
///
/// Unlike a structure borrowed from the request buffer, `Head` is owned:
/// the request buffer may be released back to the pool (and its storage
/// reused for the next pipelined request) while the handler this `Head` was
/// handed to is still running.
///
/// Note we don't strip hop-by-hop headers (`Connection`, `Transfer-Encoding`)
/// — they're needed to police protocol correctness. Proxies must skip them.
#[derive(Debug, Clone)]
pub struct Head {
    method: String,
    path: String,
    version: Version,
    headers: Vec<(String, Vec<u8>)>,
    host: Option<String>,
    body_kind: BodyKind,
    connection_close: bool,
    expect_continue: bool,
}

/// An iterator over a `Head`'s headers, yielding `(name, value)` pairs.
pub struct HeaderIter<'a> {
    inner: slice::Iter<'a, (String, Vec<u8>)>,
}

impl<'a> Iterator for HeaderIter<'a> {
    type Item = (&'a str, &'a [u8]);
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|&(ref name, ref value)| {
            (name.as_str(), &value[..])
        })
    }
}

impl Head {
    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &[(String, Vec<u8>)] { &self.headers }
    pub fn iter(&self) -> HeaderIter { HeaderIter { inner: self.headers.iter() } }
    pub fn host(&self) -> Option<&str> { self.host.as_ref().map(|s| &s[..]) }
    pub fn body_kind(&self) -> BodyKind { self.body_kind }
    pub fn connection_close(&self) -> bool { self.connection_close }
    pub fn expect_continue(&self) -> bool { self.expect_continue }
    pub fn is_head(&self) -> bool { self.method.eq_ignore_ascii_case("HEAD") }
    pub fn is_connect(&self) -> bool { self.method.eq_ignore_ascii_case("CONNECT") }

    /// Whether a request body of non-zero length is expected.
    pub fn has_body(&self) -> bool {
        match self.body_kind {
            BodyKind::Fixed(0) => false,
            BodyKind::Fixed(_) => true,
            BodyKind::Chunked => true,
        }
    }

    /// Look for a complete, valid `Upgrade: websocket` handshake among this
    /// request's headers.
    ///
    /// Returns `Ok(None)` for an ordinary request, and `Err(())` for a
    /// request that looks like a half-hearted or malformed upgrade attempt
    /// (e.g. missing `Sec-WebSocket-Version`) -- the caller should respond
    /// with `400 Bad Request` in that case rather than silently falling
    /// back to a plain response.
    pub fn get_websocket_upgrade(&self) -> Result<Option<WebsocketHandshake>, ()> {
        super::websocket::get_handshake(self)
    }
}

fn header_find<'a>(headers: &'a [(String, Vec<u8>)], name: &str) -> bool {
    headers.iter().any(|&(ref n, _)| n.eq_ignore_ascii_case(name))
}

// header value is a byte sequence; comparisons must be case-insensitive
// and tolerant of surrounding whitespace.
pub fn is_close(val: &[u8]) -> bool {
    token_matches(val, b"close")
}

pub fn is_chunked(val: &[u8]) -> bool {
    token_matches(val, b"chunked")
}

pub fn is_keep_alive(val: &[u8]) -> bool {
    token_matches(val, b"keep-alive")
}

pub fn is_continue(val: &[u8]) -> bool {
    token_matches(val, b"100-continue")
}

fn token_matches(val: &[u8], token: &[u8]) -> bool {
    let trimmed = trim(val);
    trimmed.eq_ignore_ascii_case(token)
}

fn trim(mut val: &[u8]) -> &[u8] {
    while val.first().map_or(false, |&c| is_ows(c)) {
        val = &val[1..];
    }
    while val.last().map_or(false, |&c| is_ows(c)) {
        val = &val[..val.len() - 1];
    }
    val
}

fn is_ows(c: u8) -> bool {
    matches!(c, b'\r' | b'\n' | b' ' | b'\t')
}

/// Determine a request's body length and `Connection`/`Expect` semantics
/// from its headers.
///
/// Implements the body-length algorithm for requests laid out in
/// <https://httpwg.github.io/specs/rfc7230.html#message.body.length>:
///
/// 1. A valid `Transfer-Encoding` ending in `chunked` makes the request
///    chunked.
/// 2. Otherwise a valid `Content-Length` gives a fixed length.
/// 3. Otherwise the request has no body (`Fixed(0)`).
///
/// `Transfer-Encoding` and `Content-Length` both present, or more than one
/// `Content-Length`, force the connection closed afterward: the length is
/// ambiguous enough that the following bytes can't be trusted to be the
/// next request.
struct Scan {
    body: BodyKind,
    close: bool,
    expect_continue: bool,
    host: Option<String>,
}

fn scan_headers(version: Version, headers: &[httparse::Header])
    -> Result<Scan, Error>
{
    let mut has_content_length = false;
    let mut has_host = false;
    // Forced closed by an explicit `Connection: close` token or by an
    // ambiguous body length (chunked + content-length both present);
    // the HTTP/1.0 default-closed behavior is applied below, after the
    // loop, so an explicit `keep-alive` token can override it.
    let mut close = false;
    let mut has_keep_alive = false;
    let mut expect_continue = false;
    let mut body = BodyKind::Fixed(0);
    let mut host = None;

    for header in headers {
        if header.name.eq_ignore_ascii_case("Transfer-Encoding") {
            if let Some(enc) = header.value.split(|&x| x == b',').last() {
                if is_chunked(enc) {
                    if has_content_length {
                        close = true;
                    }
                    body = BodyKind::Chunked;
                }
            }
        } else if header.name.eq_ignore_ascii_case("Content-Length") {
            if has_content_length {
                return Err(Error::DuplicateContentLength);
            }
            has_content_length = true;
            if body != BodyKind::Chunked {
                let s = from_utf8(header.value)
                    .map_err(|_| Error::ContentLengthInvalid)?;
                let len = s.trim().parse()
                    .map_err(|_| Error::ContentLengthInvalid)?;
                body = BodyKind::Fixed(len);
            } else {
                close = true;
            }
        } else if header.name.eq_ignore_ascii_case("Connection") {
            let strconn = from_utf8(header.value)
                .map_err(|_| Error::ConnectionInvalid)?;
            if strconn.split(',').any(|tok| is_close(tok.as_bytes())) {
                close = true;
            }
            if strconn.split(',').any(|tok| is_keep_alive(tok.as_bytes())) {
                has_keep_alive = true;
            }
        } else if header.name.eq_ignore_ascii_case("Host") {
            if has_host {
                return Err(Error::DuplicateHost);
            }
            has_host = true;
            let s = from_utf8(header.value)
                .map_err(|_| Error::HostInvalid)?;
            host = Some(s.trim().to_string());
        } else if header.name.eq_ignore_ascii_case("Expect") {
            if is_continue(header.value) {
                expect_continue = true;
            }
        }
    }
    // HTTP/1.0 is closed by default unless the client opts into
    // `Connection: keep-alive`; HTTP/1.1 is persistent by default unless
    // explicitly closed. An ambiguous body length always wins either way.
    if version == Version::Http10 {
        close = close || !has_keep_alive;
    }
    Ok(Scan { body, close, expect_continue, host })
}

/// Parse a complete request line and header block out of `buf`.
///
/// Returns `Ok(None)` when `buf` doesn't yet hold a complete set of
/// headers (more bytes are needed). On success, returns the number of
/// bytes consumed from `buf` together with the parsed `Head`.
pub fn parse(buf: &[u8]) -> Result<Option<(usize, Head)>, Error> {
    let mut stack_headers = [httparse::EMPTY_HEADER; MIN_HEADERS];
    let mut heap_headers;
    let (method, path, version, headers, bytes) = {
        let mut raw = httparse::Request::new(&mut stack_headers);
        let mut result = raw.parse(buf);
        if let Err(httparse::Error::TooManyHeaders) = result {
            heap_headers = vec![httparse::EMPTY_HEADER; MAX_HEADERS];
            raw = httparse::Request::new(&mut heap_headers);
            result = raw.parse(buf);
        }
        match result? {
            httparse::Status::Complete(bytes) => {
                let version = match raw.version.unwrap() {
                    0 => Version::Http10,
                    1 => Version::Http11,
                    _ => return Err(Error::UnsupportedVersion),
                };
                (raw.method.unwrap().to_string(),
                 raw.path.unwrap().to_string(),
                 version,
                 raw.headers.iter()
                     .map(|h| (h.name.to_string(), h.value.to_vec()))
                     .collect::<Vec<_>>(),
                 bytes)
            }
            httparse::Status::Partial => return Ok(None),
        }
    };

    let raw_headers: Vec<httparse::Header> = headers.iter()
        .map(|&(ref name, ref value)| {
            httparse::Header { name: name.as_str(), value: &value[..] }
        })
        .collect();
    let scan = scan_headers(version, &raw_headers)?;

    let target = RequestTarget::parse(&path).ok_or(Error::BadRequestTarget)?;
    let host = match target {
        RequestTarget::Absolute { authority, .. } => Some(authority.to_string()),
        _ => scan.host,
    };
    if version == Version::Http11 && host.is_none()
        && !header_find(&headers, "Host")
    {
        return Err(Error::HostInvalid);
    }

    Ok(Some((bytes, Head {
        method: method,
        path: path,
        version: version,
        headers: headers,
        host: host,
        body_kind: scan.body,
        connection_close: scan.close,
        expect_continue: scan.expect_continue,
    })))
}

#[cfg(test)]
mod test {
    use super::{is_chunked, is_close, is_continue, is_keep_alive};

    #[test]
    fn test_chunked() {
        assert!(is_chunked(b"chunked"));
        assert!(is_chunked(b"Chunked"));
        assert!(is_chunked(b"chuNKED"));
        assert!(is_chunked(b"CHUNKED"));
        assert!(is_chunked(b"   CHUNKED"));
        assert!(is_chunked(b"   CHUNKED  "));
        assert!(is_chunked(b"chunked  "));
        assert!(!is_chunked(b"   CHUNKED 1 "));
    }

    #[test]
    fn test_close() {
        assert!(is_close(b"close"));
        assert!(is_close(b"Close"));
        assert!(is_close(b"clOSE"));
        assert!(is_close(b"CLOSE"));
        assert!(is_close(b" CLOSE"));
        assert!(is_close(b"   close   "));
        assert!(!is_close(b"Close  1 "));
        assert!(!is_close(b" xclose   "));
    }

    #[test]
    fn test_continue() {
        assert!(is_continue(b"100-continue"));
        assert!(is_continue(b"100-Continue"));
        assert!(is_continue(b"100-conTINUE"));
        assert!(is_continue(b"100-CONTINUE"));
        assert!(is_continue(b"  100-CONTINUE"));
        assert!(is_continue(b"   100-continue   "));
        assert!(!is_continue(b"100-continue y  "));
        assert!(!is_continue(b"100-coztinue   "));
    }

    #[test]
    fn get_request_no_body() {
        let (n, head) = super::parse(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n")
            .unwrap().unwrap();
        assert_eq!(n, "GET /hello HTTP/1.1\r\nHost: x\r\n\r\n".len());
        assert_eq!(head.method(), "GET");
        assert_eq!(head.path(), "/hello");
        assert!(!head.has_body());
        assert!(!head.connection_close());
    }

    #[test]
    fn partial_request_returns_none() {
        assert!(super::parse(b"GET /hello HTTP/1.1\r\nHost: x\r\n")
            .unwrap().is_none());
    }

    #[test]
    fn test_keep_alive() {
        assert!(is_keep_alive(b"keep-alive"));
        assert!(is_keep_alive(b"Keep-Alive"));
        assert!(is_keep_alive(b"  KEEP-ALIVE  "));
        assert!(!is_keep_alive(b"keep-alive 1"));
        assert!(!is_keep_alive(b"close"));
    }

    #[test]
    fn http10_closes_by_default() {
        let (_, head) = super::parse(b"GET / HTTP/1.0\r\n\r\n")
            .unwrap().unwrap();
        assert!(head.connection_close());
    }

    #[test]
    fn http10_keep_alive_is_persistent() {
        let (_, head) = super::parse(
            b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
            .unwrap().unwrap();
        assert!(!head.connection_close());
    }

    #[test]
    fn http11_is_persistent_by_default() {
        let (_, head) = super::parse(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
            .unwrap().unwrap();
        assert!(!head.connection_close());
    }

    #[test]
    fn duplicate_content_length_is_rejected() {
        let res = super::parse(
            b"POST / HTTP/1.1\r\nHost: x\r\n\
              Content-Length: 1\r\nContent-Length: 2\r\n\r\n");
        assert!(res.is_err());
    }
}
