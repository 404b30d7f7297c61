//! `Sec-WebSocket-Accept` computation and handshake-header extraction.
//!
//! This is deliberately thin: producing the three response headers needed
//! to complete the opening handshake (`Upgrade`, `Connection`,
//! `Sec-WebSocket-Accept`) and then handing the raw, de-framed socket
//! halves to the application via `Codec::hijack`. Framing the resulting
//! WebSocket messages is left entirely to the caller.
use std::fmt;
#[allow(unused_imports)]
use std::ascii::AsciiExt;
use std::str::{from_utf8, from_utf8_unchecked};

use sha1::Sha1;

use super::headers::Head;

const GUID: &'static str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The `Sec-WebSocket-Accept` header value computed from a request's
/// `Sec-WebSocket-Key`.
///
/// Implements `Display`, so it can be written directly with
/// `enc.format_header("Sec-WebSocket-Accept", accept)`.
pub struct WebsocketAccept([u8; 20]);

/// Everything extracted from a validated `Upgrade: websocket` handshake.
pub struct WebsocketHandshake {
    /// The value to send back as `Sec-WebSocket-Accept`.
    pub accept: WebsocketAccept,
    /// Tokens requested via `Sec-WebSocket-Protocol`, in order.
    pub protocols: Vec<String>,
    /// Tokens requested via `Sec-WebSocket-Extensions`, in order.
    pub extensions: Vec<String>,
}

impl WebsocketAccept {
    fn from_key_bytes(key: &[u8]) -> WebsocketAccept {
        let mut sha1 = Sha1::new();
        sha1.update(key);
        sha1.update(GUID.as_bytes());
        WebsocketAccept(sha1.digest().bytes())
    }
}

impl fmt::Display for WebsocketAccept {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const CHARS: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                      abcdefghijklmnopqrstuvwxyz\
                                      0123456789+/";
        let mut buf = [0u8; 28];
        for i in 0..6 {
            let n = ((self.0[i * 3 + 0] as usize) << 16) |
                    ((self.0[i * 3 + 1] as usize) << 8) |
                     (self.0[i * 3 + 2] as usize);
            buf[i * 4 + 0] = CHARS[(n >> 18) & 63];
            buf[i * 4 + 1] = CHARS[(n >> 12) & 63];
            buf[i * 4 + 2] = CHARS[(n >> 6) & 63];
            buf[i * 4 + 3] = CHARS[(n >> 0) & 63];
        }
        let n = ((self.0[18] as usize) << 16) | ((self.0[19] as usize) << 8);
        buf[24] = CHARS[(n >> 18) & 63];
        buf[25] = CHARS[(n >> 12) & 63];
        buf[26] = CHARS[(n >> 6) & 63];
        buf[27] = b'=';
        fmt::Write::write_str(f, unsafe { from_utf8_unchecked(&buf) })
    }
}

impl fmt::Debug for WebsocketAccept {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WebsocketAccept({})", self)
    }
}

fn bytes_trim(mut x: &[u8]) -> &[u8] {
    while x.len() > 0 && matches!(x[0], b'\r' | b'\n' | b' ' | b'\t') {
        x = &x[1..];
    }
    while x.len() > 0 && matches!(x[x.len() - 1], b'\r' | b'\n' | b' ' | b'\t') {
        x = &x[..x.len() - 1];
    }
    x
}

/// Look for a complete `Upgrade: websocket` handshake among `req`'s
/// headers.
///
/// `Ok(None)` means this isn't a websocket upgrade at all (no `Connection:
/// Upgrade` / no `Upgrade: websocket`); `Err(())` means it looks like one
/// but is missing or mangles a required header.
pub fn get_handshake(req: &Head) -> Result<Option<WebsocketHandshake>, ()> {
    let conn_upgrade = req.iter()
        .find(|&(name, _)| name.eq_ignore_ascii_case("Connection"))
        .and_then(|(_, value)| from_utf8(value).ok())
        .map(|v| v.split(',').any(|tok| tok.trim().eq_ignore_ascii_case("upgrade")))
        .unwrap_or(false);
    if !conn_upgrade {
        return Ok(None);
    }

    let mut upgrade = false;
    let mut version_ok = false;
    let mut accept = None;
    let mut protocols = Vec::new();
    let mut extensions = Vec::new();

    for (name, value) in req.iter() {
        if name.eq_ignore_ascii_case("Upgrade") {
            if !bytes_trim(value).eq_ignore_ascii_case(b"websocket") {
                return Ok(None);
            }
            upgrade = true;
        } else if name.eq_ignore_ascii_case("Sec-WebSocket-Key") {
            if accept.is_some() {
                debug!("duplicate Sec-WebSocket-Key");
                return Err(());
            }
            accept = Some(WebsocketAccept::from_key_bytes(bytes_trim(value)));
        } else if name.eq_ignore_ascii_case("Sec-WebSocket-Version") {
            if bytes_trim(value) != b"13" {
                debug!("unsupported websocket version {:?}",
                    String::from_utf8_lossy(value));
                return Err(());
            }
            version_ok = true;
        } else if name.eq_ignore_ascii_case("Sec-WebSocket-Protocol") {
            let tokens = from_utf8(value).map_err(|_| {
                debug!("bad utf-8 in Sec-WebSocket-Protocol");
            })?;
            protocols.extend(tokens.split(',')
                .map(|x| x.trim())
                .filter(|x| x.len() > 0)
                .map(|x| x.to_string()));
        } else if name.eq_ignore_ascii_case("Sec-WebSocket-Extensions") {
            let tokens = from_utf8(value).map_err(|_| {
                debug!("bad utf-8 in Sec-WebSocket-Extensions");
            })?;
            extensions.extend(tokens.split(',')
                .map(|x| x.trim())
                .filter(|x| x.len() > 0)
                .map(|x| x.to_string()));
        }
    }

    if req.has_body() {
        debug!("websocket handshake carries a request body");
        return Err(());
    }
    if !upgrade {
        debug!("no Upgrade: websocket header on an upgrade request");
        return Err(());
    }
    if !version_ok || accept.is_none() {
        debug!("missing Sec-WebSocket-Version or Sec-WebSocket-Key");
        return Err(());
    }
    Ok(Some(WebsocketHandshake {
        accept: accept.unwrap(),
        protocols: protocols,
        extensions: extensions,
    }))
}

#[cfg(test)]
mod test {
    use super::WebsocketAccept;

    #[test]
    fn known_accept_value() {
        // The example key/accept pair from RFC 6455 section 1.3.
        let accept = WebsocketAccept::from_key_bytes(b"dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(accept.to_string(), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }
}
