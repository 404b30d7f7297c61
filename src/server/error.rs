use std::io;

use httparse;

quick_error! {
    /// Errors produced while driving an HTTP/1.x connection.
    ///
    /// None of these ever cross a connection boundary: the connection
    /// driver catches them at the loop boundary, logs, and closes or resets
    /// the connection as appropriate (see `server::connection`).
    #[derive(Debug)]
    pub enum Error {
        /// The transport returned an I/O error (not `WouldBlock`).
        Io(err: io::Error) {
            description("I/O error")
            display("I/O error: {}", err)
            from()
        }
        /// The endpoint reached end-of-stream.
        Eof {
            description("end of stream")
        }
        /// `httparse` rejected the request line or headers.
        ParseError(err: httparse::Error) {
            description("parse error")
            display("parse error: {:?}", err)
            from()
        }
        /// A chunk-size line in a chunked request body was malformed.
        ChunkParseError(err: httparse::InvalidChunkSize) {
            description("chunk size parse error")
            from()
        }
        /// The request-target could not be parsed into any recognized form.
        BadRequestTarget {
            description("error parsing request target")
        }
        /// The `Host` header (or absence of it) is invalid for the version.
        HostInvalid {
            description("invalid host header")
        }
        /// More than one `Host` header was present.
        DuplicateHost {
            description("duplicate host header")
        }
        /// The `Connection` header could not be interpreted.
        ConnectionInvalid {
            description("invalid connection header")
        }
        /// `Content-Length` was present but not a valid, non-negative integer.
        ContentLengthInvalid {
            description("invalid content-length header")
        }
        /// A duplicate, conflicting `Content-Length` header was present.
        DuplicateContentLength {
            description("duplicate content length header")
        }
        /// An HTTP version other than 0.9, 1.0 or 1.1 was requested.
        UnsupportedVersion {
            description("unsupported HTTP version")
        }
        /// A request body declared by `Content-Length` exceeds the limit
        /// the codec gave `RecvMode::buffered_upfront`.
        RequestBodyTooLong {
            description("request body longer than the codec allows")
        }
        /// An `Upgrade: websocket` request was missing or carried an
        /// invalid `Sec-WebSocket-Key`/`Sec-WebSocket-Version`.
        WebsocketHandshakeInvalid {
            description("invalid websocket handshake")
        }
        /// The generator or write flow was driven out of the sequence its
        /// contract allows (e.g. `NeedHeader` on a `ContentWrite`). Always a
        /// defect in this crate or in the `Codec` implementation, never in
        /// untrusted input.
        UnexpectedState {
            description("protocol driver reached an unexpected state")
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(e) => e,
            Error::Eof => io::Error::new(io::ErrorKind::UnexpectedEof, "eof"),
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}
