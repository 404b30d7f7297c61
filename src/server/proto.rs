//! The connection driver: reads pipelined requests off the wire, dispatches
//! each to a `Codec`, and writes responses back out in request order.
use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use futures::{Future, Async, Poll};
use tk_bufstream::{IoBuf, ReadBuf, WriteBuf};
use tokio_io::{AsyncRead, AsyncWrite};

use super::{Config, Dispatcher, Codec};
use super::error::Error;
use super::headers::{self, Head, BodyKind};
use super::encoder::{self, get_inner, ResponseConfig};
use super::recv_mode::{get_mode, Mode};
use super::body_parser::BodyProgress;

/// A request whose headers have been fully parsed, handed to a `Codec`,
/// and whose body (if any) has been fully received -- it's now just
/// waiting its turn to write a response.
struct Queued<C> {
    codec: C,
    response_config: ResponseConfig,
    /// Write `100 Continue` ahead of the real response: the request
    /// arrived with `Expect: 100-continue` and wasn't hijacked.
    send_continue: bool,
    /// This request's `recv_mode()` was `Hijack`: once the response is
    /// written, hand the raw connection over instead of going back to
    /// idle.
    hijack: bool,
}

enum Reading<S, D: Dispatcher<S>> {
    /// No request in flight for this half; `io` accumulates bytes for the
    /// next request line and headers.
    Headers(ReadBuf<S>),
    /// Headers have been dispatched; reading the body.
    Body {
        io: ReadBuf<S>,
        codec: D::Codec,
        mode: Mode,
        progress: BodyProgress,
        response_config: ResponseConfig,
        send_continue: bool,
    },
    /// The request that was just pushed onto `waiting` hijacks the
    /// connection once its response is written. Further input belongs to
    /// whatever protocol the response upgrades to, so reading stops here
    /// until the write half reaches the hijack point.
    AwaitingHijack(ReadBuf<S>),
    /// The request that was just pushed onto `waiting` answered via
    /// `RecvMode::no_body()` without its (possibly nonexistent) body ever
    /// being read. Its response forces the connection closed whenever
    /// there was a body to abandon, so there's no next request boundary
    /// to find here; further input is simply left unparsed.
    Draining(ReadBuf<S>),
    Void,
}

enum Writing<S, D: Dispatcher<S>> {
    Idle(WriteBuf<S>),
    Write(<D::Codec as Codec<S>>::ResponseFuture, D::Codec, bool /* hijack */),
    /// The connection has been handed off to a codec's `hijack()`; there's
    /// nothing left for this driver to do.
    Hijacked,
    Void,
}

/// Drives a single HTTP/1.x connection: incremental request parsing,
/// response generation, and the handoff between the two that keep-alive
/// and pipelining require.
pub struct Proto<S, D: Dispatcher<S>> {
    dispatcher: D,
    reading: Reading<S, D>,
    waiting: VecDeque<Queued<D::Codec>>,
    writing: Writing<S, D>,
    config: Arc<Config>,
}

impl<S, D: Dispatcher<S>> Proto<S, D> {
    /// Start driving a freshly accepted connection.
    pub fn new(conn: S, config: &Arc<Config>, dispatcher: D) -> Proto<S, D> {
        let (cout, cin) = IoBuf::new(conn).split();
        Proto {
            dispatcher: dispatcher,
            reading: Reading::Headers(cin),
            waiting: VecDeque::with_capacity(config.inflight_request_prealloc),
            writing: Writing::Idle(cout),
            config: config.clone(),
        }
    }
}

fn new_progress(head: &Head, mode: Mode) -> Result<BodyProgress, Error> {
    match (head.body_kind(), mode) {
        (BodyKind::Fixed(n), Mode::BufferedUpfront(max)) if n > max as u64 => {
            Err(Error::RequestBodyTooLong)
        }
        (BodyKind::Fixed(n), _) => Ok(BodyProgress::Fixed(n as usize)),
        (BodyKind::Chunked, _) => Ok(BodyProgress::Chunked(::chunked::State::new())),
    }
}

impl<S: AsyncRead + AsyncWrite, D: Dispatcher<S>> Proto<S, D> {
    fn poll_headers(&mut self, mut io: ReadBuf<S>) -> Result<bool, Error> {
        let got = io.read().map_err(Error::Io)?;
        match headers::parse(&io.in_buf[..])? {
            None => {
                if got == 0 && io.done() {
                    return Err(Error::Eof);
                }
                self.reading = Reading::Headers(io);
                Ok(got != 0)
            }
            Some((bytes, head)) => {
                io.in_buf.consume(bytes);
                let mut response_config = ResponseConfig::from(&head);
                let send_continue = head.expect_continue()
                    && head.body_kind() != BodyKind::Fixed(0);
                let mut codec = self.dispatcher.headers_received(&head)?;
                let mode = get_mode(&codec.recv_mode());
                if let Mode::Hijack = mode {
                    self.waiting.push_back(Queued {
                        codec: codec,
                        response_config: response_config,
                        send_continue: false,
                        hijack: true,
                    });
                    self.reading = Reading::AwaitingHijack(io);
                    return Ok(true);
                }
                if let Mode::NoBody = mode {
                    // The codec chose to answer without ever reading the
                    // body: no `100 Continue` is sent (there's no reason
                    // for the client to send a body it answered without
                    // looking at), and if the request declared one, the
                    // connection can't be trusted to resume at the next
                    // request's boundary, so it's forced closed -- this is
                    // this crate's realization of "mark the generator
                    // non-persistent at the first send that carries
                    // response info while a 100-continue is still owed".
                    if head.body_kind() != BodyKind::Fixed(0) {
                        response_config.do_close = true;
                    }
                    self.waiting.push_back(Queued {
                        codec: codec,
                        response_config: response_config,
                        send_continue: false,
                        hijack: false,
                    });
                    self.reading = Reading::Draining(io);
                    return Ok(true);
                }
                let progress = new_progress(&head, mode)?;
                self.reading = Reading::Body {
                    io: io,
                    codec: codec,
                    mode: mode,
                    progress: progress,
                    response_config: response_config,
                    send_continue: send_continue,
                };
                Ok(true)
            }
        }
    }

    fn poll_body(&mut self, mut io: ReadBuf<S>, mut codec: D::Codec,
        mode: Mode, mut progress: BodyProgress,
        response_config: ResponseConfig, send_continue: bool)
        -> Result<bool, Error>
    {
        let mut made_progress = false;
        loop {
            progress.parse(&mut io).map_err(Error::from)?;
            let (bytes, done) = progress.check_buf(&io);
            let op = if done {
                Some(codec.data_received(&io.in_buf[..bytes], true)?)
            } else if let Mode::Progressive(hint) = mode {
                if bytes >= hint {
                    Some(codec.data_received(&io.in_buf[..bytes], false)?)
                } else {
                    None
                }
            } else {
                None
            };
            match op {
                Some(Async::Ready(consumed)) => {
                    progress.consume(&mut io, consumed);
                    made_progress = true;
                    if done && consumed == bytes {
                        self.waiting.push_back(Queued {
                            codec: codec,
                            response_config: response_config,
                            send_continue: send_continue,
                            hijack: false,
                        });
                        self.reading = Reading::Headers(io);
                        return Ok(true);
                    }
                }
                Some(Async::NotReady) => {
                    if let Mode::Progressive(hint) = mode {
                        if bytes >= hint {
                            self.reading = Reading::Body {
                                io: io, codec: codec, mode: mode,
                                progress: progress,
                                response_config: response_config,
                                send_continue: send_continue,
                            };
                            return Ok(made_progress);
                        }
                    }
                }
                None => {}
            }
            if io.read().map_err(Error::Io)? == 0 {
                if io.done() {
                    return Err(Error::Eof);
                }
                self.reading = Reading::Body {
                    io: io, codec: codec, mode: mode, progress: progress,
                    response_config: response_config,
                    send_continue: send_continue,
                };
                return Ok(made_progress);
            }
            made_progress = true;
        }
    }

    fn poll_reading(&mut self) -> Result<bool, Error> {
        if self.waiting.len() >= self.config.inflight_request_limit {
            if let Reading::Headers(_) = self.reading {
                return Ok(false);
            }
        }
        match mem::replace(&mut self.reading, Reading::Void) {
            Reading::Headers(io) => self.poll_headers(io),
            Reading::Body { io, codec, mode, progress, response_config, send_continue } => {
                self.poll_body(io, codec, mode, progress, response_config, send_continue)
            }
            Reading::AwaitingHijack(io) => {
                self.reading = Reading::AwaitingHijack(io);
                Ok(false)
            }
            Reading::Draining(io) => {
                self.reading = Reading::Draining(io);
                Ok(false)
            }
            Reading::Void => unreachable!(),
        }
    }

    fn poll_writing(&mut self) -> Result<bool, Error> {
        let mut progress = false;
        self.writing = match mem::replace(&mut self.writing, Writing::Void) {
            Writing::Idle(mut io) => {
                io.flush().map_err(Error::Io)?;
                match self.waiting.pop_front() {
                    Some(Queued { mut codec, response_config, send_continue, hijack }) => {
                        let mut enc = encoder::new(io, response_config);
                        if send_continue {
                            enc.response_continue();
                        }
                        let fut = codec.start_response(enc);
                        progress = true;
                        Writing::Write(fut, codec, hijack)
                    }
                    None => Writing::Idle(io),
                }
            }
            Writing::Write(mut fut, mut codec, hijack) => match fut.poll()? {
                Async::Ready(done) => {
                    progress = true;
                    let mut io = get_inner(done);
                    if hijack {
                        match mem::replace(&mut self.reading, Reading::Void) {
                            Reading::AwaitingHijack(read_buf) => {
                                codec.hijack(io, read_buf);
                            }
                            other => {
                                // The read half never reached
                                // `AwaitingHijack` (e.g. the connection
                                // was already spent); nothing to hand
                                // over but the write half is still done.
                                self.reading = other;
                            }
                        }
                        Writing::Hijacked
                    } else {
                        io.flush().map_err(Error::Io)?;
                        Writing::Idle(io)
                    }
                }
                Async::NotReady => Writing::Write(fut, codec, hijack),
            },
            Writing::Hijacked => Writing::Hijacked,
            Writing::Void => unreachable!(),
        };
        Ok(progress)
    }
}

impl<S: AsyncRead + AsyncWrite, D: Dispatcher<S>> Future for Proto<S, D> {
    type Item = ();
    type Error = Error;

    fn poll(&mut self) -> Poll<(), Error> {
        if let Writing::Hijacked = self.writing {
            return Ok(Async::Ready(()));
        }
        self.poll_writing()?;
        if let Writing::Hijacked = self.writing {
            return Ok(Async::Ready(()));
        }
        while self.poll_reading()? {
            self.poll_writing()?;
            if let Writing::Hijacked = self.writing {
                return Ok(Async::Ready(()));
            }
        }
        Ok(Async::NotReady)
    }
}
