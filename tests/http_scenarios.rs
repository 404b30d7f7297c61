//! End-to-end scenarios driven against a `tk_bufstream::MockData` transport,
//! covering the handful of request/response shapes that a real server
//! needs to get right: simple responses, persistence decisions across
//! both HTTP versions, pipelining order, the 100-continue handshake, and
//! the upgrade/hijack handoff.
extern crate futures;
extern crate minihttp;
extern crate tk_bufstream;

use std::sync::Arc;
use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{ok, FutureResult};
use futures::{Async};
use tk_bufstream::{MockData, ReadBuf, WriteBuf};

use minihttp::server::{Proto, Config, Dispatcher, Codec};
use minihttp::server::{Head, RecvMode, Error, Encoder, EncoderDone};
use minihttp::Status;

fn config() -> Arc<Config> {
    Config::new().done()
}

/// A codec that always answers with a fixed status/body, echoing whether
/// the request arrived with `Expect: 100-continue`.
struct FixedCodec {
    status: Status,
    body: &'static [u8],
    close: Option<bool>,
}

struct FixedDisp {
    status: Status,
    body: &'static [u8],
    /// Force the response's `Connection` header explicitly, independent
    /// of what persistence the request computed -- only used by the
    /// HEAD-response test, which otherwise behaves identically to GET.
    close: Option<bool>,
}

impl Dispatcher<MockData> for FixedDisp {
    type Codec = FixedCodec;
    fn headers_received(&mut self, _head: &Head) -> Result<FixedCodec, Error> {
        Ok(FixedCodec { status: self.status.clone(), body: self.body, close: self.close })
    }
}

impl Codec<MockData> for FixedCodec {
    type ResponseFuture = FutureResult<EncoderDone<MockData>, Error>;
    fn recv_mode(&mut self) -> RecvMode {
        RecvMode::buffered_upfront(1024)
    }
    fn data_received(&mut self, data: &[u8], end: bool)
        -> Result<Async<usize>, Error>
    {
        assert!(end);
        Ok(Async::Ready(data.len()))
    }
    fn start_response(&mut self, mut e: Encoder<MockData>) -> Self::ResponseFuture {
        e.status(self.status.clone());
        e.add_length(self.body.len() as u64).unwrap();
        if let Some(close) = self.close {
            e.add_header("Connection",
                if close { &b"close"[..] } else { &b"keep-alive"[..] }).unwrap();
        }
        e.done_headers().unwrap();
        e.write_body(self.body);
        ok(e.done())
    }
}

fn run_to_output(mock: &MockData, proto: &mut Proto<MockData, FixedDisp>) -> String {
    for _ in 0..8 {
        proto.poll().unwrap();
    }
    String::from_utf8_lossy(&mock.output(..)).to_string()
}

#[test]
fn simple_get_http11_stays_open() {
    let mock = MockData::new();
    let mut proto = Proto::new(mock.clone(), &config(),
        FixedDisp { status: Status::Ok, body: b"hi", close: None });
    mock.add_input("GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    let out = run_to_output(&mock, &mut proto);
    assert_eq!(out, "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
    // A persistent connection's future is not resolved/closed by one
    // request/response round trip.
    assert!(!proto.poll().unwrap().is_ready());
}

#[test]
fn http10_with_keep_alive_is_persistent() {
    let mock = MockData::new();
    let mut proto = Proto::new(mock.clone(), &config(),
        FixedDisp { status: Status::Ok, body: b"hi", close: None });
    mock.add_input("GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n");
    let out = run_to_output(&mock, &mut proto);
    assert!(out.contains("Connection: keep-alive"),
        "expected keep-alive header in {:?}", out);
}

#[test]
fn http10_without_keep_alive_closes() {
    let mock = MockData::new();
    let mut proto = Proto::new(mock.clone(), &config(),
        FixedDisp { status: Status::Ok, body: b"hi", close: None });
    mock.add_input("GET / HTTP/1.0\r\n\r\n");
    let out = run_to_output(&mock, &mut proto);
    assert!(!out.contains("keep-alive"),
        "HTTP/1.0 without an explicit keep-alive must not claim persistence: {:?}",
        out);
}

#[test]
fn http11_explicit_close() {
    let mock = MockData::new();
    let mut proto = Proto::new(mock.clone(), &config(),
        FixedDisp { status: Status::Ok, body: b"hi", close: None });
    mock.add_input("GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
    let out = run_to_output(&mock, &mut proto);
    assert!(out.contains("Connection: close\r\n"),
        "expected explicit close header in {:?}", out);
}

#[test]
fn head_request_gets_headers_but_no_body() {
    let mock = MockData::new();
    let mut proto = Proto::new(mock.clone(), &config(),
        FixedDisp { status: Status::Ok, body: b"hello world", close: None });
    mock.add_input("HEAD / HTTP/1.1\r\nHost: x\r\n\r\n");
    let out = run_to_output(&mock, &mut proto);
    assert_eq!(out, "HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\n");
}

/// Two pipelined GETs arriving in a single read must produce exactly two
/// responses, in request order, with no bytes misattributed between them.
#[test]
fn pipelined_requests_answered_in_order() {
    let mock = MockData::new();
    let mut proto = Proto::new(mock.clone(), &config(),
        FixedDisp { status: Status::Ok, body: b"hi", close: None });
    mock.add_input(concat!(
        "GET /one HTTP/1.1\r\nHost: x\r\n\r\n",
        "GET /two HTTP/1.1\r\nHost: x\r\n\r\n"));
    let out = run_to_output(&mock, &mut proto);
    let expected = concat!(
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi",
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
    assert_eq!(out, expected);
}

/// A request carrying `Expect: 100-continue` only gets its interim status
/// line once the handler actually starts writing a response -- which in
/// this driver only happens once the whole declared body has arrived, so
/// feeding headers alone makes no progress until the body follows.
#[test]
fn continue_then_final_response() {
    let mock = MockData::new();
    let mut proto = Proto::new(mock.clone(), &config(),
        FixedDisp { status: Status::Ok, body: b"ok", close: None });
    mock.add_input(
        "POST / HTTP/1.1\r\nHost: x\r\nExpect: 100-continue\r\n\
         Content-Length: 4\r\n\r\n");
    for _ in 0..4 {
        proto.poll().unwrap();
    }
    assert_eq!(mock.output(..).len(), 0,
        "no response bytes before the body has arrived");
    mock.add_input("body");
    let out = run_to_output(&mock, &mut proto);
    assert_eq!(out, concat!(
        "HTTP/1.1 100 Continue\r\n\r\n",
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok"));
}

/// A handler that rejects an `Expect: 100-continue` request outright,
/// via `RecvMode::no_body()`, without ever reading the declared body: no
/// interim `100 Continue` is sent, and the response closes the connection
/// since the undelivered body can no longer be trusted to start the next
/// request.
struct RejectingCodec;
struct RejectingDisp;

impl Dispatcher<MockData> for RejectingDisp {
    type Codec = RejectingCodec;
    fn headers_received(&mut self, _head: &Head) -> Result<RejectingCodec, Error> {
        Ok(RejectingCodec)
    }
}

impl Codec<MockData> for RejectingCodec {
    type ResponseFuture = FutureResult<EncoderDone<MockData>, Error>;
    fn recv_mode(&mut self) -> RecvMode {
        RecvMode::no_body()
    }
    fn data_received(&mut self, _data: &[u8], _end: bool)
        -> Result<Async<usize>, Error>
    {
        unreachable!("data_received is never called for RecvMode::no_body()")
    }
    fn start_response(&mut self, mut e: Encoder<MockData>) -> Self::ResponseFuture {
        e.status(Status::ExpectationFailed);
        e.add_length(0).unwrap();
        e.done_headers().unwrap();
        ok(e.done())
    }
}

#[test]
fn reject_without_reading_expected_body() {
    let mock = MockData::new();
    let mut proto = Proto::new(mock.clone(), &config(), RejectingDisp);
    mock.add_input(
        "POST / HTTP/1.1\r\nHost: x\r\nExpect: 100-continue\r\n\
         Content-Length: 10\r\n\r\n");
    let mut out = String::new();
    for _ in 0..8 {
        proto.poll().unwrap();
        out = String::from_utf8_lossy(&mock.output(..)).to_string();
    }
    assert_eq!(out, concat!(
        "HTTP/1.1 417 Expectation Failed\r\n",
        "Content-Length: 0\r\n",
        "Connection: close\r\n\r\n"),
        "no 100 Continue, no wait for a body the handler never reads, \
         and the abandoned body forces the connection closed");
}

struct HijackDisp {
    hijacked: Rc<RefCell<bool>>,
}

struct HijackCodec {
    hijacked: Rc<RefCell<bool>>,
}

impl Dispatcher<MockData> for HijackDisp {
    type Codec = HijackCodec;
    fn headers_received(&mut self, _head: &Head) -> Result<HijackCodec, Error> {
        Ok(HijackCodec { hijacked: self.hijacked.clone() })
    }
}

impl Codec<MockData> for HijackCodec {
    type ResponseFuture = FutureResult<EncoderDone<MockData>, Error>;
    fn recv_mode(&mut self) -> RecvMode {
        RecvMode::hijack()
    }
    fn data_received(&mut self, _data: &[u8], _end: bool)
        -> Result<Async<usize>, Error>
    {
        unreachable!("data_received is never called for a hijacked request")
    }
    fn start_response(&mut self, mut e: Encoder<MockData>) -> Self::ResponseFuture {
        e.status(Status::SwitchingProtocol);
        e.add_header("Connection", "upgrade").unwrap();
        e.add_header("Upgrade", "example/1").unwrap();
        e.done_headers().unwrap();
        ok(e.done())
    }
    fn hijack(&mut self, _write_buf: WriteBuf<MockData>, _read_buf: ReadBuf<MockData>) {
        *self.hijacked.borrow_mut() = true;
    }
}

#[test]
fn upgrade_hands_off_the_connection() {
    let mock = MockData::new();
    let hijacked = Rc::new(RefCell::new(false));
    let mut proto = Proto::new(mock.clone(), &config(),
        HijackDisp { hijacked: hijacked.clone() });
    mock.add_input("GET / HTTP/1.1\r\nHost: x\r\nConnection: upgrade\r\n\
                     Upgrade: example/1\r\n\r\n");
    for _ in 0..8 {
        proto.poll().unwrap();
    }
    let out = String::from_utf8_lossy(&mock.output(..)).to_string();
    assert!(out.starts_with("HTTP/1.1 101 Switching Protocol"),
        "expected a 101 response, got {:?}", out);
    assert!(*hijacked.borrow(), "Codec::hijack was never called");
    // Once hijacked, the driver's future is done; it never touches the
    // connection again.
    assert!(proto.poll().unwrap().is_ready());
}
