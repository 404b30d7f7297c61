//! Higher-level interface for serving fully buffered requests
//!
//! This builds a `Dispatcher`/`Codec` pair on top of the low-level protocol
//! so that an application can write `Fn(Request, Encoder<S>) -> impl Future`
//! instead of implementing the traits in `super` directly. Request bodies
//! are always buffered in full before the handler runs; streaming bodies
//! need the low-level interface.
use std::net::SocketAddr;
use std::marker::PhantomData;

use futures::{Async, Future, IntoFuture};
use futures::future::FutureResult;
use tokio_core::reactor::Handle;
use tokio_io::{AsyncRead, AsyncWrite};
use tk_bufstream::{ReadBuf, WriteBuf};

use super::{Error, Encoder, EncoderDone, Dispatcher, Codec, Head, RecvMode};
use super::WebsocketHandshake;
use Version;

/// A fully received, buffered request.
///
/// Some known headers may be moved to an upper structure (i.e. `Host`).
#[derive(Debug)]
pub struct Request {
    peer_addr: SocketAddr,
    method: String,
    path: String,
    host: Option<String>,
    version: Version,
    headers: Vec<(String, Vec<u8>)>,
    body: Vec<u8>,
    websocket_handshake: Option<WebsocketHandshake>,
}

pub struct BufferedDispatcher<S, N: NewService<S>> {
    addr: SocketAddr,
    max_request_length: usize,
    service: N,
    handle: Handle,
    phantom: PhantomData<S>,
}

pub struct BufferedCodec<S, R> {
    max_request_length: usize,
    service: R,
    request: Option<Request>,
    handle: Handle,
    phantom: PhantomData<S>,
}

pub struct WebsocketFactory<F, G> {
    service: F,
    websockets: G,
}

pub struct WebsocketService<F, G, T, U> {
    service: F,
    websockets: G,
    phantom: PhantomData<(T, U)>,
}

pub trait NewService<S> {
    type Future: Future<Item=EncoderDone<S>, Error=Error>;
    type Instance: Service<S, Future=Self::Future>;
    fn new(&self) -> Self::Instance;
}

/// Handles one buffered request, and optionally a websocket connection
/// that grew out of one.
///
/// `start_websocket` receives the raw, split halves of the connection once
/// the `101 Switching Protocols` response has been flushed: this crate
/// stops at the handshake and leaves actual frame parsing up to the
/// application or to a dedicated websocket crate layered on top.
pub trait Service<S> {
    type Future: Future<Item=EncoderDone<S>, Error=Error>;
    type WebsocketFuture: Future<Item=(), Error=()> + 'static;
    fn call(&mut self, request: Request, encoder: Encoder<S>) -> Self::Future;
    fn start_websocket(&mut self, output: WriteBuf<S>, input: ReadBuf<S>)
        -> Self::WebsocketFuture;
}

impl<F, G, H, I, T, U, S> NewService<S> for WebsocketFactory<F, G>
    where F: Fn() -> H,
          H: FnMut(Request, Encoder<S>) -> T,
          G: Fn() -> I,
          I: FnMut(WriteBuf<S>, ReadBuf<S>) -> U,
          T: Future<Item=EncoderDone<S>, Error=Error>,
          U: Future<Item=(), Error=()> + 'static,
{
    type Future = T;
    type Instance = WebsocketService<H, I, T, U>;
    fn new(&self) -> Self::Instance {
        WebsocketService {
            service: (self.service)(),
            websockets: (self.websockets)(),
            phantom: PhantomData,
        }
    }
}

impl<S, H, I, T, U> Service<S> for WebsocketService<H, I, T, U>
    where H: FnMut(Request, Encoder<S>) -> T,
          I: FnMut(WriteBuf<S>, ReadBuf<S>) -> U,
          T: Future<Item=EncoderDone<S>, Error=Error>,
          U: Future<Item=(), Error=()> + 'static,
{
    type Future = T;
    type WebsocketFuture = U;
    fn call(&mut self, request: Request, encoder: Encoder<S>) -> T {
        (self.service)(request, encoder)
    }
    fn start_websocket(&mut self, output: WriteBuf<S>, input: ReadBuf<S>) -> U {
        (self.websockets)(output, input)
    }
}

impl Request {
    /// Returns peer address that initiated HTTP connection
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
    /// Returns method of a request
    pub fn method(&self) -> &str {
        &self.method
    }
    /// Returns path of a request
    pub fn path(&self) -> &str {
        &self.path
    }
    /// Returns HTTP version used in request
    pub fn version(&self) -> Version {
        self.version
    }
    /// Returns request headers
    pub fn headers(&self) -> &[(String, Vec<u8>)] {
        &self.headers
    }
    /// Returns request body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
    /// Returns websocket handshake if exists
    pub fn websocket_handshake(&self) -> Option<&WebsocketHandshake> {
        self.websocket_handshake.as_ref()
    }
}

impl<S, T, R> NewService<S> for T
    where T: Fn() -> R,
          R: Service<S>,
{
    type Future = R::Future;
    type Instance = R;
    fn new(&self) -> R {
        (self)()
    }
}

impl<S, T, F> Service<S> for T
    where T: Fn(Request, Encoder<S>) -> F,
        F: Future<Item=EncoderDone<S>, Error=Error>,
{
    type Future = F;
    type WebsocketFuture = FutureResult<(), ()>;
    fn call(&mut self, request: Request, encoder: Encoder<S>) -> F
    {
        (self)(request, encoder)
    }
    fn start_websocket(&mut self, _output: WriteBuf<S>, _input: ReadBuf<S>)
        -> Self::WebsocketFuture
    {
        // No websocket handler was supplied: the plain-function `Service`
        // impl never opts into `Hijack`, so this is never actually called.
        Ok(()).into_future()
    }
}


impl<S, N: NewService<S>> BufferedDispatcher<S, N> {
    pub fn new(addr: SocketAddr, handle: &Handle, service: N)
        -> BufferedDispatcher<S, N>
    {
        BufferedDispatcher {
            addr: addr,
            max_request_length: 10_485_760,
            service: service,
            handle: handle.clone(),
            phantom: PhantomData,
        }
    }
    pub fn max_request_length(&mut self, value: usize) -> &mut Self {
        self.max_request_length = value;
        self
    }
}

impl<S, F, G, H, I, T, U> BufferedDispatcher<S, WebsocketFactory<F, G>>
    where F: Fn() -> H,
          H: FnMut(Request, Encoder<S>) -> T,
          G: Fn() -> I,
          I: FnMut(WriteBuf<S>, ReadBuf<S>) -> U,
          T: Future<Item=EncoderDone<S>, Error=Error>,
          U: Future<Item=(), Error=()> + 'static,
{
    pub fn new_with_websockets(addr: SocketAddr, handle: &Handle,
        http: F, websockets: G)
        -> BufferedDispatcher<S, WebsocketFactory<F, G>>
    {
        BufferedDispatcher {
            addr: addr,
            max_request_length: 10_485_760,
            service: WebsocketFactory {
                service: http,
                websockets: websockets,
            },
            handle: handle.clone(),
            phantom: PhantomData,
        }
    }
}

impl<S, N: NewService<S>> Dispatcher<S> for BufferedDispatcher<S, N>
    where N::Instance: 'static
{
    type Codec = BufferedCodec<S, N::Instance>;

    fn headers_received(&mut self, headers: &Head)
        -> Result<Self::Codec, Error>
    {
        // TODO(tailhook) strip hop-by-hop headers
        let up = headers.get_websocket_upgrade()
            .map_err(|()| Error::WebsocketHandshakeInvalid)?;
        Ok(BufferedCodec {
            max_request_length: self.max_request_length,
            service: self.service.new(),
            request: Some(Request {
                peer_addr: self.addr,
                method: headers.method().to_string(),
                path: headers.path().to_string(),
                host: headers.host().map(|x| x.to_string()),
                version: headers.version(),
                headers: headers.headers().iter().map(|&(ref name, ref value)| {
                    (name.clone(), value.clone())
                }).collect(),
                body: Vec::new(),
                websocket_handshake: up,
            }),
            handle: self.handle.clone(),
            phantom: PhantomData,
        })
    }
}

impl<S: AsyncRead + AsyncWrite + 'static, R: Service<S> + 'static> Codec<S>
    for BufferedCodec<S, R>
{
    type ResponseFuture = R::Future;
    fn recv_mode(&mut self) -> RecvMode {
        if self.request.as_ref().unwrap().websocket_handshake.is_some() {
            RecvMode::hijack()
        } else {
            RecvMode::buffered_upfront(self.max_request_length)
        }
    }
    fn data_received(&mut self, data: &[u8], end: bool)
        -> Result<Async<usize>, Error>
    {
        assert!(end);
        self.request.as_mut().unwrap().body = data.to_vec();
        Ok(Async::Ready(data.len()))
    }
    fn start_response(&mut self, e: Encoder<S>) -> R::Future {
        self.service.call(self.request.take().unwrap(), e)
    }
    fn hijack(&mut self, write_buf: WriteBuf<S>, read_buf: ReadBuf<S>) {
        self.handle.spawn(self.service.start_websocket(write_buf, read_buf));
    }
}
