use futures::{Async, Future};

use tk_bufstream::{ReadBuf, WriteBuf};

use super::{Error, Encoder, EncoderDone};
use super::headers::Head;
use super::recv_mode::RecvMode;

/// The low-level interface to the connection driver: it decides, for each
/// request, which `Codec` will receive its body and produce its response.
///
/// Dispatch/routing beyond that one decision is out of scope for this
/// crate; a real application typically stores a router or service handle
/// on the `Dispatcher` and has `headers_received` look up a handler.
pub trait Dispatcher<S> {
    type Codec: Codec<S>;

    /// Headers of a request have been fully parsed.
    ///
    /// At this point everything needed to police protocol correctness has
    /// already been extracted. Anything else you need from the headers
    /// must be captured here (for example by storing it on the returned
    /// codec).
    fn headers_received(&mut self, head: &Head) -> Result<Self::Codec, Error>;
}

/// Per-request behavior: how to receive the body and how to produce the
/// response. One `Codec` instance is created per request by `Dispatcher`.
pub trait Codec<S> {
    /// Future resolved once the response has been fully written.
    type ResponseFuture: Future<Item = EncoderDone<S>, Error = Error>;

    /// Returns the mode used to receive the request body. Called once,
    /// immediately after `headers_received`.
    fn recv_mode(&mut self) -> RecvMode;

    /// A chunk of the request body has arrived. `end` is `true` for the
    /// final chunk (including a final empty chunk for zero-length bodies).
    ///
    /// Returns the number of bytes consumed. If fewer than `data.len()`
    /// bytes are consumed, the remainder is presented again on the next
    /// call once more data (or the same data, if `end`) is available.
    ///
    /// Never called when `recv_mode()` returned `RecvMode::hijack()`.
    fn data_received(&mut self, data: &[u8], end: bool) -> Result<Async<usize>, Error>;

    /// All preceding responses on this connection have either been sent or
    /// are themselves buffered for send: start writing this one.
    ///
    /// May be called before `data_received` reports `end`, but never
    /// before `headers_received`.
    fn start_response(&mut self, e: Encoder<S>) -> Self::ResponseFuture;

    /// Called once `recv_mode()` returned `RecvMode::hijack()` and the
    /// response's status line (e.g. `101 Switching Protocols`) has been
    /// flushed: the connection driver relinquishes both halves of the
    /// split socket to this callback and forgets about the connection
    /// entirely — no `ResponseFuture` is awaited for it.
    ///
    /// Default codecs never opt into `RecvMode::hijack()`, so they never
    /// reach this; codecs that do must override it.
    #[allow(unused_variables)]
    fn hijack(&mut self, write_buf: WriteBuf<S>, read_buf: ReadBuf<S>) {
        panic!("hijack() not implemented for a codec that requested RecvMode::hijack()")
    }
}
