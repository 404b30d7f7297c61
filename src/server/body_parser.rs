//! Tracking how much of a request body remains to be read.
//!
//! Unlike a response body, a request body always has a definite length --
//! either `Content-Length` or `Transfer-Encoding: chunked` -- so unlike the
//! equivalent client-side type this has no `Eof` variant.
use httparse::InvalidChunkSize;
use tk_bufstream::ReadBuf;

use chunked;

#[derive(Debug, Clone)]
pub enum BodyProgress {
    /// Bytes left to read for a `Content-Length` body.
    Fixed(usize),
    Chunked(chunked::State),
}

impl BodyProgress {
    /// Number of usable bytes currently buffered, and whether that's the
    /// entire remaining body.
    pub fn check_buf<S>(&self, io: &ReadBuf<S>) -> (usize, bool) {
        use self::BodyProgress::*;
        match *self {
            Fixed(x) if x <= io.in_buf.len() => (x, true),
            Fixed(_) => (io.in_buf.len(), false),
            Chunked(ref s) => (s.buffered(), s.is_done()),
        }
    }
    pub fn parse<S>(&mut self, io: &mut ReadBuf<S>) -> Result<(), InvalidChunkSize> {
        use self::BodyProgress::*;
        match *self {
            Fixed(_) => {}
            Chunked(ref mut s) => s.parse(&mut io.in_buf)?,
        }
        Ok(())
    }
    pub fn consume<S>(&mut self, io: &mut ReadBuf<S>, n: usize) {
        use self::BodyProgress::*;
        io.in_buf.consume(n);
        match *self {
            Fixed(ref mut x) => {
                assert!(*x >= n);
                *x -= n;
            }
            Chunked(ref mut s) => s.consume(n),
        }
    }
}
