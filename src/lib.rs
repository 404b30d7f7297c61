//! An HTTP/1.x connection driver for the `tokio` stack.
//!
//! This crate owns the hard part of serving HTTP/1.x: incremental request
//! parsing, response generation, buffer-lifecycle management across the
//! asynchronous I/O boundary, request-body back-pressure, and connection
//! persistence / pipelining / protocol-upgrade handoff. Routing, business
//! logic, TLS and WebSocket framing are left to the application and to other
//! layers wrapping the transport.
#![recursion_limit = "100"]

extern crate futures;
extern crate httparse;
extern crate tokio_core;
extern crate tokio_io;
extern crate tk_bufstream;
extern crate sha1;
#[macro_use(quick_error)] extern crate quick_error;
#[macro_use] extern crate matches;
#[macro_use] extern crate log;
#[cfg(feature = "date_header")] extern crate httpdate;

pub mod server;
mod enums;
mod base_serializer;
mod chunked;

pub use enums::{Version, Status, HttpStatus};
