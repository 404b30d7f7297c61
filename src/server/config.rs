use std::sync::Arc;
use std::time::Duration;

use server::{Config};

impl Config {
    /// Create a config with defaults
    pub fn new() -> Config {
        Config {
            inflight_request_limit: 2,
            inflight_request_prealloc: 0,
            first_byte_timeout: Duration::from_secs(30),
            keep_alive_timeout: Duration::from_secs(90),
            headers_timeout: Duration::from_secs(10),
            input_body_byte_timeout: Duration::from_secs(15),
            input_body_whole_timeout: Duration::from_secs(300),
            output_body_byte_timeout: Duration::from_secs(15),
            output_body_whole_timeout: Duration::from_secs(300),
        }
    }
    /// A number of inflight requests until we stop reading more requests
    pub fn inflight_request_limit(&mut self, value: usize) -> &mut Self {
        self.inflight_request_limit = value;
        self
    }
    /// Size of the queue that is preallocated for holding requests
    ///
    /// Should be smaller than `inflight_request_limit`.
    pub fn inflight_request_prealoc(&mut self, value: usize) -> &mut Self {
        self.inflight_request_prealloc = value;
        self
    }
    /// How long to wait for the first byte of a request on an otherwise
    /// idle connection before dropping it.
    pub fn first_byte_timeout(&mut self, value: Duration) -> &mut Self {
        self.first_byte_timeout = value;
        self
    }
    /// How long an idle, persistent connection may sit between requests.
    pub fn keep_alive_timeout(&mut self, value: Duration) -> &mut Self {
        self.keep_alive_timeout = value;
        self
    }
    /// How long a request's headers may take to arrive once its first byte
    /// has been seen.
    pub fn headers_timeout(&mut self, value: Duration) -> &mut Self {
        self.headers_timeout = value;
        self
    }
    /// Maximum gap between two successive reads while a request body is
    /// being received.
    pub fn input_body_byte_timeout(&mut self, value: Duration) -> &mut Self {
        self.input_body_byte_timeout = value;
        self
    }
    /// Maximum total time to receive a whole request body.
    pub fn input_body_whole_timeout(&mut self, value: Duration) -> &mut Self {
        self.input_body_whole_timeout = value;
        self
    }
    /// Maximum gap between two successive writes while a response body is
    /// being sent.
    pub fn output_body_byte_timeout(&mut self, value: Duration) -> &mut Self {
        self.output_body_byte_timeout = value;
        self
    }
    /// Maximum total time to send a whole response body.
    pub fn output_body_whole_timeout(&mut self, value: Duration) -> &mut Self {
        self.output_body_whole_timeout = value;
        self
    }
    /// Create a Arc'd config clone to pass to the constructor
    ///
    /// This is just a convenience method.
    pub fn done(&mut self) -> Arc<Config> {
        Arc::new(self.clone())
    }
}
