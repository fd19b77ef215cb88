use std::net::SocketAddr;

use bytes::Bytes;

use super::Direction;

/// A completed request/response pair with fully buffered bodies, as handed
/// over by a capture source.
#[derive(Debug)]
pub struct Exchange {
    pub request: http::Request<Bytes>,
    pub response: http::Response<Bytes>,
    pub direction: Direction,
    /// Peer address of the connection, used when no host header is present.
    pub remote_addr: Option<SocketAddr>,
}

impl Exchange {
    pub fn new(
        request: http::Request<Bytes>,
        response: http::Response<Bytes>,
        direction: Direction,
    ) -> Self {
        Self {
            request,
            response,
            direction,
            remote_addr: None,
        }
    }

    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }
}
