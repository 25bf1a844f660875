//! Byte-stream view of the query channel.
//!
//! Agent protocol clients expect a connection they can write a request to
//! and read the reply from. [`AgentStream`] provides that over Pageant's
//! one-shot exchange:
//! - `write(request)` runs one full query and queues the whole response
//! - `read(buf)` drains queued bytes in FIFO order
//! - `read` on an empty queue returns `Ok(0)` immediately
//!
//! At most one exchange per stream is in flight: a second writer waits for
//! the first round-trip to finish. Reads only take the buffer lock, so they
//! are never held up by a round-trip.
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//! use pageant_client::transport::LoopbackHost;
//! use pageant_client::AgentStream;
//!
//! let mut stream = AgentStream::new(LoopbackHost::echo());
//! stream.write_all(&[1, 2, 3]).unwrap();
//!
//! let mut reply = Vec::new();
//! stream.read_to_end(&mut reply).unwrap();
//! assert_eq!(reply, [1, 2, 3]);
//! ```

use std::io::{self, Read, Write};
use std::sync::Mutex;

use bytes::{Buf, BytesMut};

use crate::channel::QueryChannel;
use crate::protocol::MAX_FRAME_SIZE;
use crate::sync::lock;
use crate::transport::Backend;

/// `Read`/`Write` adapter over a [`QueryChannel`].
#[derive(Debug)]
pub struct AgentStream<B> {
    channel: QueryChannel<B>,
    /// Held for the whole write, round-trip included.
    exchange: Mutex<()>,
    /// Responses waiting to be read.
    buffer: Mutex<BytesMut>,
}

impl<B: Backend> AgentStream<B> {
    /// Stream over a channel to the default `"Pageant"` window.
    pub fn new(backend: B) -> Self {
        Self::from_channel(QueryChannel::new(backend))
    }

    /// Stream over an existing channel.
    pub fn from_channel(channel: QueryChannel<B>) -> Self {
        Self {
            channel,
            exchange: Mutex::new(()),
            buffer: Mutex::new(BytesMut::with_capacity(MAX_FRAME_SIZE)),
        }
    }

    /// The underlying channel.
    pub fn channel(&self) -> &QueryChannel<B> {
        &self.channel
    }

    /// Number of response bytes not yet read.
    pub fn pending(&self) -> usize {
        lock(&self.buffer).len()
    }

    /// Run one query and queue its response.
    ///
    /// Returns `request.len()`: the count of bytes accepted, not the size of
    /// the response. On error nothing is queued.
    pub fn send(&self, request: &[u8]) -> crate::Result<usize> {
        let _exchange = lock(&self.exchange);

        let response = self.channel.query(request)?;
        lock(&self.buffer).extend_from_slice(&response);
        Ok(request.len())
    }

    /// Copy queued response bytes into `buf`. Returns 0 when nothing is queued.
    pub fn recv(&self, buf: &mut [u8]) -> usize {
        let mut buffer = lock(&self.buffer);

        let n = buf.len().min(buffer.len());
        buf[..n].copy_from_slice(&buffer[..n]);
        buffer.advance(n);
        n
    }
}

impl<B: Backend> Write for &AgentStream<B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.send(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<B: Backend> Read for &AgentStream<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.recv(buf))
    }
}

impl<B: Backend> Write for AgentStream<B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<B: Backend> Read for AgentStream<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}
