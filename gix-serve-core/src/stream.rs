//! Adapters between a chunked RPC transport and blocking byte streams.
//!
//! A transport exchanges discrete chunks with [`ChunkSource::recv()`] and
//! [`ChunkSink::send()`], while a subprocess wants to read from and write to plain
//! [`Read`] and [`Write`] implementations. [`ChunkReader`] and [`ChunkWriter`] bridge
//! the two, one direction each. Neither is meant to be shared between threads; each is
//! driven by exactly one of them.

use std::io::{self, Read, Write};

use crate::CancellationToken;

/// The receiving half of a transport.
pub trait ChunkSource {
    /// Block until the next chunk arrives and return it, or `None` at the end of the stream.
    fn recv(&mut self) -> io::Result<Option<Vec<u8>>>;
}

impl<F> ChunkSource for F
where
    F: FnMut() -> io::Result<Option<Vec<u8>>>,
{
    fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        self()
    }
}

/// The sending half of a transport.
pub trait ChunkSink {
    /// Send `chunk` as one message, returning once the transport accepted it.
    fn send(&mut self, chunk: &[u8]) -> io::Result<()>;
}

impl<F> ChunkSink for F
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    fn send(&mut self, chunk: &[u8]) -> io::Result<()> {
        self(chunk)
    }
}

impl ChunkSink for Vec<u8> {
    fn send(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

impl ChunkSink for &mut Vec<u8> {
    fn send(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// A [`Read`] implementation pulling chunks from a [`ChunkSource`].
///
/// Reads never block on the transport while part of the current chunk is left. Empty
/// chunks are skipped as they would otherwise read like the end of the stream, and errors
/// of the transport are passed on as they are.
pub struct ChunkReader<S> {
    source: S,
    chunk: Vec<u8>,
    pos: usize,
    cancellation: Option<CancellationToken>,
    eof: bool,
}

impl<S: ChunkSource> ChunkReader<S> {
    /// Create a new reader over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            chunk: Vec::new(),
            pos: 0,
            cancellation: None,
            eof: false,
        }
    }

    /// Refuse to wait for more chunks once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Return the source.
    pub fn into_inner(self) -> S {
        self.source
    }

    fn fill(&mut self) -> io::Result<bool> {
        while self.pos >= self.chunk.len() {
            if self.eof {
                return Ok(false);
            }
            if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(io::Error::new(io::ErrorKind::Other, crate::Error::Cancelled));
            }
            match self.source.recv()? {
                Some(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                None => {
                    self.eof = true;
                    self.chunk.clear();
                    self.pos = 0;
                }
            }
        }
        Ok(true)
    }
}

impl<S: ChunkSource> Read for ChunkReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || !self.fill()? {
            return Ok(0);
        }
        let available = &self.chunk[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// A [`Write`] implementation sending every write as one chunk to a [`ChunkSink`].
///
/// After the first failed send, all further writes fail without reaching the sink.
pub struct ChunkWriter<S> {
    sink: S,
    failed: bool,
}

impl<S: ChunkSink> ChunkWriter<S> {
    /// Create a new writer over `sink`.
    pub fn new(sink: S) -> Self {
        Self { sink, failed: false }
    }

    /// Return the sink.
    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: ChunkSink> Write for ChunkWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "transport failed on an earlier send",
            ));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if let Err(err) = self.sink.send(buf) {
            self.failed = true;
            return Err(err);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
