//! Client Connection
//!
//! Owns the TCP stream to one cache server.
//!
//! Requests and replies go through [`Connection::exchange`]. A failed
//! exchange leaves the stream at an unknown position (a late reply may still
//! arrive), so the connection is poisoned and refuses every later exchange.

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{CacheError, Result};

/// A blocking connection to a single server
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Peer address for logging
    peer_addr: String,

    /// Set once an exchange failed part-way
    poisoned: bool,
}

impl Connection {
    /// Connect to `addr` (`host:port`)
    ///
    /// Every resolved address is tried in turn. A non-zero `timeout_ms`
    /// bounds the connect attempt and every later read and write.
    pub fn connect(addr: &str, timeout_ms: u64) -> Result<Self> {
        let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        let candidates = addr
            .to_socket_addrs()
            .map_err(|e| CacheError::Transport(format!("resolving {}: {}", addr, e)))?;

        let mut last_err = None;
        for candidate in candidates {
            let attempt = match timeout {
                Some(t) => TcpStream::connect_timeout(&candidate, t),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    let mut conn = Self::from_stream(stream)?;
                    conn.set_timeouts(timeout_ms, timeout_ms)?;
                    tracing::debug!("Connected to {}", conn.peer_addr);
                    return Ok(conn);
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", candidate, e);
                    last_err = Some(e);
                }
            }
        }

        Err(CacheError::Transport(match last_err {
            Some(e) => format!("connecting to {}: {}", addr, e),
            None => format!("connecting to {}: no addresses resolved", addr),
        }))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            peer_addr,
            poisoned: false,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Send one request and read its reply with `read`
    ///
    /// Any error poisons the connection: the socket is shut down and later
    /// calls fail without touching the stream.
    pub fn exchange<T, F>(&mut self, bytes: &[u8], read: F) -> Result<T>
    where
        F: FnOnce(&mut BufReader<TcpStream>) -> Result<T>,
    {
        if self.poisoned {
            return Err(CacheError::Transport(format!(
                "connection to {} is unusable after an earlier failure",
                self.peer_addr
            )));
        }

        let result = self.send(bytes).and_then(|()| read(&mut self.reader));
        if let Err(e) = &result {
            tracing::debug!("Dropping connection to {}: {}", self.peer_addr, e);
            self.poisoned = true;
            let _ = self.writer.get_ref().shutdown(Shutdown::Both);
        }
        result
    }

    /// Whether an earlier exchange failed
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        tracing::trace!("Sending {} bytes to {}", bytes.len(), self.peer_addr);
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
