//! Transport abstraction the driver and case runner read/write through.
//!
//! Grounded on the teacher's `src/socket.rs`, which wraps a
//! `rustls::ClientConnection` + `TcpStream` pair and pumps TLS records by
//! hand (`process()`, staged `read_buffer`). This module inverts that to
//! the server role (`rustls::ServerConnection`) and adds the one thing
//! the teacher's version doesn't need: a read deadline, since the
//! teacher's client spins with `thread::yield_now()` forever while this
//! harness must give up on a non-responding client rather than block
//! indefinitely on a peer that never reacts.
//!
//! `DeadlineSocket` is the trait the driver and every case routine code
//! against, rather than a concrete `TlsSocket`, so integration tests can
//! drive the same protocol logic over a plain loopback `TcpStream` pair
//! with no TLS handshake involved.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// Anything the driver can read frames from, write frames to, and bound
/// the next read on.
pub trait DeadlineSocket: Read + Write {
    fn set_deadline(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl DeadlineSocket for TcpStream {
    fn set_deadline(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

/// Server-role TLS socket: a `rustls::ServerConnection` pumped by hand
/// over a `TcpStream`, in the teacher's `process()` idiom.
pub struct TlsSocket {
    conn: rustls::ServerConnection,
    stream: TcpStream,
    plain_buffer: Vec<u8>,
    eof: bool,
    deadline: Option<Instant>,
}

impl TlsSocket {
    pub fn new(conn: rustls::ServerConnection, stream: TcpStream) -> Self {
        Self {
            conn,
            stream,
            plain_buffer: Vec::with_capacity(1024),
            eof: false,
            deadline: None,
        }
    }

    /// Pumps one round of TLS: a non-blocking probe read of ciphertext,
    /// feeding it through rustls, draining any resulting plaintext into
    /// `plain_buffer`, and flushing anything rustls wants written.
    fn pump(&mut self) -> io::Result<()> {
        if self.conn.wants_read() {
            self.stream.set_nonblocking(true)?;
            let mut raw = [0u8; 4096];
            let read_result = self.stream.read(&mut raw);
            self.stream.set_nonblocking(false)?;
            match read_result {
                Ok(0) => self.eof = true,
                Ok(n) => {
                    let mut cursor = &raw[..n];
                    self.conn
                        .read_tls(&mut cursor)
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                    if let Err(e) = self.conn.process_new_packets() {
                        return Err(io::Error::new(io::ErrorKind::InvalidData, e));
                    }
                    let mut decrypted = [0u8; 4096];
                    loop {
                        match self.conn.reader().read(&mut decrypted) {
                            Ok(0) => break,
                            Ok(n) => self.plain_buffer.extend_from_slice(&decrypted[..n]),
                            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                            Err(e) => return Err(e),
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e),
            }
        }
        if self.conn.wants_write() {
            self.conn.write_tls(&mut self.stream)?;
        }
        Ok(())
    }
}

impl Read for TlsSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if !self.plain_buffer.is_empty() {
                let n = self.plain_buffer.len().min(buf.len());
                buf[..n].copy_from_slice(&self.plain_buffer[..n]);
                self.plain_buffer.drain(..n);
                return Ok(n);
            }
            if self.eof {
                return Ok(0);
            }
            self.pump()?;
            if self.plain_buffer.is_empty() && !self.eof {
                if let Some(deadline) = self.deadline {
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::WouldBlock,
                            "read deadline exceeded",
                        ));
                    }
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

impl Write for TlsSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.conn.writer().write(buf)?;
        self.pump()?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.conn.writer().flush()?;
        self.pump()
    }
}

impl DeadlineSocket for TlsSocket {
    fn set_deadline(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.deadline = timeout.map(|d| Instant::now() + d);
        Ok(())
    }
}
