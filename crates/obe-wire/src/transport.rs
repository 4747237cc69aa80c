//! Blocking framed transports over byte streams and TCP.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use obe_core::errors::{ErrorInfo, ObeError};
use serde_json::Value;
use tracing::{debug, info, trace};

use crate::frame::{decode_header, decode_payload, encode_frame, HEADER_LEN};

/// Message-level transport used by a session.
pub trait Transport {
    /// Sends one value as one frame.
    fn send(&mut self, value: &Value) -> Result<(), ObeError>;

    /// Blocks until one complete frame has been read and decoded.
    fn receive(&mut self) -> Result<Value, ObeError>;
}

/// [`Transport`] over any blocking byte stream.
#[derive(Debug)]
pub struct FramedTransport<S> {
    stream: S,
}

impl<S> FramedTransport<S> {
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Unwraps the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Transport for FramedTransport<S> {
    fn send(&mut self, value: &Value) -> Result<(), ObeError> {
        let frame = encode_frame(value)?;
        self.stream.write_all(&frame).map_err(io_error)?;
        self.stream.flush().map_err(io_error)?;
        trace!(bytes = frame.len(), "frame sent");
        Ok(())
    }

    fn receive(&mut self) -> Result<Value, ObeError> {
        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header).map_err(io_error)?;
        let len = decode_header(&header)?;
        // grows with the bytes received, never with the declared length alone
        let mut payload = Vec::new();
        let read = (&mut self.stream)
            .take(len as u64)
            .read_to_end(&mut payload)
            .map_err(io_error)?;
        if read < len {
            return Err(ObeError::Transport(
                ErrorInfo::new("wire.closed", "connection closed inside a frame")
                    .with_context("have", read.to_string())
                    .with_context("need", len.to_string()),
            ));
        }
        trace!(bytes = len, "frame received");
        decode_payload(&payload)
    }
}

fn io_error(err: io::Error) -> ObeError {
    let (code, message) = match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => ("wire.closed", "connection closed by peer"),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            ("wire.timeout", "timed out waiting for the peer")
        }
        _ => ("wire.io", "socket i/o failed"),
    };
    ObeError::Transport(ErrorInfo::new(code, message).with_context("cause", err.to_string()))
}

/// TCP listener handing out one framed connection per `accept`.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Binds to `addr`; port `0` picks a free port.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, ObeError> {
        let inner = TcpListener::bind(addr).map_err(|err| {
            ObeError::Transport(ErrorInfo::new("wire.bind", err.to_string()))
        })?;
        Ok(Self { inner })
    }

    /// Bound address, useful after binding port `0`.
    pub fn local_addr(&self) -> Result<SocketAddr, ObeError> {
        self.inner
            .local_addr()
            .map_err(|err| ObeError::Transport(ErrorInfo::new("wire.local_addr", err.to_string())))
    }

    /// Waits for a client. `read_timeout` applies to every later receive.
    pub fn accept(
        &self,
        read_timeout: Option<Duration>,
    ) -> Result<(FramedTransport<TcpStream>, SocketAddr), ObeError> {
        let (stream, peer) = self.inner.accept().map_err(io_error)?;
        stream.set_read_timeout(read_timeout).map_err(io_error)?;
        stream.set_nodelay(true).map_err(io_error)?;
        info!(%peer, "client connected");
        Ok((FramedTransport::new(stream), peer))
    }
}

/// Client side of a framed connection.
#[derive(Debug)]
pub struct Client {
    transport: FramedTransport<TcpStream>,
}

impl Client {
    /// Connects to a listening server.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, ObeError> {
        let stream = TcpStream::connect(addr).map_err(|err| {
            ObeError::Transport(ErrorInfo::new("wire.connect", err.to_string()))
        })?;
        stream.set_nodelay(true).map_err(io_error)?;
        debug!("connected to server");
        Ok(Self {
            transport: FramedTransport::new(stream),
        })
    }

    /// Sends `message` and waits for its reply.
    pub fn request(&mut self, message: &Value) -> Result<Value, ObeError> {
        self.transport.send(message)?;
        self.transport.receive()
    }

    /// Sends without waiting for a reply.
    pub fn send(&mut self, message: &Value) -> Result<(), ObeError> {
        self.transport.send(message)
    }

    /// Waits for the next message.
    pub fn receive(&mut self) -> Result<Value, ObeError> {
        self.transport.receive()
    }
}
