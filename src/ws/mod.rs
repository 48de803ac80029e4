//! Server side websocket protocol implementation.
//!
//! ## Examples
//!
//! Drive one accepted connection until the peer closes.
//! ```no_run
//! use std::net::TcpListener;
//! use wsecho::ws::Connection;
//!
//! let listener = TcpListener::bind("127.0.0.1:8888").unwrap();
//! let (stream, _) = listener.accept().unwrap();
//! Connection::new(stream).run().unwrap();
//! ```
//!
//! Advance the state machine one transition at a time and observe it.
//! ```no_run
//! use std::net::TcpStream;
//! use wsecho::ws::{Connection, Phase};
//!
//! fn upgrade(stream: TcpStream) -> Connection<TcpStream> {
//!   let mut connection = Connection::new(stream);
//!   while connection.phase() == Phase::AwaitingHandshake {
//!     connection.step().unwrap();
//!   }
//!   connection
//! }
//! ```

use std::io::{Read, Write};
use std::path::PathBuf;

use log::debug;

use crate::buffer::ReadBuffer;
use crate::http;

// re-export
pub use crate::ws::error::Error;
pub use crate::ws::frame::{Frame, Opcode};

pub mod decoder;
pub mod encoder;
mod error;
pub mod frame;
pub mod handshake;
pub mod protocol;

/// Status code carried by the server's close frame.
pub const CLOSE_STATUS: u16 = 0x0001;
/// Reason text carried by the server's close frame.
pub const CLOSE_REASON: &[u8] = b"Close Socket!";

/// Where a connection stands in its lifecycle. Transitions only move
/// forward; a connection that reached [`Phase::Closed`] is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the http request that asks for the upgrade.
    AwaitingHandshake,
    /// Upgrade complete; exchanging frames.
    Open,
    /// A close frame arrived; ours is still to be sent.
    Closing,
    /// Close frame sent (or http fallback served); transport released.
    Closed,
}

/// Engine for one accepted connection. Owns the transport and drives the
/// per-connection protocol state machine: handshake, frame loop, close
/// handshake.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    buffer: ReadBuffer,
    phase: Phase,
    fallback_page: Option<PathBuf>,
}

impl<S> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: ReadBuffer::new(),
            phase: Phase::AwaitingHandshake,
            fallback_page: None,
        }
    }

    /// Page served to plain http clients instead of the upgrade.
    pub fn with_fallback_page(mut self, page: Option<PathBuf>) -> Self {
        self.fallback_page = page;
        self
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }
}

impl<S: Read + Write> Connection<S> {
    /// Drives the connection until it reaches [`Phase::Closed`], then
    /// releases the transport. Any protocol or IO failure aborts this
    /// connection only.
    pub fn run(mut self) -> Result<(), Error> {
        while self.phase != Phase::Closed {
            self.step()?;
        }
        Ok(())
    }

    /// Advances the state machine by exactly one transition.
    pub fn step(&mut self) -> Result<(), Error> {
        match self.phase {
            Phase::AwaitingHandshake => self.perform_handshake(),
            Phase::Open => self.dispatch_next_frame(),
            Phase::Closing => self.send_close(),
            Phase::Closed => Ok(()),
        }
    }

    fn perform_handshake(&mut self) -> Result<(), Error> {
        let head = http::read_request_head(&mut self.stream, &mut self.buffer)?;
        match handshake::examine(head)? {
            handshake::Upgrade::Websocket { accept } => {
                http::write_switching_protocols(&mut self.stream, &accept)?;
                debug!("handshake complete, accept {accept}");
                self.phase = Phase::Open;
            }
            handshake::Upgrade::Http => {
                debug!("no websocket key in request, serving fallback page");
                http::serve_file(&mut self.stream, self.fallback_page.as_deref())?;
                self.phase = Phase::Closed;
            }
        }
        Ok(())
    }

    fn dispatch_next_frame(&mut self) -> Result<(), Error> {
        let frame = decoder::read_frame(&mut self.stream, &mut self.buffer)?;
        match frame.opcode {
            Opcode::Text => {
                let mut reply = Frame::text(frame.payload);
                encoder::write_frame(&mut self.stream, &mut reply)?;
            }
            Opcode::Close => {
                self.phase = Phase::Closing;
            }
            Opcode::Continuation | Opcode::Binary | Opcode::Ping | Opcode::Pong => {
                debug!("ignoring {:?} frame of {} bytes", frame.opcode, frame.payload.len());
            }
            Opcode::Reserved(bits) => {
                debug!("ignoring frame with reserved opcode {bits:#x}");
            }
        }
        Ok(())
    }

    fn send_close(&mut self) -> Result<(), Error> {
        let mut close = Frame::close(CLOSE_STATUS, CLOSE_REASON);
        encoder::write_frame(&mut self.stream, &mut close)?;
        self.phase = Phase::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::io::Cursor;

    use super::*;

    const UPGRADE_HEAD: &[u8] = b"GET /chat HTTP/1.1\r\n\
        Host: localhost\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    /// In-memory transport: the engine reads a pre-recorded client script
    /// and its writes are captured for inspection.
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl ScriptedStream {
        fn new(script: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(script),
                output: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn masked_frame(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
        let mut frame = Frame {
            masked: true,
            mask_key: 0x37fa213d,
            ..Frame::unmasked(opcode, payload.to_vec())
        };
        encoder::encode(&mut frame)
    }

    fn client_script(frames: &[Vec<u8>]) -> Vec<u8> {
        let mut script = UPGRADE_HEAD.to_vec();
        for frame in frames {
            script.extend_from_slice(frame);
        }
        script
    }

    #[test]
    fn should_walk_phases_from_handshake_to_closed() {
        let script = client_script(&[
            masked_frame(Opcode::Text, b"Hello"),
            masked_frame(Opcode::Close, b""),
        ]);
        let mut connection = Connection::new(ScriptedStream::new(script));
        assert_eq!(Phase::AwaitingHandshake, connection.phase());

        connection.step().unwrap();
        assert_eq!(Phase::Open, connection.phase());

        connection.step().unwrap(); // text frame echoed
        assert_eq!(Phase::Open, connection.phase());

        connection.step().unwrap(); // close frame received
        assert_eq!(Phase::Closing, connection.phase());

        connection.step().unwrap(); // close frame sent
        assert_eq!(Phase::Closed, connection.phase());

        // a closed connection stays closed
        connection.step().unwrap();
        assert_eq!(Phase::Closed, connection.phase());
    }

    #[test]
    fn should_echo_text_and_close_cleanly() {
        let script = client_script(&[
            masked_frame(Opcode::Text, b"Hello"),
            masked_frame(Opcode::Close, b""),
        ]);
        let mut connection = Connection::new(ScriptedStream::new(script));
        while connection.phase() != Phase::Closed {
            connection.step().unwrap();
        }
        let output = connection.stream.output;

        // 101 response first
        let head_end = output.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let head = String::from_utf8(output[..head_end].to_vec()).unwrap();
        assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(head.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));

        // then exactly the echo frame and the close frame
        let mut frames = output[head_end..].to_vec();
        let echo = decoder::decode(&frames).unwrap();
        assert!(echo.fin);
        assert!(!echo.masked);
        assert_eq!(Opcode::Text, echo.opcode);
        assert_eq!(b"Hello".to_vec(), echo.payload);

        frames.drain(..echo.wire_length);
        let close = decoder::decode(&frames).unwrap();
        assert_eq!(Opcode::Close, close.opcode);
        assert_eq!(b"\x00\x01Close Socket!".to_vec(), close.payload);
        assert_eq!(frames.len(), close.wire_length);
    }

    #[test]
    fn should_ignore_frames_with_no_defined_behaviour() {
        let script = client_script(&[
            masked_frame(Opcode::Ping, b"ping"),
            masked_frame(Opcode::Binary, &[1, 2, 3]),
            masked_frame(Opcode::Reserved(0x3), b""),
            masked_frame(Opcode::Text, b"still here"),
            masked_frame(Opcode::Close, b""),
        ]);
        let mut connection = Connection::new(ScriptedStream::new(script));
        while connection.phase() != Phase::Closed {
            connection.step().unwrap();
        }
        let output = connection.stream.output;

        let head_end = output.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let echo = decoder::decode(&output[head_end..]).unwrap();
        assert_eq!(b"still here".to_vec(), echo.payload);
    }

    #[test]
    fn should_serve_fallback_and_close_without_upgrading() {
        let script = b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: keep-alive\r\n\r\n".to_vec();
        let mut connection = Connection::new(ScriptedStream::new(script));

        connection.step().unwrap();
        assert_eq!(Phase::Closed, connection.phase());
        assert!(connection.stream.output.starts_with(b"HTTP/1.0 404 Not Found\r\n"));
    }

    #[test]
    fn should_abort_connection_on_truncated_frame() {
        let mut script = UPGRADE_HEAD.to_vec();
        script.extend_from_slice(&[0x81, 0x05, b'H', b'e']); // header declares 5, stream ends at 2
        let mut connection = Connection::new(ScriptedStream::new(script));

        connection.step().unwrap();
        assert!(matches!(
            connection.step(),
            Err(Error::TruncatedFrame { expected: 7, available: 4 })
        ));
    }
}
