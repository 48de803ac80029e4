//! Http plumbing around the websocket core: request head framing, the `101
//! Switching Protocols` response and the static file fallback for plain
//! http requests.

use std::fs;
use std::io;
use std::io::{Read, Write};
use std::path::Path;

use ::http::StatusCode;
use memchr::memmem::Finder;

use crate::buffer::ReadBuffer;
use crate::ws::Error;

pub(crate) const SERVER_NAME: &str = concat!("wsecho/", env!("CARGO_PKG_VERSION"));

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const MAX_HEAD_LENGTH: usize = 16 * 1024;

/// Reads from the stream until a complete request head (terminated by an
/// empty line) is buffered, then consumes and returns it. Bytes past the
/// terminator stay in the buffer for the frame phase.
pub fn read_request_head<'a, S: Read>(stream: &mut S, buffer: &'a mut ReadBuffer) -> Result<&'a [u8], Error> {
    let finder = Finder::new(HEAD_TERMINATOR);
    let end = loop {
        if let Some(at) = finder.find(buffer.view()) {
            break at;
        }
        if buffer.available() > MAX_HEAD_LENGTH {
            return Err(Error::Handshake("request head too large"));
        }
        buffer.read_from(stream)?;
    };
    Ok(buffer.consume_next(end + HEAD_TERMINATOR.len()))
}

/// Completes the websocket upgrade with a `101 Switching Protocols`
/// response carrying the computed accept value.
pub fn write_switching_protocols<S: Write>(stream: &mut S, accept: &str) -> io::Result<()> {
    stream.write_all(b"HTTP/1.1 101 Switching Protocols\r\n")?;
    stream.write_all(b"Upgrade: websocket\r\n")?;
    stream.write_all(b"Connection: Upgrade\r\n")?;
    stream.write_all(format!("Sec-WebSocket-Accept: {accept}\r\n").as_bytes())?;
    stream.write_all(b"\r\n")?;
    stream.flush()
}

/// Serves the fallback page to a client that asked for plain http. A
/// missing or unconfigured page answers `404 Not Found`.
pub fn serve_file<S: Write>(stream: &mut S, page: Option<&Path>) -> io::Result<()> {
    match page.map(fs::read) {
        Some(Ok(body)) => write_response(stream, StatusCode::OK, &body),
        Some(Err(err)) if err.kind() == io::ErrorKind::NotFound => {
            write_response(stream, StatusCode::NOT_FOUND, b"")
        }
        Some(Err(err)) => Err(err),
        None => write_response(stream, StatusCode::NOT_FOUND, b""),
    }
}

fn write_response<S: Write>(stream: &mut S, status: StatusCode, body: &[u8]) -> io::Result<()> {
    let mut length = itoa::Buffer::new();
    stream.write_all(format!("HTTP/1.0 {status}\r\n").as_bytes())?;
    stream.write_all(format!("Server: {SERVER_NAME}\r\n").as_bytes())?;
    stream.write_all(b"Content-Type: text/html\r\n")?;
    stream.write_all(b"Content-Length: ")?;
    stream.write_all(length.format(body.len()).as_bytes())?;
    stream.write_all(b"\r\n\r\n")?;
    stream.write_all(body)?;
    stream.flush()
}
