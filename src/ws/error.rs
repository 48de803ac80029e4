use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("frame truncated: header declares {expected} bytes, only {available} available")]
    TruncatedFrame { expected: usize, available: usize },
    #[error("handshake failed: {0}")]
    Handshake(&'static str),
    #[error("unable to parse request head: {0}")]
    InvalidRequest(#[from] httparse::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        io::Error::other(value)
    }
}
