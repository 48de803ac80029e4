use crate::crypto::{base64, sha1};
use crate::ws::Error;

/// Magic GUID appended to the client key before hashing (RFC 6455 §1.3).
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const MAX_HEADERS: usize = 64;

/// What a parsed request head asks the server to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upgrade {
    /// The request carries a `Sec-WebSocket-Key`; answer `101 Switching
    /// Protocols` with this accept value.
    Websocket { accept: String },
    /// Plain http request; fall back to serving the static page.
    Http,
}

/// Derives the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(client_key: &str) -> String {
    let mut seed = Vec::with_capacity(client_key.len() + WEBSOCKET_GUID.len());
    seed.extend_from_slice(client_key.as_bytes());
    seed.extend_from_slice(WEBSOCKET_GUID.as_bytes());
    base64::encode(sha1::hash(&seed).as_bytes())
}

/// Examines a complete request head and decides between the websocket
/// upgrade and the plain http fallback.
pub fn examine(head: &[u8]) -> Result<Upgrade, Error> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut headers);
    if request.parse(head)?.is_partial() {
        return Err(Error::Handshake("request head ends before the empty line"));
    }

    for header in request.headers.iter() {
        if header.name.eq_ignore_ascii_case("sec-websocket-key") {
            let key = std::str::from_utf8(header.value)
                .map_err(|_| Error::Handshake("sec-websocket-key is not valid utf-8"))?
                .trim_matches(|c: char| c == ' ' || c == '\t');
            return Ok(Upgrade::Websocket { accept: accept_key(key) });
        }
    }
    Ok(Upgrade::Http)
}
