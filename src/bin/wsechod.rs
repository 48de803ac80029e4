use std::io;
use std::net::SocketAddr;

use log::info;

use wsecho::server::Server;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8888";

fn main() -> io::Result<()> {
    env_logger::init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WSECHO_LISTEN").ok())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
        .parse()
        .map_err(io::Error::other)?;

    let mut server = Server::bind(addr)?;
    if let Ok(page) = std::env::var("WSECHO_FALLBACK_PAGE") {
        server = server.with_fallback_page(page);
    }

    info!("listening on {}", server.local_addr()?);
    server.serve()
}
