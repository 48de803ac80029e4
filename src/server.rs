//! Blocking accept loop: one worker thread per connection.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::thread;

use log::{info, warn};
use socket2::{Domain, Protocol, Socket, Type};

use crate::ws::Connection;

const BACKLOG: i32 = 10;

/// Listening websocket echo server. Connections are independent: each gets
/// its own worker thread, buffer and engine, and a failing worker never
/// takes the accept loop down with it.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    fallback_page: Option<PathBuf>,
}

impl Server {
    /// Binds a listener on `addr` with `SO_REUSEADDR` set.
    pub fn bind(addr: SocketAddr) -> io::Result<Server> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(BACKLOG)?;
        Ok(Server {
            listener: socket.into(),
            fallback_page: None,
        })
    }

    /// Page served to plain http clients instead of the upgrade.
    pub fn with_fallback_page(mut self, page: impl Into<PathBuf>) -> Self {
        self.fallback_page = Some(page.into());
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, dispatching each to its own worker.
    pub fn serve(&self) -> io::Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("accept failed: {err}");
                    continue;
                }
            };
            info!("accepted connection from {peer}");

            let connection = Connection::new(stream).with_fallback_page(self.fallback_page.clone());
            let worker = thread::Builder::new().name(format!("wsecho-{peer}"));
            let spawned = worker.spawn(move || match connection.run() {
                Ok(()) => info!("connection from {peer} closed"),
                Err(err) => warn!("connection from {peer} aborted: {err}"),
            });
            if let Err(err) = spawned {
                warn!("unable to spawn worker for {peer}: {err}");
            }
        }
    }
}
