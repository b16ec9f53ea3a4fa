use std::{
    net::{SocketAddr, TcpListener, TcpStream},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use rusty_pool::{Builder, ThreadPool};
use thiserror::Error;

use crate::http::accept_loop;

/// Errors surfaced by [`Server::start`]. None of these are retried.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("failed to spawn acceptor thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("server is already running")]
    AlreadyRunning,
}

/// Immutable server configuration: where to listen and what to serve.
///
/// ### Example:
/// ```
/// use tinystatic::config::ServerConfig;
///
/// let config = ServerConfig::new()
///     .base_addr("localhost:9001")
///     .root_dir("public");
/// ```
#[derive(Clone, Debug)]
pub struct ServerConfig {
    base_addr: String,
    root_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig::new()
    }
}

impl ServerConfig {
    /// Defaults: listen on `localhost:8080`, serve the `static` directory
    /// relative to the working directory.
    pub fn new() -> ServerConfig {
        ServerConfig {
            base_addr: String::from("localhost:8080"),
            root_dir: PathBuf::from("static"),
        }
    }

    /// The address the listener binds to, in `host:port` form.
    pub fn base_addr<P: Into<String>>(mut self, addr: P) -> Self {
        self.base_addr = addr.into();
        self
    }

    /// The directory request paths are resolved beneath.
    pub fn root_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.root_dir = dir.into();
        self
    }

    pub fn get_base_addr(&self) -> &str {
        &self.base_addr
    }

    pub fn get_root_dir(&self) -> &Path {
        &self.root_dir
    }
}

struct Acceptor {
    addr: SocketAddr,
    thread: JoinHandle<()>,
}

/// The listener owner. Holds the configuration and the worker pool; the
/// bound socket itself lives on the acceptor thread between [`Server::start`]
/// and [`Server::stop`].
pub struct Server {
    config: ServerConfig,
    pool: Arc<ThreadPool>,
    running: Arc<AtomicBool>,
    acceptor: Mutex<Option<Acceptor>>,
}

impl Server {
    /// Builds the server with one worker per core; [`Server::threads`]
    /// overrides that.
    pub fn new(config: ServerConfig) -> Server {
        let workers = num_cpus::get();

        #[cfg(feature = "log")]
        log::debug!("using {} worker threads", workers);

        Server {
            config,
            pool: Arc::new(Builder::new().core_size(workers).build()),
            running: Arc::new(AtomicBool::new(false)),
            acceptor: Mutex::new(None),
        }
    }

    /// Overrides the worker pool size.
    pub fn threads(mut self, threads: usize) -> Self {
        self.pool = Arc::new(Builder::new().core_size(threads).build());
        self
    }

    /// Binds the listener to the configured address and starts accepting.
    ///
    /// The accept loop runs on its own thread: each accepted connection is
    /// submitted to the worker pool and the loop immediately moves on to the
    /// next one, never waiting for a dispatched request to finish. There is
    /// no bound on in-flight requests.
    ///
    /// The loop runs until [`Server::stop`] is called or the listener
    /// reports an unexpected accept error, which is logged and terminates
    /// the loop without automatic restart. A server whose loop died that
    /// way may be started again explicitly.
    pub fn start(&self) -> Result<(), ServerError> {
        let mut acceptor = self.acceptor.lock().unwrap();
        if let Some(live) = acceptor.as_ref() {
            if !live.thread.is_finished() {
                return Err(ServerError::AlreadyRunning);
            }
            // The accept loop exited on its own; reap the dead handle so
            // the server can be bound anew.
            if let Some(dead) = acceptor.take() {
                let _ = dead.thread.join();
            }
        }

        let listener =
            TcpListener::bind(self.config.get_base_addr()).map_err(ServerError::Bind)?;
        let addr = listener.local_addr().map_err(ServerError::Bind)?;

        self.running.store(true, Ordering::SeqCst);

        #[cfg(feature = "log")]
        log::info!("listening on {}", addr);

        let pool = Arc::clone(&self.pool);
        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let thread = thread::Builder::new()
            .name(String::from("tinystatic-acceptor"))
            .spawn(move || accept_loop(listener, pool, config, running))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ServerError::Spawn(e)
            })?;

        *acceptor = Some(Acceptor { addr, thread });
        Ok(())
    }

    /// Stops accepting new connections and closes the listener. Idempotent:
    /// calling it again, or without ever having started, is a no-op.
    ///
    /// Requests already dispatched to the pool are neither cancelled nor
    /// awaited; they run to completion on their workers.
    pub fn stop(&self) {
        let acceptor = self.acceptor.lock().unwrap().take();
        let Some(Acceptor { addr, thread }) = acceptor else {
            return;
        };

        self.running.store(false, Ordering::SeqCst);
        // A blocked accept only returns once a connection arrives, so nudge
        // the listener to let the loop observe the cleared flag.
        let _ = TcpStream::connect(addr);
        let _ = thread.join();

        #[cfg(feature = "log")]
        log::info!("listener on {} stopped", addr);
    }

    /// The bound address while running, `None` otherwise. Useful when the
    /// configured address carries port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.acceptor
            .lock()
            .unwrap()
            .as_ref()
            .filter(|a| !a.thread.is_finished())
            .map(|a| a.addr)
    }
}
