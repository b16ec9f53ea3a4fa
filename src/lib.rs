//! # tinystatic
//!
//! `tinystatic` is a small multi-threaded HTTP server that serves static
//! files from a root directory. Every accepted connection is handed to a
//! worker pool and answered independently: an existing file comes back as a
//! `200` with its content type inferred from the extension, a missing one as
//! a plaintext `404`, and a file that fails to read as a bare `500`.

//! # Example
//! ```no_run
//! use tinystatic::config::{Server, ServerConfig, ServerError};
//!
//! fn main() -> Result<(), ServerError> {
//!   let config = ServerConfig::new()
//!       .base_addr("localhost:8080")
//!       .root_dir("static");
//!   let server = Server::new(config);
//!
//!   server.start()?;
//!   // requests are now served off worker threads; block until done, then
//!   std::thread::park();
//!   server.stop();
//!   Ok(())
//! }
//! ```
//!
//! Request paths are joined onto the root directory after stripping one
//! leading `/`, with no further normalization. A path containing `..`
//! segments can therefore reach outside the root; do not expose this server
//! to untrusted networks without fronting it with something that rejects
//! such paths.

pub mod config;
pub mod http;
pub mod mime;
pub mod request;
pub mod response;
