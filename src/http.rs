use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    net::TcpListener,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rusty_pool::ThreadPool;
use thiserror::Error;

use crate::{config::ServerConfig, mime, request::Request, response::Response};

/// Failure while producing a response for one request. Contained to that
/// request; the client only ever sees a bare 500.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("failed to read {}: {source}", .path.display())]
    FileRead { path: PathBuf, source: io::Error },
}

/// Accepts connections until the running flag is cleared, submitting each
/// one to the worker pool without waiting on it.
pub(crate) fn accept_loop(
    listener: TcpListener,
    pool: Arc<ThreadPool>,
    config: ServerConfig,
    running: Arc<AtomicBool>,
) {
    for stream in listener.incoming() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        match stream {
            Ok(mut conn) => {
                let config = config.clone();
                pool.execute(move || handle_connection(&mut conn, &config));
            }
            Err(err) => {
                #[cfg(feature = "log")]
                log::error!("accept failed: {err}");
                break;
            }
        }
    }

    // Whether stopped or killed by an accept error, the loop is done:
    // clear the flag so the owning server no longer reports itself as
    // running. Dropping the listener closes the socket; later connection
    // attempts are refused.
    running.store(false, Ordering::SeqCst);
}

/// Handles one connection end to end: parse the request head, build the
/// response, send it. Exactly one response is written per parsed request,
/// and the connection is flushed and closed on every exit path.
pub(crate) fn handle_connection<C: Read + Write>(conn: &mut C, config: &ServerConfig) {
    let buf = read_stream(conn);
    let request = match Request::parse(&buf) {
        Ok(req) => req,
        Err(err) => {
            // No parseable request line, so there is nothing to answer.
            #[cfg(feature = "log")]
            log::debug!("dropping connection: {err}");
            return;
        }
    };

    #[cfg(feature = "log")]
    log::debug!("{} {}", request.get_method(), request.get_path());

    let response = match build_res(&request, config) {
        Ok(res) => res,
        Err(err) => {
            #[cfg(feature = "log")]
            log::error!("error handling request: {err}");
            Response::new().status_line("HTTP/1.1 500 Internal Server Error")
        }
    };

    if let Err(err) = response.send(conn) {
        #[cfg(feature = "log")]
        log::warn!("error writing response: {err}");
    }
}

/// Maps a request to its response: an existing regular file is served whole
/// with an inferred content type, anything else gets the plaintext 404. The
/// requested method is irrelevant; every method is served the same way.
fn build_res(request: &Request, config: &ServerConfig) -> Result<Response, HandlerError> {
    let target = resolve_target(config.get_root_dir(), request.get_path());

    if target.is_file() {
        let body = read_to_vec(&target).map_err(|source| HandlerError::FileRead {
            path: target.clone(),
            source,
        })?;
        Ok(Response::new().mime(mime::from_path(&target)).body(body))
    } else {
        let message = format!("404 (Not Found): {}", request.get_path());
        Ok(Response::new()
            .status_line("HTTP/1.1 404 Not Found")
            .mime("text/plain")
            .body(message.into_bytes()))
    }
}

/// Joins the decoded request path onto the root directory after stripping a
/// single leading `/`. No canonicalization: `..` segments are resolved by
/// the filesystem, not rejected.
pub(crate) fn resolve_target(root: &Path, path: &str) -> PathBuf {
    root.join(path.strip_prefix('/').unwrap_or(path))
}

pub fn read_to_vec<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    fn inner(path: &Path) -> io::Result<Vec<u8>> {
        let file = File::open(path)?;
        let mut content: Vec<u8> = Vec::new();
        let mut reader = BufReader::new(file);
        reader.read_to_end(&mut content)?;
        Ok(content)
    }
    inner(path.as_ref())
}

/// Reads from the stream until the end of the request head, EOF, or a short
/// read. Request bodies are ignored, so there is no need to keep reading
/// past the blank line.
fn read_stream<P: Read>(stream: &mut P) -> Vec<u8> {
    let buffer_size = 512;
    let mut request_buffer = vec![];
    loop {
        let mut buffer = vec![0; buffer_size];
        match stream.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                request_buffer.extend_from_slice(&buffer[..n]);
                if request_buffer.windows(4).any(|w| w == b"\r\n\r\n") || n < buffer_size {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    request_buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    struct MockConn {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl MockConn {
        fn new(request: &str) -> MockConn {
            MockConn {
                input: Cursor::new(request.as_bytes().to_vec()),
                output: Vec::new(),
            }
        }

        fn response(&self) -> (String, Vec<u8>) {
            let split = self
                .output
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .expect("no blank line in response");
            let head = String::from_utf8(self.output[..split].to_vec()).unwrap();
            let body = self.output[split + 4..].to_vec();
            (head, body)
        }
    }

    impl Read for MockConn {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for MockConn {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tinystatic-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn serves_existing_file() {
        let root = temp_root("serves");
        fs::write(root.join("index.html"), b"<h1>Hi</h1>").unwrap();
        let config = ServerConfig::new().root_dir(&root);

        let mut conn = MockConn::new("GET /index.html HTTP/1.1\r\n\r\n");
        handle_connection(&mut conn, &config);

        let (head, body) = conn.response();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"), "head: {head}");
        assert!(head.contains("Content-Type: text/html\r\n"));
        // Content-Length is the final header, so the head ends right on it;
        // its own \r\n belongs to the blank-line terminator.
        assert!(head.ends_with("Content-Length: 11"), "head: {head}");
        assert_eq!(body, b"<h1>Hi</h1>");
    }

    #[test]
    fn missing_file_gets_plaintext_404() {
        let root = temp_root("missing");
        let config = ServerConfig::new().root_dir(&root);

        let mut conn = MockConn::new("GET /missing.png HTTP/1.1\r\n\r\n");
        handle_connection(&mut conn, &config);

        let (head, body) = conn.response();
        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(head.contains("Content-Type: text/plain\r\n"));
        assert_eq!(body, b"404 (Not Found): /missing.png");
    }

    #[test]
    fn methods_are_not_differentiated() {
        let root = temp_root("methods");
        fs::write(root.join("a.css"), b"h1{}").unwrap();
        let config = ServerConfig::new().root_dir(&root);

        let mut conn = MockConn::new("POST /a.css HTTP/1.1\r\n\r\n");
        handle_connection(&mut conn, &config);

        let (head, body) = conn.response();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: text/css\r\n"));
        assert_eq!(body, b"h1{}");
    }

    #[test]
    fn unparseable_head_gets_no_response() {
        let root = temp_root("unparseable");
        let config = ServerConfig::new().root_dir(&root);

        let mut conn = MockConn::new("\r\n\r\n");
        handle_connection(&mut conn, &config);

        assert!(conn.output.is_empty());
    }

    #[test]
    fn directory_is_not_a_file() {
        let root = temp_root("dir");
        fs::create_dir_all(root.join("sub")).unwrap();
        let config = ServerConfig::new().root_dir(&root);

        let mut conn = MockConn::new("GET /sub HTTP/1.1\r\n\r\n");
        handle_connection(&mut conn, &config);

        let (head, body) = conn.response();
        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert_eq!(body, b"404 (Not Found): /sub");
    }

    #[test]
    fn accept_error_clears_running_flag() {
        // A nonblocking listener makes accept fail immediately with
        // WouldBlock, which the loop treats as any other unexpected error.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let pool = Arc::new(ThreadPool::default());
        accept_loop(
            listener,
            pool,
            ServerConfig::new(),
            Arc::clone(&running),
        );

        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn resolve_target_strips_one_leading_slash() {
        assert_eq!(
            resolve_target(Path::new("static"), "/css/site.css"),
            PathBuf::from("static/css/site.css")
        );
        assert_eq!(resolve_target(Path::new("static"), "/"), PathBuf::from("static"));
        assert_eq!(
            resolve_target(Path::new("static"), "plain.txt"),
            PathBuf::from("static/plain.txt")
        );
    }
}
