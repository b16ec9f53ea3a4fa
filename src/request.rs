use thiserror::Error;

/// A single parsed request head: the method and the decoded URL path.
///
/// Headers and body are not kept. Every method is served the same way and
/// request bodies are ignored, so the request line is all that matters.
#[derive(Clone, Debug)]
pub struct Request {
    method: String,
    path: String,
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("request head is not valid UTF-8")]
    Encoding,
    #[error("failed to parse request line")]
    RequestLine,
}

impl Request {
    /// Parses the request line out of the raw bytes read from a connection.
    pub fn parse(buf: &[u8]) -> Result<Request, RequestError> {
        let line_end = buf
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(buf.len());
        let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| RequestError::Encoding)?;

        let mut parts = line.split_whitespace();
        let method = parts.next().ok_or(RequestError::RequestLine)?;
        let target = parts.next().ok_or(RequestError::RequestLine)?;

        Ok(Request {
            method: method.to_string(),
            path: decode_path(target),
        })
    }

    pub fn get_method(&self) -> &str {
        &self.method
    }

    /// The percent-decoded path component, query string excluded.
    pub fn get_path(&self) -> &str {
        &self.path
    }
}

/// Decodes the path component of a request target: the query string is cut
/// off and `%XX` escapes are decoded. Malformed escapes pass through
/// verbatim.
pub(crate) fn decode_path(target: &str) -> String {
    let path = target.split('?').next().unwrap_or(target);
    let bytes = path.as_bytes();

    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let escape = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = escape {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(decoded)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}
