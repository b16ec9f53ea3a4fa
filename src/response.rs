use std::io::{self, Write};

/// A response under construction. Defaults to `200 OK` with no body and no
/// content type.
#[derive(Clone, Debug)]
pub struct Response {
    status_line: String,
    mime: Option<String>,
    body: Option<Vec<u8>>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Response {
        Response {
            status_line: String::from("HTTP/1.1 200 OK\r\n"),
            mime: None,
            body: None,
        }
    }

    pub fn status_line<P: Into<String>>(mut self, line: P) -> Self {
        let line_str = line.into();
        self.status_line = line_str.trim().to_string() + "\r\n";
        self
    }

    pub fn mime<P: Into<String>>(mut self, mime: P) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Writes the head and body to the socket and flushes it. `Content-Type`
    /// is only emitted when a mime type was set; an absent body writes
    /// nothing after the head, but `Content-Length` is always present so the
    /// client is not left waiting.
    pub(crate) fn send<P: Write>(&self, sock: &mut P) -> io::Result<()> {
        let mut head = self.status_line.clone();
        if let Some(mime) = &self.mime {
            head += &format!("Content-Type: {mime}\r\n");
        }
        let length = self.body.as_ref().map_or(0, Vec::len);
        head += &format!("Content-Length: {length}\r\n\r\n");

        sock.write_all(head.as_bytes())?;
        if let Some(body) = &self.body {
            sock.write_all(body)?;
        }
        sock.flush()
    }
}
