//! Loopback listener that receives the OAuth redirect.

use crate::error::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const SUCCESS_PAGE: &str = "<html><body>\
    <h1>Authorization successful!</h1>\
    <p>You can close this window and return to the terminal.</p>\
    </body></html>";

const FAILURE_PAGE: &str = "<html><body>\
    <h1>Authorization failed</h1>\
    <p>Return to the terminal for details.</p>\
    </body></html>";

pub struct CallbackListener {
    listener: TcpListener,
    port: u16,
}

enum Callback {
    Code { code: String, state: Option<String> },
    Denied(String),
    Unrelated,
}

impl CallbackListener {
    /// Bind an ephemeral port on the loopback interface.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        Ok(CallbackListener { listener, port })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/", self.port)
    }

    /// Serve requests until one carries the authorization code (or an error).
    ///
    /// Requests without either, like a browser asking for `/favicon.ico`,
    /// get a 404 and are skipped.
    pub async fn wait_for_code(&self, expected_state: &str) -> Result<String> {
        loop {
            let (stream, _) = self.listener.accept().await?;
            let (stream, callback) = read_callback(stream).await?;

            match callback {
                Callback::Code { code, state } => {
                    if state.as_deref() != Some(expected_state) {
                        respond(stream, "400 Bad Request", FAILURE_PAGE).await?;
                        return Err(Error::Auth(
                            "OAuth state mismatch in authorization callback".to_string(),
                        ));
                    }
                    respond(stream, "200 OK", SUCCESS_PAGE).await?;
                    return Ok(code);
                }
                Callback::Denied(reason) => {
                    respond(stream, "200 OK", FAILURE_PAGE).await?;
                    return Err(Error::Auth(format!("Authorization denied: {}", reason)));
                }
                Callback::Unrelated => {
                    respond(stream, "404 Not Found", "").await?;
                }
            }
        }
    }
}

async fn read_callback(stream: TcpStream) -> Result<(TcpStream, Callback)> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain the headers so the browser sees a clean response
    let mut header = String::new();
    loop {
        header.clear();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    // Request line looks like: GET /?code=xxx&state=yyy HTTP/1.1
    let callback = match request_line.split_whitespace().nth(1) {
        Some(target) => parse_target(target),
        None => Callback::Unrelated,
    };

    Ok((reader.into_inner(), callback))
}

fn parse_target(target: &str) -> Callback {
    let Ok(url) = url::Url::parse(&format!("http://localhost{}", target)) else {
        return Callback::Unrelated;
    };

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    };

    if let Some(reason) = param("error") {
        return Callback::Denied(reason);
    }

    match param("code") {
        Some(code) => Callback::Code {
            code,
            state: param("state"),
        },
        None => Callback::Unrelated,
    }
}

async fn respond(mut stream: TcpStream, status: &str, body: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\n\
        Content-Type: text/html\r\n\
        Content-Length: {}\r\n\
        Connection: close\r\n\
        \r\n\
        {}",
        status,
        body.len(),
        body
    );

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
