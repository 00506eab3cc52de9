//! Minimal HTTP responder for exercising the REST clients in tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct CannedServer {
    pub endpoint: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    /// Raw text of every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

/// Answers one connection per entry of `responses`, then stops accepting.
pub async fn canned_server(responses: Vec<(u16, &'static str)>) -> std::io::Result<CannedServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("http://{}", listener.local_addr()?);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut stream).await;
            recorded.lock().expect("request log poisoned").push(request);

            let response = format!(
                "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    Ok(CannedServer { endpoint, requests })
}

/// Accepts connections but never answers.
pub async fn silent_server() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("http://{}", listener.local_addr()?);

    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            open.push(stream);
        }
    });

    Ok(endpoint)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buffer = [0u8; 8192];

    loop {
        match tokio::time::timeout(Duration::from_millis(500), stream.read(&mut buffer)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
            Ok(Ok(read)) => raw.extend_from_slice(&buffer[..read]),
        }
        if request_complete(&raw) {
            break;
        }
    }

    String::from_utf8_lossy(&raw).into_owned()
}

fn request_complete(raw: &[u8]) -> bool {
    let Some(header_end) = raw.windows(4).position(|window| window == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&raw[..header_end]).to_ascii_lowercase();

    if headers.contains("transfer-encoding: chunked") {
        return raw.ends_with(b"0\r\n\r\n");
    }

    let length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    raw.len() >= header_end + 4 + length
}

/// Temporary directory whose own name is not hidden; `tempdir()` uses a
/// `.tmp` prefix, which the path filter would reject.
pub fn workspace() -> std::io::Result<tempfile::TempDir> {
    tempfile::Builder::new().prefix("indexer-test-").tempdir()
}
