//! A one-shot HTTP server whose body stops short of its `Content-Length`.
//!
//! wiremock always sends complete bodies, so mid-body transport failures need
//! a raw listener.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::socket_guard::should_skip_socket_bound_test;

/// Serves one `200` response that declares `declared_len` bytes but sends
/// only `body` before closing. Returns the URL, or `None` when socket tests
/// are skipped.
pub async fn serve_truncated_body_or_skip(
    content_type: &'static str,
    declared_len: usize,
    body: &'static [u8],
) -> Option<String> {
    if should_skip_socket_bound_test() {
        return None;
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
    let addr = listener.local_addr().ok()?;

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        // Drain the request head so closing does not reset the connection.
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {declared_len}\r\nConnection: close\r\n\r\n"
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        if socket.write_all(body).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
        let _ = socket.shutdown().await;
    });

    Some(format!("http://{addr}/truncated"))
}
