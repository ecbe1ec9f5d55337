//! Scripted local HTTP server for exercising the REST clients.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::auth::Authenticator;
use crate::config::ServiceEndpoint;
use crate::credentials::ServiceAccountKey;
use crate::credentials::tests::sample_json;

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header block, lowercased.
    pub headers: String,
    pub body: String,
}

/// Serves scripted responses in order, one connection per response.
pub struct StubServer {
    pub base_url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut recorded = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                recorded.push(read_request(&mut stream).await);

                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
            recorded
        });

        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Wait until every scripted response was served.
    pub async fn requests(self) -> Vec<RecordedRequest> {
        self.handle.await.unwrap()
    }
}

async fn read_request(stream: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before end of headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap().split(' ');
    let method = request_line.next().unwrap().to_owned();
    let path = request_line.next().unwrap().to_owned();
    let headers = lines.collect::<Vec<_>>().join("\n").to_lowercase();

    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before end of body");
        buf.extend_from_slice(&chunk[..n]);
    }

    RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&buf[header_end..header_end + content_length])
            .into_owned(),
    }
}

/// HTTP client, authenticator and an emulated endpoint at `base_url`.
///
/// Emulated endpoints use the fixed emulator token, so no key exchange
/// happens.
pub fn emulated(base_url: String) -> (reqwest::Client, Arc<Authenticator>, ServiceEndpoint) {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let key = ServiceAccountKey::from_json(&sample_json()).unwrap();
    let auth = Arc::new(Authenticator::new(client.clone(), key));
    (
        client,
        auth,
        ServiceEndpoint {
            base_url,
            emulated: true,
        },
    )
}
