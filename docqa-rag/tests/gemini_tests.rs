//! Tests of the Gemini adapters against a local HTTP server.

#![cfg(feature = "gemini")]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use docqa_rag::EmbeddingProvider;
use docqa_rag::gemini::{GeminiClient, GeminiEmbeddingProvider, MAX_BATCH_SIZE};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Sizes of the `batchEmbedContents` requests the server received, in order.
type Received = Arc<Mutex<Vec<usize>>>;

/// Read one HTTP request and return its JSON body.
async fn read_request(socket: &mut TcpStream) -> Option<Value> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];

    let (body_start, content_length) = loop {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            break (pos + 4, length);
        }
    };

    while buf.len() < body_start + content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    serde_json::from_slice(&buf[body_start..body_start + content_length]).ok()
}

/// Embeds `t{i}` as `[i, 1]` and rejects batches over the API limit with
/// the same 400 body Gemini sends.
fn respond(body: &Value, received: &Received) -> (&'static str, Value) {
    let requests = body["requests"].as_array().cloned().unwrap_or_default();
    received.lock().unwrap().push(requests.len());

    if requests.len() > MAX_BATCH_SIZE {
        let error = json!({
            "error": { "code": 400, "message": "at most 100 requests can be in one batch" }
        });
        return ("400 Bad Request", error);
    }

    let embeddings: Vec<Value> = requests
        .iter()
        .map(|r| {
            let text = r["content"]["parts"][0]["text"].as_str().unwrap_or_default();
            let n: f32 = text.trim_start_matches('t').parse().unwrap_or(-1.0);
            json!({ "values": [n, 1.0] })
        })
        .collect();
    ("200 OK", json!({ "embeddings": embeddings }))
}

async fn spawn_server() -> (SocketAddr, Received) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received: Received = Arc::default();

    let state = Arc::clone(&received);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let Some(body) = read_request(&mut socket).await else {
                    return;
                };
                let (status, payload) = respond(&body, &state);
                let payload = payload.to_string();
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
                    payload.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (addr, received)
}

fn provider(addr: SocketAddr) -> GeminiEmbeddingProvider {
    let client = GeminiClient::new("test-key").unwrap().with_base_url(format!("http://{addr}"));
    GeminiEmbeddingProvider::new(client)
}

#[tokio::test]
async fn large_batches_are_split_and_kept_in_order() {
    let (addr, received) = spawn_server().await;
    let texts: Vec<String> = (0..250).map(|i| format!("t{i}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

    let embeddings = provider(addr).embed_batch(&refs).await.unwrap();

    assert_eq!(embeddings.len(), 250);
    for (i, embedding) in embeddings.iter().enumerate() {
        assert_eq!(embedding, &vec![i as f32, 1.0]);
    }

    let sizes = received.lock().unwrap().clone();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert!(sizes.iter().all(|&n| n <= MAX_BATCH_SIZE));
}

#[tokio::test]
async fn batch_at_the_limit_is_one_request() {
    let (addr, received) = spawn_server().await;
    let texts: Vec<String> = (0..MAX_BATCH_SIZE).map(|i| format!("t{i}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

    let embeddings = provider(addr).embed_batch(&refs).await.unwrap();

    assert_eq!(embeddings.len(), MAX_BATCH_SIZE);
    assert_eq!(*received.lock().unwrap(), vec![MAX_BATCH_SIZE]);
}

#[tokio::test]
async fn empty_batch_sends_nothing() {
    let (addr, received) = spawn_server().await;
    assert!(provider(addr).embed_batch(&[]).await.unwrap().is_empty());
    assert!(received.lock().unwrap().is_empty());
}
