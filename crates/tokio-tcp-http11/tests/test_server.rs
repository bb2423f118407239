use std::net::SocketAddr;

use sha2::{Digest, Sha256};
use tcp_http11::{BodyProgress, ResponseDecoder, ResponseHead};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tcp_http11::{
    Handler, HandlerError, ProxyRelay, Request, ResponseWriter, Server, StatusCode,
    default_headers,
};

struct Pages;

impl Handler for Pages {
    async fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if request.target() == "/myproblem" {
            return Err(HandlerError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Woopsie, my bad\n",
            ));
        }
        let body = format!("{} {}\n", request.method(), request.target());
        writer.write_status_line(StatusCode::OK).await?;
        writer.write_headers(&default_headers(body.len())).await?;
        writer.write_body(body.as_bytes()).await?;
        Ok(())
    }
}

/// 1 回だけレスポンスを返すアップストリーム
async fn spawn_upstream(response: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 256];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        assert!(request.starts_with(b"GET /stream/3 HTTP/1.1\r\n"));
        stream.write_all(&response).await.unwrap();
        stream.shutdown().await.unwrap();
    });
    addr
}

async fn send(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

fn decode(response: &[u8]) -> (ResponseHead, Vec<u8>, ResponseDecoder) {
    let mut decoder = ResponseDecoder::new();
    decoder.feed(response);
    decoder.mark_eof();
    let (head, _) = decoder.decode_head().unwrap().unwrap();
    let mut body = Vec::new();
    assert_eq!(decoder.decode_body(&mut body).unwrap(), BodyProgress::Complete);
    (head, body, decoder)
}

fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[tokio::test]
async fn test_serve_request() {
    let handle = Server::bind("127.0.0.1:0")
        .await
        .unwrap()
        .initial_buffer_size(2)
        .serve(Pages);
    let addr = handle.local_addr().unwrap();

    let response = send(
        addr,
        b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n",
    )
    .await;
    let (head, body, _) = decode(&response);
    assert_eq!(head.status_code, 200);
    assert_eq!(head.headers.get("content-type"), Some("text/plain"));
    assert_eq!(body, b"GET /coffee\n");

    handle.close();
    handle.join().await.unwrap();
}

#[tokio::test]
async fn test_handler_error() {
    let handle = Server::bind("127.0.0.1:0").await.unwrap().serve(Pages);
    let addr = handle.local_addr().unwrap();

    let response = send(addr, b"GET /myproblem HTTP/1.1\r\n\r\n").await;
    let (head, body, _) = decode(&response);
    assert_eq!(head.status_code, 500);
    assert_eq!(head.reason_phrase, "Internal Server Error");
    assert_eq!(body, b"Woopsie, my bad\n");

    handle.close();
}

#[tokio::test]
async fn test_malformed_request_gets_no_response() {
    let handle = Server::bind("127.0.0.1:0").await.unwrap().serve(Pages);
    let addr = handle.local_addr().unwrap();

    // 送ったバイトはすべて読まれてから切断される
    let response = send(addr, b"GET /coffee HTTP/1.0\r\n").await;
    assert!(response.is_empty());

    handle.close();
}

#[tokio::test]
async fn test_concurrent_connections() {
    let handle = Server::bind("127.0.0.1:0").await.unwrap().serve(Pages);
    let addr = handle.local_addr().unwrap();

    let mut tasks = Vec::new();
    for i in 0..8 {
        tasks.push(tokio::spawn(async move {
            let request = format!("GET /{} HTTP/1.1\r\n\r\n", i);
            let response = send(addr, request.as_bytes()).await;
            let (_, body, _) = decode(&response);
            assert_eq!(body, format!("GET /{}\n", i).as_bytes());
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    handle.close();
}

#[tokio::test]
async fn test_close_stops_accepting() {
    let handle = Server::bind("127.0.0.1:0").await.unwrap().serve(Pages);
    let addr = handle.local_addr().unwrap();
    handle.close();
    handle.join().await.unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_proxy_relay_content_length() {
    let upstream_body = b"{\"id\": 0}\n{\"id\": 1}\n{\"id\": 2}\n".repeat(100);
    let mut upstream_response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        upstream_body.len()
    )
    .into_bytes();
    upstream_response.extend_from_slice(&upstream_body);
    let upstream = spawn_upstream(upstream_response).await;

    let relay = ProxyRelay::new(&format!("http://{}", upstream), "/httpbin/").unwrap();
    let handle = Server::bind("127.0.0.1:0")
        .await
        .unwrap()
        .proxy(relay)
        .serve(Pages);
    let addr = handle.local_addr().unwrap();

    let response = send(addr, b"GET /httpbin/stream/3 HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let (head, body, decoder) = decode(&response);
    assert_eq!(head.status_code, 200);
    assert!(head.is_chunked());
    assert_eq!(head.headers.get("content-length"), None);
    assert_eq!(head.headers.get("content-type"), Some("application/json"));
    assert_eq!(body, upstream_body);

    let sha256 = decoder.trailers().get("x-content-sha256").unwrap();
    assert_eq!(sha256.len(), 64);
    assert_eq!(sha256, sha256_hex(&upstream_body));
    assert_eq!(
        decoder.trailers().get("x-content-length"),
        Some(upstream_body.len().to_string().as_str())
    );

    handle.close();
}

#[tokio::test]
async fn test_proxy_relay_chunked_upstream() {
    let upstream = spawn_upstream(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n"
            .to_vec(),
    )
    .await;

    let relay = ProxyRelay::new(&format!("http://{}/", upstream), "/httpbin/")
        .unwrap()
        .read_size(7);
    let handle = Server::bind("127.0.0.1:0")
        .await
        .unwrap()
        .proxy(relay)
        .serve(Pages);
    let addr = handle.local_addr().unwrap();

    let response = send(addr, b"GET /httpbin/stream/3 HTTP/1.1\r\n\r\n").await;
    let (_, body, decoder) = decode(&response);
    assert_eq!(body, b"hello world");
    assert_eq!(
        decoder.trailers().get("x-content-sha256"),
        Some(sha256_hex(b"hello world").as_str())
    );
    assert_eq!(decoder.trailers().get("x-content-length"), Some("11"));

    handle.close();
}

#[tokio::test]
async fn test_proxy_relay_bodiless_status() {
    let upstream = spawn_upstream(b"HTTP/1.1 204 No Content\r\nX-A: 1\r\n\r\n".to_vec()).await;

    let relay = ProxyRelay::new(&format!("http://{}", upstream), "/httpbin/").unwrap();
    let handle = Server::bind("127.0.0.1:0")
        .await
        .unwrap()
        .proxy(relay)
        .serve(Pages);
    let addr = handle.local_addr().unwrap();

    // chunked の枠もトレーラーも付かない
    let response = send(addr, b"GET /httpbin/stream/3 HTTP/1.1\r\n\r\n").await;
    assert_eq!(
        response,
        b"HTTP/1.1 204 \r\nx-a: 1\r\nconnection: close\r\n\r\n"
    );

    handle.close();
}

#[tokio::test]
async fn test_proxy_relay_truncated_upstream() {
    let upstream = spawn_upstream(
        b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhello".to_vec(),
    )
    .await;

    let relay = ProxyRelay::new(&format!("http://{}", upstream), "/httpbin/").unwrap();
    let handle = Server::bind("127.0.0.1:0")
        .await
        .unwrap()
        .proxy(relay)
        .serve(Pages);
    let addr = handle.local_addr().unwrap();

    // 受け取った分だけ流して打ち切る。終端チャンクもトレーラーも送らない
    let response = send(addr, b"GET /httpbin/stream/3 HTTP/1.1\r\n\r\n").await;
    let head_end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .unwrap()
        + 4;
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert_eq!(&response[head_end..], b"5\r\nhello\r\n");

    handle.close();
}

#[tokio::test]
async fn test_proxy_relay_unreachable_upstream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = listener.local_addr().unwrap();
    drop(listener);

    let relay = ProxyRelay::new(&format!("http://{}", upstream), "/httpbin/").unwrap();
    let handle = Server::bind("127.0.0.1:0")
        .await
        .unwrap()
        .proxy(relay)
        .serve(Pages);
    let addr = handle.local_addr().unwrap();

    let response = send(addr, b"GET /httpbin/stream/3 HTTP/1.1\r\n\r\n").await;
    let (head, body, _) = decode(&response);
    assert_eq!(head.status_code, 500);
    // 接続エラーの詳細はクライアントに返さない
    assert_eq!(body, b"Internal Server Error");

    handle.close();
}
