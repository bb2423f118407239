//! アップストリームへのプロキシ中継
//!
//! アップストリームのレスポンスを chunked で再エンコードしながら流し、
//! 最後にボディの SHA-256 と長さをトレーラーとして送る。
//! 1xx / 204 / 304 のようにボディを持たないレスポンスはヘッダーだけを送る。
//!
//! ```text
//! GET /httpbin/stream/3        ->  GET https://httpbin.org/stream/3
//!
//! HTTP/1.1 200 OK
//! transfer-encoding: chunked
//! trailer: X-Content-Sha256, X-Content-Length
//!
//! <chunk>...
//! 0
//! x-content-sha256: <64 桁の 16 進数>
//! x-content-length: <バイト数>
//! ```

use std::pin::Pin;
#[cfg(feature = "tls")]
use std::sync::Arc;
use std::task::{Context, Poll};

#[cfg(feature = "tls")]
use rustls::ClientConfig;
#[cfg(feature = "tls")]
use rustls_pki_types::ServerName;
use sha2::{Digest, Sha256};
use tcp_http11::{
    BodyKind, BodyProgress, HeaderStore, Request, ResponseDecoder, ResponseHead, StatusCode,
    encode_request_head,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
#[cfg(feature = "tls")]
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};
use crate::server::{Handler, HandlerError};
use crate::writer::ResponseWriter;

/// 1 回の読み取りサイズのデフォルト
pub const DEFAULT_READ_SIZE: usize = 1024;

const SHA256_TRAILER: &str = "X-Content-Sha256";
const LENGTH_TRAILER: &str = "X-Content-Length";

/// OS のルート証明書ストアを使用するデフォルトの TLS 設定を作成
#[cfg(feature = "tls")]
fn default_tls_config() -> Arc<ClientConfig> {
    Arc::new(
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(rustls_platform_verifier::Verifier::new()))
            .with_no_client_auth(),
    )
}

/// 中継したボディのダイジェスト
///
/// 1 回の中継の間だけ使う。
#[derive(Debug, Clone, Default)]
pub struct ProxyDigest {
    hasher: Sha256,
    length: u64,
}

impl ProxyDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.length += data.len() as u64;
    }

    /// これまでに受け取ったバイト数
    pub fn length(&self) -> u64 {
        self.length
    }

    /// SHA-256 (小文字 16 進数 64 桁) とバイト数を返す
    pub fn finish(self) -> (String, u64) {
        let hash = self.hasher.finalize();
        let hex = hash.iter().map(|b| format!("{:02x}", b)).collect();
        (hex, self.length)
    }
}

/// 中継結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySummary {
    pub status_code: u16,
    pub sha256: String,
    pub length: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Http,
    Https,
}

/// アップストリームの接続先
#[derive(Debug, Clone, PartialEq, Eq)]
struct Upstream {
    scheme: Scheme,
    host: String,
    port: u16,
    /// 末尾の `/` を除いたベースパス
    base_path: String,
}

impl Upstream {
    fn parse(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::InvalidUrl(format!("missing scheme: {}", url)))?;
        let scheme = match scheme {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => {
                return Err(Error::InvalidUrl(
                    "URL must start with http:// or https://".to_string(),
                ));
            }
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(Error::InvalidUrl("URL must have a host".to_string()));
        }

        let default_port = match scheme {
            Scheme::Http => 80,
            Scheme::Https => 443,
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::InvalidUrl(format!("invalid port: {}", port)))?;
                (host, port)
            }
            None => (authority, default_port),
        };
        if host.is_empty() {
            return Err(Error::InvalidUrl("URL must have a host".to_string()));
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            base_path: path.trim_end_matches('/').to_string(),
        })
    }

    fn host_header(&self) -> String {
        match (self.scheme, self.port) {
            (Scheme::Http, 80) | (Scheme::Https, 443) => self.host.clone(),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

/// アップストリームへの接続 (平文または TLS)
enum UpstreamStream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for UpstreamStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            UpstreamStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            UpstreamStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for UpstreamStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            UpstreamStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            UpstreamStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            UpstreamStream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls")]
            UpstreamStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            UpstreamStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            UpstreamStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// プロキシ中継ハンドラー
///
/// `prefix` で始まるリクエストターゲットを、プレフィックスを外して
/// アップストリームのベースパスの下に転送する。
///
/// ```ignore
/// use tokio_tcp_http11::{ProxyRelay, Server};
///
/// let relay = ProxyRelay::new("https://httpbin.org", "/httpbin/")?;
/// let handle = Server::bind("0.0.0.0:42069").await?.proxy(relay).serve(handler);
/// ```
#[derive(Debug, Clone)]
pub struct ProxyRelay {
    upstream: Upstream,
    prefix: String,
    read_size: usize,
    #[cfg(feature = "tls")]
    tls_config: Option<Arc<ClientConfig>>,
}

impl ProxyRelay {
    pub fn new(upstream_url: &str, prefix: &str) -> Result<Self> {
        let upstream = Upstream::parse(upstream_url)?;
        Ok(Self {
            upstream,
            prefix: prefix.to_string(),
            read_size: DEFAULT_READ_SIZE,
            #[cfg(feature = "tls")]
            tls_config: None,
        })
    }

    /// アップストリームからの 1 回の読み取りサイズを設定 (0 の場合は 1)
    pub fn read_size(mut self, size: usize) -> Self {
        self.read_size = size.max(1);
        self
    }

    /// TLS 設定を指定 (省略時は OS のルート証明書を使用)
    #[cfg(feature = "tls")]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// ターゲットが中継対象か
    pub fn matches(&self, target: &str) -> bool {
        target.starts_with(&self.prefix)
    }

    /// アップストリームに送るリクエストターゲットを返す
    ///
    /// `/httpbin/stream/3` (プレフィックス `/httpbin/`) は
    /// `<ベースパス>/stream/3` になる。
    pub fn upstream_target(&self, target: &str) -> Option<String> {
        let suffix = target.strip_prefix(&self.prefix)?;
        Some(format!("{}/{}", self.upstream.base_path, suffix))
    }

    /// `target` をアップストリームに中継する
    pub async fn relay<W>(&self, target: &str, writer: &mut ResponseWriter<W>) -> Result<RelaySummary>
    where
        W: AsyncWrite + Unpin,
    {
        let upstream_target = self
            .upstream_target(target)
            .ok_or_else(|| Error::InvalidUrl(format!("target outside {}: {}", self.prefix, target)))?;

        let mut stream = self.connect().await?;
        let mut headers = HeaderStore::new();
        headers.set("Host", &self.upstream.host_header());
        headers.set("User-Agent", concat!("tcp_http11/", env!("CARGO_PKG_VERSION")));
        headers.set("Accept", "*/*");
        headers.set("Connection", "close");
        stream
            .write_all(&encode_request_head("GET", &upstream_target, &headers))
            .await?;
        stream.flush().await?;
        tracing::debug!(
            host = %self.upstream.host,
            path = %upstream_target,
            "sent upstream request"
        );

        let mut decoder = ResponseDecoder::new();
        let mut buf = vec![0u8; self.read_size];
        let (head, kind) = loop {
            let n = read_upstream(&mut stream, &mut decoder, &mut buf).await?;
            if let Some(parsed) = decoder.decode_head()? {
                break parsed;
            }
            if n == 0 {
                return Err(Error::UpstreamClosed);
            }
        };

        writer
            .write_status_line(StatusCode::new(head.status_code))
            .await?;
        let (sha256, length) = if matches!(kind, BodyKind::None) {
            writer.write_headers(&bodiless_headers(&head)).await?;
            writer.write_body(&[]).await?;
            ProxyDigest::new().finish()
        } else {
            writer.write_headers(&relay_headers(&head)).await?;
            relay_chunked(&mut stream, &mut decoder, &mut buf, writer).await?
        };

        tracing::info!(
            path = %target,
            status = head.status_code,
            length,
            sha256 = %sha256,
            "relayed upstream response"
        );
        Ok(RelaySummary {
            status_code: head.status_code,
            sha256,
            length,
        })
    }

    async fn connect(&self) -> Result<UpstreamStream> {
        let addr = format!("{}:{}", self.upstream.host, self.upstream.port);
        let stream = TcpStream::connect(&addr).await?;
        match self.upstream.scheme {
            Scheme::Http => Ok(UpstreamStream::Plain(stream)),
            #[cfg(feature = "tls")]
            Scheme::Https => {
                let tls_config = self.tls_config.clone().unwrap_or_else(default_tls_config);
                let connector = TlsConnector::from(tls_config);
                let server_name = ServerName::try_from(self.upstream.host.clone())?;
                let tls_stream = connector
                    .connect(server_name, stream)
                    .await
                    .map_err(|e| Error::Tls(e.to_string()))?;
                Ok(UpstreamStream::Tls(Box::new(tls_stream)))
            }
            #[cfg(not(feature = "tls"))]
            Scheme::Https => Err(Error::Tls("TLS support is disabled".to_string())),
        }
    }
}

impl Handler for ProxyRelay {
    async fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> std::result::Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.relay(request.target(), writer).await?;
        Ok(())
    }
}

/// 1 回読み取ってデコーダーに渡し、読んだバイト数を返す (0 は EOF)
async fn read_upstream(
    stream: &mut UpstreamStream,
    decoder: &mut ResponseDecoder,
    buf: &mut [u8],
) -> Result<usize> {
    let n = stream.read(buf).await?;
    if n == 0 {
        decoder.mark_eof();
    } else {
        decoder.feed(&buf[..n]);
    }
    Ok(n)
}

/// ボディを chunked で流し、終端チャンクとダイジェストのトレーラーを書く
///
/// 途中で失敗した場合、終端チャンクもトレーラーも送らない。
async fn relay_chunked<W>(
    stream: &mut UpstreamStream,
    decoder: &mut ResponseDecoder,
    buf: &mut [u8],
    writer: &mut ResponseWriter<W>,
) -> Result<(String, u64)>
where
    W: AsyncWrite + Unpin,
{
    let mut digest = ProxyDigest::new();
    let mut body = Vec::with_capacity(buf.len());
    loop {
        let progress = decoder.decode_body(&mut body)?;
        if !body.is_empty() {
            writer.write_chunked_body(&body).await?;
            digest.update(&body);
            body.clear();
        }
        if progress == BodyProgress::Complete {
            break;
        }
        read_upstream(stream, decoder, buf).await?;
    }

    writer.write_chunked_body_done().await?;
    let (sha256, length) = digest.finish();
    let mut trailers = HeaderStore::new();
    trailers.set(SHA256_TRAILER, &sha256);
    trailers.set(LENGTH_TRAILER, &length.to_string());
    writer.write_trailers(&trailers).await?;
    Ok((sha256, length))
}

/// ボディを持たないレスポンスのヘッダー
///
/// フレーミング関連のヘッダーを外す。接続は中継後に閉じる。
fn bodiless_headers(head: &ResponseHead) -> HeaderStore {
    let mut headers = head.headers.clone();
    headers.remove("Content-Length");
    headers.remove("Transfer-Encoding");
    headers.remove("Trailer");
    headers.set("Connection", "close");
    headers
}

/// アップストリームのヘッダーを chunked 中継用に書き換える
fn relay_headers(head: &ResponseHead) -> HeaderStore {
    let mut headers = head.headers.clone();
    headers.remove("Content-Length");
    headers.set("Transfer-Encoding", "chunked");
    headers.set("Trailer", &format!("{}, {}", SHA256_TRAILER, LENGTH_TRAILER));
    headers
}
