//! HTTP サーバー
//!
//! 接続ごとに tokio タスクを 1 つ起動し、リクエストを 1 つ読み取って
//! ハンドラーに渡した後、書き込み側を閉じる。Keep-Alive はしない。
//!
//! ## 使い方
//!
//! ```ignore
//! use tokio_tcp_http11::{Handler, HandlerError, ResponseWriter, serve};
//!
//! let handle = serve(42069, MyHandler).await?;
//! // ...
//! handle.close();
//! handle.join().await?;
//! ```

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tcp_http11::{ParserLimits, Request, StatusCode, WriterState, default_headers};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::reader::read_request;
use crate::relay::ProxyRelay;
use crate::writer::ResponseWriter;

/// HTTP リクエストハンドラー
///
/// レスポンスは `writer` に直接書き込む。ステータスラインを書く前に
/// `HandlerError` を返した場合は、サーバーがエラーレスポンスを書き込む。
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> impl Future<Output = std::result::Result<(), HandlerError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

/// ハンドラーが返すエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub status_code: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

impl std::error::Error for HandlerError {}

/// 内部エラーの詳細はログにだけ残し、クライアントには固定の文言を返す
impl From<Error> for HandlerError {
    fn from(e: Error) -> Self {
        tracing::error!(error = %e, "handler failed");
        let status_code = StatusCode::INTERNAL_SERVER_ERROR;
        HandlerError::new(status_code, status_code.reason_phrase())
    }
}

/// ポートを指定してサーバーを起動
///
/// `0.0.0.0:<port>` にバインドし、accept ループを別タスクで動かす。
pub async fn serve<H: Handler>(port: u16, handler: H) -> Result<ServerHandle> {
    let server = Server::bind(&format!("0.0.0.0:{}", port)).await?;
    Ok(server.serve(handler))
}

/// HTTP サーバー
pub struct Server {
    listener: TcpListener,
    limits: ParserLimits,
    proxy: Option<ProxyRelay>,
}

impl Server {
    /// 指定アドレスにバインド
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            limits: ParserLimits::default(),
            proxy: None,
        })
    }

    /// 読み取りバッファの初期サイズを設定
    pub fn initial_buffer_size(mut self, size: usize) -> Self {
        self.limits.initial_buffer_size = size;
        self
    }

    /// 読み取りバッファの最大サイズを設定
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.limits.max_buffer_size = size;
        self
    }

    /// プレフィックスに一致するリクエストをアップストリームに中継する
    pub fn proxy(mut self, relay: ProxyRelay) -> Self {
        self.proxy = Some(relay);
        self
    }

    /// ローカルアドレスを取得
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// accept ループを起動
    ///
    /// tokio ランタイム上で呼ぶ必要がある。
    pub fn serve<H: Handler>(self, handler: H) -> ServerHandle {
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            shutdown: Notify::new(),
        });
        let local_addr = self.listener.local_addr().ok();
        let config = Arc::new(ConnectionConfig {
            limits: self.limits,
            proxy: self.proxy,
        });
        let task = tokio::spawn(accept_loop(
            self.listener,
            shared.clone(),
            Arc::new(handler),
            config,
        ));
        ServerHandle {
            shared,
            local_addr,
            task,
        }
    }
}

struct Shared {
    running: AtomicBool,
    shutdown: Notify,
}

/// 起動中のサーバーのハンドル
pub struct ServerHandle {
    shared: Arc<Shared>,
    local_addr: Option<SocketAddr>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// 新しい接続の受け付けを止める
    ///
    /// 何度呼んでもよい。処理中の接続は最後まで処理される。
    pub fn close(&self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            self.shared.shutdown.notify_one();
        }
    }

    /// accept ループの終了を待つ
    pub async fn join(self) -> Result<()> {
        self.task.await.map_err(|e| Error::Io(std::io::Error::other(e)))
    }
}

pub(crate) struct ConnectionConfig {
    pub(crate) limits: ParserLimits,
    pub(crate) proxy: Option<ProxyRelay>,
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    shared: Arc<Shared>,
    handler: Arc<H>,
    config: Arc<ConnectionConfig>,
) {
    while shared.running.load(Ordering::Acquire) {
        let accepted = tokio::select! {
            _ = shared.shutdown.notified() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "unable to accept connection");
                shared.running.store(false, Ordering::Release);
                break;
            }
        };
        tracing::debug!(peer = %peer, "accepted connection");

        let handler = handler.clone();
        let config = config.clone();
        tokio::spawn(async move {
            serve_connection(stream, peer, handler.as_ref(), &config).await;
            tracing::debug!(peer = %peer, "handled connection, closing");
        });
    }
    tracing::info!("server stopped accepting connections");
}

/// 1 つの接続でリクエストを 1 つ処理する
///
/// パースに失敗した場合はレスポンスを返さずに接続を閉じる。
pub(crate) async fn serve_connection<S, H>(
    mut stream: S,
    peer: SocketAddr,
    handler: &H,
    config: &ConnectionConfig,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    H: Handler,
{
    match read_request(&mut stream, &config.limits).await {
        Ok(request) => {
            tracing::debug!(
                peer = %peer,
                method = request.method(),
                path = request.target(),
                "parsed request"
            );
            let mut writer = ResponseWriter::new(&mut stream);
            let result = match &config.proxy {
                Some(relay) if relay.matches(request.target()) => {
                    relay.handle(&request, &mut writer).await
                }
                _ => handler.handle(&request, &mut writer).await,
            };
            if let Err(e) = result {
                report_handler_error(&mut writer, peer, e).await;
            }
        }
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "unable to parse request, dropping connection");
        }
    }

    if let Err(e) = stream.shutdown().await {
        tracing::debug!(peer = %peer, error = %e, "unable to close write side");
    }
}

/// レスポンス未送信ならエラーレスポンスを書き込み、送信済みならログのみ
async fn report_handler_error<W>(writer: &mut ResponseWriter<W>, peer: SocketAddr, e: HandlerError)
where
    W: AsyncWrite + Unpin,
{
    if writer.state() != WriterState::AwaitingStatusLine {
        tracing::error!(peer = %peer, error = %e, "handler failed after the response started");
        return;
    }
    tracing::warn!(peer = %peer, status = e.status_code.as_u16(), message = %e.message, "handler returned an error");

    let result = async {
        writer.write_status_line(e.status_code).await?;
        writer
            .write_headers(&default_headers(e.message.len()))
            .await?;
        writer.write_body(e.message.as_bytes()).await?;
        Ok::<_, Error>(())
    }
    .await;
    if let Err(write_err) = result {
        tracing::error!(peer = %peer, error = %write_err, "unable to write error response");
    }
}
