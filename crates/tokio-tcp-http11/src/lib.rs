//! tokio_tcp_http11 - Tokio integration for tcp_http11
//!
//! tcp_http11 の Sans I/O パーサー / エンコーダーを tokio のソケットにつなぐ。
//!
//! ## Features
//!
//! - `tls` - HTTPS アップストリームへの中継 (デフォルト有効)
//!
//! ## 特徴
//!
//! - **1 接続 1 タスク**: 接続ごとに tokio タスクを起動する
//! - **1 接続 1 リクエスト**: レスポンス後に書き込み側を閉じる
//! - **プロキシ中継**: アップストリームのレスポンスを chunked で流し、
//!   SHA-256 と長さをトレーラーで送る
//!
//! ## サーバー
//!
//! ```ignore
//! use tokio_tcp_http11::{
//!     Handler, HandlerError, ProxyRelay, ResponseWriter, Server, default_headers,
//! };
//!
//! struct Hello;
//!
//! impl Handler for Hello {
//!     async fn handle<W>(
//!         &self,
//!         _request: &Request,
//!         writer: &mut ResponseWriter<W>,
//!     ) -> Result<(), HandlerError>
//!     where
//!         W: AsyncWrite + Unpin + Send,
//!     {
//!         let body = b"Hello, World!";
//!         writer.write_status_line(StatusCode::OK).await?;
//!         writer.write_headers(&default_headers(body.len())).await?;
//!         writer.write_body(body).await?;
//!         Ok(())
//!     }
//! }
//!
//! let relay = ProxyRelay::new("https://httpbin.org", "/httpbin/")?;
//! let handle = Server::bind("0.0.0.0:42069").await?.proxy(relay).serve(Hello);
//! handle.close();
//! handle.join().await?;
//! ```

pub mod error;
mod reader;
mod relay;
mod server;
mod writer;

pub use error::{Error, Result};
pub use reader::read_request;
pub use relay::{DEFAULT_READ_SIZE, ProxyDigest, ProxyRelay, RelaySummary};
pub use server::{Handler, HandlerError, Server, ServerHandle, serve};
pub use writer::ResponseWriter;

// tcp_http11 の型を re-export
pub use tcp_http11::{HeaderStore, ParserLimits, Request, StatusCode, WriterState, default_headers};
