//! 非同期レスポンスライター
//!
//! `ResponseEncoder` が生成したバイト列をそのまま `AsyncWrite` に書き込む。
//! 順序違反はエンコーダーが検出するため、違反時には何も書き込まれない。

use tcp_http11::{HeaderStore, ResponseEncoder, StatusCode, WriterState};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;

/// HTTP レスポンスライター
pub struct ResponseWriter<W> {
    inner: W,
    encoder: ResponseEncoder,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            encoder: ResponseEncoder::new(),
            buf: Vec::new(),
        }
    }

    pub fn state(&self) -> WriterState {
        self.encoder.state()
    }

    /// メッセージを最後まで書き終えたか
    pub fn is_finished(&self) -> bool {
        self.encoder.is_finished()
    }

    pub async fn write_status_line(&mut self, code: StatusCode) -> Result<()> {
        self.encoder.status_line(code, &mut self.buf)?;
        self.flush_buf().await
    }

    pub async fn write_headers(&mut self, headers: &HeaderStore) -> Result<()> {
        self.encoder.headers(headers, &mut self.buf)?;
        self.flush_buf().await
    }

    /// 固定長のボディを書き込み、書き込んだバイト数を返す
    pub async fn write_body(&mut self, data: &[u8]) -> Result<usize> {
        self.encoder.body(data, &mut self.buf)?;
        self.flush_buf().await?;
        Ok(data.len())
    }

    /// チャンクを 1 つ書き込み、データのバイト数を返す
    pub async fn write_chunked_body(&mut self, data: &[u8]) -> Result<usize> {
        let n = self.encoder.chunk(data, &mut self.buf)?;
        self.flush_buf().await?;
        Ok(n)
    }

    pub async fn write_chunked_body_done(&mut self) -> Result<()> {
        self.encoder.chunked_done(&mut self.buf)?;
        self.flush_buf().await
    }

    pub async fn write_trailers(&mut self, trailers: &HeaderStore) -> Result<()> {
        self.encoder.trailers(trailers, &mut self.buf)?;
        self.flush_buf().await
    }

    pub async fn finish_trailers(&mut self) -> Result<()> {
        self.encoder.finish_trailers(&mut self.buf)?;
        self.flush_buf().await
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// エンコード済みのバイト列を書き込む
    ///
    /// エンコーダーの状態は既に進んでいるため、失敗時もバッファは空にする。
    async fn flush_buf(&mut self) -> Result<()> {
        let result = self.inner.write_all(&self.buf).await;
        self.buf.clear();
        result?;
        self.inner.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;
    use crate::error::Error;
    use tcp_http11::default_headers;

    /// `broken` の間だけ書き込みに失敗する
    #[derive(Default)]
    struct BrokenPipe {
        broken: bool,
        written: Vec<u8>,
    }

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if self.broken {
                return Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()));
            }
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_failed_write_is_not_resent() {
        let mut writer = ResponseWriter::new(BrokenPipe {
            broken: true,
            ..Default::default()
        });
        let err = writer.write_status_line(StatusCode::OK).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(writer.state(), WriterState::AwaitingHeaders);

        writer.get_mut().broken = false;
        writer.write_headers(&default_headers(0)).await.unwrap();
        assert_eq!(
            writer.into_inner().written,
            b"content-length: 0\r\nconnection: close\r\ncontent-type: text/plain\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_fixed_length_response() {
        let mut writer = ResponseWriter::new(Vec::new());
        writer.write_status_line(StatusCode::OK).await.unwrap();
        writer.write_headers(&default_headers(4)).await.unwrap();
        assert_eq!(writer.write_body(b"pong").await.unwrap(), 4);
        assert_eq!(writer.state(), WriterState::Done);
        let out = writer.into_inner();
        assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with(b"\r\n\r\npong"));
    }

    #[tokio::test]
    async fn test_out_of_order_writes_nothing() {
        let mut writer = ResponseWriter::new(Vec::new());
        let err = writer.write_body(b"early").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Http(tcp_http11::Error::OutOfOrder {
                operation: "write_body",
                ..
            })
        ));
        assert!(writer.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_chunked_with_trailers() {
        let mut writer = ResponseWriter::new(Vec::new());
        let mut headers = HeaderStore::new();
        headers.set("Transfer-Encoding", "chunked");
        headers.set("Trailer", "X-Content-Length");

        writer.write_status_line(StatusCode::OK).await.unwrap();
        writer.write_headers(&headers).await.unwrap();
        writer.get_mut().clear();

        assert_eq!(writer.write_chunked_body(b"0123456789abcdef").await.unwrap(), 16);
        assert_eq!(writer.write_chunked_body(b"").await.unwrap(), 0);
        writer.write_chunked_body_done().await.unwrap();

        let mut trailers = HeaderStore::new();
        trailers.set("X-Content-Length", "16");
        writer.write_trailers(&trailers).await.unwrap();
        assert!(writer.is_finished());
        assert_eq!(
            writer.into_inner(),
            b"10\r\n0123456789abcdef\r\n0\r\nx-content-length: 16\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_finish_without_trailers() {
        let mut writer = ResponseWriter::new(Vec::new());
        let mut headers = HeaderStore::new();
        headers.set("Transfer-Encoding", "chunked");
        writer.write_status_line(StatusCode::new(404)).await.unwrap();
        writer.write_headers(&headers).await.unwrap();
        writer.write_chunked_body_done().await.unwrap();
        writer.finish_trailers().await.unwrap();
        assert_eq!(
            writer.into_inner(),
            b"HTTP/1.1 404 \r\ntransfer-encoding: chunked\r\n\r\n0\r\n\r\n"
        );
    }
}
