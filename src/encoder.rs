//! HTTP/1.1 エンコーダー
//!
//! レスポンスは `ResponseEncoder` で順序を強制しながら組み立てる。
//! 各メソッドは出力をバイト列に追記するだけで、書き込みは呼び出し側が行う。

use crate::error::Error;
use crate::headers::HeaderStore;
use crate::response::StatusCode;
use crate::trailer::DeclaredTrailers;

/// レスポンス書き込みの状態
///
/// 前にしか進まない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// ステータスライン待ち
    AwaitingStatusLine,
    /// ヘッダー待ち
    AwaitingHeaders,
    /// ボディ待ち
    AwaitingBody,
    /// ボディ送信済み
    Done,
}

impl WriterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriterState::AwaitingStatusLine => "awaiting status-line",
            WriterState::AwaitingHeaders => "awaiting headers",
            WriterState::AwaitingBody => "awaiting body",
            WriterState::Done => "done",
        }
    }
}

/// ボディの送り方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Unset,
    Raw,
    Chunked,
    /// 終端チャンク送信済み、トレーラーまたは最後の CRLF 待ち
    AwaitingTrailers,
    Finished,
}

/// HTTP レスポンスエンコーダー (Sans I/O)
///
/// ```rust
/// use tcp_http11::{HeaderStore, ResponseEncoder, StatusCode};
///
/// let mut encoder = ResponseEncoder::new();
/// let mut out = Vec::new();
/// let mut headers = HeaderStore::new();
/// headers.set("Transfer-Encoding", "chunked");
///
/// encoder.status_line(StatusCode::OK, &mut out).unwrap();
/// encoder.headers(&headers, &mut out).unwrap();
/// encoder.chunk(b"hello", &mut out).unwrap();
/// encoder.chunked_done(&mut out).unwrap();
/// encoder.finish_trailers(&mut out).unwrap();
///
/// assert_eq!(
///     out,
///     b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n"
/// );
/// ```
#[derive(Debug)]
pub struct ResponseEncoder {
    state: WriterState,
    framing: Framing,
    declared_trailers: Option<DeclaredTrailers>,
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self {
            state: WriterState::AwaitingStatusLine,
            framing: Framing::Unset,
            declared_trailers: None,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// `HTTP/1.1 <code> <reason>\r\n` を出力
    pub fn status_line(&mut self, code: StatusCode, out: &mut Vec<u8>) -> Result<(), Error> {
        self.expect_state(WriterState::AwaitingStatusLine, "write_status_line")?;
        out.extend_from_slice(code.status_line().as_bytes());
        self.state = WriterState::AwaitingHeaders;
        Ok(())
    }

    /// ヘッダーと空行を出力
    ///
    /// `Trailer` ヘッダーがあれば、後で送るトレーラーの宣言として記録する。
    pub fn headers(&mut self, headers: &HeaderStore, out: &mut Vec<u8>) -> Result<(), Error> {
        self.expect_state(WriterState::AwaitingHeaders, "write_headers")?;
        if headers.is_empty() {
            return Err(Error::EmptyHeaders);
        }
        let declared = headers.get("Trailer").map(DeclaredTrailers::parse).transpose()?;

        write_fields(headers, out);
        out.extend_from_slice(b"\r\n");

        self.declared_trailers = declared;
        self.state = WriterState::AwaitingBody;
        Ok(())
    }

    /// 固定長のボディを出力
    pub fn body(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<(), Error> {
        self.expect_state(WriterState::AwaitingBody, "write_body")?;
        if self.framing != Framing::Unset {
            return Err(self.out_of_order("write_body"));
        }
        out.extend_from_slice(data);
        self.framing = Framing::Raw;
        self.state = WriterState::Done;
        Ok(())
    }

    /// チャンクを 1 つ出力し、データのバイト数を返す
    ///
    /// 空のデータは何も出力しない (終端チャンクと区別できないため)。
    pub fn chunk(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<usize, Error> {
        self.expect_state(WriterState::AwaitingBody, "write_chunked_body")?;
        if !matches!(self.framing, Framing::Unset | Framing::Chunked) {
            return Err(self.out_of_order("write_chunked_body"));
        }
        self.framing = Framing::Chunked;
        if data.is_empty() {
            return Ok(0);
        }
        push_chunk(data, out);
        Ok(data.len())
    }

    /// 終端チャンク `0\r\n` を出力
    ///
    /// 最後の CRLF は `trailers()` または `finish_trailers()` が出力する。
    pub fn chunked_done(&mut self, out: &mut Vec<u8>) -> Result<(), Error> {
        self.expect_state(WriterState::AwaitingBody, "write_chunked_body_done")?;
        if !matches!(self.framing, Framing::Unset | Framing::Chunked) {
            return Err(self.out_of_order("write_chunked_body_done"));
        }
        out.extend_from_slice(b"0\r\n");
        self.framing = Framing::AwaitingTrailers;
        self.state = WriterState::Done;
        Ok(())
    }

    /// トレーラーと最後の CRLF を出力
    ///
    /// すべてのフィールドが `Trailer` ヘッダーで宣言されている必要がある。
    pub fn trailers(&mut self, trailers: &HeaderStore, out: &mut Vec<u8>) -> Result<(), Error> {
        if self.framing != Framing::AwaitingTrailers {
            return Err(self.out_of_order("write_trailers"));
        }
        if trailers.is_empty() {
            return Err(Error::EmptyHeaders);
        }
        for (name, _) in trailers.iter() {
            let declared = self
                .declared_trailers
                .as_ref()
                .is_some_and(|t| t.declares(name));
            if !declared {
                return Err(Error::TrailerNotDeclared(name.to_string()));
            }
        }

        write_fields(trailers, out);
        out.extend_from_slice(b"\r\n");
        self.framing = Framing::Finished;
        Ok(())
    }

    /// トレーラーなしで chunked ボディを閉じる
    pub fn finish_trailers(&mut self, out: &mut Vec<u8>) -> Result<(), Error> {
        if self.framing != Framing::AwaitingTrailers {
            return Err(self.out_of_order("finish_trailers"));
        }
        out.extend_from_slice(b"\r\n");
        self.framing = Framing::Finished;
        Ok(())
    }

    /// メッセージを最後まで出力し終えたか
    pub fn is_finished(&self) -> bool {
        matches!(self.framing, Framing::Raw | Framing::Finished)
    }

    fn expect_state(&self, expected: WriterState, operation: &'static str) -> Result<(), Error> {
        if self.state != expected {
            return Err(self.out_of_order(operation));
        }
        Ok(())
    }

    fn out_of_order(&self, operation: &'static str) -> Error {
        Error::OutOfOrder {
            operation,
            state: self.state.as_str(),
        }
    }
}

/// リクエストヘッド (リクエストライン + ヘッダー + 空行) をエンコード
///
/// プロキシがアップストリームへ送るリクエストに使う。
pub fn encode_request_head(method: &str, target: &str, headers: &HeaderStore) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(method.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(target.as_bytes());
    buf.extend_from_slice(b" HTTP/1.1\r\n");
    write_fields(headers, &mut buf);
    buf.extend_from_slice(b"\r\n");
    buf
}

fn write_fields(headers: &HeaderStore, out: &mut Vec<u8>) {
    for (name, value) in headers.iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
}

/// チャンクサイズは大文字の 16 進数
fn push_chunk(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(format!("{:X}\r\n", data.len()).as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}
