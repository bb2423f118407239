//! ボディデコーダーの定義

use crate::error::Error;
use crate::headers::{HeaderStore, find_line};

use super::phase::ChunkPhase;

/// ボディの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Content-Length で指定された固定長
    ContentLength(usize),
    /// Transfer-Encoding: chunked
    Chunked,
    /// 接続が閉じるまでがボディ (close-delimited)
    ///
    /// RFC 9112: レスポンスで Transfer-Encoding も Content-Length もない場合、
    /// 接続が閉じられるまでをボディとして扱う
    CloseDelimited,
    /// ボディなし
    None,
}

/// ボディデコードの進捗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyProgress {
    /// まだデータがある（続きを読む）
    Continue,
    /// 完了
    Complete,
}

/// chunked ボディのデコーダー (Sans I/O)
///
/// 入力バッファは呼び出し側が保持する。`decode()` は処理できた分を
/// 入力バッファから取り除き、チャンクデータを `out` に追加する。
///
/// ```rust
/// use tcp_http11::{BodyProgress, ChunkedDecoder};
///
/// let mut decoder = ChunkedDecoder::new();
/// let mut input = b"5\r\nhello\r\n0\r\n\r\n".to_vec();
/// let mut out = Vec::new();
/// assert_eq!(decoder.decode(&mut input, &mut out).unwrap(), BodyProgress::Complete);
/// assert_eq!(out, b"hello");
/// ```
#[derive(Debug)]
pub struct ChunkedDecoder {
    phase: ChunkPhase,
    trailers: HeaderStore,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            phase: ChunkPhase::Size,
            trailers: HeaderStore::new(),
        }
    }

    /// 終端チャンクとトレーラーまで読み終えたか
    pub fn is_complete(&self) -> bool {
        self.phase == ChunkPhase::Complete
    }

    /// 受信したトレーラー
    pub fn trailers(&self) -> &HeaderStore {
        &self.trailers
    }

    /// 入力をデコードしてチャンクデータを `out` に追加
    pub fn decode(&mut self, input: &mut Vec<u8>, out: &mut Vec<u8>) -> Result<BodyProgress, Error> {
        loop {
            match self.phase {
                ChunkPhase::Size => {
                    let Some(pos) = find_line(input) else {
                        return Ok(BodyProgress::Continue);
                    };
                    let size = parse_chunk_size(&input[..pos])?;
                    input.drain(..pos + 2);
                    self.phase = if size == 0 {
                        ChunkPhase::Trailer
                    } else {
                        ChunkPhase::Data { remaining: size }
                    };
                }
                ChunkPhase::Data { remaining } => {
                    if input.is_empty() {
                        return Ok(BodyProgress::Continue);
                    }
                    let n = input.len().min(remaining);
                    out.extend_from_slice(&input[..n]);
                    input.drain(..n);
                    self.phase = if n == remaining {
                        ChunkPhase::DataCrlf
                    } else {
                        ChunkPhase::Data {
                            remaining: remaining - n,
                        }
                    };
                }
                ChunkPhase::DataCrlf => {
                    if input.len() < 2 {
                        return Ok(BodyProgress::Continue);
                    }
                    if &input[..2] != b"\r\n" {
                        return Err(Error::InvalidChunk(
                            "missing CRLF after chunk data".to_string(),
                        ));
                    }
                    input.drain(..2);
                    self.phase = ChunkPhase::Size;
                }
                ChunkPhase::Trailer => {
                    let (n, done) = self.trailers.parse_line(input)?;
                    if n == 0 {
                        return Ok(BodyProgress::Continue);
                    }
                    input.drain(..n);
                    if done {
                        self.phase = ChunkPhase::Complete;
                    }
                }
                ChunkPhase::Complete => return Ok(BodyProgress::Complete),
            }
        }
    }
}

/// チャンクサイズ行をパース (拡張は無視)
fn parse_chunk_size(line: &[u8]) -> Result<usize, Error> {
    let line = String::from_utf8_lossy(line);
    let size = line.split(';').next().unwrap_or_default().trim();
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidChunk(format!("invalid chunk size: {:?}", size)));
    }
    usize::from_str_radix(size, 16)
        .map_err(|_| Error::InvalidChunk(format!("chunk size overflow: {}", size)))
}
