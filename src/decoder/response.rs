//! HTTP レスポンスデコーダー
//!
//! プロキシがアップストリームから受け取るレスポンスのデコードに使う。

use crate::error::Error;
use crate::headers::{HeaderStore, find_line};

use super::body::{BodyKind, BodyProgress, ChunkedDecoder};
use super::head::ResponseHead;
use super::phase::ResponsePhase;
use super::request::parse_content_length;

/// HTTP レスポンスデコーダー (Sans I/O)
///
/// ヘッダーを `decode_head()` で取り出した後、`decode_body()` で
/// 届いた分だけボディをストリーミングで取り出す。
/// chunked の場合はチャンクを外したデータを返す。
///
/// ```rust
/// use tcp_http11::{BodyProgress, ResponseDecoder};
///
/// let mut decoder = ResponseDecoder::new();
/// decoder.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhel");
/// let (head, _) = decoder.decode_head().unwrap().unwrap();
/// assert_eq!(head.status_code, 200);
///
/// let mut body = Vec::new();
/// assert_eq!(decoder.decode_body(&mut body).unwrap(), BodyProgress::Continue);
/// decoder.feed(b"lo");
/// assert_eq!(decoder.decode_body(&mut body).unwrap(), BodyProgress::Complete);
/// assert_eq!(body, b"hello");
/// ```
#[derive(Debug)]
pub struct ResponseDecoder {
    buf: Vec<u8>,
    phase: ResponsePhase,
    status_line: Option<(String, u16, String)>,
    headers: HeaderStore,
    body_kind: BodyKind,
    remaining: usize,
    chunked: ChunkedDecoder,
    eof: bool,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    /// 新しいデコーダーを作成
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            phase: ResponsePhase::StatusLine,
            status_line: None,
            headers: HeaderStore::new(),
            body_kind: BodyKind::None,
            remaining: 0,
            chunked: ChunkedDecoder::new(),
            eof: false,
        }
    }

    /// バッファにデータを追加
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// 接続が閉じられたことを通知
    ///
    /// close-delimited のボディはこれで完了になる。
    /// それ以外のボディが途中であれば `decode_body()` がエラーを返す。
    pub fn mark_eof(&mut self) {
        self.eof = true;
    }

    /// ボディまで読み終えたか
    pub fn is_complete(&self) -> bool {
        self.phase == ResponsePhase::Complete
    }

    /// chunked ボディのトレーラー
    ///
    /// chunked 以外、またはボディ完了前は空。
    pub fn trailers(&self) -> &HeaderStore {
        self.chunked.trailers()
    }

    /// ヘッダーをデコード
    ///
    /// ヘッダーが完了したら `Some((ResponseHead, BodyKind))` を返す。
    /// データ不足の場合は `None` を返す。
    pub fn decode_head(&mut self) -> Result<Option<(ResponseHead, BodyKind)>, Error> {
        loop {
            match self.phase {
                ResponsePhase::StatusLine => {
                    let Some(pos) = find_line(&self.buf) else {
                        return Ok(None);
                    };
                    let status_line = parse_status_line(&self.buf[..pos])?;
                    self.buf.drain(..pos + 2);
                    self.status_line = Some(status_line);
                    self.phase = ResponsePhase::Headers;
                }
                ResponsePhase::Headers => {
                    let (n, done) = self.headers.parse_line(&self.buf)?;
                    if n == 0 {
                        return Ok(None);
                    }
                    self.buf.drain(..n);
                    if !done {
                        continue;
                    }

                    let (version, status_code, reason_phrase) =
                        self.status_line.take().ok_or(Error::OutOfOrder {
                            operation: "decode_head",
                            state: "parsing headers",
                        })?;
                    let head = ResponseHead {
                        version,
                        status_code,
                        reason_phrase,
                        headers: std::mem::take(&mut self.headers),
                    };
                    let body_kind = determine_body_kind(&head)?;
                    self.body_kind = body_kind;
                    self.phase = match body_kind {
                        BodyKind::ContentLength(0) | BodyKind::None => ResponsePhase::Complete,
                        BodyKind::ContentLength(len) => {
                            self.remaining = len;
                            ResponsePhase::Body
                        }
                        BodyKind::Chunked | BodyKind::CloseDelimited => ResponsePhase::Body,
                    };
                    return Ok(Some((head, body_kind)));
                }
                ResponsePhase::Body | ResponsePhase::Complete => {
                    return Err(Error::OutOfOrder {
                        operation: "decode_head",
                        state: "decoding body",
                    });
                }
            }
        }
    }

    /// 届いている分のボディを `out` に追加
    pub fn decode_body(&mut self, out: &mut Vec<u8>) -> Result<BodyProgress, Error> {
        match self.phase {
            ResponsePhase::Complete => return Ok(BodyProgress::Complete),
            ResponsePhase::Body => {}
            ResponsePhase::StatusLine | ResponsePhase::Headers => {
                return Err(Error::OutOfOrder {
                    operation: "decode_body",
                    state: "decoding head",
                });
            }
        }

        let progress = match self.body_kind {
            BodyKind::ContentLength(_) => {
                let n = self.buf.len().min(self.remaining);
                out.extend_from_slice(&self.buf[..n]);
                self.buf.drain(..n);
                self.remaining -= n;
                if self.remaining == 0 {
                    BodyProgress::Complete
                } else {
                    BodyProgress::Continue
                }
            }
            BodyKind::Chunked => self.chunked.decode(&mut self.buf, out)?,
            BodyKind::CloseDelimited => {
                out.append(&mut self.buf);
                if self.eof {
                    BodyProgress::Complete
                } else {
                    BodyProgress::Continue
                }
            }
            BodyKind::None => BodyProgress::Complete,
        };

        match progress {
            BodyProgress::Complete => {
                self.phase = ResponsePhase::Complete;
                Ok(BodyProgress::Complete)
            }
            BodyProgress::Continue if self.eof => Err(Error::IncompleteBody),
            BodyProgress::Continue => Ok(BodyProgress::Continue),
        }
    }
}

/// ステータスラインをパース
///
/// HTTP-version SP status-code SP [ reason-phrase ]
fn parse_status_line(raw: &[u8]) -> Result<(String, u16, String), Error> {
    let line = String::from_utf8_lossy(raw);
    let invalid = || Error::InvalidStatusLine(line.to_string());

    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or_else(invalid)?;
    let code = parts.next().ok_or_else(invalid)?;
    let reason = parts.next().unwrap_or_default();

    if !version.starts_with("HTTP/1.") {
        return Err(invalid());
    }
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let status_code: u16 = code.parse().map_err(|_| invalid())?;
    if status_code < 100 {
        return Err(invalid());
    }

    Ok((version.to_string(), status_code, reason.to_string()))
}

/// ボディの種類を決定 (RFC 9112 Section 6.3)
fn determine_body_kind(head: &ResponseHead) -> Result<BodyKind, Error> {
    if head.is_informational() || head.status_code == 204 || head.status_code == 304 {
        return Ok(BodyKind::None);
    }
    if head.headers.contains("Transfer-Encoding") {
        // chunked 以外の転送コーディングは接続終了まで読む
        return Ok(if head.is_chunked() {
            BodyKind::Chunked
        } else {
            BodyKind::CloseDelimited
        });
    }
    let Some(raw) = head.headers.get("Content-Length") else {
        return Ok(BodyKind::CloseDelimited);
    };

    // 同じ値の Content-Length が複数あった場合は結合されている
    let mut declared: Option<usize> = None;
    for value in raw.split(',') {
        let len = parse_content_length(value)?;
        if declared.is_some_and(|prev| prev != len) {
            return Err(Error::InvalidContentLength(raw.to_string()));
        }
        declared = Some(len);
    }
    declared
        .map(BodyKind::ContentLength)
        .ok_or_else(|| Error::InvalidContentLength(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(data: &[u8]) -> Result<(ResponseHead, Vec<u8>), Error> {
        let mut decoder = ResponseDecoder::new();
        decoder.feed(data);
        decoder.mark_eof();
        let (head, _) = decoder.decode_head()?.ok_or(Error::IncompleteBody)?;
        let mut body = Vec::new();
        decoder.decode_body(&mut body)?;
        Ok((head, body))
    }

    #[test]
    fn test_content_length() {
        let (head, body) =
            decode_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-A: b\r\n\r\nhello").unwrap();
        assert_eq!(head.status_code, 200);
        assert_eq!(head.reason_phrase, "OK");
        assert_eq!(head.headers.get("x-a"), Some("b"));
        assert_eq!(body, b"hello");
    }

    #[test]
    fn test_chunked() {
        let (head, body) = decode_all(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n",
        )
        .unwrap();
        assert!(head.is_chunked());
        assert_eq!(body, b"hello world");
    }

    #[test]
    fn test_chunked_trailers() {
        let mut decoder = ResponseDecoder::new();
        decoder.feed(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nTrailer: X-Content-Length\r\n\r\n3\r\nabc\r\n0\r\nX-Content-Length: 3\r\n\r\n",
        );
        decoder.decode_head().unwrap().unwrap();
        let mut body = Vec::new();
        assert_eq!(decoder.decode_body(&mut body).unwrap(), BodyProgress::Complete);
        assert_eq!(body, b"abc");
        assert_eq!(decoder.trailers().get("x-content-length"), Some("3"));
    }

    #[test]
    fn test_close_delimited() {
        let (_, body) = decode_all(b"HTTP/1.0 200 OK\r\n\r\nuntil close").unwrap();
        assert_eq!(body, b"until close");
    }

    #[test]
    fn test_no_body_status() {
        let (head, body) = decode_all(b"HTTP/1.1 304 Not Modified\r\nContent-Length: 10\r\n\r\n").unwrap();
        assert_eq!(head.status_code, 304);
        assert!(body.is_empty());
    }

    #[test]
    fn test_missing_reason_phrase() {
        let (head, _) = decode_all(b"HTTP/1.1 418\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(head.status_code, 418);
        assert_eq!(head.reason_phrase, "");
    }

    #[test]
    fn test_truncated_content_length() {
        assert_eq!(
            decode_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort").unwrap_err(),
            Error::IncompleteBody
        );
    }

    #[test]
    fn test_truncated_chunked() {
        assert_eq!(
            decode_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhel").unwrap_err(),
            Error::IncompleteBody
        );
    }

    #[test]
    fn test_invalid_status_line() {
        assert!(matches!(
            decode_all(b"HTTX/1.1 200 OK\r\n\r\n"),
            Err(Error::InvalidStatusLine(_))
        ));
        assert!(matches!(
            decode_all(b"HTTP/1.1 20 OK\r\n\r\n"),
            Err(Error::InvalidStatusLine(_))
        ));
    }
}
