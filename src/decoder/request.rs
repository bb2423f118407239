//! HTTP リクエストパーサー

use crate::error::Error;
use crate::headers::{HeaderStore, find_line};
use crate::request::{Request, RequestLine};

use super::phase::ParseState;

/// HTTP リクエストパーサー (Sans I/O)
///
/// 任意の境界で分割されたバイト列を受け取り、消費したバイト数を返す。
/// 呼び出し側は消費された分をバッファから取り除き、残りに新しいデータを
/// 追加して再度 `parse()` を呼ぶ。
///
/// ```rust
/// use tcp_http11::{ParseState, RequestParser};
///
/// let mut parser = RequestParser::new();
/// let data = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
/// let consumed = parser.parse(data).unwrap();
/// assert_eq!(consumed, data.len());
/// assert_eq!(parser.state(), ParseState::Done);
///
/// let request = parser.into_request().unwrap();
/// assert_eq!(request.method(), "GET");
/// ```
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,
    request_line: Option<RequestLine>,
    headers: HeaderStore,
    body: Vec<u8>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    /// 新しいパーサーを作成
    pub fn new() -> Self {
        Self {
            state: ParseState::InitializingLine,
            request_line: None,
            headers: HeaderStore::new(),
            body: Vec::new(),
        }
    }

    /// 現在の状態を取得
    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// データをパースし、消費したバイト数を返す
    ///
    /// 1 ステップが 0 バイトしか消費しなくなる (データ不足) か、
    /// `Done` に到達するまでステップを繰り返す。
    /// `Done` 到達後に呼ぶとエラー。
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, Error> {
        if self.state == ParseState::Done {
            return Err(Error::OutOfOrder {
                operation: "parse",
                state: self.state.as_str(),
            });
        }

        let mut total = 0;
        while self.state != ParseState::Done {
            let n = self.parse_single(&data[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    /// 入力の終端を通知
    ///
    /// `Done` に到達していなければ不完全なリクエストとしてエラーを返す。
    pub fn mark_eof(&self) -> Result<(), Error> {
        if self.state != ParseState::Done {
            return Err(Error::IncompleteRequest {
                state: self.state.as_str(),
            });
        }
        Ok(())
    }

    /// パース済みのリクエストを取り出す
    ///
    /// `Done` 以外の状態で呼ぶとエラー。
    pub fn into_request(self) -> Result<Request, Error> {
        let out_of_order = Error::OutOfOrder {
            operation: "into_request",
            state: self.state.as_str(),
        };
        if self.state != ParseState::Done {
            return Err(out_of_order);
        }
        let request_line = self.request_line.ok_or(out_of_order)?;
        Ok(Request {
            request_line,
            headers: self.headers,
            body: self.body,
        })
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, Error> {
        match self.state {
            ParseState::InitializingLine => {
                let Some((request_line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                self.request_line = Some(request_line);
                self.state = ParseState::ParsingHeaders;
                Ok(n)
            }
            ParseState::ParsingHeaders => {
                let (n, done) = self.headers.parse_line(data)?;
                if done {
                    self.state = ParseState::ParsingBody;
                }
                Ok(n)
            }
            ParseState::ParsingBody => {
                let Some(raw) = self.headers.get("Content-Length") else {
                    // Content-Length がなければボディなし
                    self.state = ParseState::Done;
                    return Ok(0);
                };
                let declared = parse_content_length(raw)?;

                let actual = self.body.len() + data.len();
                if actual > declared {
                    return Err(Error::BodyLengthMismatch { declared, actual });
                }
                self.body.extend_from_slice(data);
                if actual == declared {
                    self.state = ParseState::Done;
                }
                Ok(data.len())
            }
            ParseState::Done => Err(Error::OutOfOrder {
                operation: "parse",
                state: self.state.as_str(),
            }),
        }
    }
}

/// リクエストラインをパース
///
/// CRLF が見つからない場合は `None` を返す。
fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, Error> {
    let Some(pos) = find_line(data) else {
        return Ok(None);
    };
    let raw = &data[..pos];
    let line = std::str::from_utf8(raw)
        .map_err(|_| Error::MalformedRequestLine(String::from_utf8_lossy(raw).into_owned()))?;

    // METHOD SP request-target SP HTTP-version
    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(Error::MalformedRequestLine(line.to_string()));
    };

    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(Error::InvalidMethod(method.to_string()));
    }
    if target.is_empty() {
        return Err(Error::MalformedRequestLine(line.to_string()));
    }

    // HTTP/1.1 以外はネゴシエーションせずに拒否する
    let Some(("HTTP", number)) = version.split_once('/') else {
        return Err(Error::UnsupportedVersion(version.to_string()));
    };
    if number != "1.1" {
        return Err(Error::UnsupportedVersion(version.to_string()));
    }

    Ok(Some((
        RequestLine {
            method: method.to_string(),
            target: target.to_string(),
            http_version: number.to_string(),
        },
        pos + 2,
    )))
}

/// Content-Length の値をパース
pub(crate) fn parse_content_length(input: &str) -> Result<usize, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidContentLength(input.to_string()));
    }
    trimmed
        .parse::<usize>()
        .map_err(|_| Error::InvalidContentLength(input.to_string()))
}
