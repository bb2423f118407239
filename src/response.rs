//! レスポンスのステータスコードとデフォルトヘッダー

use std::fmt;

use crate::headers::HeaderStore;

/// HTTP ステータスコード
///
/// 理由句を持つのは 200 / 400 / 500 のみ。
/// それ以外のコードはステータスラインの理由句が空になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    pub const fn new(code: u16) -> Self {
        StatusCode(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// 理由句
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            500 => "Internal Server Error",
            _ => "",
        }
    }

    /// ステータスライン (CRLF を含む)
    ///
    /// 理由句のないコードでは `HTTP/1.1 <code> \r\n` になる。
    pub fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}\r\n", self.0, self.reason_phrase())
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 固定長ボディ用のデフォルトヘッダー
///
/// `content-length`, `connection: close`, `content-type: text/plain` を返す。
/// 呼び出し側は `set()` で上書きしてから送信する。
pub fn default_headers(content_length: usize) -> HeaderStore {
    let mut headers = HeaderStore::new();
    headers.set("Content-Length", &content_length.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}
