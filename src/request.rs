use crate::headers::HeaderStore;

/// リクエストライン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// HTTP メソッド (大文字アルファベットのみ)
    pub method: String,
    /// リクエストターゲット
    pub target: String,
    /// HTTP バージョン番号 (常に "1.1")
    pub http_version: String,
}

/// パース済み HTTP リクエスト
///
/// `RequestParser::into_request()` からのみ得られる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: HeaderStore,
    pub body: Vec<u8>,
}

impl Request {
    /// HTTP メソッドを取得
    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    /// リクエストターゲットを取得
    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    /// ヘッダーを取得 (大文字小文字を区別しない)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}
