//! HTTP ヘッダー型の定義

use crate::headers::HeaderStore;

/// レスポンスヘッダー（ボディなし）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP バージョン (HTTP/1.1 等)
    pub version: String,
    /// ステータスコード (200, 404, etc.)
    pub status_code: u16,
    /// ステータスフレーズ (OK, Not Found, etc.)
    pub reason_phrase: String,
    /// ヘッダー
    pub headers: HeaderStore,
}

impl ResponseHead {
    /// ステータスコードが情報レスポンス (1xx) か確認
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status_code)
    }

    /// Transfer-Encoding が chunked かどうかを判定
    ///
    /// Transfer-Encoding リストの最後が chunked かどうかを確認する (RFC 9112)
    pub fn is_chunked(&self) -> bool {
        self.headers.get("Transfer-Encoding").is_some_and(|v| {
            v.rsplit(',')
                .map(str::trim)
                .find(|t| !t.is_empty())
                .is_some_and(|t| t.eq_ignore_ascii_case("chunked"))
        })
    }
}
