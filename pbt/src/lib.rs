//! PBT テスト共通ユーティリティ

use proptest::prelude::*;
use tcp_http11::{Error, Request, RequestParser};

// ========================================
// リクエスト要素の生成
// ========================================

/// メソッド: 大文字アルファベットのみ
pub fn method() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("DELETE".to_string()),
        "[A-Z]{1,10}".prop_map(|s| s),
    ]
}

/// リクエストターゲット (空白を含まない)
pub fn target() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("/".to_string()),
        "/[a-zA-Z0-9/_.?=&-]{1,48}".prop_map(|s| s),
    ]
}

/// ヘッダー名 (小文字、Content-Length は除く)
pub fn header_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9!#$%&'*+.^_`|~-]{0,23}"
        .prop_filter("framing header", |n| n != "content-length")
}

/// ヘッダー値 (前後に空白を含まない表示可能 ASCII)
pub fn header_value() -> impl Strategy<Value = String> {
    "[!-~]([ -~]{0,30}[!-~])?".prop_map(|s| s)
}

/// 名前が重複しないヘッダー列
pub fn unique_headers() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::btree_map(header_name(), header_value(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

pub fn body() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..512)
}

// ========================================
// ヘルパー
// ========================================

/// リクエストのバイト列を組み立てる
///
/// ボディが空でなければ Content-Length を付ける。
pub fn build_request(
    method: &str,
    target: &str,
    headers: &[(String, String)],
    body: &[u8],
) -> Vec<u8> {
    let mut data = format!("{} {} HTTP/1.1\r\n", method, target).into_bytes();
    for (name, value) in headers {
        data.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    if !body.is_empty() {
        data.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    data.extend_from_slice(b"\r\n");
    data.extend_from_slice(body);
    data
}

/// `cuts` の位置で分割して 1 片ずつパーサーに渡す
///
/// 消費されなかったバイトは次の片の前に残す。
pub fn parse_in_pieces(data: &[u8], cuts: &[usize]) -> Result<Request, Error> {
    let mut points: Vec<usize> = cuts.iter().map(|&c| c.min(data.len())).collect();
    points.push(data.len());
    points.sort_unstable();

    let mut parser = RequestParser::new();
    let mut buf = Vec::new();
    let mut start = 0;
    for end in points {
        if parser.is_done() {
            break;
        }
        buf.extend_from_slice(&data[start..end]);
        start = end;
        let consumed = parser.parse(&buf)?;
        buf.drain(..consumed);
    }
    parser.mark_eof()?;
    parser.into_request()
}
