//! ヘッダーフィールドの格納とパース
//!
//! フィールド名は小文字に正規化して格納する。
//! 同名のフィールドが複数回現れた場合は `"<old>, <new>"` の形で結合する。
//!
//! ```rust
//! use tcp_http11::HeaderStore;
//!
//! let mut headers = HeaderStore::new();
//! let (n, done) = headers.parse_line(b"Foo: 1\r\n").unwrap();
//! assert_eq!((n, done), (8, false));
//! headers.parse_line(b"foo: 2\r\n").unwrap();
//! assert_eq!(headers.get("FOO"), Some("1, 2"));
//! ```

use crate::error::Error;

/// ヘッダーフィールドの集合
///
/// 挿入順を保持する。名前の比較は ASCII の大文字小文字を区別しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    entries: Vec<(String, String)>,
}

impl HeaderStore {
    /// 空のヘッダー集合を作成
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// バッファ先頭のヘッダー行を 1 行だけパース
    ///
    /// 戻り値は `(消費バイト数, ヘッダーセクション終了か)`。
    /// CRLF がまだ届いていない場合は `(0, false)` を返す。
    /// 空行 (CRLF のみ) はヘッダーセクションの終端として `(2, true)` を返す。
    pub fn parse_line(&mut self, data: &[u8]) -> Result<(usize, bool), Error> {
        let Some(pos) = find_line(data) else {
            return Ok((0, false));
        };
        if pos == 0 {
            return Ok((2, true));
        }

        let line = &data[..pos];
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or(Error::MissingColon)?;
        let raw_name = &line[..colon];

        // コロン直前の空白は禁止 (RFC 9112 Section 5.1)
        if raw_name.last().is_some_and(|b| b.is_ascii_whitespace()) {
            return Err(Error::InvalidHeaderName(
                String::from_utf8_lossy(raw_name).into_owned(),
            ));
        }

        let name = raw_name.trim_ascii_start();
        if name.is_empty() || !name.iter().copied().all(is_token_char) {
            return Err(Error::InvalidHeaderName(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }
        // token 文字は ASCII のみなので変換は失敗しない
        let name = String::from_utf8_lossy(name);
        let value = String::from_utf8_lossy(line[colon + 1..].trim_ascii());

        self.append(&name, &value);
        Ok((pos + 2, false))
    }

    /// フィールドを追加 (同名が存在する場合は `", "` で結合)
    pub fn append(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self.entries.push((name, value.to_string())),
        }
    }

    /// フィールドを設定 (同名が存在する場合は位置を保ったまま置き換え)
    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.entries.push((name, value.to_string())),
        }
    }

    /// フィールドを取得 (大文字小文字を区別しない)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// フィールドを削除して値を返す
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self
            .entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(pos).1)
    }

    /// フィールドが存在するか確認
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 挿入順に `(名前, 値)` を列挙
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// CRLF の位置を探す
pub(crate) fn find_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// トークン文字か確認 (RFC 9110 Section 5.6.2)
pub(crate) fn is_token_char(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
    )
}
