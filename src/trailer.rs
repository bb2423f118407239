//! `Trailer` ヘッダーの宣言
//!
//! chunked レスポンスで送るトレーラーは、ヘッダー送信時に `Trailer` で
//! 宣言しておく。`ResponseEncoder` はこの宣言にないトレーラーの書き込みを拒否する。

use crate::error::Error;
use crate::headers::is_token_char;

/// `Trailer` ヘッダーで宣言されたフィールド名 (小文字)
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeclaredTrailers(Vec<String>);

impl DeclaredTrailers {
    /// `X-Content-Sha256, X-Content-Length` のようなカンマ区切りの値を読む
    pub(crate) fn parse(value: &str) -> Result<Self, Error> {
        let mut names = Vec::new();
        for name in value.split(',').map(str::trim) {
            if name.is_empty() || !name.bytes().all(is_token_char) {
                return Err(Error::InvalidTrailerDeclaration(value.to_string()));
            }
            let name = name.to_ascii_lowercase();
            if is_prohibited_trailer_field(&name) {
                return Err(Error::ProhibitedTrailer(name));
            }
            names.push(name);
        }
        Ok(Self(names))
    }

    pub(crate) fn declares(&self, name: &str) -> bool {
        self.0.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

/// トレーラーに置けないフィールドか
///
/// フレーミング、ルーティング、認証、ボディの解釈に関わるフィールドが該当する。
pub fn is_prohibited_trailer_field(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "transfer-encoding"
            | "content-length"
            | "trailer"
            | "host"
            | "authorization"
            | "proxy-authorization"
            | "content-encoding"
            | "content-type"
            | "content-range"
    )
}
