use std::fmt;

/// HTTP パース / エンコードエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// リクエストラインの形式が不正
    MalformedRequestLine(String),
    /// メソッドが大文字アルファベットのみで構成されていない
    InvalidMethod(String),
    /// HTTP/1.1 以外のバージョン
    UnsupportedVersion(String),
    /// ヘッダー行にコロンがない
    MissingColon,
    /// ヘッダー名が不正 (空白や token 以外の文字を含む)
    InvalidHeaderName(String),
    /// Content-Length が数値ではない
    InvalidContentLength(String),
    /// ボディが Content-Length を超えた
    BodyLengthMismatch { declared: usize, actual: usize },
    /// Done に到達する前に入力が終わった
    IncompleteRequest { state: &'static str },
    /// バッファサイズ超過
    BufferOverflow { size: usize, limit: usize },
    /// 状態機械の順序違反 (呼び出し側のバグ)
    OutOfOrder {
        operation: &'static str,
        state: &'static str,
    },
    /// 空のヘッダー / トレーラー集合
    EmptyHeaders,
    /// Trailer ヘッダーで宣言されていないトレーラーフィールド
    TrailerNotDeclared(String),
    /// ステータスラインの形式が不正
    InvalidStatusLine(String),
    /// チャンク形式が不正
    InvalidChunk(String),
    /// ボディの途中で入力が終わった
    IncompleteBody,
    /// Trailer ヘッダーの値が不正
    InvalidTrailerDeclaration(String),
    /// トレーラーに置けないフィールドが宣言された
    ProhibitedTrailer(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedRequestLine(line) => {
                write!(f, "poorly formatted request-line: {:?}", line)
            }
            Error::InvalidMethod(method) => write!(f, "invalid method: {}", method),
            Error::UnsupportedVersion(version) => {
                write!(f, "unrecognized HTTP-version: {}", version)
            }
            Error::MissingColon => write!(f, "header line must contain a colon"),
            Error::InvalidHeaderName(name) => write!(f, "invalid header name: {:?}", name),
            Error::InvalidContentLength(value) => {
                write!(f, "invalid Content-Length: {:?}", value)
            }
            Error::BodyLengthMismatch { declared, actual } => write!(
                f,
                "body longer than Content-Length: declared {} actual {}",
                declared, actual
            ),
            Error::IncompleteRequest { state } => {
                write!(f, "incomplete request: stream ended while {}", state)
            }
            Error::BufferOverflow { size, limit } => {
                write!(f, "buffer overflow: {} > {}", size, limit)
            }
            Error::OutOfOrder { operation, state } => {
                write!(f, "{} is not allowed while {}", operation, state)
            }
            Error::EmptyHeaders => write!(f, "empty headers"),
            Error::TrailerNotDeclared(name) => {
                write!(f, "trailer field not declared in Trailer header: {}", name)
            }
            Error::InvalidStatusLine(line) => write!(f, "invalid status-line: {:?}", line),
            Error::InvalidChunk(msg) => write!(f, "invalid chunk: {}", msg),
            Error::IncompleteBody => write!(f, "stream ended before the end of the body"),
            Error::InvalidTrailerDeclaration(value) => {
                write!(f, "invalid Trailer header: {:?}", value)
            }
            Error::ProhibitedTrailer(name) => write!(f, "prohibited trailer field: {}", name),
        }
    }
}

impl std::error::Error for Error {}
