//! tokio-tcp-http11 エラー型

use std::fmt;

/// tokio-tcp-http11 エラー
#[derive(Debug)]
pub enum Error {
    /// I/O エラー
    Io(std::io::Error),
    /// HTTP パース / エンコードエラー
    Http(tcp_http11::Error),
    /// TLS エラー
    Tls(String),
    /// 不正なアップストリーム URL
    InvalidUrl(String),
    /// アップストリームがレスポンスヘッダーの途中で接続を閉じた
    UpstreamClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Tls(e) => write!(f, "TLS error: {}", e),
            Error::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
            Error::UpstreamClosed => write!(f, "upstream closed before the response head"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<tcp_http11::Error> for Error {
    fn from(e: tcp_http11::Error) -> Self {
        Error::Http(e)
    }
}

#[cfg(feature = "tls")]
impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

#[cfg(feature = "tls")]
impl From<rustls_pki_types::InvalidDnsNameError> for Error {
    fn from(e: rustls_pki_types::InvalidDnsNameError) -> Self {
        Error::Tls(e.to_string())
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
