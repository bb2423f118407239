//! HTTP/1.1 デコーダーモジュール
//!
//! Sans I/O 設計に基づくインクリメンタルなデコーダーを提供。
//!
//! ## 使い方
//!
//! ### リクエスト
//!
//! 読み取ったバイト列を `parse()` に渡し、消費されたバイト数だけ
//! バッファを詰める。`Done` になるまで繰り返す。
//!
//! ```rust
//! use tcp_http11::RequestParser;
//!
//! let mut parser = RequestParser::new();
//! let mut buf = Vec::new();
//! let pieces: [&[u8]; 3] = [b"POST /submit HTTP/1.1\r\nContent-", b"Length: 5\r\n\r\nhel", b"lo"];
//! for piece in pieces {
//!     buf.extend_from_slice(piece);
//!     let consumed = parser.parse(&buf).unwrap();
//!     buf.drain(..consumed);
//! }
//! let request = parser.into_request().unwrap();
//! assert_eq!(request.body, b"hello");
//! ```
//!
//! ### レスポンス
//!
//! ```rust
//! use tcp_http11::ResponseDecoder;
//!
//! let mut decoder = ResponseDecoder::new();
//! decoder.feed(b"HTTP/1.1 204 No Content\r\n\r\n");
//! let (head, _) = decoder.decode_head().unwrap().unwrap();
//! assert_eq!(head.status_code, 204);
//! assert!(decoder.is_complete());
//! ```

mod body;
mod head;
mod phase;
mod request;
mod response;

// 公開 API
pub use body::{BodyKind, BodyProgress, ChunkedDecoder};
pub use head::ResponseHead;
pub use phase::ParseState;
pub use request::RequestParser;
pub use response::ResponseDecoder;
