//! # tcp_http11
//!
//! TCP の上に直接実装する HTTP/1.1 メッセージエンジン (Sans I/O)
//!
//! ## 特徴
//!
//! - **依存なし**: 標準ライブラリのみ使用
//! - **Sans I/O**: パーサーとエンコーダーはバイト列だけを扱い、I/O は呼び出し側が行う
//! - **任意の分割に対応**: リクエストがどこで分割されて届いても同じ結果になる
//!
//! ## 使い方
//!
//! ### リクエストの読み取り
//!
//! ```rust
//! use tcp_http11::{ParserLimits, ReadBuffer, RequestParser};
//!
//! let limits = ParserLimits::default();
//! let mut input: &[u8] = b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n";
//! let mut buf = ReadBuffer::with_capacity(limits.initial_buffer_size);
//! let mut parser = RequestParser::new();
//!
//! while !parser.is_done() {
//!     buf.grow_if_full(limits.max_buffer_size).unwrap();
//!     let spare = buf.spare_mut();
//!     let n = spare.len().min(input.len());
//!     spare[..n].copy_from_slice(&input[..n]);
//!     input = &input[n..];
//!     buf.advance(n);
//!     let consumed = parser.parse(buf.filled()).unwrap();
//!     buf.consume(consumed);
//! }
//!
//! let request = parser.into_request().unwrap();
//! assert_eq!(request.target(), "/coffee");
//! assert_eq!(request.get_header("host"), Some("localhost:42069"));
//! ```
//!
//! ### レスポンスの書き込み
//!
//! ```rust
//! use tcp_http11::{ResponseEncoder, StatusCode, default_headers};
//!
//! let body = b"All good, frfr\n";
//! let mut encoder = ResponseEncoder::new();
//! let mut out = Vec::new();
//! encoder.status_line(StatusCode::OK, &mut out).unwrap();
//! encoder.headers(&default_headers(body.len()), &mut out).unwrap();
//! encoder.body(body, &mut out).unwrap();
//! assert!(out.starts_with(b"HTTP/1.1 200 OK\r\ncontent-length: 15\r\n"));
//! ```

mod buffer;
mod decoder;
mod encoder;
mod error;
mod headers;
mod limits;
mod request;
mod response;
mod trailer;

pub use buffer::ReadBuffer;
pub use decoder::{
    BodyKind, BodyProgress, ChunkedDecoder, ParseState, RequestParser, ResponseDecoder,
    ResponseHead,
};
pub use encoder::{ResponseEncoder, WriterState, encode_request_head};
pub use error::Error;
pub use headers::HeaderStore;
pub use limits::ParserLimits;
pub use request::{Request, RequestLine};
pub use response::{StatusCode, default_headers};
pub use trailer::is_prohibited_trailer_field;
