//! ResponseEncoder のプロパティテスト

use pbt::{header_name, header_value};
use proptest::prelude::*;
use tcp_http11::{
    BodyProgress, Error, HeaderStore, ResponseDecoder, ResponseEncoder, StatusCode, WriterState,
    default_headers,
};

#[derive(Debug, Clone)]
enum Op {
    StatusLine(u16),
    Headers,
    Body(Vec<u8>),
    Chunk(Vec<u8>),
    ChunkedDone,
    FinishTrailers,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop_oneof![Just(200u16), Just(400), Just(500), 100u16..600].prop_map(Op::StatusLine),
        Just(Op::Headers),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(Op::Body),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(Op::Chunk),
        Just(Op::ChunkedDone),
        Just(Op::FinishTrailers),
    ]
}

fn rank(state: WriterState) -> u8 {
    match state {
        WriterState::AwaitingStatusLine => 0,
        WriterState::AwaitingHeaders => 1,
        WriterState::AwaitingBody => 2,
        WriterState::Done => 3,
    }
}

fn apply(encoder: &mut ResponseEncoder, op: &Op, out: &mut Vec<u8>) -> Result<(), Error> {
    match op {
        Op::StatusLine(code) => encoder.status_line(StatusCode::new(*code), out),
        Op::Headers => encoder.headers(&default_headers(0), out),
        Op::Body(data) => encoder.body(data, out),
        Op::Chunk(data) => encoder.chunk(data, out).map(|_| ()),
        Op::ChunkedDone => encoder.chunked_done(out),
        Op::FinishTrailers => encoder.finish_trailers(out),
    }
}

proptest! {
    // 任意の呼び出し順で、状態は前にしか進まず、失敗した呼び出しは何も出力しない
    #[test]
    fn writer_state_is_monotonic(ops in proptest::collection::vec(op(), 0..16)) {
        let mut encoder = ResponseEncoder::new();
        let mut out = Vec::new();
        let mut status_lines = 0;

        for op in &ops {
            let before_state = encoder.state();
            let before_len = out.len();
            match apply(&mut encoder, op, &mut out) {
                Ok(()) => {
                    prop_assert!(rank(encoder.state()) >= rank(before_state));
                    if matches!(op, Op::StatusLine(_)) {
                        status_lines += 1;
                    }
                }
                Err(e) => {
                    prop_assert!(matches!(e, Error::OutOfOrder { .. }), "unexpected error: {:?}", e);
                    prop_assert_eq!(encoder.state(), before_state);
                    prop_assert_eq!(out.len(), before_len);
                }
            }
        }

        prop_assert!(status_lines <= 1);
        if status_lines == 1 {
            prop_assert!(out.starts_with(b"HTTP/1.1 "));
        } else {
            prop_assert!(out.is_empty());
        }
    }

    // chunked で書いたボディとトレーラーがデコードで元に戻る
    #[test]
    fn chunked_round_trip(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..300), 0..8),
        trailer_name in header_name(),
        trailer_value in header_value(),
    ) {
        prop_assume!(!tcp_http11::is_prohibited_trailer_field(&trailer_name));

        let mut headers = HeaderStore::new();
        headers.set("Transfer-Encoding", "chunked");
        headers.set("Trailer", &trailer_name);

        let mut encoder = ResponseEncoder::new();
        let mut out = Vec::new();
        encoder.status_line(StatusCode::OK, &mut out).unwrap();
        encoder.headers(&headers, &mut out).unwrap();
        let mut written = 0;
        for chunk in &chunks {
            written += encoder.chunk(chunk, &mut out).unwrap();
        }
        encoder.chunked_done(&mut out).unwrap();
        let mut trailers = HeaderStore::new();
        trailers.set(&trailer_name, &trailer_value);
        encoder.trailers(&trailers, &mut out).unwrap();

        let expected: Vec<u8> = chunks.concat();
        prop_assert_eq!(written, expected.len());

        let mut decoder = ResponseDecoder::new();
        decoder.feed(&out);
        let (head, _) = decoder.decode_head().unwrap().unwrap();
        prop_assert!(head.is_chunked());
        let mut body = Vec::new();
        prop_assert_eq!(decoder.decode_body(&mut body).unwrap(), BodyProgress::Complete);
        prop_assert_eq!(body, expected);
        prop_assert_eq!(decoder.trailers().get(&trailer_name), Some(trailer_value.as_str()));
    }

    // 宣言されていないトレーラーは拒否される
    #[test]
    fn undeclared_trailer_rejected(declared in header_name(), other in header_name()) {
        prop_assume!(declared != other);
        prop_assume!(!tcp_http11::is_prohibited_trailer_field(&declared));

        let mut headers = HeaderStore::new();
        headers.set("Transfer-Encoding", "chunked");
        headers.set("Trailer", &declared);

        let mut encoder = ResponseEncoder::new();
        let mut out = Vec::new();
        encoder.status_line(StatusCode::OK, &mut out).unwrap();
        encoder.headers(&headers, &mut out).unwrap();
        encoder.chunked_done(&mut out).unwrap();

        let mut trailers = HeaderStore::new();
        trailers.set(&other, "1");
        prop_assert_eq!(
            encoder.trailers(&trailers, &mut out),
            Err(Error::TrailerNotDeclared(other.clone()))
        );
    }
}

#[test]
fn empty_chunked_body_round_trip() {
    let mut headers = HeaderStore::new();
    headers.set("Transfer-Encoding", "chunked");
    let mut encoder = ResponseEncoder::new();
    let mut out = Vec::new();
    encoder.status_line(StatusCode::OK, &mut out).unwrap();
    encoder.headers(&headers, &mut out).unwrap();
    encoder.chunked_done(&mut out).unwrap();
    encoder.finish_trailers(&mut out).unwrap();

    let mut decoder = ResponseDecoder::new();
    decoder.feed(&out);
    decoder.decode_head().unwrap().unwrap();
    let mut body = Vec::new();
    assert_eq!(decoder.decode_body(&mut body).unwrap(), BodyProgress::Complete);
    assert!(body.is_empty());
    assert!(decoder.trailers().is_empty());
}
