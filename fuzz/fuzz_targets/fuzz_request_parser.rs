#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tcp_http11::{ParserLimits, ReadBuffer, Request, RequestParser};

#[derive(Arbitrary, Debug)]
struct FuzzRequest {
    data: Vec<u8>,
    read_hint: u8,
    initial_hint: u8,
}

fn parse(data: &[u8], read_size: usize, limits: &ParserLimits) -> Option<Request> {
    let mut input = data;
    let mut buf = ReadBuffer::with_capacity(limits.initial_buffer_size);
    let mut parser = RequestParser::new();

    while !parser.is_done() {
        buf.grow_if_full(limits.max_buffer_size).ok()?;
        let spare = buf.spare_mut();
        let n = spare.len().min(read_size).min(input.len());
        if n == 0 {
            parser.mark_eof().ok()?;
            break;
        }
        spare[..n].copy_from_slice(&input[..n]);
        input = &input[n..];
        buf.advance(n);

        let consumed = parser.parse(buf.filled()).ok()?;
        assert!(consumed <= buf.filled().len());
        buf.consume(consumed);
    }
    parser.into_request().ok()
}

fuzz_target!(|input: FuzzRequest| {
    let limits = ParserLimits {
        initial_buffer_size: (input.initial_hint as usize % 16) + 1,
        max_buffer_size: 64 * 1024,
    };
    let read_size = (input.read_hint as usize % 32) + 1;

    // 読み取り単位によって結果が変わってはならない
    let split = parse(&input.data, read_size, &limits);
    let whole = parse(&input.data, input.data.len().max(1), &limits);
    if let (Some(split), Some(whole)) = (&split, &whole) {
        assert_eq!(split, whole);
    }
    if let Some(request) = split {
        assert!(request.method().bytes().all(|b| b.is_ascii_uppercase()));
        assert_eq!(request.request_line.http_version, "1.1");
    }
});
