#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tcp_http11::{BodyProgress, HeaderStore, ResponseDecoder, ResponseEncoder, StatusCode};

#[derive(Arbitrary, Debug)]
struct FuzzChunked {
    chunks: Vec<Vec<u8>>,
    split_hint: u8,
    with_trailer: bool,
}

fn decode(encoded: &[u8], split_size: usize) -> Option<(Vec<u8>, HeaderStore)> {
    let mut decoder = ResponseDecoder::new();
    let mut body = Vec::new();
    let mut head_done = false;
    for part in encoded.chunks(split_size) {
        decoder.feed(part);
        if !head_done {
            match decoder.decode_head() {
                Ok(Some(_)) => head_done = true,
                Ok(None) => continue,
                Err(_) => return None,
            }
        }
        match decoder.decode_body(&mut body) {
            Ok(BodyProgress::Complete) => return Some((body, decoder.trailers().clone())),
            Ok(BodyProgress::Continue) => {}
            Err(_) => return None,
        }
    }
    None
}

fuzz_target!(|input: FuzzChunked| {
    let mut chunks = input.chunks;
    chunks.truncate(64);
    let expected: Vec<u8> = chunks.concat();
    let split_size = (input.split_hint as usize % 32) + 1;

    let mut headers = HeaderStore::new();
    headers.set("Transfer-Encoding", "chunked");
    if input.with_trailer {
        headers.set("Trailer", "X-Content-Length");
    }

    let mut encoder = ResponseEncoder::new();
    let mut out = Vec::new();
    encoder.status_line(StatusCode::OK, &mut out).unwrap();
    encoder.headers(&headers, &mut out).unwrap();
    for chunk in &chunks {
        assert_eq!(encoder.chunk(chunk, &mut out).unwrap(), chunk.len());
    }
    encoder.chunked_done(&mut out).unwrap();
    if input.with_trailer {
        let mut trailers = HeaderStore::new();
        trailers.set("X-Content-Length", &expected.len().to_string());
        encoder.trailers(&trailers, &mut out).unwrap();
    } else {
        encoder.finish_trailers(&mut out).unwrap();
    }

    let (body, trailers) = decode(&out, split_size).expect("encoder output must decode");
    assert_eq!(body, expected);
    if input.with_trailer {
        assert_eq!(
            trailers.get("x-content-length"),
            Some(expected.len().to_string().as_str())
        );
    }
});
