#![no_main]

use libfuzzer_sys::fuzz_target;
use tcp_http11::ResponseDecoder;

fuzz_target!(|data: &[u8]| {
    let mut decoder = ResponseDecoder::new();
    decoder.feed(data);
    decoder.mark_eof();
    if let Ok(Some((head, _))) = decoder.decode_head() {
        assert!(head.status_code >= 100);
        let mut body = Vec::new();
        let _ = decoder.decode_body(&mut body);
    }
});
