#![no_main]

use edgeserve::buffer::ReadBuffer;
use edgeserve::parser::request::RequestParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }

    let mut buf = ReadBuffer::new(data.len().max(1));
    buf.spare_capacity()[..data.len()].copy_from_slice(data);
    buf.advance_read(data.len());

    let mut parser = RequestParser::new();
    let _ = parser.advance(&mut buf);
});
