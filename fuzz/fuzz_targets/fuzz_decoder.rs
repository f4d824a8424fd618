#![no_main]

use libfuzzer_sys::fuzz_target;
use pbzip2::reader::Bz2Decoder;
use std::io::Read;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > 10_000_000 {
        return;
    }

    let data_arc = Arc::new(data.to_vec());
    let mut decoder = Bz2Decoder::new(data_arc);

    let mut output = Vec::new();
    const MAX_OUTPUT: usize = 100_000_000;

    loop {
        let mut buf = [0u8; 8192];
        match decoder.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                output.extend_from_slice(&buf[..n]);
                if output.len() > MAX_OUTPUT {
                    break;
                }
            }
            Err(_) => break,
        }
    }
});
