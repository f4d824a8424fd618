#![no_main]

use libfuzzer_sys::fuzz_target;
use pbzip2::scanner::MagicScanner;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > 10_000_000 {
        return;
    }

    let scanner = MagicScanner::new();
    let max_bit = data.len() as u64 * 8;
    let mut pos = 0u64;
    let mut found = 0;

    while let Some((bit, _marker)) = scanner.find_from(data, pos) {
        assert!(bit < max_bit, "marker bit {bit} exceeds input length {max_bit}");
        found += 1;
        pos = bit + 1;
        if found > 10_000 {
            break;
        }
    }
});
