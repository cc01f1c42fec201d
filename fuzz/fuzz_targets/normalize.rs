#![no_main]

use libfuzzer_sys::fuzz_target;
use cvp_core::Normalizer;

fuzz_target!(|data: &[u8]| {
    // Canonical reduction must never panic and must be idempotent.
    let normalizer = Normalizer::new();
    let once = normalizer.canonicalize(data);
    let twice = normalizer.canonicalize(&once);
    assert_eq!(once, twice);
});
