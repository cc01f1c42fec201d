#![no_main]

use libfuzzer_sys::fuzz_target;
use cvp_core::Dfa;

fuzz_target!(|data: &[u8]| {
    // Shape recognition must never panic on any input.
    let dfa = Dfa::new();
    let _ = dfa.run(data);
});
