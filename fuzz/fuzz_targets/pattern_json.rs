#![no_main]

use libfuzzer_sys::fuzz_target;
use mnemo_memory::patterns_from_json;

fuzz_target!(|data: &str| {
    // patterns_from_json should never panic on any input
    if let Ok(patterns) = patterns_from_json(data) {
        for pattern in &patterns {
            assert_eq!(pattern.grid.len(), pattern.width() * pattern.height());
        }
    }
});
