#![no_main]

use libfuzzer_sys::fuzz_target;
use mnemo_automata::Rule;

fuzz_target!(|data: &str| {
    // Accepted notation must survive a canonical round trip.
    if let Ok(rule) = Rule::parse(data) {
        let reparsed = Rule::parse(&rule.notation()).expect("canonical notation parses");
        assert_eq!(rule, reparsed);
    }
});
