#![no_main]
use libfuzzer_sys::fuzz_target;
use shot_core::protocol::{Command, Dialect, parse};
use shot_core::Phase;

fuzz_target!(|data: &str| {
    let strict = parse(data, Dialect::Strict);
    assert!(strict.len() <= 1);

    for cmd in strict.iter().chain(parse(data, Dialect::Legacy).iter()) {
        if let Command::Patch(p) = cmd {
            if let Some(d) = p.delay_ms {
                assert!(d.is_finite() && d >= 0.0);
            }
            if let Some(phase) = p.phase {
                assert!(matches!(phase, Phase::Starting | Phase::Idle));
            }
        }
    }
});
