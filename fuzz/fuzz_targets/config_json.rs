#![no_main]

use libfuzzer_sys::fuzz_target;
use wellmixed_core::SchedulerConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };
    if let Ok(config) = SchedulerConfig::from_json_str(text) {
        // Anything accepted is valid and survives a round trip.
        assert!(config.validate().is_ok());
        let json = config.to_json_string().expect("serialize");
        assert_eq!(SchedulerConfig::from_json_str(&json).expect("reparse"), config);
    }
});
