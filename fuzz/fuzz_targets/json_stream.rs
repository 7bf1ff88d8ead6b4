//! Fuzzing target for the toolchain JSON-stream decoder
//!
//! Exercises `gomod_core::json_stream::parse_concatenated` against arbitrary
//! bytes, standing in for a misbehaving or truncated `go mod download -json`
//! / `go list -json` stream.

#![no_main]

use libfuzzer_sys::fuzz_target;

use gomod_core::model::ParsedModule;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = gomod_core::json_stream::parse_concatenated::<ParsedModule>(s);
        let _ = serde_json::from_str::<serde_json::Value>(s);
    }
});
