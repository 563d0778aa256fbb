#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        match benchgate_expr::parse(s) {
            // Error positions must point into (or just past) the input.
            Err(err) => assert!(err.position <= s.len()),
            Ok(assertion) => {
                let _ = format!("{assertion:?}");
            }
        }
    }
});
