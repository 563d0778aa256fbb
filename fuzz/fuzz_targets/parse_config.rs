#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(file) = toml::from_str::<benchgate_types::ConfigFile>(s) {
            // Resolution either rejects the file or yields unique subject names.
            if let Ok(config) = benchgate_config::resolve_config(file) {
                let mut names: Vec<_> = config.subjects.iter().map(|s| &s.name).collect();
                let total = names.len();
                names.sort();
                names.dedup();
                assert_eq!(names.len(), total);
            }
        }
    }
});
