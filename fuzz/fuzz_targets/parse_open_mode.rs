/*
 * fuzz_targets/parse_open_mode.rs
 *
 * fuzz target for fopen mode validation. anything accepted must map
 * back to a canonical mode that parses to the same value.
 */

#![no_main]

use libfuzzer_sys::fuzz_target;
use portshim::OpenMode;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(mode) = OpenMode::parse(s) {
        /* canonical spelling reparses to the same mode */
        let canonical = mode.to_string();
        assert_eq!(OpenMode::parse(&canonical).ok(), Some(mode));
        assert!(canonical.len() <= 7);
    }
});
