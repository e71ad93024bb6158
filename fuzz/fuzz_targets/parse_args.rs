/*
 * fuzz_targets/parse_args.rs
 *
 * fuzz target for CLI argument parsing. try_parse_from must return an
 * error, never panic, on arbitrary argument combinations.
 *
 * edge cases: "alloc 1" (too few factors), "-q --trace", negative epochs,
 * factors that overflow usize, empty paths
 */

#![no_main]

use clap::Parser;
use libfuzzer_sys::fuzz_target;
use portshim::Args;

fuzz_target!(|data: &[u8]| {
    /* split input on null bytes to simulate multiple arguments */
    let args: Vec<&str> = data
        .split(|&b| b == 0)
        .filter_map(|chunk| core::str::from_utf8(chunk).ok())
        .filter(|s| !s.is_empty())
        .collect();

    let _ = Args::try_parse_from(core::iter::once("portshim").chain(args));
});
