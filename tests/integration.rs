/*
 * Integration tests for the portshim CLI.
 *
 * Each subcommand is a thin shell over one wrapped primitive, so these
 * mostly pin down output shape and exit status: 0 ok, 1 the wrapped
 * operation failed, 2 bad command line.
 */

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn portshim_cmd() -> Command {
    let mut cmd = Command::cargo_bin("portshim").unwrap();
    /* keep the environment from turning tracing on under us */
    cmd.env_remove("PORTSHIM_DEBUG").env_remove("RUST_LOG");
    cmd
}

/* =========================================================================
 * COMMAND LINE
 * ========================================================================= */

#[test]
fn test_no_subcommand_is_usage_error() {
    portshim_cmd().assert().code(2);
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    portshim_cmd().arg("frobnicate").assert().code(2);
}

#[test]
fn test_help_mentions_exit_status() {
    portshim_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit status"));
}

/* =========================================================================
 * STAT
 * ========================================================================= */

#[test]
fn test_stat_regular_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.bin");
    std::fs::write(&path, [0u8; 42]).unwrap();

    portshim_cmd()
        .arg("stat")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("size: 42"))
        .stdout(predicate::str::contains("kind: regular"));
}

#[test]
fn test_stat_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.bin");
    std::fs::write(&path, b"abc").unwrap();

    portshim_cmd()
        .arg("stat")
        .arg(&path)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(r#"{"status":"ok""#))
        .stdout(predicate::str::contains(r#""size":3"#))
        .stdout(predicate::str::contains(r#""kind":"regular""#));
}

#[test]
fn test_stat_missing_json_error() {
    let dir = tempfile::tempdir().unwrap();

    portshim_cmd()
        .arg("stat")
        .arg(dir.path().join("nope"))
        .arg("--json")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""status":"error""#))
        .stdout(predicate::str::contains(r#""exit_code":1"#));
}

/* =========================================================================
 * TIME
 * ========================================================================= */

#[test]
fn test_gmtime_epoch() {
    portshim_cmd()
        .args(["gmtime", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1970-01-01T00:00:00"))
        .stdout(predicate::str::contains("weekday: 4"));
}

#[test]
fn test_gmtime_negative_json() {
    portshim_cmd()
        .args(["gmtime", "-1", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""year":1969"#))
        .stdout(predicate::str::contains(r#""second":59"#))
        .stdout(predicate::str::contains(r#""is_dst":false"#));
}

#[test]
fn test_gmtime_out_of_range_fails() {
    portshim_cmd()
        .args(["gmtime", &i64::MAX.to_string()])
        .assert()
        .code(1);
}

#[test]
fn test_time_prints_epoch_and_ctime() {
    portshim_cmd()
        .arg("time")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\d+\n\w{3} \w{3} [ \d]\d \d\d:\d\d:\d\d \d{4}\n$").unwrap());
}

/* =========================================================================
 * STRERROR
 * ========================================================================= */

#[test]
fn test_strerror_enoent() {
    let expected = portshim::strerror(libc::ENOENT);
    portshim_cmd()
        .args(["strerror", &libc::ENOENT.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

/* =========================================================================
 * ALLOC
 * ========================================================================= */

#[test]
fn test_alloc_pair() {
    portshim_cmd()
        .args(["alloc", "4", "4"])
        .assert()
        .success()
        .stdout("allocated 16 bytes\n");
}

#[test]
fn test_alloc_triple() {
    portshim_cmd()
        .args(["alloc", "2", "3", "7"])
        .assert()
        .success()
        .stdout("allocated 42 bytes\n");
}

#[test]
fn test_alloc_zero_factor() {
    portshim_cmd()
        .args(["alloc", "0", "5"])
        .assert()
        .success()
        .stdout("allocated 0 bytes\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_alloc_overflow() {
    portshim_cmd()
        .args(["alloc", &usize::MAX.to_string(), "2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Multiplication overflow"));
}

#[test]
fn test_alloc_overflow_quiet() {
    portshim_cmd()
        .args(["-q", "alloc", &usize::MAX.to_string(), "2"])
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_alloc_wrong_arity() {
    portshim_cmd().args(["alloc", "4"]).assert().code(2);
}

#[test]
fn test_alloc_trace() {
    portshim_cmd()
        .args(["--trace", "alloc", "2", "2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("malloc2(2 * 2)"));
}

#[test]
fn test_alloc_trace_from_env() {
    portshim_cmd()
        .env("PORTSHIM_DEBUG", "1")
        .args(["alloc", "2", "2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("malloc2(2 * 2)"));
}

/* =========================================================================
 * CAT
 * ========================================================================= */

#[test]
fn test_cat_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    std::fs::write(&a, "first\n").unwrap();
    std::fs::write(&b, "second\n").unwrap();

    portshim_cmd()
        .arg("cat")
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout("first\nsecond\n");
}

#[test]
fn test_cat_large_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.bin");
    /* bigger than one 64 KiB read */
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &data).unwrap();

    portshim_cmd()
        .arg("cat")
        .arg(&path)
        .assert()
        .success()
        .stdout(data);
}

#[test]
fn test_cat_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.txt");

    portshim_cmd()
        .arg("cat")
        .arg(&missing)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to open"));
}

#[test]
fn test_cat_missing_file_quiet() {
    let dir = tempfile::tempdir().unwrap();

    portshim_cmd()
        .args(["cat", "-q"])
        .arg(dir.path().join("missing.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty());
}
