//! Integration tests for the CredVault CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! The passphrase comes from `CREDVAULT_PASSPHRASE` and each project
//! directory carries a `.credvault.toml` with cheap Argon2 settings.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const PASSPHRASE: &str = "correct horse battery";

/// Helper: get a Command pointing at the credvault binary.
fn credvault() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("credvault").expect("binary should exist");
    cmd.env_remove("CREDVAULT_KEY_ID").env_remove("CREDVAULT_LOG");
    cmd
}

/// Helper: a project directory with fast KDF settings.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child(".credvault.toml")
        .write_str("argon2_memory_kib = 8192\nargon2_iterations = 1\nargon2_parallelism = 1\n")
        .unwrap();
    tmp
}

/// Helper: run `credvault <args>` inside `dir` with the passphrase set.
fn run(dir: &TempDir, args: &[&str]) -> assert_cmd::assert::Assert {
    credvault()
        .args(args)
        .current_dir(dir.path())
        .env("CREDVAULT_PASSPHRASE", PASSPHRASE)
        .assert()
}

/// Helper: a project that has already run `setup`.
fn initialised() -> TempDir {
    let dir = project();
    run(&dir, &["setup"]).success();
    dir
}

// ---------------------------------------------------------------------------
// Help and argument handling
// ---------------------------------------------------------------------------

#[test]
fn help_flag_shows_usage() {
    credvault()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Versioned, tamper-evident secret store"))
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("put"))
        .stdout(predicate::str::contains("getall"))
        .stdout(predicate::str::contains("versions"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn version_flag_shows_version() {
    credvault()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("credvault"));
}

#[test]
fn no_args_shows_help() {
    credvault()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn put_help_shows_digest_option() {
    credvault()
        .args(["put", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digest"))
        .stdout(predicate::str::contains("autoversion").not());
}

// ---------------------------------------------------------------------------
// End-to-end flows
// ---------------------------------------------------------------------------

#[test]
fn setup_creates_keyring_and_database() {
    let dir = project();
    run(&dir, &["setup"])
        .success()
        .stdout(predicate::str::contains("alias/credstash"));

    dir.child(".credvault/keyring.json").assert(predicate::path::exists());
    dir.child(".credvault/secrets.db").assert(predicate::path::exists());

    // A second setup is harmless.
    run(&dir, &["setup"])
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn get_before_setup_fails() {
    let dir = project();
    run(&dir, &["get", "db.pass"])
        .failure()
        .stderr(predicate::str::contains("credvault setup"));
}

#[test]
fn put_then_get_latest_and_explicit_version() {
    let dir = initialised();

    run(&dir, &["put", "db.pass", "first"])
        .success()
        .stdout(predicate::str::contains("version 1"));
    run(&dir, &["put", "db.pass", "second"])
        .success()
        .stdout(predicate::str::contains("version 2"));

    run(&dir, &["get", "db.pass"]).success().stdout("second\n");
    run(&dir, &["get", "db.pass", "-v", "1"])
        .success()
        .stdout("first\n");
}

#[test]
fn put_reads_value_from_stdin() {
    let dir = initialised();

    credvault()
        .args(["put", "api.token", "-"])
        .current_dir(dir.path())
        .env("CREDVAULT_PASSPHRASE", PASSPHRASE)
        .write_stdin("from-stdin\n")
        .assert()
        .success();

    run(&dir, &["get", "api.token"]).success().stdout("from-stdin\n");
}

#[test]
fn put_needs_an_explicit_value_before_context() {
    let dir = initialised();

    // Without a value the context pair would be taken as the secret.
    credvault()
        .args(["put", "db.pass"])
        .current_dir(dir.path())
        .env("CREDVAULT_PASSPHRASE", PASSPHRASE)
        .write_stdin("ignored\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));

    credvault()
        .args(["put", "db.pass", "-", "env=prod"])
        .current_dir(dir.path())
        .env("CREDVAULT_PASSPHRASE", PASSPHRASE)
        .write_stdin("piped\n")
        .assert()
        .success();

    run(&dir, &["get", "db.pass", "env=prod"])
        .success()
        .stdout("piped\n");
}

#[test]
fn duplicate_explicit_version_is_refused() {
    let dir = initialised();
    run(&dir, &["put", "x", "a", "-v", "5"]).success();
    run(&dir, &["put", "x", "b", "-v", "5"])
        .failure()
        .stderr(predicate::str::contains("is already in the credential store."));
    run(&dir, &["get", "x"]).success().stdout("a\n");
}

#[test]
fn context_is_required_to_decrypt() {
    let dir = initialised();
    run(&dir, &["put", "db.pass", "s3cret", "env=prod"]).success();

    run(&dir, &["get", "db.pass", "env=prod"])
        .success()
        .stdout("s3cret\n");
    run(&dir, &["get", "db.pass", "env=dev"])
        .failure()
        .stderr(predicate::str::contains("encryption context may not match"))
        .stderr(predicate::str::contains("s3cret").not());
}

#[test]
fn malformed_context_is_rejected() {
    let dir = initialised();
    run(&dir, &["put", "db.pass", "v", "not-a-pair"])
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

#[test]
fn getall_env_format_filters_by_prefix() {
    let dir = initialised();
    run(&dir, &["put", "a.key", "k1"]).success();
    run(&dir, &["put", "a.key", "k2"]).success();
    run(&dir, &["put", "a.secret", "s1"]).success();
    run(&dir, &["put", "b.key", "b1"]).success();

    run(&dir, &["getall", "--starts-with", "a.", "-f", "env"])
        .success()
        .stdout("A_KEY=k2\nA_SECRET=s1\n");
}

#[test]
fn getall_json_is_the_default() {
    let dir = initialised();
    run(&dir, &["put", "db.pass", "pw"]).success();

    run(&dir, &["getall"])
        .success()
        .stdout(predicate::str::contains("\"db.pass\": \"pw\""));
}

#[test]
fn versions_lists_every_version() {
    let dir = initialised();
    run(&dir, &["put", "db.pass", "one"]).success();
    run(&dir, &["put", "db.pass", "two"]).success();

    run(&dir, &["versions", "db.pass"])
        .success()
        .stdout(predicate::str::contains("one"))
        .stdout(predicate::str::contains("two"));

    run(&dir, &["versions", "db.pass", "-l", "1"])
        .success()
        .stdout(predicate::str::contains("two"))
        .stdout(predicate::str::contains("one").not());
}

#[test]
fn list_shows_names_without_values() {
    let dir = initialised();
    run(&dir, &["put", "db.pass", "hidden-value"]).success();

    run(&dir, &["list"])
        .success()
        .stdout(predicate::str::contains("db.pass"))
        .stdout(predicate::str::contains("hidden-value").not());
}

#[test]
fn delete_single_version_then_all() {
    let dir = initialised();
    run(&dir, &["put", "x", "one"]).success();
    run(&dir, &["put", "x", "two"]).success();
    run(&dir, &["put", "x", "three"]).success();

    run(&dir, &["delete", "x", "-v", "3", "-f"]).success();
    run(&dir, &["get", "x"]).success().stdout("two\n");

    run(&dir, &["delete", "x", "-f"])
        .success()
        .stdout(predicate::str::contains("version 1"))
        .stdout(predicate::str::contains("version 2"));
    run(&dir, &["get", "x"])
        .failure()
        .stderr(predicate::str::contains("could not be found"));
}

#[test]
fn wrong_passphrase_is_rejected() {
    let dir = initialised();
    credvault()
        .args(["list"])
        .current_dir(dir.path())
        .env("CREDVAULT_PASSPHRASE", "not the passphrase")
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong passphrase"));
}

#[test]
fn config_shows_overrides_without_passphrase() {
    let dir = project();
    credvault()
        .args(["--table", "team-creds", "-k", "alias/team", "config"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("team-creds"))
        .stdout(predicate::str::contains("alias/team"))
        .stdout(predicate::str::contains("SHA256"));
}

#[test]
fn unknown_master_key_id_fails_put() {
    let dir = initialised();
    run(&dir, &["-k", "alias/missing", "put", "x", "v"])
        .failure()
        .stderr(predicate::str::contains("alias/missing"));
}

#[test]
fn audit_records_operations() {
    let dir = initialised();
    run(&dir, &["put", "db.pass", "pw"]).success();
    run(&dir, &["get", "db.pass"]).success();

    run(&dir, &["audit", "--last", "10"])
        .success()
        .stdout(predicate::str::contains("put"))
        .stdout(predicate::str::contains("db.pass"))
        .stdout(predicate::str::contains("pw\n").not());
}

#[test]
fn audit_records_the_version_a_plain_get_read() {
    let dir = initialised();
    run(&dir, &["put", "db.pass", "one"]).success();
    run(&dir, &["put", "db.pass", "two"]).success();
    run(&dir, &["put", "other", "x"]).success();
    run(&dir, &["get", "db.pass"]).success();

    // put@2 and the latest-version get both name version 2.
    run(&dir, &["audit", "db.pass"])
        .success()
        .stdout(predicate::function(|out: &str| out.matches("db.pass@2").count() == 2))
        .stdout(predicate::str::contains("db.pass@1"))
        .stdout(predicate::str::contains("other").not());
}

#[test]
fn completions_reject_unknown_shell() {
    credvault().args(["completions", "bash"]).assert().success();
    credvault()
        .args(["completions", "csh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
