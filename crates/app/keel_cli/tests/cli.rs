use assert_cmd::Command;
use predicates::prelude::*;

const SECRET: &str = "cli-test-secret";

fn keel() -> Command {
    let mut cmd = Command::cargo_bin("keel").unwrap();
    cmd.env_remove("KEEL_CONFIG")
        .env_remove("KEEL_JWT_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap().trim().to_string()
}

#[test]
fn prints_version() {
    keel()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn issue_then_verify_access_token() {
    let token = stdout_of(keel().args([
        "--secret", SECRET, "issue-access", "--user", "u1", "--tenant", "acme", "--role", "editor",
        "--role", "viewer",
    ]));
    assert_eq!(token.split('.').count(), 3);

    keel()
        .args(["--secret", SECRET, "verify", &token])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"user_id\": \"u1\""))
        .stdout(predicate::str::contains("\"tenant_id\": \"acme\""))
        .stdout(predicate::str::contains("editor"));
}

#[test]
fn verify_with_other_secret_fails() {
    let token = stdout_of(keel().args(["--secret", SECRET, "issue-access", "--user", "u1"]));
    keel()
        .args(["--secret", "another", "verify", &token])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid or expired token"));
}

#[test]
fn secret_from_environment() {
    let token = stdout_of(
        keel()
            .env("KEEL_JWT_SECRET", SECRET)
            .args(["issue-refresh", "--user", "u1", "--tenant", "acme"]),
    );
    keel()
        .env("KEEL_JWT_SECRET", SECRET)
        .args(["verify", "--refresh", &token])
        .assert()
        .success();
}

#[test]
fn secret_from_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keel.yaml");
    std::fs::write(&path, format!("auth:\n  jwt_secret: {SECRET}\n")).unwrap();

    let token = stdout_of(keel().args([
        "--config",
        path.to_str().unwrap(),
        "issue-access",
        "--user",
        "u1",
    ]));
    keel()
        .args(["--secret", SECRET, "verify", &token])
        .assert()
        .success();
}

#[test]
fn refresh_exchanges_only_refresh_tokens() {
    let refresh = stdout_of(keel().args(["--secret", SECRET, "issue-refresh", "--user", "u1"]));
    let access = stdout_of(keel().args(["--secret", SECRET, "refresh", &refresh]));
    keel()
        .args(["--secret", SECRET, "verify", &access])
        .assert()
        .success();

    keel()
        .args(["--secret", SECRET, "refresh", &access])
        .assert()
        .failure();
}

#[test]
fn missing_secret_is_a_config_error() {
    keel()
        .args(["issue-access", "--user", "u1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("secret"));
}

#[test]
fn password_hash_round_trip() {
    let hash = stdout_of(keel().args(["hash-password", "hunter2"]));
    assert!(hash.starts_with("$2"));

    keel()
        .args(["check-password", "hunter2", &hash])
        .assert()
        .success()
        .stdout("ok\n");
    keel()
        .args(["check-password", "wrong", &hash])
        .assert()
        .failure();
}

#[test]
fn gen_secret_respects_length() {
    let secret = stdout_of(keel().args(["gen-secret", "--len", "32"]));
    assert_eq!(secret.len(), 32);
    assert!(secret.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn check_tls_without_material_fails() {
    keel()
        .args(["--secret", SECRET, "check-tls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TLS is not configured"));
}

#[test]
fn check_tls_with_missing_ca_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.pem");
    keel()
        .env("KEEL_TLS_CERT", &missing)
        .env("KEEL_TLS_KEY", &missing)
        .env("KEEL_TLS_CA", &missing)
        .args(["--secret", SECRET, "check-tls"])
        .assert()
        .failure();
}
