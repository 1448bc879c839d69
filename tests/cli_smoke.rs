use assert_cmd::Command;

#[test]
fn runbook_test_help_command_succeeds() {
    let mut cmd = Command::cargo_bin("runbook-test").expect("runbook-test binary should build");
    cmd.arg("--help").env("NO_COLOR", "1");
    cmd.assert().success();
}

#[test]
fn runbook_test_rejects_missing_runbook() {
    let mut cmd = Command::cargo_bin("runbook-test").expect("runbook-test binary should build");
    cmd.arg("does-not-exist.md");
    cmd.assert().failure();
}
