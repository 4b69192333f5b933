use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Temporary store, per-user caches and blob directory for one test.
struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temporary directory"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// `et` acting as workshop staff.
    fn staff(&self) -> Command {
        self.command("executor", "staff")
    }

    /// `et` acting as the client `cli_1`.
    fn client(&self) -> Command {
        self.command("client", "cli_1")
    }

    fn command(&self, role: &str, id: &str) -> Command {
        let mut cmd = Command::cargo_bin("et").expect("Failed to find et binary");
        cmd.arg("--no-color")
            .arg("--database-file")
            .arg(self.path("store.db"))
            .arg("--cache-file")
            .arg(self.path(&format!("cache-{id}.db")))
            .arg("--blob-dir")
            .arg(self.path("blobs"))
            .args(["--as-role", role, "--as-id", id, "--as-name", id]);
        cmd
    }

    fn create_project(&self, qr: &str, steps: &[&str]) {
        let mut cmd = self.staff();
        cmd.args([
            "project", "create", qr, "--client", "cli_1", "--vehicle", "veh_1",
        ]);
        for step in steps {
            cmd.args(["--step", step]);
        }
        cmd.assert().success();
    }
}

#[test]
fn test_cli_list_empty_projects() {
    let env = TestEnv::new();

    env.staff()
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects found."));
}

#[test]
fn test_cli_create_project() {
    let env = TestEnv::new();

    env.staff()
        .args([
            "project",
            "create",
            "QR-100",
            "--client",
            "cli_1",
            "--vehicle",
            "veh_1",
            "--step",
            "Glass",
            "--step",
            "Doors",
            "--delivery",
            "2099-03-01",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Created project with ID: prj_1 (stored)",
        ))
        .stdout(predicate::str::contains("### 1. Glass (○ Pending)"))
        .stdout(predicate::str::contains("`stp_2`"));

    env.staff()
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## QR-100 (ID: prj_1) (0/2)"));
}

#[test]
fn test_cli_create_project_with_standard_stages() {
    let env = TestEnv::new();

    env.staff()
        .args([
            "project", "create", "QR-101", "--client", "cli_1", "--vehicle", "veh_1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Timeline (0/"));
}

#[test]
fn test_cli_duplicate_qr_code_fails() {
    let env = TestEnv::new();
    env.create_project("QR-1", &["Glass"]);

    env.staff()
        .args([
            "project", "create", "QR-1", "--client", "cli_1", "--vehicle", "veh_1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("qr_code"));
}

#[test]
fn test_cli_step_walkthrough() {
    let env = TestEnv::new();
    env.create_project("QR-2", &["Glass", "Doors"]);

    env.staff()
        .args(["step", "start", "prj_1", "stp_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Updated project with ID: prj_1 (stored)",
        ))
        .stdout(predicate::str::contains("Glass: pending → in_progress"));

    env.staff()
        .args(["step", "complete", "prj_1", "stp_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "a forecast date for the next step is required",
        ));

    env.staff()
        .args([
            "step",
            "complete",
            "prj_1",
            "stp_1",
            "--forecast",
            "2099-01-15",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress: 0% → 50%"))
        .stdout(predicate::str::contains("Doors forecast for 2099-01-15"));

    env.staff()
        .args(["project", "show", "QR-2", "--qr"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Timeline (1/2)"));
}

#[test]
fn test_cli_edit_step_needs_a_field() {
    let env = TestEnv::new();
    env.create_project("QR-3", &["Glass"]);

    env.staff()
        .args(["step", "edit", "prj_1", "stp_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to edit"));

    env.staff()
        .args(["step", "edit", "prj_1", "stp_1", "--technician", "Marta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated technician of Glass"))
        .stdout(predicate::str::contains("- Technician: Marta"));
}

#[test]
fn test_cli_step_photo_upload() {
    let env = TestEnv::new();
    env.create_project("QR-4", &["Glass"]);
    let photo = env.path("left_door.jpg");
    std::fs::write(&photo, b"jpeg bytes").expect("Failed to write photo");

    env.staff()
        .args(["step", "photo", "prj_1", "stp_1"])
        .arg(&photo)
        .assert()
        .success()
        .stdout(predicate::str::contains("Photo added to Glass"))
        .stdout(predicate::str::contains("left_door.jpg"));
}

#[test]
fn test_cli_client_cannot_move_steps() {
    let env = TestEnv::new();
    env.create_project("QR-5", &["Glass"]);

    env.client()
        .args(["step", "start", "prj_1", "stp_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Action not allowed"));
}

#[test]
fn test_cli_client_sees_only_own_projects() {
    let env = TestEnv::new();
    env.create_project("QR-6", &["Glass"]);
    env.staff()
        .args([
            "project", "create", "QR-7", "--client", "cli_2", "--vehicle", "veh_2",
        ])
        .assert()
        .success();

    env.client()
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("QR-6"))
        .stdout(predicate::str::contains("QR-7").not());
}

#[test]
fn test_cli_chat_between_client_and_staff() {
    let env = TestEnv::new();
    env.create_project("QR-8", &["Glass"]);

    env.client()
        .args(["chat", "send", "prj_1", "  When is it ready?  "])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Created message with ID: msg_1 (stored)",
        ));

    env.staff()
        .args(["chat", "show", "prj_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("When is it ready?"))
        .stdout(predicate::str::contains("1 unread"));

    env.staff()
        .args(["chat", "read", "prj_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked 1 message(s) as read (stored)"));

    env.staff()
        .args(["chat", "show", "prj_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unread").not());
}

#[test]
fn test_cli_blank_message_rejected() {
    let env = TestEnv::new();
    env.create_project("QR-9", &["Glass"]);

    env.staff()
        .args(["chat", "send", "prj_1", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("content"));
}

#[test]
fn test_cli_quote_pipeline() {
    let env = TestEnv::new();

    env.client()
        .args([
            "quote",
            "request",
            "--service",
            "Full armoring",
            "--brand",
            "Toyota",
            "--model",
            "Hilux",
            "--year",
            "2024",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Created quote with ID: quo_1 (stored)",
        ));

    // Answering before the proposal is sent is rejected
    env.client()
        .args(["quote", "approve", "quo_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has not been sent"));

    env.staff()
        .args(["quote", "list", "--pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("quo_1"));

    env.staff()
        .args(["quote", "send", "quo_1", "--price", "85000", "--days", "45"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: pending → sent"))
        .stdout(predicate::str::contains("Price: 85000.00"));

    env.client()
        .args(["quote", "approve", "quo_1", "--response", "Go ahead"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: sent → approved"))
        .stdout(predicate::str::contains("Client response: Go ahead"));

    env.staff()
        .args(["quote", "expire", "quo_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already approved"));
}

#[test]
fn test_cli_staff_quote_needs_client() {
    let env = TestEnv::new();

    env.staff()
        .args([
            "quote", "request", "--service", "Glass", "--brand", "BMW", "--model", "X5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--client is required"));
}

#[test]
fn test_cli_offline_changes_stay_local() {
    let env = TestEnv::new();

    env.staff()
        .args([
            "--offline",
            "project",
            "create",
            "QR-10",
            "--client",
            "cli_1",
            "--vehicle",
            "veh_1",
            "--step",
            "Glass",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("saved locally, not yet stored"))
        .stdout(predicate::str::contains("Created project with ID: local-"));

    // The cached project survives into the next offline run
    env.staff()
        .args(["--offline", "project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("QR-10"));
}

#[test]
fn test_cli_directory() {
    let env = TestEnv::new();

    env.staff()
        .args(["client", "add", "Ana Souza", "ana@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered client with ID: cli_1"));

    env.staff()
        .args([
            "vehicle", "add", "--client", "cli_1", "Toyota", "Hilux", "--year", "2024",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered vehicle with ID: veh_1"));

    env.staff()
        .args(["client", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ana@example.com"));

    env.create_project("QR-11", &["Glass"]);
    env.staff()
        .args(["project", "list", "--email", "ANA@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("QR-11"));
}

#[test]
fn test_cli_directory_rules() {
    let env = TestEnv::new();

    env.staff()
        .args(["--offline", "client", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("without --offline"));

    env.client()
        .args(["client", "add", "Eve", "eve@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only workshop staff"));
}

#[test]
fn test_cli_invalid_date() {
    let env = TestEnv::new();

    env.staff()
        .args([
            "project",
            "create",
            "QR-12",
            "--client",
            "cli_1",
            "--vehicle",
            "veh_1",
            "--delivery",
            "next week",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--delivery"));
}
