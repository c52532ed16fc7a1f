use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const STAKEHOLDERS: &str = r#"[
    {"id": "12345", "display_name": "DHS", "federal": true, "region": "VA",
     "kind": "FEDERAL",
     "technical_contacts": [{"name": "Ann", "email": "a@x.gov"}],
     "distribution_lists": ["a@x.gov", "b@x.gov"]},
    {"id": "22222", "display_name": "STATE", "federal": false, "kind": "STATE",
     "technical_contacts": [{"email": "s@x.gov"}]}
]"#;

struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let reports = root.path().join("cyhy");
        std::fs::create_dir(&reports).expect("report dir");
        for name in [
            "12345_cyhy_report.pdf",
            "12345_cyhy_report_p2.pdf",
            "99999_cyhy_report.pdf",
            "README.txt",
        ] {
            std::fs::write(reports.join(name), b"%PDF-1.4").expect("write report");
        }
        std::fs::write(root.path().join("stakeholders.json"), STAKEHOLDERS)
            .expect("write stakeholders");
        std::fs::write(root.path().join("advisors.toml"), "VA = \"c@x.gov\"\n")
            .expect("write advisors");
        Self { root }
    }

    fn path(&self, name: &str) -> String {
        self.root.path().join(name).display().to_string()
    }

    fn dir(&self) -> &Path {
        self.root.path()
    }

    fn command(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("cyhy-mailer");
        cmd.env_clear()
            .current_dir(self.dir())
            .arg("--env-file")
            .arg(self.path("missing.env"))
            .arg("--stakeholder-file")
            .arg(self.path("stakeholders.json"));
        cmd
    }
}

#[test]
fn dry_run_reports_json_without_sending() {
    let fixture = Fixture::new();
    let output = fixture
        .command()
        .arg("send")
        .arg("--cyhy-report-dir")
        .arg(fixture.path("cyhy"))
        .arg("--advisor-map")
        .arg(fixture.path("advisors.toml"))
        .arg("--summary-to")
        .arg("ops@x.gov")
        .arg("--dry-run")
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).expect("json report");
    let counts = &report["summary"]["cyhy-report"];
    assert_eq!(counts["attempted"], 2);
    assert_eq!(counts["dry_run"], 1);
    assert_eq!(counts["skipped"], 1);
    assert_eq!(counts["sent"], 0);
    assert_eq!(counts["unmatched"], 1);

    let first = &report["messages"][0];
    assert_eq!(first["stakeholder_id"], "12345");
    assert_eq!(first["to"], serde_json::json!(["a@x.gov", "b@x.gov"]));
    assert_eq!(first["cc"], serde_json::json!(["c@x.gov"]));
    assert_eq!(first["attachments"], 2);
    assert_eq!(first["outcome"]["status"], "skipped-dry-run");

    assert_eq!(report["summary_email"]["status"], "skipped-dry-run");
}

#[test]
fn dry_run_prints_summary_lines() {
    let fixture = Fixture::new();
    fixture
        .command()
        .arg("--cyhy-report-dir")
        .arg(fixture.path("cyhy"))
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cyhy-report: attempted 2, sent 0, skipped 1, failed 0, dry-run 1, unmatched 1",
        ));
}

#[test]
fn dry_run_before_send_subcommand_still_holds_mail_back() {
    let fixture = Fixture::new();
    fixture
        .command()
        .arg("--dry-run")
        .arg("send")
        .arg("--cyhy-report-dir")
        .arg(fixture.path("cyhy"))
        .assert()
        .success()
        .stdout(predicate::str::contains("sent 0, skipped 1, failed 0, dry-run 1"));
}

#[test]
fn nothing_enabled_is_fatal() {
    let fixture = Fixture::new();
    fixture
        .command()
        .arg("send")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no report category enabled"));
}

#[test]
fn missing_report_directory_is_fatal() {
    let fixture = Fixture::new();
    fixture
        .command()
        .arg("send")
        .arg("--notification-dir")
        .arg(fixture.path("does-not-exist"))
        .arg("--dry-run")
        .assert()
        .code(1);
}

#[test]
fn transport_failures_exit_with_two() {
    let fixture = Fixture::new();
    fixture
        .command()
        .env("SMTP_SERVER", "127.0.0.1")
        .env("SMTP_PORT", "1")
        .env("SMTP_TIMEOUT", "2s")
        .arg("send")
        .arg("--cyhy-report-dir")
        .arg(fixture.path("cyhy"))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("failed 1"));
}

#[test]
fn adhoc_dry_run_to_federal_stakeholders() {
    let fixture = Fixture::new();
    std::fs::write(fixture.dir().join("body.html"), "<p>Maintenance tonight</p>")
        .expect("write html");
    std::fs::write(fixture.dir().join("body.txt"), "Maintenance tonight")
        .expect("write text");

    let output = fixture
        .command()
        .arg("adhoc")
        .arg("--subject")
        .arg("Scheduled maintenance")
        .arg("--html-body")
        .arg(fixture.path("body.html"))
        .arg("--text-body")
        .arg(fixture.path("body.txt"))
        .arg("--to")
        .arg("ops@x.gov")
        .arg("--federal-stakeholders")
        .arg("--dry-run")
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(report["summary"]["adhoc"]["attempted"], 2);
    assert_eq!(report["summary"]["adhoc"]["dry_run"], 2);
    assert_eq!(report["messages"][0]["to"], serde_json::json!(["ops@x.gov"]));
    assert_eq!(report["messages"][1]["stakeholder_id"], "12345");
}

#[test]
fn adhoc_without_audience_is_fatal() {
    let fixture = Fixture::new();
    std::fs::write(fixture.dir().join("body.html"), "<p>x</p>").expect("write html");
    std::fs::write(fixture.dir().join("body.txt"), "x").expect("write text");

    fixture
        .command()
        .arg("adhoc")
        .arg("--subject")
        .arg("Nothing")
        .arg("--html-body")
        .arg(fixture.path("body.html"))
        .arg("--text-body")
        .arg(fixture.path("body.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no audience selected"));
}

#[test]
fn adhoc_rejects_malformed_to_address() {
    let fixture = Fixture::new();
    std::fs::write(fixture.dir().join("body.html"), "<p>x</p>").expect("write html");
    std::fs::write(fixture.dir().join("body.txt"), "x").expect("write text");

    fixture
        .command()
        .arg("adhoc")
        .arg("--subject")
        .arg("Typo")
        .arg("--html-body")
        .arg(fixture.path("body.html"))
        .arg("--text-body")
        .arg(fixture.path("body.txt"))
        .arg("--to")
        .arg("ops.x.gov")
        .arg("--dry-run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--to 'ops.x.gov' is not an email address"));
}
