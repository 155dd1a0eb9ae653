use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use veil_tls::{KeyProfile, SubjectProfile, TrustAnchorStore};

fn preflight_command(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_veil-preflight"));
    command
        .current_dir(dir)
        .env_remove("VEIL_CONFIG_PATH")
        .env_remove("VEIL_STATUS_PATH")
        .env_remove("VEIL_CA_EXPORT_PATH");
    command
}

fn status_records(raw: &str) -> Vec<serde_json::Value> {
    raw.lines()
        .map(|line| serde_json::from_str(line).expect("status line must be JSON"))
        .collect()
}

fn write_config(dir: &Path, hostnames: &[&str]) -> std::path::PathBuf {
    let config_path = dir.join("veil.json");
    let config = serde_json::json!({
        "ca_cert_path": dir.join("ca.pem"),
        "ca_key_path": dir.join("key.pem"),
        "dot_cert_path": dir.join("dot_cert.pem"),
        "dot_key_path": dir.join("dot_key.pem"),
        "proxied_hostnames": hostnames,
        "key_profile": "modern",
    });
    fs::write(&config_path, config.to_string()).expect("write config");
    config_path
}

#[test]
fn missing_dot_material_exits_with_bootstrap_failed() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = write_config(dir.path(), &["news.example"]);
    let status_path = dir.path().join("status.ndjson");

    let output = preflight_command(dir.path())
        .env("VEIL_CONFIG_PATH", &config_path)
        .env("VEIL_STATUS_PATH", &status_path)
        .output()
        .expect("run preflight");

    assert_eq!(output.status.code(), Some(21));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("VEIL_STATUS\t"), "stderr: {stderr}");

    let records = status_records(&fs::read_to_string(&status_path).expect("read status file"));
    let exit = records.last().expect("exit record");
    assert_eq!(exit["schema"], "veil-preflight-status-v1");
    assert_eq!(exit["stage"], "exit");
    assert_eq!(exit["exit_class"], "bootstrap_failed");
    assert!(
        exit["detail"]
            .as_str()
            .expect("detail")
            .contains("missing"),
        "{exit}"
    );
}

#[test]
fn invalid_config_file_exits_with_config_invalid() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("veil.json");
    fs::write(&config_path, r#"{"unknown_knob": true}"#).expect("write config");

    let output = preflight_command(dir.path())
        .env("VEIL_CONFIG_PATH", &config_path)
        .output()
        .expect("run preflight");

    assert_eq!(output.status.code(), Some(20));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config_invalid"), "stderr: {stderr}");
}

#[test]
fn successful_preflight_exports_ca_certificate() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = write_config(dir.path(), &["news.example"]);

    // Any valid self-signed pair stands in for operator-provisioned DoT
    // material here; production deployments use publicly trusted certs.
    TrustAnchorStore::new(dir.path().join("dot_cert.pem"), dir.path().join("dot_key.pem"))
        .obtain(&SubjectProfile::default(), KeyProfile::Modern)
        .expect("provision dot material");

    let export_path = dir.path().join("export/ca.pem");
    let status_path = dir.path().join("status.ndjson");
    let output = preflight_command(dir.path())
        .env("VEIL_CONFIG_PATH", &config_path)
        .env("VEIL_STATUS_PATH", &status_path)
        .env("VEIL_CA_EXPORT_PATH", &export_path)
        .output()
        .expect("run preflight");

    assert_eq!(output.status.code(), Some(0));

    let exported = fs::read(&export_path).expect("exported CA certificate");
    let persisted = fs::read(dir.path().join("ca.pem")).expect("persisted CA certificate");
    assert_eq!(exported, persisted);

    let records = status_records(&fs::read_to_string(&status_path).expect("read status file"));
    let exit = records.last().expect("exit record");
    assert_eq!(exit["exit_class"], "ok");
    assert!(
        exit["detail"]
            .as_str()
            .expect("detail")
            .contains("trust anchor"),
        "{exit}"
    );
}
