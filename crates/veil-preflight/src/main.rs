use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use veil_tls::{run_bootstrap, BootstrapConfig, BootstrapError, BootstrapOutcome};

const STATUS_SCHEMA: &str = "veil-preflight-status-v1";
const STATUS_PREFIX: &str = "VEIL_STATUS\t";

const ENV_CONFIG_PATH: &str = "VEIL_CONFIG_PATH";
const ENV_STATUS_PATH: &str = "VEIL_STATUS_PATH";
const ENV_CA_EXPORT_PATH: &str = "VEIL_CA_EXPORT_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitClass {
    Ok,
    ConfigInvalid,
    BootstrapFailed,
    CaExportFailed,
}

impl ExitClass {
    fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::ConfigInvalid => 20,
            Self::BootstrapFailed => 21,
            Self::CaExportFailed => 22,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::ConfigInvalid => "config_invalid",
            Self::BootstrapFailed => "bootstrap_failed",
            Self::CaExportFailed => "ca_export_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunOutcome {
    class: ExitClass,
    detail: Option<String>,
}

impl RunOutcome {
    fn ok(detail: Option<String>) -> Self {
        Self {
            class: ExitClass::Ok,
            detail,
        }
    }

    fn error(class: ExitClass, detail: impl Into<String>) -> Self {
        Self {
            class,
            detail: Some(detail.into()),
        }
    }

    fn exit_code(&self) -> i32 {
        self.class.code()
    }

    fn status_record(&self) -> StatusRecord {
        StatusRecord::new(
            "exit",
            if self.class == ExitClass::Ok {
                "ok"
            } else {
                "error"
            },
            self.exit_code(),
            self.class.label(),
            self.detail.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct StatusRecord {
    schema: &'static str,
    stage: &'static str,
    outcome: &'static str,
    exit_code: i32,
    exit_class: &'static str,
    unix_ms: u128,
    detail: Option<String>,
}

impl StatusRecord {
    fn new(
        stage: &'static str,
        outcome: &'static str,
        exit_code: i32,
        exit_class: &'static str,
        detail: Option<String>,
    ) -> Self {
        Self {
            schema: STATUS_SCHEMA,
            stage,
            outcome,
            exit_code,
            exit_class,
            unix_ms: now_unix_ms(),
            detail,
        }
    }
}

#[derive(Debug, Default)]
struct StatusEmitter {
    status_file: Option<Mutex<BufWriter<File>>>,
}

impl StatusEmitter {
    fn from_env() -> Self {
        let path = env::var(ENV_STATUS_PATH)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let Some(path) = path else {
            return Self::default();
        };

        let status_file = match open_status_file(&path) {
            Ok(file) => Some(Mutex::new(BufWriter::new(file))),
            Err(error) => {
                eprintln!("failed to open status stream file {path}: {error}");
                None
            }
        };
        Self { status_file }
    }

    fn emit(&self, record: StatusRecord) {
        let json = match serde_json::to_string(&record) {
            Ok(value) => value,
            Err(error) => {
                eprintln!("failed to serialize status record: {error}");
                return;
            }
        };

        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{STATUS_PREFIX}{json}");
        let _ = stderr.flush();

        if let Some(status_file) = self.status_file.as_ref() {
            let mut writer = status_file.lock().expect("lock poisoned");
            let _ = writeln!(writer, "{json}");
            let _ = writer.flush();
        }
    }
}

fn main() {
    let status_emitter = StatusEmitter::from_env();
    status_emitter.emit(StatusRecord::new(
        "startup",
        "in_progress",
        0,
        "ok",
        Some("running certificate preflight".to_string()),
    ));

    let outcome = run_preflight();
    status_emitter.emit(outcome.status_record());
    std::process::exit(outcome.exit_code());
}

fn run_preflight() -> RunOutcome {
    let config = match load_bootstrap_config() {
        Ok(config) => config,
        Err(detail) => return RunOutcome::error(ExitClass::ConfigInvalid, detail),
    };

    let outcome = match run_bootstrap(&config) {
        Ok(outcome) => outcome,
        Err(error @ BootstrapError::InvalidConfiguration(_)) => {
            return RunOutcome::error(ExitClass::ConfigInvalid, error.to_string())
        }
        Err(error) => return RunOutcome::error(ExitClass::BootstrapFailed, error.to_string()),
    };

    let exported = match export_ca_certificate(&outcome) {
        Ok(exported) => exported,
        Err(error) => return RunOutcome::error(ExitClass::CaExportFailed, error.to_string()),
    };

    let mut detail = format!(
        "trust anchor {}; leaf covers {} dns names",
        outcome.ca_fingerprint_sha256,
        outcome.dns_names.len()
    );
    if let Some(path) = exported {
        detail.push_str(&format!("; ca exported to {path}"));
    }
    RunOutcome::ok(Some(detail))
}

fn load_bootstrap_config() -> Result<BootstrapConfig, String> {
    let path = env::var(ENV_CONFIG_PATH)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let Some(path) = path else {
        return Ok(BootstrapConfig::default());
    };

    let raw = fs::read_to_string(&path)
        .map_err(|error| format!("failed to read config file {path}: {error}"))?;
    serde_json::from_str(&raw).map_err(|error| format!("invalid config file {path}: {error}"))
}

fn export_ca_certificate(outcome: &BootstrapOutcome) -> io::Result<Option<String>> {
    let path = env::var(ENV_CA_EXPORT_PATH)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let Some(path) = path else {
        return Ok(None);
    };

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&path, outcome.ca_certificate_pem.as_bytes())?;
    Ok(Some(path))
}

fn open_status_file(path: &str) -> io::Result<File> {
    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn now_unix_ms() -> u128 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis(),
        Err(_) => 0,
    }
}
