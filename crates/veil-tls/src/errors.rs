use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("required certificate material is missing: {path}")]
    MissingCertificateMaterial { path: PathBuf },
    #[error("trust anchor material at {path} is corrupt: {detail}")]
    CorruptTrustAnchor { path: PathBuf, detail: String },
    #[error("failed to parse PEM material from {path}: {detail}")]
    CorruptPem { path: PathBuf, detail: String },
    #[error("certificate does not match its private key: {detail}")]
    InvalidKeyPair { detail: String },
    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] rcgen::Error),
    #[error("certificate signing failed: {0}")]
    CertificateSigning(#[source] rcgen::Error),
    #[error("TLS config build failed: {0}")]
    ConfigBuild(#[from] rustls::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid bootstrap configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
}

impl BootstrapError {
    pub(crate) fn corrupt_anchor(path: &std::path::Path, detail: impl ToString) -> Self {
        Self::CorruptTrustAnchor {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn corrupt_pem(path: &std::path::Path, detail: impl ToString) -> Self {
        Self::CorruptPem {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }

    /// Maps a rustls certificate/key assembly failure, distinguishing the
    /// key-mismatch case from other config build errors.
    pub(crate) fn from_assembly(error: rustls::Error) -> Self {
        match error {
            rustls::Error::InconsistentKeys(reason) => Self::InvalidKeyPair {
                detail: format!("{reason:?}"),
            },
            other => Self::ConfigBuild(other),
        }
    }
}
