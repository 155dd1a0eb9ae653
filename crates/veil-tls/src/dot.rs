use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;

use crate::errors::BootstrapError;

/// Loader for the DoT listener's pre-provisioned certificate pair.
///
/// There is no generation fallback: DoT serves real clients that validate
/// against public trust roots, which the self-signed anchor cannot satisfy.
/// Protocol versions and cipher suites stay at rustls defaults, and no ALPN
/// preference is set, unlike the interception config.
pub struct DotCertificateLoader {
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl DotCertificateLoader {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    pub fn load(&self) -> Result<Arc<ServerConfig>, BootstrapError> {
        require_exists(&self.cert_path)?;
        require_exists(&self.key_path)?;

        let chain = CertificateDer::pem_file_iter(&self.cert_path)
            .map_err(|error| BootstrapError::corrupt_pem(&self.cert_path, error))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| BootstrapError::corrupt_pem(&self.cert_path, error))?;
        if chain.is_empty() {
            return Err(BootstrapError::corrupt_pem(
                &self.cert_path,
                "no CERTIFICATE block found",
            ));
        }
        let private_key = PrivateKeyDer::from_pem_file(&self.key_path)
            .map_err(|error| BootstrapError::corrupt_pem(&self.key_path, error))?;

        let server_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(chain, private_key)
            .map_err(BootstrapError::from_assembly)?;

        Ok(Arc::new(server_config))
    }
}

fn require_exists(path: &Path) -> Result<(), BootstrapError> {
    if !path.exists() {
        return Err(BootstrapError::MissingCertificateMaterial {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
