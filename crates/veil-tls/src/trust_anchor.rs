use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rcgen::{
    BasicConstraints, CertificateParams, IsCa, Issuer, KeyPair, KeyUsagePurpose,
};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;
use sha2::{Digest, Sha256};

use crate::config::{KeyProfile, SubjectProfile};
use crate::errors::BootstrapError;
use crate::keys::{generate_key_pair, validity_window};

/// The deployment's private root of trust: a self-signed CA certificate and
/// the key that signs every leaf the interception listener presents.
#[derive(Debug)]
pub struct TrustAnchor {
    issuer: Issuer<'static, KeyPair>,
    cert_pem: String,
    cert_der: CertificateDer<'static>,
    key_pem: String,
}

impl TrustAnchor {
    pub fn certificate_pem(&self) -> &str {
        &self.cert_pem
    }

    pub fn certificate_der(&self) -> &CertificateDer<'static> {
        &self.cert_der
    }

    /// Colon-separated lowercase SHA-256 of the certificate DER, for
    /// operator-facing status output.
    pub fn fingerprint_sha256(&self) -> String {
        let digest = Sha256::digest(self.cert_der.as_ref());
        let mut rendered = String::with_capacity(digest.len() * 3);
        for (index, byte) in digest.iter().enumerate() {
            if index > 0 {
                rendered.push(':');
            }
            let _ = write!(rendered, "{byte:02x}");
        }
        rendered
    }

    pub(crate) fn issuer(&self) -> &Issuer<'static, KeyPair> {
        &self.issuer
    }
}

/// Load-or-generate store for the persistent trust anchor pair.
///
/// Material on disk is authoritative: while both files exist they are reused
/// unchanged and never rewritten. Generation happens only when neither file
/// exists; a half-present pair is rejected as corrupt rather than
/// regenerated.
pub struct TrustAnchorStore {
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl TrustAnchorStore {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    pub fn obtain(
        &self,
        subject: &SubjectProfile,
        key_profile: KeyProfile,
    ) -> Result<TrustAnchor, BootstrapError> {
        let cert_exists = self.cert_path.exists();
        let key_exists = self.key_path.exists();

        match (cert_exists, key_exists) {
            (true, true) => self.load(),
            (false, false) => {
                let anchor = generate_anchor(subject, key_profile)?;
                self.persist(&anchor)?;
                tracing::info!(
                    cert_path = %self.cert_path.display(),
                    fingerprint = %anchor.fingerprint_sha256(),
                    "generated new trust anchor"
                );
                Ok(anchor)
            }
            (true, false) => Err(BootstrapError::corrupt_anchor(
                &self.key_path,
                "trust anchor key file is missing while the certificate exists",
            )),
            (false, true) => Err(BootstrapError::corrupt_anchor(
                &self.cert_path,
                "trust anchor certificate file is missing while the key exists",
            )),
        }
    }

    fn load(&self) -> Result<TrustAnchor, BootstrapError> {
        let cert_pem = fs::read_to_string(&self.cert_path)
            .map_err(|error| BootstrapError::corrupt_anchor(&self.cert_path, error))?;
        let key_pem = fs::read_to_string(&self.key_path)
            .map_err(|error| BootstrapError::corrupt_anchor(&self.key_path, error))?;

        let cert_der = CertificateDer::from_pem_slice(cert_pem.as_bytes())
            .map_err(|error| BootstrapError::corrupt_anchor(&self.cert_path, error))?;
        let key = KeyPair::from_pem(&key_pem)
            .map_err(|error| BootstrapError::corrupt_anchor(&self.key_path, error))?;
        let issuer = Issuer::from_ca_cert_der(&cert_der, key)
            .map_err(|error| BootstrapError::corrupt_anchor(&self.cert_path, error))?;

        Ok(TrustAnchor {
            issuer,
            cert_pem,
            cert_der,
            key_pem,
        })
    }

    fn persist(&self, anchor: &TrustAnchor) -> Result<(), BootstrapError> {
        ensure_parent_exists(&self.cert_path)?;
        ensure_parent_exists(&self.key_path)?;

        fs::write(&self.cert_path, anchor.cert_pem.as_bytes())?;
        fs::write(&self.key_path, anchor.key_pem.as_bytes())?;
        restrict_permissions(&self.cert_path)?;
        restrict_permissions(&self.key_path)?;
        Ok(())
    }
}

fn generate_anchor(
    subject: &SubjectProfile,
    key_profile: KeyProfile,
) -> Result<TrustAnchor, BootstrapError> {
    let key = generate_key_pair(key_profile).map_err(BootstrapError::KeyGeneration)?;
    let params = anchor_params(subject);
    let cert = params
        .self_signed(&key)
        .map_err(BootstrapError::CertificateSigning)?;

    let cert_pem = cert.pem();
    let cert_der = cert.der().clone();
    let key_pem = key.serialize_pem();
    let issuer = Issuer::new(params, key);

    Ok(TrustAnchor {
        issuer,
        cert_pem,
        cert_der,
        key_pem,
    })
}

fn anchor_params(subject: &SubjectProfile) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.use_authority_key_identifier_extension = true;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
    ];
    let (not_before, not_after) = validity_window();
    params.not_before = not_before;
    params.not_after = not_after;
    params.distinguished_name = subject.distinguished_name();
    params
}

fn ensure_parent_exists(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
