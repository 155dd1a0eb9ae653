use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use rustls::{RootCertStore, ServerConfig};

use crate::config::BootstrapConfig;
use crate::dot::DotCertificateLoader;
use crate::errors::BootstrapError;
use crate::leaf::LeafCertificateIssuer;
use crate::server_config::assemble_intercept_config;
use crate::trust_anchor::TrustAnchorStore;

/// Everything the startup bootstrap produces, constructed once and passed by
/// reference into the listener constructors. Both configs are immutable and
/// shared read-only across connection tasks; no post-construction
/// synchronization is needed.
#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    pub intercept_config: Arc<ServerConfig>,
    pub dot_config: Arc<ServerConfig>,
    pub ca_roots: Arc<RootCertStore>,
    pub ca_certificate_pem: String,
    pub ca_certificate_der: CertificateDer<'static>,
    pub ca_fingerprint_sha256: String,
    pub leaf_certificate_der: CertificateDer<'static>,
    pub dns_names: Vec<String>,
}

/// Runs the full certificate bootstrap: trust anchor acquisition, leaf
/// issuance, interception config assembly, then the independent DoT load.
///
/// Strictly sequential; each step's failure is returned as a typed error for
/// the caller to act on (exit, retry the whole bootstrap, or degrade).
/// Neither listener may be started from a partially-built outcome.
pub fn run_bootstrap(config: &BootstrapConfig) -> Result<BootstrapOutcome, BootstrapError> {
    config.validate()?;

    let store = TrustAnchorStore::new(&config.ca_cert_path, &config.ca_key_path);
    let anchor = store.obtain(&config.anchor_subject, config.key_profile)?;

    let leaf = LeafCertificateIssuer::new(&anchor, &config.leaf_subject, config.key_profile)
        .issue(&config.proxied_hostnames)?;
    let intercept = assemble_intercept_config(&anchor, &leaf, config.tls_compat_profile)?;

    let dot_config =
        DotCertificateLoader::new(&config.dot_cert_path, &config.dot_key_path).load()?;

    tracing::debug!(
        fingerprint = %anchor.fingerprint_sha256(),
        dns_names = leaf.dns_names().len(),
        profile = config.tls_compat_profile.as_str(),
        "certificate bootstrap complete"
    );

    Ok(BootstrapOutcome {
        intercept_config: intercept.server_config,
        dot_config,
        ca_roots: intercept.ca_roots,
        ca_certificate_pem: anchor.certificate_pem().to_string(),
        ca_certificate_der: anchor.certificate_der().clone(),
        ca_fingerprint_sha256: anchor.fingerprint_sha256(),
        leaf_certificate_der: leaf.certificate_der().clone(),
        dns_names: leaf.dns_names().to_vec(),
    })
}
