use std::sync::Arc;

use rustls::{RootCertStore, ServerConfig};

use crate::config::TlsCompatProfile;
use crate::errors::BootstrapError;
use crate::leaf::LeafCertificate;
use crate::trust_anchor::TrustAnchor;

const ALPN_HTTP1: &[u8] = b"http/1.1";

/// TLS configuration for the interception listener, plus the anchor-only
/// root pool collaborators use to verify chains against this deployment's
/// private root.
#[derive(Debug, Clone)]
pub struct InterceptServerConfig {
    pub server_config: Arc<ServerConfig>,
    pub ca_roots: Arc<RootCertStore>,
}

/// Packages the leaf and its issuing anchor into the interception listener's
/// TLS configuration.
///
/// ALPN is pinned to `http/1.1`: the interception layer operates on a single
/// request/response stream and offers no multiplexed-stream protocol. The
/// protocol-version floor comes from the configured compatibility profile.
pub fn assemble_intercept_config(
    anchor: &TrustAnchor,
    leaf: &LeafCertificate,
    profile: TlsCompatProfile,
) -> Result<InterceptServerConfig, BootstrapError> {
    let chain = vec![
        leaf.certificate_der().clone(),
        anchor.certificate_der().clone(),
    ];
    let private_key = leaf.private_key_der();

    let mut server_config =
        ServerConfig::builder_with_protocol_versions(protocol_versions_for_profile(profile))
            .with_no_client_auth()
            .with_single_cert(chain, private_key)
            .map_err(BootstrapError::from_assembly)?;
    server_config.alpn_protocols = vec![ALPN_HTTP1.to_vec()];

    let mut ca_roots = RootCertStore::empty();
    ca_roots.add(anchor.certificate_der().clone())?;

    Ok(InterceptServerConfig {
        server_config: Arc::new(server_config),
        ca_roots: Arc::new(ca_roots),
    })
}

fn protocol_versions_for_profile(
    profile: TlsCompatProfile,
) -> &'static [&'static rustls::SupportedProtocolVersion] {
    const TLS13_ONLY: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];
    const TLS12_TLS13: &[&rustls::SupportedProtocolVersion] =
        &[&rustls::version::TLS12, &rustls::version::TLS13];

    match profile {
        TlsCompatProfile::Modern => TLS13_ONLY,
        TlsCompatProfile::Compat => TLS12_TLS13,
    }
}
