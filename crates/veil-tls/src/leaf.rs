use rcgen::{
    CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyUsagePurpose, SanType,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::config::{KeyProfile, SubjectProfile};
use crate::errors::BootstrapError;
use crate::keys::{generate_key_pair, validity_window};
use crate::trust_anchor::TrustAnchor;

/// Expands the configured hostnames into the certificate's DNS-name list.
///
/// Each host contributes the pair {host, "*." + host}, bare name first, in
/// hostname input order.
pub fn expand_dns_names(hostnames: &[String]) -> Vec<String> {
    let mut names = Vec::with_capacity(hostnames.len() * 2);
    for host in hostnames {
        names.push(host.clone());
        names.push(format!("*.{host}"));
    }
    names
}

/// Ephemeral server certificate for the interception listener, signed by the
/// trust anchor. Regenerated on every process start, never persisted.
pub struct LeafCertificate {
    cert_pem: String,
    cert_der: CertificateDer<'static>,
    key_pem: String,
    key_der: PrivatePkcs8KeyDer<'static>,
    dns_names: Vec<String>,
}

impl LeafCertificate {
    pub fn certificate_pem(&self) -> &str {
        &self.cert_pem
    }

    pub fn certificate_der(&self) -> &CertificateDer<'static> {
        &self.cert_der
    }

    pub fn private_key_pem(&self) -> &str {
        &self.key_pem
    }

    pub fn private_key_der(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::from(self.key_der.clone_key())
    }

    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }
}

pub struct LeafCertificateIssuer<'a> {
    anchor: &'a TrustAnchor,
    subject: &'a SubjectProfile,
    key_profile: KeyProfile,
}

impl<'a> LeafCertificateIssuer<'a> {
    pub fn new(
        anchor: &'a TrustAnchor,
        subject: &'a SubjectProfile,
        key_profile: KeyProfile,
    ) -> Self {
        Self {
            anchor,
            subject,
            key_profile,
        }
    }

    pub fn issue(&self, hostnames: &[String]) -> Result<LeafCertificate, BootstrapError> {
        let dns_names = expand_dns_names(hostnames);
        let params = leaf_params(self.subject, &dns_names)?;

        let key = generate_key_pair(self.key_profile).map_err(BootstrapError::KeyGeneration)?;
        let cert = params
            .signed_by(&key, self.anchor.issuer())
            .map_err(BootstrapError::CertificateSigning)?;

        Ok(LeafCertificate {
            cert_pem: cert.pem(),
            cert_der: cert.der().clone(),
            key_pem: key.serialize_pem(),
            key_der: PrivatePkcs8KeyDer::from(key.serialize_der()),
            dns_names,
        })
    }
}

fn leaf_params(
    subject: &SubjectProfile,
    dns_names: &[String],
) -> Result<CertificateParams, BootstrapError> {
    let mut params = CertificateParams::new(Vec::<String>::new())
        .map_err(BootstrapError::CertificateSigning)?;
    params.is_ca = IsCa::NoCa;
    params.use_authority_key_identifier_extension = true;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    // ClientAuth is deliberate: the proxy may present this certificate when
    // acting as a TLS client toward upstream hosts during interception.
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ClientAuth,
        ExtendedKeyUsagePurpose::ServerAuth,
    ];
    let (not_before, not_after) = validity_window();
    params.not_before = not_before;
    params.not_after = not_after;
    params.distinguished_name = subject.distinguished_name();

    for name in dns_names {
        params.subject_alt_names.push(SanType::DnsName(
            name.as_str()
                .try_into()
                .map_err(BootstrapError::CertificateSigning)?,
        ));
    }

    Ok(params)
}
