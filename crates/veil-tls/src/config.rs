use std::path::PathBuf;

use rcgen::{DistinguishedName, DnType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum-protocol-version policy for the interception listener.
///
/// `Compat` keeps the TLS 1.2 floor for maximum client compatibility during
/// interception; `Modern` restricts the listener to TLS 1.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsCompatProfile {
    Modern,
    Compat,
}

impl Default for TlsCompatProfile {
    fn default() -> Self {
        Self::Compat
    }
}

impl TlsCompatProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Compat => "compat",
        }
    }
}

/// Key algorithm preference for generated trust anchor and leaf keys.
///
/// `Compat` prefers RSA for interoperability with older clients and falls
/// back to ECDSA P-256 when the crypto backend cannot generate RSA keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyProfile {
    Modern,
    Compat,
}

impl Default for KeyProfile {
    fn default() -> Self {
        Self::Compat
    }
}

impl KeyProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Compat => "compat",
        }
    }
}

/// Subject identity written into generated certificates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubjectProfile {
    pub common_name: String,
    pub organization: String,
    pub country: Option<String>,
    pub locality: Option<String>,
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            common_name: "veil Root CA".to_string(),
            organization: "veil".to_string(),
            country: None,
            locality: None,
        }
    }
}

impl SubjectProfile {
    pub(crate) fn distinguished_name(&self) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, self.common_name.clone());
        dn.push(DnType::OrganizationName, self.organization.clone());
        if let Some(country) = &self.country {
            dn.push(DnType::CountryName, country.clone());
        }
        if let Some(locality) = &self.locality {
            dn.push(DnType::LocalityName, locality.clone());
        }
        dn
    }
}

/// Inputs to the startup certificate bootstrap.
///
/// The hostname list is consumed in input order; per-host DNS-name expansion
/// is documented on [`crate::expand_dns_names`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    pub ca_cert_path: PathBuf,
    pub ca_key_path: PathBuf,
    pub dot_cert_path: PathBuf,
    pub dot_key_path: PathBuf,
    pub proxied_hostnames: Vec<String>,
    pub anchor_subject: SubjectProfile,
    pub leaf_subject: SubjectProfile,
    pub tls_compat_profile: TlsCompatProfile,
    pub key_profile: KeyProfile,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            ca_cert_path: PathBuf::from("cert/ca.pem"),
            ca_key_path: PathBuf::from("cert/key.pem"),
            dot_cert_path: PathBuf::from("cert/dot_cert.pem"),
            dot_key_path: PathBuf::from("cert/dot_key.pem"),
            proxied_hostnames: Vec::new(),
            anchor_subject: SubjectProfile::default(),
            leaf_subject: SubjectProfile {
                common_name: "veil proxy".to_string(),
                organization: "veil".to_string(),
                country: None,
                locality: None,
            },
            tls_compat_profile: TlsCompatProfile::Compat,
            key_profile: KeyProfile::Compat,
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_path(&self.ca_cert_path, "ca_cert_path")?;
        require_path(&self.ca_key_path, "ca_key_path")?;
        require_path(&self.dot_cert_path, "dot_cert_path")?;
        require_path(&self.dot_key_path, "dot_key_path")?;
        for host in &self.proxied_hostnames {
            if host.trim().is_empty() {
                return Err(ConfigError::EmptyHostEntry);
            }
            if host.starts_with("*.") {
                return Err(ConfigError::WildcardHostEntry { host: host.clone() });
            }
        }
        validate_subject(&self.anchor_subject, "anchor_subject")?;
        validate_subject(&self.leaf_subject, "leaf_subject")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },
    #[error("proxied_hostnames contains an empty host entry")]
    EmptyHostEntry,
    #[error("proxied_hostnames entries must not carry a wildcard label: {host}")]
    WildcardHostEntry { host: String },
    #[error("{field}.common_name must not be empty")]
    EmptySubjectCommonName { field: &'static str },
    #[error("{field}.organization must not be empty")]
    EmptySubjectOrganization { field: &'static str },
}

fn require_path(path: &std::path::Path, field: &'static str) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyPath { field });
    }
    Ok(())
}

fn validate_subject(subject: &SubjectProfile, field: &'static str) -> Result<(), ConfigError> {
    if subject.common_name.trim().is_empty() {
        return Err(ConfigError::EmptySubjectCommonName { field });
    }
    if subject.organization.trim().is_empty() {
        return Err(ConfigError::EmptySubjectOrganization { field });
    }
    Ok(())
}
