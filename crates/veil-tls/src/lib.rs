mod bootstrap;
mod config;
mod dot;
mod errors;
mod keys;
mod leaf;
mod server_config;
mod trust_anchor;

pub use bootstrap::{run_bootstrap, BootstrapOutcome};
pub use config::{
    BootstrapConfig, ConfigError, KeyProfile, SubjectProfile, TlsCompatProfile,
};
pub use dot::DotCertificateLoader;
pub use errors::BootstrapError;
pub use leaf::{expand_dns_names, LeafCertificate, LeafCertificateIssuer};
pub use server_config::{assemble_intercept_config, InterceptServerConfig};
pub use trust_anchor::{TrustAnchor, TrustAnchorStore};
