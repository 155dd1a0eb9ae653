use rcgen::KeyPair;
use time::{Duration, OffsetDateTime};

use crate::config::KeyProfile;

const CERT_VALIDITY_DAYS: i64 = 3650;

pub(crate) fn generate_key_pair(profile: KeyProfile) -> Result<KeyPair, rcgen::Error> {
    match profile {
        KeyProfile::Modern => KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)
            .or_else(|_| KeyPair::generate()),
        KeyProfile::Compat => KeyPair::generate_for(&rcgen::PKCS_RSA_SHA256)
            .or_else(|_| KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256))
            .or_else(|_| KeyPair::generate()),
    }
}

/// Ten-year validity window starting now, shared by anchor and leaf issuance.
pub(crate) fn validity_window() -> (OffsetDateTime, OffsetDateTime) {
    let not_before = OffsetDateTime::now_utc();
    (not_before, not_before + Duration::days(CERT_VALIDITY_DAYS))
}
