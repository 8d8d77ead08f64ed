// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate minting for the TLS subreconciler.
//!
//! The operator acts as a private CA per cluster: it mints one CA and signs one node
//! certificate per interface with it. Certificates are never rotated; once the secrets
//! exist they are reused verbatim.

use crate::errors::{Error, Result};
use rcgen::{
    string::Ia5String, BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType,
};

/// Validity of a minted CA (10 years)
pub const CA_VALIDITY_YEARS: i64 = 10;

/// Validity of a minted node certificate (1 year)
pub const CERT_VALIDITY_YEARS: i64 = 1;

/// PEM-encoded certificate and private key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PemPair {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Capability to mint CA and node certificates.
pub trait CertificateIssuer: Send + Sync {
    /// Mint a self-signed CA.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Certificate`] if key or certificate generation fails.
    fn mint_ca(&self, common_name: &str) -> Result<PemPair>;

    /// Mint a node certificate signed by `ca`, valid for `sans`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Certificate`] if the CA cannot be loaded, a SAN is not a valid
    /// DNS name, or signing fails.
    fn mint_node_cert(&self, ca: &PemPair, common_name: &str, sans: &[String]) -> Result<PemPair>;
}

fn compute_validity(years: i64) -> (::time::OffsetDateTime, ::time::OffsetDateTime) {
    let now = ::time::OffsetDateTime::now_utc();
    let not_after = now + ::time::Duration::days(years * 365);
    (now, not_after)
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::Utf8String(common_name.to_string()),
    );
    dn
}

/// [`CertificateIssuer`] backed by `rcgen`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RcgenIssuer;

impl CertificateIssuer for RcgenIssuer {
    fn mint_ca(&self, common_name: &str) -> Result<PemPair> {
        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let (not_before, not_after) = compute_validity(CA_VALIDITY_YEARS);
        params.not_before = not_before;
        params.not_after = not_after;

        let key_pair = KeyPair::generate()
            .map_err(|e| Error::Certificate(format!("failed to generate CA key: {e}")))?;
        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| Error::Certificate(format!("failed to create CA cert: {e}")))?;

        Ok(PemPair {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    fn mint_node_cert(&self, ca: &PemPair, common_name: &str, sans: &[String]) -> Result<PemPair> {
        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(common_name);
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        // Transport TLS presents the same certificate as client and server.
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let (not_before, not_after) = compute_validity(CERT_VALIDITY_YEARS);
        params.not_before = not_before;
        params.not_after = not_after;
        params.subject_alt_names = sans
            .iter()
            .map(|san| {
                Ia5String::try_from(san.clone())
                    .map(SanType::DnsName)
                    .map_err(|e| Error::Certificate(format!("invalid DNS name '{san}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let ca_key = KeyPair::from_pem(&ca.key_pem)
            .map_err(|e| Error::Certificate(format!("failed to parse CA key: {e}")))?;
        let issuer = Issuer::from_ca_cert_pem(&ca.cert_pem, &ca_key)
            .map_err(|e| Error::Certificate(format!("failed to load CA: {e}")))?;

        let key_pair = KeyPair::generate()
            .map_err(|e| Error::Certificate(format!("failed to generate node key: {e}")))?;
        let cert = params
            .signed_by(&key_pair, &issuer)
            .map_err(|e| Error::Certificate(format!("failed to sign node cert: {e}")))?;

        Ok(PemPair {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }
}

#[cfg(test)]
#[path = "pki_tests.rs"]
mod pki_tests;
