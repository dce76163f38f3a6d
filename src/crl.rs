use der::{Decode, Encode};
use time::OffsetDateTime;
use x509_cert::crl::CertificateList;
use x509_cert::name::RdnSequence;
use x509_cert::serial_number::SerialNumber;

use crate::error::{CertCheckError, Result};
use crate::key::PublicKey;
use crate::pem_utils;

/// A decoded certificate revocation list.
#[derive(Debug, Clone)]
pub struct Crl {
    pub inner: CertificateList,
}

impl Crl {
    /// Parses the first PEM block of `pem`, which must be labeled `X509 CRL`.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = pem_utils::first_block(pem, pem_utils::X509_CRL).ok_or_else(|| {
            CertCheckError::invalid_crl("Unable to parse crl. Error: no X509 CRL PEM block")
        })?;
        Self::from_der(&der)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateList::from_der(der)
            .map_err(|e| CertCheckError::invalid_crl(format!("Unable to parse crl. Error: {e}")))?;
        tracing::debug!(
            issuer = %inner.tbs_cert_list.issuer,
            revoked = inner.tbs_cert_list.revoked_certificates.as_ref().map_or(0, Vec::len),
            "decoded crl"
        );
        Ok(Self { inner })
    }

    pub fn issuer(&self) -> &RdnSequence {
        &self.inner.tbs_cert_list.issuer
    }

    pub fn this_update(&self) -> OffsetDateTime {
        OffsetDateTime::from(self.inner.tbs_cert_list.this_update.to_system_time())
    }

    pub fn next_update(&self) -> Option<OffsetDateTime> {
        self.inner
            .tbs_cert_list
            .next_update
            .map(|t| OffsetDateTime::from(t.to_system_time()))
    }

    /// Serial numbers of the revoked certificates, in list order.
    pub fn revoked_serials(&self) -> impl Iterator<Item = &SerialNumber> {
        self.inner
            .tbs_cert_list
            .revoked_certificates
            .iter()
            .flatten()
            .map(|revoked| &revoked.serial_number)
    }

    /// Whether the list is stale at `now`. A list without a next update
    /// time is always considered stale.
    pub fn has_expired(&self, now: OffsetDateTime) -> bool {
        self.next_update()
            .is_none_or(|next_update| now >= next_update)
    }

    /// Whether `serial` appears on the list.
    pub fn is_revoked(&self, serial: &SerialNumber) -> bool {
        self.revoked_serials()
            .any(|revoked| revoked.as_bytes() == serial.as_bytes())
    }

    /// Verifies the list signature with the issuer's public key.
    pub fn verify_signature(&self, issuer_key: &PublicKey) -> Result<()> {
        let tbs = self.inner.tbs_cert_list.to_der()?;
        issuer_key.verify(
            &tbs,
            self.inner.signature.raw_bytes(),
            &self.inner.signature_algorithm,
        )
    }
}
