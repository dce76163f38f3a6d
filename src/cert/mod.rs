pub mod extensions;
pub mod params;

use der::{Decode, Encode, EncodePem};
use extensions::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectAltName,
    ToAndFromX509Extension,
};
use time::OffsetDateTime;
use x509_cert::name::RdnSequence;
use x509_cert::serial_number::SerialNumber;

use crate::error::{CertCheckError, Result};
use crate::key::PublicKey;
use crate::oid;
use crate::pem_utils;

/// A decoded X.509 certificate.
///
/// Accessors decode fields on demand and never cache; the wrapper is meant
/// to live for the duration of one check.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: x509_cert::Certificate,
}

impl Certificate {
    /// Parses the first PEM block of `pem`, which must be labeled `CERTIFICATE`.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = pem_utils::first_block(pem, pem_utils::CERTIFICATE).ok_or_else(|| {
            CertCheckError::invalid_cert("PEM block is missing or is not a certificate")
        })?;
        Self::from_der(&der)
    }

    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = x509_cert::Certificate::from_der(der).map_err(|e| {
            tracing::debug!(error = %e, "certificate parse failed");
            CertCheckError::invalid_cert("Unable to parse certificate")
        })?;
        tracing::debug!(subject = %inner.tbs_certificate.subject, "decoded certificate");
        Ok(Self { inner })
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertCheckError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertCheckError::EncodingError(e.to_string()))
    }

    pub fn subject(&self) -> &RdnSequence {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &RdnSequence {
        &self.inner.tbs_certificate.issuer
    }

    pub fn serial_number(&self) -> &SerialNumber {
        &self.inner.tbs_certificate.serial_number
    }

    pub fn not_before(&self) -> OffsetDateTime {
        OffsetDateTime::from(self.inner.tbs_certificate.validity.not_before.to_system_time())
    }

    pub fn not_after(&self) -> OffsetDateTime {
        OffsetDateTime::from(self.inner.tbs_certificate.validity.not_after.to_system_time())
    }

    /// The last common name of the subject, or an empty string.
    pub fn common_name(&self) -> Result<String> {
        Ok(oid::values_of(self.subject(), oid::COMMON_NAME)?
            .pop()
            .unwrap_or_default())
    }

    /// The domain name spelled by the subject's domain component labels.
    pub fn domain_name(&self) -> Result<String> {
        domain_name_from_rdns(self.subject())
    }

    pub fn countries(&self) -> Result<Vec<String>> {
        oid::values_of(self.subject(), oid::COUNTRY)
    }

    pub fn states(&self) -> Result<Vec<String>> {
        oid::values_of(self.subject(), oid::STATE)
    }

    pub fn localities(&self) -> Result<Vec<String>> {
        oid::values_of(self.subject(), oid::LOCALITY)
    }

    pub fn organizations(&self) -> Result<Vec<String>> {
        oid::values_of(self.subject(), oid::ORGANIZATION)
    }

    pub fn organizational_units(&self) -> Result<Vec<String>> {
        oid::values_of(self.subject(), oid::ORGANIZATION_UNIT)
    }

    /// Decodes the extension of type `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    pub fn subject_alt_name(&self) -> Result<SubjectAltName> {
        Ok(self.extension::<SubjectAltName>()?.unwrap_or_default())
    }

    pub fn dns_names(&self) -> Result<Vec<String>> {
        Ok(self.subject_alt_name()?.dns_names)
    }

    pub fn email_addresses(&self) -> Result<Vec<String>> {
        Ok(self.subject_alt_name()?.email_addresses)
    }

    /// SAN IP addresses rendered in their textual form.
    pub fn ip_addresses(&self) -> Result<Vec<String>> {
        Ok(self
            .subject_alt_name()?
            .ip_addresses
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    /// CA flag of the basic constraints extension; `false` when absent.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self
            .extension::<BasicConstraints>()?
            .is_some_and(|bc| bc.is_ca))
    }

    /// Key usage bit mask; `0` when the extension is absent.
    pub fn key_usage(&self) -> Result<u16> {
        Ok(self
            .extension::<KeyUsage>()?
            .map(|ku| ku.mask())
            .unwrap_or_default())
    }

    pub fn authority_key_id(&self) -> Result<Vec<u8>> {
        Ok(self
            .extension::<AuthorityKeyIdentifier>()?
            .map(|aki| aki.key_identifier)
            .unwrap_or_default())
    }

    /// caIssuers URLs of the authority information access extension.
    pub fn issuing_certificate_urls(&self) -> Result<Vec<String>> {
        Ok(self
            .extension::<AuthorityInfoAccess>()?
            .map(|aia| aia.ca_issuers)
            .unwrap_or_default())
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Verifies the certificate signature with `issuer_key`.
    pub fn verify_signed_by(&self, issuer_key: &PublicKey) -> Result<()> {
        let tbs = self.inner.tbs_certificate.to_der()?;
        issuer_key.verify(
            &tbs,
            self.inner.signature.raw_bytes(),
            &self.inner.signature_algorithm,
        )
    }

    /// Whether `time` lies inside the validity window, bounds included.
    pub fn is_valid_at(&self, time: OffsetDateTime) -> bool {
        self.not_before() <= time && time <= self.not_after()
    }
}

/// Reconstructs a domain name from domain component attributes.
///
/// Labels are read in encoding order and each one is prepended to the
/// labels seen so far, so `DC=com, DC=example` yields `example.com`.
fn domain_name_from_rdns(name: &RdnSequence) -> Result<String> {
    oid::attributes(name)
        .filter(|atv| atv.oid == oid::DOMAIN_COMPONENT)
        .try_fold(String::new(), |domain, atv| {
            let label = oid::attribute_value(&atv.value)?;
            Ok(if domain.is_empty() {
                label
            } else {
                format!("{label}.{domain}")
            })
        })
}
