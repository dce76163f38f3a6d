use der::asn1::UtcTime;
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::crl::{RevokedCert, TbsCertList};
use x509_cert::name::RdnSequence;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

use crate::cert::params::ExtensionParam;
use crate::error::{CertCheckError, Result};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - Big-endian serial number bytes.
/// * `signature_algorithm` - The algorithm the issuer signs with.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `not_before` - The start of the certificate's validity period.
/// * `not_after` - The end of the certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `extensions` - X.509 extensions, in encoding order.
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub issuer: RdnSequence,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub subject: RdnSequence,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    ///
    /// Times are encoded as `UTCTime` and lose any sub-second part.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(ExtensionParam::to_x509)
            .collect::<Result<Vec<_>>>()?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: serial_number(&self.serial_number)?,
            signature: self.signature_algorithm.clone(),
            issuer: self.issuer.clone(),
            validity: Validity {
                not_before: utc_time(self.not_before)?,
                not_after: utc_time(self.not_after)?,
            },
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }
}

/// The "To Be Signed" portion of a version 2 CRL.
pub struct TbsRevocationList {
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub issuer: RdnSequence,
    pub this_update: OffsetDateTime,
    pub next_update: Option<OffsetDateTime>,
    /// Revoked serial numbers; each entry is dated `this_update`.
    pub revoked: Vec<SerialNumber>,
}

impl TbsRevocationList {
    pub fn to_tbs_cert_list(&self) -> Result<TbsCertList> {
        let this_update = utc_time(self.this_update)?;
        let revoked_certificates = self
            .revoked
            .iter()
            .map(|serial_number| RevokedCert {
                serial_number: serial_number.clone(),
                revocation_date: this_update,
                crl_entry_extensions: None,
            })
            .collect::<Vec<_>>();

        Ok(TbsCertList {
            version: Version::V2,
            signature: self.signature_algorithm.clone(),
            issuer: self.issuer.clone(),
            this_update,
            next_update: self.next_update.map(utc_time).transpose()?,
            revoked_certificates: (!revoked_certificates.is_empty())
                .then_some(revoked_certificates),
            crl_extensions: None,
        })
    }
}

fn utc_time(time: OffsetDateTime) -> Result<Time> {
    UtcTime::from_system_time(time.into())
        .map(Time::UtcTime)
        .map_err(|e| CertCheckError::EncodingError(format!("time {time}: {e}")))
}

fn serial_number(bytes: &[u8]) -> Result<SerialNumber> {
    SerialNumber::new(bytes).map_err(|e| CertCheckError::EncodingError(e.to_string()))
}
