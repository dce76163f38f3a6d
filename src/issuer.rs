//! A minimal certificate authority for exercising the validators.
//!
//! It signs certificates from PKCS#10 requests and issues CRLs the way a
//! production authority would, so the whole request, issue and validate
//! cycle can run in-process.

use der::Encode;
use der::asn1::BitString;
use time::{Duration, OffsetDateTime};
use x509_cert::crl::CertificateList;
use x509_cert::name::RdnSequence;
use x509_cert::serial_number::SerialNumber;

use crate::cert::Certificate;
use crate::cert::extensions::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, KeyUsage, KeyUsages,
    SubjectKeyIdentifier, ToAndFromX509Extension,
};
use crate::cert::params::{ExtensionParam, Validity};
use crate::csr::CertificateRequest;
use crate::error::{CertCheckError, Result};
use crate::key::{self, KeyAlgorithm, KeyPair};
use crate::oid;
use crate::pem_utils;
use crate::tbs_certificate::{TbsCertificate, TbsRevocationList};

/// Represents an entity capable of issuing certificates and CRLs.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> &RdnSequence;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// URL where the issuer certificate can be fetched, published as the
    /// caIssuers entry of issued certificates.
    fn issuing_certificate_url(&self) -> &str;

    /// Key identifier of the signing key.
    fn key_identifier(&self) -> Result<Vec<u8>> {
        Ok(key::key_identifier(&self.signing_key().as_spki()?))
    }

    /// Issues a certificate for a PEM encoded signing request.
    ///
    /// The request signature is checked first. The certificate copies the
    /// requested subject, public key and extensions, then adds authority
    /// key identifier and authority information access extensions.
    ///
    /// # Returns
    /// The issued certificate as PEM.
    fn issue(&self, csr_pem: &str, validity: &Validity) -> Result<String> {
        let request = CertificateRequest::from_pem(csr_pem)?;
        request
            .verify_signature()
            .map_err(|e| CertCheckError::InvalidCsr(format!("CSR signature is invalid: {e}")))?;

        let issuer_extensions = [
            ExtensionParam::from_extension(
                &AuthorityKeyIdentifier {
                    key_identifier: self.key_identifier()?,
                },
                false,
            )?,
            ExtensionParam::from_extension(
                &AuthorityInfoAccess {
                    ca_issuers: vec![self.issuing_certificate_url().to_string()],
                    ocsp_servers: Vec::new(),
                },
                false,
            )?,
        ];

        let extensions = request
            .requested_extensions()?
            .into_iter()
            .filter(|ext| {
                ext.oid != AuthorityKeyIdentifier::OID && ext.oid != AuthorityInfoAccess::OID
            })
            .chain(issuer_extensions)
            .collect();

        let tbs_cert = TbsCertificate {
            serial_number: random_serial_number(),
            signature_algorithm: self.signing_key().signature_algorithm(),
            issuer: self.issuer_name().clone(),
            not_before: validity.not_before,
            not_after: validity.not_after,
            subject: request.subject().clone(),
            subject_public_key_info: request.inner.info.public_key.clone(),
            extensions,
        };

        let cert = sign_certificate(&tbs_cert, self.signing_key())?;
        tracing::debug!(
            subject = %cert.subject(),
            serial = %cert.serial_number(),
            "issued certificate"
        );
        cert.to_pem()
    }

    /// Issues a CRL revoking `revoked`.
    ///
    /// `next_update` may be `None` to produce a list without a next update
    /// time.
    fn issue_crl(
        &self,
        revoked: &[SerialNumber],
        this_update: OffsetDateTime,
        next_update: Option<OffsetDateTime>,
    ) -> Result<String> {
        let tbs = TbsRevocationList {
            signature_algorithm: self.signing_key().signature_algorithm(),
            issuer: self.issuer_name().clone(),
            this_update,
            next_update,
            revoked: revoked.to_vec(),
        }
        .to_tbs_cert_list()?;

        let signature = self.signing_key().sign_data(&tbs.to_der()?)?;
        let crl = CertificateList {
            tbs_cert_list: tbs,
            signature_algorithm: self.signing_key().signature_algorithm(),
            signature: BitString::from_bytes(&signature)?,
        };
        let der = crl
            .to_der()
            .map_err(|e| CertCheckError::EncodingError(e.to_string()))?;
        tracing::debug!(revoked = revoked.len(), "issued crl");
        Ok(pem_utils::der_to_pem(&der, pem_utils::X509_CRL))
    }
}

fn sign_certificate(tbs_cert: &TbsCertificate, key: &KeyPair) -> Result<Certificate> {
    let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
    let signature = key.sign_data(&tbs_cert_inner.to_der()?)?;

    Ok(Certificate {
        inner: x509_cert::Certificate {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: tbs_cert.signature_algorithm.clone(),
            signature: BitString::from_bytes(&signature)?,
        },
    })
}

/// 16 random bytes, kept positive and minimally encoded.
fn random_serial_number() -> Vec<u8> {
    let mut serial = rand::random::<[u8; 16]>();
    serial[0] = (serial[0] & 0x7f) | 0x40;
    serial.to_vec()
}

/// A self-signed root certificate together with its private key.
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    pub cert: Certificate,
    key: KeyPair,
    issuing_certificate_url: String,
}

impl CertificateAuthority {
    /// Creates a self-signed root valid for ten years.
    ///
    /// The root carries critical CA basic constraints, key usage allowing
    /// certificate and CRL signing, and a subject key identifier.
    pub fn new_root(common_name: &str, algorithm: KeyAlgorithm) -> Result<Self> {
        let key = KeyPair::generate(algorithm)?;
        let spki = key.as_spki()?;
        let subject = RdnSequence(vec![oid::string_rdn(oid::COMMON_NAME, common_name)?]);

        let key_usage = KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign);
        let extensions = vec![
            ExtensionParam::from_extension(
                &BasicConstraints {
                    is_ca: true,
                    max_path_length: None,
                },
                true,
            )?,
            ExtensionParam::from_extension(&key_usage, true)?,
            ExtensionParam::from_extension(&SubjectKeyIdentifier(key::key_identifier(&spki)), false)?,
        ];

        let validity = Validity::for_days(3650);
        let tbs_cert = TbsCertificate {
            serial_number: random_serial_number(),
            signature_algorithm: key.signature_algorithm(),
            issuer: subject.clone(),
            // Backdated a minute to absorb UTCTime truncation.
            not_before: validity.not_before - Duration::minutes(1),
            not_after: validity.not_after,
            subject,
            subject_public_key_info: spki,
            extensions,
        };
        let cert = sign_certificate(&tbs_cert, &key)?;

        Ok(Self {
            issuing_certificate_url: format!(
                "https://ca.example.com/{}.crt",
                common_name.replace(' ', "-").to_lowercase()
            ),
            cert,
            key,
        })
    }

    pub fn cert_pem(&self) -> Result<String> {
        self.cert.to_pem()
    }
}

impl Issuer for CertificateAuthority {
    fn issuer_name(&self) -> &RdnSequence {
        self.cert.subject()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn issuing_certificate_url(&self) -> &str {
        &self.issuing_certificate_url
    }
}
