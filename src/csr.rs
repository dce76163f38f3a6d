//! PKCS#10 certificate signing requests.
//!
//! [`create_cert_sign_request`] turns a [`CertSignRequest`] into PEM text
//! ready to submit to a certificate authority. [`CertificateRequest`] decodes
//! such text again, which the fixture authority and tests rely on.

use std::net::IpAddr;

use const_oid::db::rfc5912::ID_EXTENSION_REQ;
use der::asn1::{BitString, SetOfVec};
use der::{Any, Decode, Encode};
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;
use x509_cert::name::RdnSequence;
use x509_cert::request::{CertReq, CertReqInfo, Version};

use crate::cert::extensions::{BasicConstraints, KeyUsage, SubjectAltName};
use crate::cert::params::{CertSignRequest, ExtensionParam};
use crate::error::{CertCheckError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::oid;
use crate::pem_utils;

/// Generates a fresh key pair and returns a signed CSR for `request` as PEM.
///
/// Two calls with the same input yield different keys and signatures.
pub fn create_cert_sign_request(request: &CertSignRequest) -> Result<String> {
    let key = KeyPair::generate(request.key_algorithm)?;
    create_cert_sign_request_with_key(request, &key)
}

/// Same as [`create_cert_sign_request`], signing with a caller-supplied key.
pub fn create_cert_sign_request_with_key(
    request: &CertSignRequest,
    key: &KeyPair,
) -> Result<String> {
    let subject = build_subject(request)?;
    let extensions = build_extensions(request)?;

    let mut attributes = SetOfVec::new();
    attributes
        .insert(extension_request(&extensions)?)
        .map_err(|e| invalid_csr("Unable to add extension request", e))?;

    let info = CertReqInfo {
        version: Version::V1,
        subject,
        public_key: key
            .as_spki()
            .map_err(|e| invalid_csr("Unable to encode public key", e))?,
        attributes,
    };

    let info_der = info
        .to_der()
        .map_err(|e| invalid_csr("Unable to generate csr", e))?;
    let signature = key
        .sign_data(&info_der)
        .map_err(|e| invalid_csr("Unable to generate csr", e))?;

    let csr = CertReq {
        info,
        algorithm: key.signature_algorithm(),
        signature: BitString::from_bytes(&signature)
            .map_err(|e| invalid_csr("Unable to generate csr", e))?,
    };
    let csr_der = csr
        .to_der()
        .map_err(|e| invalid_csr("Unable to generate csr", e))?;

    tracing::debug!(
        subject = %csr.info.subject,
        algorithm = ?key.algorithm(),
        "created certificate signing request"
    );
    Ok(pem_utils::der_to_pem(&csr_der, pem_utils::CERTIFICATE_REQUEST))
}

fn invalid_csr(context: &str, cause: impl std::fmt::Display) -> CertCheckError {
    CertCheckError::InvalidCsr(format!("{context}: {cause}"))
}

/// Subject RDNs in the order C, ST, L, O, OU, CN, then the domain labels
/// from the top-level label down.
fn build_subject(request: &CertSignRequest) -> Result<RdnSequence> {
    let lists = [
        (oid::COUNTRY, &request.country_list),
        (oid::STATE, &request.state_list),
        (oid::LOCALITY, &request.locality_list),
        (oid::ORGANIZATION, &request.org_list),
        (oid::ORGANIZATION_UNIT, &request.org_unit_list),
    ];

    let mut attributes: Vec<_> = lists
        .iter()
        .flat_map(|(oid, values)| values.iter().map(move |value| (*oid, value.as_str())))
        .collect();
    if !request.common_name.is_empty() {
        attributes.push((oid::COMMON_NAME, request.common_name.as_str()));
    }
    if !request.domain_name.is_empty() {
        attributes.extend(
            request
                .domain_name
                .rsplit('.')
                .map(|label| (oid::DOMAIN_COMPONENT, label)),
        );
    }

    let rdns = attributes
        .into_iter()
        .map(|(oid, value)| {
            oid::string_rdn(oid, value).map_err(|e| invalid_csr("Unable to encode subject", e))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RdnSequence(rdns))
}

fn build_extensions(request: &CertSignRequest) -> Result<Vec<ExtensionParam>> {
    let mut extensions = Vec::new();

    let san = SubjectAltName {
        dns_names: request.dns_list.clone(),
        ip_addresses: request
            .ip_addresses
            .iter()
            .map(|ip| {
                ip.parse::<IpAddr>()
                    .map_err(|e| invalid_csr(&format!("Invalid IP address {ip:?}"), e))
            })
            .collect::<Result<Vec<_>>>()?,
        email_addresses: request.email_addresses.clone(),
    };
    if !san.is_empty() {
        extensions.push(
            ExtensionParam::from_extension(&san, false)
                .map_err(|e| invalid_csr("Unable to add subject alternative names", e))?,
        );
    }

    if request.key_usage != 0 {
        let key_usage = KeyUsage::from_mask(request.key_usage)
            .and_then(|ku| ExtensionParam::from_extension(&ku, false))
            .map_err(|e| invalid_csr("Unable to add keyusage extension", e))?;
        extensions.push(key_usage);
    }

    let basic_constraints = BasicConstraints {
        is_ca: request.is_ca,
        max_path_length: None,
    };
    extensions.push(
        ExtensionParam::from_extension(&basic_constraints, false)
            .map_err(|e| invalid_csr("Unable to add basic constraint extension", e))?,
    );

    Ok(extensions)
}

/// Wraps extensions into a PKCS#9 extensionRequest attribute.
fn extension_request(extensions: &[ExtensionParam]) -> Result<Attribute> {
    let extensions = extensions
        .iter()
        .map(ExtensionParam::to_x509)
        .collect::<Result<Vec<_>>>()?;
    let value = Any::encode_from(&extensions)
        .map_err(|e| invalid_csr("Unable to encode extension request", e))?;

    let mut values = SetOfVec::new();
    values
        .insert(value)
        .map_err(|e| invalid_csr("Unable to encode extension request", e))?;
    Ok(Attribute {
        oid: ID_EXTENSION_REQ,
        values,
    })
}

/// A decoded PKCS#10 request.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub inner: CertReq,
}

impl CertificateRequest {
    /// Parses the first PEM block of `pem`, which must be labeled
    /// `CERTIFICATE REQUEST`.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = pem_utils::first_block(pem, pem_utils::CERTIFICATE_REQUEST)
            .ok_or_else(|| CertCheckError::InvalidCsr("PEM block is not a CSR".to_string()))?;
        let inner = CertReq::from_der(&der).map_err(|e| invalid_csr("Unable to parse csr", e))?;
        Ok(Self { inner })
    }

    pub fn subject(&self) -> &RdnSequence {
        &self.inner.info.subject
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.info.public_key)
    }

    /// Extensions carried in the extensionRequest attribute, in order.
    pub fn requested_extensions(&self) -> Result<Vec<ExtensionParam>> {
        let mut requested = Vec::new();
        for attribute in self.inner.info.attributes.iter() {
            if attribute.oid != ID_EXTENSION_REQ {
                continue;
            }
            for value in attribute.values.iter() {
                let extensions: Vec<Extension> = value
                    .decode_as()
                    .map_err(|e| invalid_csr("Unable to parse extension request", e))?;
                requested.extend(extensions.iter().map(ExtensionParam::from_x509));
            }
        }
        Ok(requested)
    }

    /// Checks the request is signed by the key it carries.
    pub fn verify_signature(&self) -> Result<()> {
        let info_der = self.inner.info.to_der()?;
        self.public_key()?.verify(
            &info_der,
            self.inner.signature.raw_bytes(),
            &self.inner.algorithm,
        )
    }
}
