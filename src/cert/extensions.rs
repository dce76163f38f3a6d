use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

use crate::error::CertCheckError;

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use certcheck::cert::extensions::{BasicConstraints, ToAndFromX509Extension};
/// let bc = BasicConstraints { is_ca: true, max_path_length: None };
/// let encoded = bc.to_x509_extension_value().unwrap();
/// let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
/// assert!(decoded.is_ca);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertCheckError>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertCheckError>
    where
        Self: Sized;
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// Only DNS names, IP addresses and email addresses are carried; other
/// general name forms are skipped when decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub email_addresses: Vec<String>,
}

impl SubjectAltName {
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ip_addresses.is_empty() && self.email_addresses.is_empty()
    }
}

fn ia5(value: &str) -> Result<Ia5String, CertCheckError> {
    Ia5String::new(value).map_err(|e| CertCheckError::EncodingError(format!("{value:?}: {e}")))
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertCheckError> {
        let mut names = Vec::new();
        for dns in &self.dns_names {
            names.push(GeneralName::DnsName(ia5(dns)?));
        }
        for email in &self.email_addresses {
            names.push(GeneralName::Rfc822Name(ia5(email)?));
        }
        for ip in &self.ip_addresses {
            let octets = match ip {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            names.push(GeneralName::IpAddress(OctetString::new(octets)?));
        }

        Ok(x509_cert::ext::pkix::SubjectAltName(names).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertCheckError> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let mut decoded = Self::default();
        for name in &san.0 {
            match name {
                GeneralName::DnsName(dns) => decoded.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(email) => decoded.email_addresses.push(email.to_string()),
                GeneralName::IpAddress(ip) => decoded.ip_addresses.push(ip_from_octets(ip.as_bytes())?),
                _ => {}
            }
        }
        Ok(decoded)
    }
}

fn ip_from_octets(octets: &[u8]) -> Result<IpAddr, CertCheckError> {
    if let Ok(v4) = <[u8; 4]>::try_from(octets) {
        Ok(IpAddr::V4(Ipv4Addr::from(v4)))
    } else if let Ok(v6) = <[u8; 16]>::try_from(octets) {
        let v6 = Ipv6Addr::from(v6);
        Ok(v6.to_ipv4_mapped().map_or(IpAddr::V6(v6), IpAddr::V4))
    } else {
        Err(CertCheckError::DecodingError(format!(
            "IP address of {} bytes",
            octets.len()
        )))
    }
}

/// Represents the Basic Constraints extension.
///
/// This extension indicates whether the certificate is a CA certificate and its path length.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertCheckError> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self, CertCheckError> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

/// Represents the Key Usage extension.
///
/// The integer form used by [`crate::cert::params::CertSignRequest`] maps bit
/// `n` of the mask to key usage bit `n`, so digitalSignature is `1` and
/// keyCertSign is `32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    /// Builds the extension from an integer mask, rejecting undefined bits.
    pub fn from_mask(mask: u16) -> Result<Self, CertCheckError> {
        FlagSet::<KeyUsages>::new(mask)
            .map(Self)
            .map_err(|_| CertCheckError::EncodingError(format!("invalid key usage mask {mask:#x}")))
    }

    pub fn mask(&self) -> u16 {
        self.0.bits()
    }
}

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertCheckError> {
        let ku = X509KeyUsage(self.0);
        Ok(ku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertCheckError> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// Only the key identifier form is produced; issuer name and serial are
/// ignored when decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertCheckError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertCheckError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;

        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

/// Represents the Subject Key Identifier extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertCheckError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.as_slice())?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertCheckError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Information Access (AIA) extension.
///
/// # Fields
/// * `ca_issuers` - URLs where the issuing certificate can be fetched.
/// * `ocsp_servers` - URLs of OCSP responders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityInfoAccess {
    pub ca_issuers: Vec<String>,
    pub ocsp_servers: Vec<String>,
}

impl ToAndFromX509Extension for AuthorityInfoAccess {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityInfoAccessSyntax::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertCheckError> {
        use const_oid::db::rfc5912::{ID_AD_CA_ISSUERS, ID_AD_OCSP};
        use x509_cert::ext::pkix::AccessDescription;

        let ocsp = self.ocsp_servers.iter().map(|url| (ID_AD_OCSP, url));
        let issuers = self.ca_issuers.iter().map(|url| (ID_AD_CA_ISSUERS, url));
        let descriptions = ocsp
            .chain(issuers)
            .map(|(access_method, url)| {
                Ok(AccessDescription {
                    access_method,
                    access_location: GeneralName::UniformResourceIdentifier(ia5(url)?),
                })
            })
            .collect::<Result<Vec<_>, CertCheckError>>()?;

        Ok(x509_cert::ext::pkix::AuthorityInfoAccessSyntax(descriptions).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertCheckError> {
        use const_oid::db::rfc5912::{ID_AD_CA_ISSUERS, ID_AD_OCSP};

        let aia = x509_cert::ext::pkix::AuthorityInfoAccessSyntax::from_der(extension)?;
        let mut decoded = Self::default();
        for description in &aia.0 {
            let GeneralName::UniformResourceIdentifier(url) = &description.access_location else {
                continue;
            };
            match description.access_method {
                ID_AD_CA_ISSUERS => decoded.ca_issuers.push(url.to_string()),
                ID_AD_OCSP => decoded.ocsp_servers.push(url.to_string()),
                _ => {}
            }
        }
        Ok(decoded)
    }
}
