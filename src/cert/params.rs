use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::OctetString;
use time::Duration;
use time::OffsetDateTime;

use super::extensions::ToAndFromX509Extension;
use crate::error::CertCheckError;
use crate::key::KeyAlgorithm;

/// Input for building a certificate signing request.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `domain_name` - Domain name, encoded as domain component (DC) labels.
/// * `org_list`, `org_unit_list`, `country_list`, `state_list`,
///   `locality_list` - Subject attributes, one RDN per value, in order.
/// * `dns_list`, `ip_addresses`, `email_addresses` - Subject alternative names.
/// * `key_usage` - Key usage bit mask, see [`super::extensions::KeyUsage`].
///   Zero leaves the extension out.
/// * `is_ca` - Requested basic constraints CA flag.
/// * `key_algorithm` - Algorithm of the generated key pair.
#[derive(Clone, Debug, Default, Builder)]
pub struct CertSignRequest {
    #[builder(default)]
    pub common_name: String,
    #[builder(default)]
    pub domain_name: String,
    #[builder(default)]
    pub org_list: Vec<String>,
    #[builder(default)]
    pub org_unit_list: Vec<String>,
    #[builder(default)]
    pub country_list: Vec<String>,
    #[builder(default)]
    pub state_list: Vec<String>,
    #[builder(default)]
    pub locality_list: Vec<String>,
    #[builder(default)]
    pub dns_list: Vec<String>,
    #[builder(default)]
    pub ip_addresses: Vec<String>,
    #[builder(default)]
    pub email_addresses: Vec<String>,
    #[builder(default)]
    pub key_usage: u16,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub key_algorithm: KeyAlgorithm,
}

/// Expected field values of an issued certificate.
///
/// Field-for-field parallel to [`CertSignRequest`]. List fields are compared
/// in order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder)]
pub struct CertData {
    #[builder(default)]
    pub common_name: String,
    #[builder(default)]
    pub domain_name: String,
    #[builder(default)]
    pub org_list: Vec<String>,
    #[builder(default)]
    pub org_unit_list: Vec<String>,
    #[builder(default)]
    pub country_list: Vec<String>,
    #[builder(default)]
    pub state_list: Vec<String>,
    #[builder(default)]
    pub locality_list: Vec<String>,
    #[builder(default)]
    pub dns_list: Vec<String>,
    #[builder(default)]
    pub ip_addresses: Vec<String>,
    #[builder(default)]
    pub email_addresses: Vec<String>,
    #[builder(default)]
    pub key_usage: u16,
    #[builder(default)]
    pub is_ca: bool,
}

impl From<&CertSignRequest> for CertData {
    /// The values a certificate issued verbatim from `request` should carry.
    fn from(request: &CertSignRequest) -> Self {
        Self {
            common_name: request.common_name.clone(),
            domain_name: request.domain_name.clone(),
            org_list: request.org_list.clone(),
            org_unit_list: request.org_unit_list.clone(),
            country_list: request.country_list.clone(),
            state_list: request.state_list.clone(),
            locality_list: request.locality_list.clone(),
            dns_list: request.dns_list.clone(),
            ip_addresses: request.ip_addresses.clone(),
            email_addresses: request.email_addresses.clone(),
            key_usage: request.key_usage,
            is_ca: request.is_ca,
        }
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// # Arguments
    /// * `days` - The number of days for the validity period.
    ///
    /// # Returns
    /// A `Validity` object.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: &E,
        critical: bool,
    ) -> Result<Self, CertCheckError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, CertCheckError> {
        E::from_x509_extension_value(&self.value)
    }

    pub fn from_x509(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }

    pub fn to_x509(&self) -> Result<x509_cert::ext::Extension, CertCheckError> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone())?,
        })
    }
}
