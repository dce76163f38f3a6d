//! Object identifiers of distinguished-name attributes and their short names.
//!
//! The table is used to render names for diagnostics; it is never mutated.

use const_oid::ObjectIdentifier;
use der::asn1::{
    BmpString, Ia5StringRef, PrintableStringRef, SetOfVec, TeletexStringRef, Utf8StringRef,
};
use der::{Any, Tag, Tagged};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use crate::error::{CertCheckError, Result};

pub const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
pub const COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
pub const LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
pub const STATE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
pub const ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
pub const ORGANIZATION_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
pub const EMAIL_ADDRESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1");
/// Domain component, carrying the domain name labels of a subject.
pub const DOMAIN_COMPONENT: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("0.9.2342.19200300.100.1.25");

/// Short names of the subject attributes a certificate-authority issues.
pub static OID_NAMES: &[(ObjectIdentifier, &str)] = &[
    (COMMON_NAME, "CN"),
    (ObjectIdentifier::new_unwrap("2.5.4.4"), "SN"),
    (ObjectIdentifier::new_unwrap("2.5.4.5"), "serialNumber"),
    (COUNTRY, "C"),
    (LOCALITY, "L"),
    (STATE, "ST"),
    (ObjectIdentifier::new_unwrap("2.5.4.9"), "streetAddress"),
    (ORGANIZATION, "O"),
    (ORGANIZATION_UNIT, "OU"),
    (ObjectIdentifier::new_unwrap("2.5.4.12"), "title"),
    (ObjectIdentifier::new_unwrap("2.5.4.17"), "postalCode"),
    (ObjectIdentifier::new_unwrap("2.5.4.42"), "GN"),
    (ObjectIdentifier::new_unwrap("2.5.4.43"), "initials"),
    (ObjectIdentifier::new_unwrap("2.5.4.44"), "generationQualifier"),
    (ObjectIdentifier::new_unwrap("2.5.4.46"), "dnQualifier"),
    (ObjectIdentifier::new_unwrap("2.5.4.65"), "pseudonym"),
    (DOMAIN_COMPONENT, "DC"),
    (EMAIL_ADDRESS, "emailAddress"),
    (ObjectIdentifier::new_unwrap("0.9.2342.19200300.100.1.1"), "userid"),
];

/// Looks up the short name of an attribute type.
pub fn attribute_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    OID_NAMES
        .iter()
        .find(|(known, _)| known == oid)
        .map(|(_, name)| *name)
}

/// Decodes a directory string attribute value.
///
/// UTF8String, PrintableString, IA5String, TeletexString, BMPString,
/// NumericString and VisibleString are accepted. Any other value is rejected
/// with [`CertCheckError::UnsupportedValue`].
pub fn attribute_value(value: &Any) -> Result<String> {
    let decoded = match value.tag() {
        Tag::Utf8String => value
            .decode_as::<Utf8StringRef<'_>>()
            .map(|s| s.as_str().to_owned()),
        Tag::PrintableString => value
            .decode_as::<PrintableStringRef<'_>>()
            .map(|s| s.as_str().to_owned()),
        Tag::Ia5String => value
            .decode_as::<Ia5StringRef<'_>>()
            .map(|s| s.as_str().to_owned()),
        Tag::TeletexString => value
            .decode_as::<TeletexStringRef<'_>>()
            .map(|s| s.as_str().to_owned()),
        Tag::BmpString => value.decode_as::<BmpString>().map(|s| s.to_string()),
        Tag::NumericString => {
            restricted_ascii(value, |b| b.is_ascii_digit() || b == b' ')
        }
        Tag::VisibleString => restricted_ascii(value, |b| (b' '..=b'~').contains(&b)),
        tag => {
            return Err(CertCheckError::UnsupportedValue(format!(
                "attribute value with tag {tag}"
            )));
        }
    };
    decoded.map_err(|e| CertCheckError::UnsupportedValue(e.to_string()))
}

/// Reads a string type with no dedicated decoder, checking its alphabet.
fn restricted_ascii(value: &Any, allowed: impl Fn(u8) -> bool) -> der::Result<String> {
    let bytes = value.value();
    if bytes.iter().all(|b| allowed(*b)) {
        Ok(bytes.iter().map(|b| char::from(*b)).collect())
    } else {
        Err(value.tag().value_error())
    }
}

/// Iterates over every attribute of a name in encoding order.
pub fn attributes(name: &RdnSequence) -> impl Iterator<Item = &AttributeTypeAndValue> {
    name.0.iter().flat_map(|rdn| rdn.0.iter())
}

/// All string values of attributes of type `oid`, in encoding order.
pub fn values_of(name: &RdnSequence, oid: ObjectIdentifier) -> Result<Vec<String>> {
    attributes(name)
        .filter(|atv| atv.oid == oid)
        .map(|atv| attribute_value(&atv.value))
        .collect()
}

/// Renders a name as comma separated `NAME=value` pairs in encoding order.
///
/// Attribute types missing from [`OID_NAMES`] are rendered in dotted form.
pub fn construct_dn(name: &RdnSequence) -> Result<String> {
    let pairs = attributes(name)
        .map(|atv| {
            let value = attribute_value(&atv.value)?;
            Ok(match attribute_name(&atv.oid) {
                Some(short) => format!("{short}={value}"),
                None => format!("{}={value}", atv.oid),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(pairs.join(","))
}

/// Builds a single-valued RDN holding `value` with the string type
/// conventional for `oid`.
pub(crate) fn string_rdn(oid: ObjectIdentifier, value: &str) -> Result<RelativeDistinguishedName> {
    let encoded = match oid {
        COUNTRY => Any::encode_from(&PrintableStringRef::new(value)?),
        DOMAIN_COMPONENT | EMAIL_ADDRESS => Any::encode_from(&Ia5StringRef::new(value)?),
        _ => Any::encode_from(&Utf8StringRef::new(value)?),
    }?;

    let mut set = SetOfVec::new();
    set.insert(AttributeTypeAndValue {
        oid,
        value: encoded,
    })?;
    Ok(RelativeDistinguishedName(set))
}
