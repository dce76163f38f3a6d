//! Assertions over issued certificates and revocation lists.
//!
//! Every validator decodes its PEM input once, then compares or verifies
//! and stops at the first failure. Failures are logged with `tracing` at
//! `warn` level before being returned.

use time::OffsetDateTime;
use x509_cert::certificate::Version;

use crate::cert::Certificate;
use crate::cert::extensions::BasicConstraints;
use crate::cert::params::CertData;
use crate::crl::Crl;
use crate::error::{CertCheckError, Result};
use crate::oid;
use crate::pem_utils;

fn rejected(check: &'static str, err: CertCheckError) -> CertCheckError {
    tracing::warn!(check, error = %err, "validation failed");
    err
}

fn decode_cert(pem: &str, check: &'static str) -> Result<Certificate> {
    Certificate::from_pem(pem).map_err(|e| {
        tracing::debug!(error = %e, "certificate decode failed");
        rejected(
            check,
            CertCheckError::invalid_cert("Unable to convert cert to X509 cert"),
        )
    })
}

/// Returns the organization values of the certificate subject, in order.
pub fn get_cert_org(cert_pem: &str) -> Result<Vec<String>> {
    decode_cert(cert_pem, "organization")?.organizations()
}

/// Field values read back from a certificate, in the shape of [`CertData`],
/// plus the issuer references every issued certificate must carry.
struct Observed {
    data: CertData,
    issuing_certificate_urls: Vec<String>,
    authority_key_id: Vec<u8>,
}

impl Observed {
    fn read(cert: &Certificate) -> Result<Self> {
        Ok(Self {
            data: CertData {
                common_name: cert.common_name()?,
                domain_name: cert.domain_name()?,
                org_list: cert.organizations()?,
                org_unit_list: cert.organizational_units()?,
                country_list: cert.countries()?,
                state_list: cert.states()?,
                locality_list: cert.localities()?,
                dns_list: cert.dns_names()?,
                ip_addresses: cert.ip_addresses()?,
                email_addresses: cert.email_addresses()?,
                key_usage: cert.key_usage()?,
                is_ca: cert.is_ca()?,
            },
            issuing_certificate_urls: cert.issuing_certificate_urls()?,
            authority_key_id: cert.authority_key_id()?,
        })
    }
}

/// A named predicate over the observed certificate and the expectation,
/// with the detail reported when it does not hold.
struct DetailCheck {
    name: &'static str,
    holds: fn(&Observed, &CertData) -> bool,
    detail: &'static str,
}

const DETAIL_CHECKS: &[DetailCheck] = &[
    DetailCheck {
        name: "common_name",
        holds: |seen, want| seen.data.common_name == want.common_name,
        detail: "Certificate common name does not match as expected",
    },
    DetailCheck {
        name: "domain_name",
        holds: |seen, want| seen.data.domain_name == want.domain_name,
        detail: "Certificate domain name does not match as expected",
    },
    DetailCheck {
        name: "country",
        holds: |seen, want| seen.data.country_list == want.country_list,
        detail: "Certificate country does not match as expected",
    },
    DetailCheck {
        name: "state",
        holds: |seen, want| seen.data.state_list == want.state_list,
        detail: "Certificate state does not match as expected",
    },
    DetailCheck {
        name: "locality",
        holds: |seen, want| seen.data.locality_list == want.locality_list,
        detail: "Certificate locality does not match as expected",
    },
    DetailCheck {
        name: "org_unit",
        holds: |seen, want| seen.data.org_unit_list == want.org_unit_list,
        detail: "Certificate OU's does not match as expected",
    },
    DetailCheck {
        name: "org",
        holds: |seen, want| seen.data.org_list == want.org_list,
        detail: "Certificate org's does not match as expected",
    },
    DetailCheck {
        name: "email_addresses",
        holds: |seen, want| seen.data.email_addresses == want.email_addresses,
        detail: "Certificate email addresses does not match as expected",
    },
    DetailCheck {
        name: "dns_names",
        holds: |seen, want| seen.data.dns_list == want.dns_list,
        detail: "Certificate dns names does not match as expected",
    },
    DetailCheck {
        name: "ip_addresses",
        holds: |seen, want| seen.data.ip_addresses == want.ip_addresses,
        detail: "Certificate ip addresses does not match as expected",
    },
    DetailCheck {
        name: "is_ca",
        holds: |seen, want| seen.data.is_ca == want.is_ca,
        detail: "Certificate CA status does not match as expected",
    },
    DetailCheck {
        name: "key_usage",
        holds: |seen, want| seen.data.key_usage == want.key_usage,
        detail: "Certificate key usage does not match as expected",
    },
    DetailCheck {
        name: "authority_information_access",
        holds: |seen, _| !seen.issuing_certificate_urls.is_empty(),
        detail: "Certificate does not have authority information access",
    },
    DetailCheck {
        name: "authority_key_identifier",
        holds: |seen, _| !seen.authority_key_id.is_empty(),
        detail: "Certificate does not have authority key identifier",
    },
];

/// Compares a certificate field by field against `expected`.
///
/// List fields must match exactly, order included. The first mismatch is
/// returned as [`CertCheckError::InvalidCertificate`] naming the field. A
/// subject or extension that cannot be read is reported the same way.
pub fn check_cert_details(cert_pem: &str, expected: &CertData) -> Result<()> {
    let cert = decode_cert(cert_pem, "decode")?;
    let seen = Observed::read(&cert).map_err(|e| {
        rejected(
            "subject",
            CertCheckError::invalid_cert(format!("Unable to parse X509 cert subject: {e}")),
        )
    })?;

    match DETAIL_CHECKS
        .iter()
        .find(|check| !(check.holds)(&seen, expected))
    {
        Some(check) => Err(rejected(
            check.name,
            CertCheckError::invalid_cert(check.detail),
        )),
        None => Ok(()),
    }
}

/// Checks the validity window equals `start`..`end` to the second.
pub fn check_cert_validity(cert_pem: &str, start: OffsetDateTime, end: OffsetDateTime) -> Result<()> {
    let cert = decode_cert(cert_pem, "decode")?;

    if cert.not_before().unix_timestamp() != start.unix_timestamp() {
        return Err(rejected(
            "not_before",
            CertCheckError::invalid_cert("Certificate start time does not match"),
        ));
    }
    if cert.not_after().unix_timestamp() != end.unix_timestamp() {
        return Err(rejected(
            "not_after",
            CertCheckError::invalid_cert("Certificate end time does not match"),
        ));
    }
    Ok(())
}

/// Verifies that `cert_pem` chains directly to one of the certificates in
/// `ca_pem`.
///
/// Every `CERTIFICATE` block of `ca_pem` that decodes becomes a trust
/// anchor. The target must be valid now, name an anchor as its issuer, and
/// carry a signature that verifies with that anchor's key. The anchor must
/// itself be valid now and be allowed to sign certificates: a CA by its
/// basic constraints, or a v1 or v2 root without them.
pub fn verify_cert(cert_pem: &str, ca_pem: &str) -> Result<()> {
    let anchors: Vec<Certificate> = pem_utils::blocks_with_label(ca_pem, pem_utils::CERTIFICATE)
        .iter()
        .filter_map(|der| Certificate::from_der(der).ok())
        .collect();
    if anchors.is_empty() {
        return Err(rejected(
            "trust_store",
            CertCheckError::invalid_cert("Invalid CA Cert. Unable to add cert to certpool"),
        ));
    }

    let cert = decode_cert(cert_pem, "decode")?;
    let now = OffsetDateTime::now_utc();

    verify_against_anchors(&cert, &anchors, now).map_err(|cause| {
        rejected(
            "chain",
            CertCheckError::invalid_cert(format!("Cert verification failed: {cause}")),
        )
    })
}

fn verify_against_anchors(
    cert: &Certificate,
    anchors: &[Certificate],
    now: OffsetDateTime,
) -> std::result::Result<(), String> {
    if !cert.is_valid_at(now) {
        return Err("certificate has expired or is not yet valid".to_string());
    }

    let mut last_failure = "certificate signed by unknown authority".to_string();
    for anchor in anchors.iter().filter(|anchor| anchor.subject() == cert.issuer()) {
        match verify_issued_by(cert, anchor, now) {
            Ok(()) => return Ok(()),
            Err(cause) => last_failure = cause,
        }
    }
    Err(last_failure)
}

/// Checks that `anchor` issued `cert`.
///
/// An anchor with basic constraints must be a CA. A v3 anchor without them
/// is rejected, while v1 and v2 roots, which predate extensions, are allowed.
fn verify_issued_by(
    cert: &Certificate,
    anchor: &Certificate,
    now: OffsetDateTime,
) -> std::result::Result<(), String> {
    if !anchor.is_valid_at(now) {
        return Err("issuer certificate has expired or is not yet valid".to_string());
    }
    let basic_constraints = anchor
        .extension::<BasicConstraints>()
        .map_err(|e| e.to_string())?;
    let may_sign = match basic_constraints {
        Some(bc) => bc.is_ca,
        None => anchor.inner.tbs_certificate.version != Version::V3,
    };
    if !may_sign {
        return Err("issuer certificate is not a CA".to_string());
    }
    let key_usage = anchor.key_usage().map_err(|e| e.to_string())?;
    if key_usage != 0 && key_usage & KEY_CERT_SIGN == 0 {
        return Err("issuer certificate may not sign certificates".to_string());
    }

    let issuer_key = anchor.public_key().map_err(|e| e.to_string())?;
    cert.verify_signed_by(&issuer_key).map_err(|e| e.to_string())
}

/// keyCertSign bit of the key usage mask.
const KEY_CERT_SIGN: u16 = 1 << 5;

/// Parses a CRL and checks it is current, well formed, and signed by the
/// key of `cert_pem`.
pub fn check_and_verify_crl(cert_pem: &str, crl_pem: &str) -> Result<()> {
    let crl = Crl::from_pem(crl_pem).map_err(|e| rejected("crl_decode", e))?;

    if crl.has_expired(OffsetDateTime::now_utc()) {
        return Err(rejected(
            "crl_expiry",
            CertCheckError::invalid_crl("Crl is not valid now"),
        ));
    }

    if crl
        .next_update()
        .is_none_or(|next_update| next_update <= crl.this_update())
    {
        return Err(rejected(
            "crl_update_window",
            CertCheckError::invalid_crl("Next crl update time is invalid"),
        ));
    }

    let issuer = oid::construct_dn(crl.issuer()).map_err(|e| {
        rejected(
            "crl_issuer",
            CertCheckError::invalid_crl(format!("Crl issuer is invalid: {e}")),
        )
    })?;
    if issuer.is_empty() {
        return Err(rejected(
            "crl_issuer",
            CertCheckError::invalid_crl("Crl issuer is invalid"),
        ));
    }

    let cert = Certificate::from_pem(cert_pem).map_err(|e| rejected("decode", e))?;
    cert.public_key()
        .and_then(|issuer_key| crl.verify_signature(&issuer_key))
        .map_err(|e| {
            rejected(
                "crl_signature",
                CertCheckError::invalid_crl(format!("Unable to verify x509Crl. Error: {e}")),
            )
        })
}

/// Reports whether the serial number of `cert_pem` is on the CRL.
///
/// Only decoding can fail; an empty or absent revoked list yields `false`.
pub fn check_if_signed_cert_is_revoked(cert_pem: &str, crl_pem: &str) -> Result<bool> {
    let cert = Certificate::from_pem(cert_pem).map_err(|e| rejected("decode", e))?;
    let crl = Crl::from_pem(crl_pem).map_err(|e| rejected("crl_decode", e))?;

    let revoked = crl.is_revoked(cert.serial_number());
    tracing::debug!(
        serial = %cert.serial_number(),
        revoked,
        "checked certificate against crl"
    );
    Ok(revoked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::{CertSignRequest, Validity};
    use crate::issuer::{CertificateAuthority, Issuer};
    use crate::key::KeyAlgorithm;
    use const_oid::AssociatedOid;
    use der::asn1::{BmpString, OctetString, SetOfVec};
    use der::{Any, Encode};
    use time::Duration;
    use x509_cert::attr::AttributeTypeAndValue;
    use x509_cert::ext::pkix::name::GeneralName;
    use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

    fn issued(ca: &CertificateAuthority) -> Certificate {
        let request = CertSignRequest::builder()
            .common_name("test.example.com".to_string())
            .org_list(vec!["VMware".to_string()])
            .ip_addresses(vec!["10.0.0.1".to_string()])
            .key_algorithm(KeyAlgorithm::Ed25519)
            .build();
        let csr_pem = crate::create_cert_sign_request(&request).unwrap();
        Certificate::from_pem(&ca.issue(&csr_pem, &Validity::for_days(1)).unwrap()).unwrap()
    }

    fn single_rdn(oid: const_oid::ObjectIdentifier, value: Any) -> RdnSequence {
        let mut set = SetOfVec::new();
        set.insert(AttributeTypeAndValue { oid, value }).unwrap();
        RdnSequence(vec![RelativeDistinguishedName(set)])
    }

    #[test]
    fn test_detail_checks_run_in_documented_order() {
        let names: Vec<_> = DETAIL_CHECKS.iter().map(|check| check.name).collect();
        assert_eq!(
            names,
            vec![
                "common_name",
                "domain_name",
                "country",
                "state",
                "locality",
                "org_unit",
                "org",
                "email_addresses",
                "dns_names",
                "ip_addresses",
                "is_ca",
                "key_usage",
                "authority_information_access",
                "authority_key_identifier",
            ]
        );
    }

    #[test]
    fn test_first_mismatch_wins() {
        let seen = Observed {
            data: CertData::builder()
                .common_name("a".to_string())
                .org_list(vec!["A".to_string(), "B".to_string()])
                .build(),
            issuing_certificate_urls: Vec::new(),
            authority_key_id: Vec::new(),
        };
        let want = CertData::builder()
            .common_name("a".to_string())
            .org_list(vec!["B".to_string(), "A".to_string()])
            .key_usage(32)
            .build();

        let failed = DETAIL_CHECKS
            .iter()
            .find(|check| !(check.holds)(&seen, &want))
            .unwrap();
        assert_eq!(failed.name, "org");
    }

    #[test]
    fn test_undecodable_inputs() {
        assert_eq!(
            check_cert_details("not pem", &CertData::default()).unwrap_err(),
            CertCheckError::invalid_cert("Unable to convert cert to X509 cert")
        );
        assert_eq!(
            verify_cert("", "").unwrap_err(),
            CertCheckError::invalid_cert("Invalid CA Cert. Unable to add cert to certpool")
        );
        assert!(matches!(
            check_and_verify_crl("", "garbage"),
            Err(CertCheckError::InvalidCrl(_))
        ));
        assert!(get_cert_org("").is_err());
    }

    #[test]
    fn test_bmp_string_organization_is_read() {
        let ca = CertificateAuthority::new_root("Test Root", KeyAlgorithm::Ed25519).unwrap();
        let mut cert = issued(&ca);
        cert.inner.tbs_certificate.subject = single_rdn(
            oid::ORGANIZATION,
            Any::encode_from(&BmpString::from_utf8("VMware").unwrap()).unwrap(),
        );
        let cert_pem = cert.to_pem().unwrap();

        assert_eq!(get_cert_org(&cert_pem).unwrap(), vec!["VMware"]);
        let expected = CertData::builder()
            .org_list(vec!["VMware".to_string()])
            .ip_addresses(vec!["10.0.0.1".to_string()])
            .build();
        check_cert_details(&cert_pem, &expected).unwrap();
    }

    #[test]
    fn test_unreadable_extension_is_invalid_certificate() {
        let ca = CertificateAuthority::new_root("Test Root", KeyAlgorithm::Ed25519).unwrap();
        let mut cert = issued(&ca);
        let bad_san = x509_cert::ext::pkix::SubjectAltName(vec![GeneralName::IpAddress(
            OctetString::new(vec![10, 0, 0, 1, 5]).unwrap(),
        )]);
        for ext in cert.inner.tbs_certificate.extensions.iter_mut().flatten() {
            if ext.extn_id == x509_cert::ext::pkix::SubjectAltName::OID {
                ext.extn_value = OctetString::new(bad_san.to_der().unwrap()).unwrap();
            }
        }

        let err = check_cert_details(&cert.to_pem().unwrap(), &CertData::default()).unwrap_err();
        assert!(matches!(
            &err,
            CertCheckError::InvalidCertificate(detail)
                if detail.starts_with("Unable to parse X509 cert subject")
        ));
    }

    #[test]
    fn test_unreadable_crl_issuer_is_invalid_crl() {
        let ca = CertificateAuthority::new_root("Test Root", KeyAlgorithm::Ed25519).unwrap();
        let now = OffsetDateTime::now_utc();
        let crl_pem = ca.issue_crl(&[], now, Some(now + Duration::hours(1))).unwrap();
        let mut crl = Crl::from_pem(&crl_pem).unwrap();
        crl.inner.tbs_cert_list.issuer = single_rdn(
            oid::COMMON_NAME,
            Any::encode_from(&OctetString::new(vec![1, 2, 3]).unwrap()).unwrap(),
        );
        let crl_pem = pem_utils::der_to_pem(&crl.inner.to_der().unwrap(), pem_utils::X509_CRL);

        let err = check_and_verify_crl(&ca.cert_pem().unwrap(), &crl_pem).unwrap_err();
        assert!(matches!(
            &err,
            CertCheckError::InvalidCrl(detail) if detail.starts_with("Crl issuer is invalid")
        ));
    }
}
