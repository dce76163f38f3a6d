mod util;

use certcheck::cert::Certificate;
use certcheck::cert::params::{CertData, CertSignRequest, Validity};
use certcheck::error::CertCheckError;
use certcheck::issuer::{CertificateAuthority, Issuer};
use certcheck::key::KeyAlgorithm;
use time::{Duration, OffsetDateTime};

pub type Result<T> = std::result::Result<T, CertCheckError>;

fn invalid_cert(detail: &str) -> CertCheckError {
    CertCheckError::InvalidCertificate(detail.to_string())
}

fn invalid_crl(detail: &str) -> CertCheckError {
    CertCheckError::InvalidCrl(detail.to_string())
}

/// A request for a non-CA certificate with key usage 32 comes back with
/// exactly the requested details.
#[test]
fn example_scenario() -> Result<()> {
    util::init_tracing();
    let ca = util::generate_ca();

    let request = CertSignRequest::builder()
        .common_name("test.example.com".to_string())
        .domain_name("example.com".to_string())
        .is_ca(false)
        .key_usage(32)
        .build();
    let csr_pem = certcheck::create_cert_sign_request(&request)?;
    let cert_pem = ca.issue(&csr_pem, &Validity::for_days(30))?;

    let expected = CertData::builder()
        .common_name("test.example.com".to_string())
        .domain_name("example.com".to_string())
        .is_ca(false)
        .key_usage(32)
        .build();
    certcheck::check_cert_details(&cert_pem, &expected)
}

#[test]
fn issued_certificate_matches_request() -> Result<()> {
    util::init_tracing();
    let ca = util::generate_ca();
    let request = util::server_request();
    let cert_pem = util::issue(&ca, &request);

    certcheck::check_cert_details(&cert_pem, &CertData::from(&request))?;
    certcheck::verify_cert(&cert_pem, &ca.cert_pem()?)?;
    assert_eq!(
        certcheck::get_cert_org(&cert_pem)?,
        vec!["VMware".to_string(), "Lightwave".to_string()]
    );
    Ok(())
}

#[test]
fn any_single_divergence_is_reported() {
    util::init_tracing();
    let ca = util::generate_ca();
    let request = util::server_request();
    let cert_pem = util::issue(&ca, &request);
    let actual = CertData::from(&request);

    let cases: [(fn(&mut CertData), &str); 12] = [
        (
            |d| d.common_name = "other.example.com".to_string(),
            "Certificate common name does not match as expected",
        ),
        (
            |d| d.domain_name = "example.org".to_string(),
            "Certificate domain name does not match as expected",
        ),
        (
            |d| d.country_list = vec!["DE".to_string()],
            "Certificate country does not match as expected",
        ),
        (
            |d| d.state_list.clear(),
            "Certificate state does not match as expected",
        ),
        (
            |d| d.locality_list.push("Austin".to_string()),
            "Certificate locality does not match as expected",
        ),
        (
            |d| d.org_unit_list = vec!["Sales".to_string()],
            "Certificate OU's does not match as expected",
        ),
        (
            |d| d.org_list.reverse(),
            "Certificate org's does not match as expected",
        ),
        (
            |d| d.email_addresses.clear(),
            "Certificate email addresses does not match as expected",
        ),
        (
            |d| d.dns_list.reverse(),
            "Certificate dns names does not match as expected",
        ),
        (
            |d| d.ip_addresses = vec!["10.0.0.1".to_string()],
            "Certificate ip addresses does not match as expected",
        ),
        (
            |d| d.is_ca = true,
            "Certificate CA status does not match as expected",
        ),
        (
            |d| d.key_usage = 32,
            "Certificate key usage does not match as expected",
        ),
    ];

    for (diverge, detail) in cases {
        let mut expected = actual.clone();
        diverge(&mut expected);
        assert_eq!(
            certcheck::check_cert_details(&cert_pem, &expected).unwrap_err(),
            invalid_cert(detail)
        );
    }
}

#[test]
fn org_list_comparison_is_order_sensitive() {
    let ca = util::generate_ca();
    let request = CertSignRequest::builder()
        .common_name("orgs.example.com".to_string())
        .org_list(vec!["B".to_string(), "A".to_string()])
        .key_algorithm(KeyAlgorithm::Ed25519)
        .build();
    let cert_pem = util::issue(&ca, &request);

    let mut expected = CertData::from(&request);
    expected.org_list = vec!["A".to_string(), "B".to_string()];
    assert_eq!(
        certcheck::check_cert_details(&cert_pem, &expected).unwrap_err(),
        invalid_cert("Certificate org's does not match as expected")
    );

    expected.org_list = vec!["B".to_string(), "A".to_string()];
    assert!(certcheck::check_cert_details(&cert_pem, &expected).is_ok());
}

#[test]
fn first_mismatch_wins() {
    let ca = util::generate_ca();
    let request = util::server_request();
    let cert_pem = util::issue(&ca, &request);

    let mut expected = CertData::from(&request);
    expected.key_usage = 0;
    expected.country_list.clear();
    assert_eq!(
        certcheck::check_cert_details(&cert_pem, &expected).unwrap_err(),
        invalid_cert("Certificate country does not match as expected")
    );
}

#[test]
fn domain_name_round_trips() -> Result<()> {
    let ca = util::generate_ca();
    for domain in ["example.com", "a.b.example.org", "localhost"] {
        let request = CertSignRequest::builder()
            .common_name(format!("host.{domain}"))
            .domain_name(domain.to_string())
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .build();
        let cert = Certificate::from_pem(&util::issue(&ca, &request))?;
        assert_eq!(cert.domain_name()?, domain);
    }
    Ok(())
}

#[test]
fn ca_flag_and_key_usage_round_trip() -> Result<()> {
    let ca = util::generate_ca();
    for is_ca in [false, true] {
        for key_usage in [0u16, 1, 32, 32 | 64, 0x1ff] {
            let request = CertSignRequest::builder()
                .common_name("usage.example.com".to_string())
                .is_ca(is_ca)
                .key_usage(key_usage)
                .key_algorithm(KeyAlgorithm::Ed25519)
                .build();
            let cert = Certificate::from_pem(&util::issue(&ca, &request))?;
            assert_eq!(cert.is_ca()?, is_ca);
            assert_eq!(cert.key_usage()?, key_usage);
        }
    }
    Ok(())
}

#[test]
fn validity_must_match_to_the_second() -> Result<()> {
    util::init_tracing();
    let ca = util::generate_ca();
    let csr_pem = certcheck::create_cert_sign_request(&util::server_request())?;

    let not_before = OffsetDateTime::now_utc();
    let not_after = not_before + Duration::days(90);
    let cert_pem = ca.issue(
        &csr_pem,
        &Validity {
            not_before,
            not_after,
        },
    )?;

    certcheck::check_cert_validity(&cert_pem, not_before, not_after)?;
    assert_eq!(
        certcheck::check_cert_validity(&cert_pem, not_before + Duration::seconds(1), not_after)
            .unwrap_err(),
        invalid_cert("Certificate start time does not match")
    );
    assert_eq!(
        certcheck::check_cert_validity(&cert_pem, not_before, not_after - Duration::seconds(1))
            .unwrap_err(),
        invalid_cert("Certificate end time does not match")
    );
    Ok(())
}

#[test]
fn verify_cert_rejects_other_authority() -> Result<()> {
    util::init_tracing();
    let ca = util::generate_ca();
    let other = CertificateAuthority::new_root("myca.local", KeyAlgorithm::EcdsaP256)?;
    let cert_pem = util::issue(&ca, &util::server_request());

    let err = certcheck::verify_cert(&cert_pem, &other.cert_pem()?).unwrap_err();
    assert!(matches!(
        &err,
        CertCheckError::InvalidCertificate(detail) if detail.starts_with("Cert verification failed")
    ));

    let bundle = format!("{}{}", other.cert_pem()?, ca.cert_pem()?);
    certcheck::verify_cert(&cert_pem, &bundle)
}

#[test]
fn verify_cert_rejects_expired_certificate() -> Result<()> {
    let ca = util::generate_ca();
    let csr_pem = certcheck::create_cert_sign_request(&util::server_request())?;
    let now = OffsetDateTime::now_utc();
    let cert_pem = ca.issue(
        &csr_pem,
        &Validity {
            not_before: now - Duration::days(10),
            not_after: now - Duration::days(1),
        },
    )?;

    assert!(certcheck::verify_cert(&cert_pem, &ca.cert_pem()?).is_err());
    Ok(())
}

#[test]
fn verify_cert_needs_a_ca_certificate() {
    let ca = util::generate_ca();
    let cert_pem = util::issue(&ca, &util::server_request());

    assert_eq!(
        certcheck::verify_cert(&cert_pem, "no certificates here").unwrap_err(),
        invalid_cert("Invalid CA Cert. Unable to add cert to certpool")
    );
}

#[test]
fn crl_checks() -> Result<()> {
    util::init_tracing();
    let ca = util::generate_ca();
    let ca_pem = ca.cert_pem()?;
    let now = OffsetDateTime::now_utc();

    let current = ca.issue_crl(&[], now, Some(now + Duration::hours(1)))?;
    certcheck::check_and_verify_crl(&ca_pem, &current)?;

    let expired = ca.issue_crl(&[], now - Duration::hours(2), Some(now - Duration::hours(1)))?;
    assert_eq!(
        certcheck::check_and_verify_crl(&ca_pem, &expired).unwrap_err(),
        invalid_crl("Crl is not valid now")
    );

    let without_next_update = ca.issue_crl(&[], now, None)?;
    assert_eq!(
        certcheck::check_and_verify_crl(&ca_pem, &without_next_update).unwrap_err(),
        invalid_crl("Crl is not valid now")
    );

    let inverted = ca.issue_crl(&[], now + Duration::hours(2), Some(now + Duration::hours(1)))?;
    assert_eq!(
        certcheck::check_and_verify_crl(&ca_pem, &inverted).unwrap_err(),
        invalid_crl("Next crl update time is invalid")
    );

    let other = CertificateAuthority::new_root("other.local", KeyAlgorithm::EcdsaP256)?;
    let err = certcheck::check_and_verify_crl(&other.cert_pem()?, &current).unwrap_err();
    assert!(matches!(
        &err,
        CertCheckError::InvalidCrl(detail) if detail.starts_with("Unable to verify x509Crl")
    ));

    assert!(matches!(
        certcheck::check_and_verify_crl(&ca_pem, "garbage"),
        Err(CertCheckError::InvalidCrl(_))
    ));
    Ok(())
}

#[test]
fn revocation_lookup() -> Result<()> {
    util::init_tracing();
    let ca = util::generate_ca();
    let revoked_pem = util::issue(&ca, &util::server_request());
    let other_pem = util::issue(&ca, &util::server_request());
    let revoked_serial = Certificate::from_pem(&revoked_pem)?.serial_number().clone();

    let now = OffsetDateTime::now_utc();
    let next = Some(now + Duration::hours(1));

    let empty = ca.issue_crl(&[], now, next)?;
    assert!(!certcheck::check_if_signed_cert_is_revoked(&revoked_pem, &empty)?);

    let crl = ca.issue_crl(&[revoked_serial], now, next)?;
    assert!(certcheck::check_if_signed_cert_is_revoked(&revoked_pem, &crl)?);
    assert!(!certcheck::check_if_signed_cert_is_revoked(&other_pem, &crl)?);

    assert!(certcheck::check_if_signed_cert_is_revoked("", &crl).is_err());
    Ok(())
}

#[test]
fn rsa_and_p384_authorities() -> Result<()> {
    for algorithm in [KeyAlgorithm::Rsa2048, KeyAlgorithm::EcdsaP384] {
        let ca = CertificateAuthority::new_root("alg.local", algorithm)?;
        let mut request = util::server_request();
        request.key_algorithm = algorithm;
        let cert_pem = util::issue(&ca, &request);

        certcheck::verify_cert(&cert_pem, &ca.cert_pem()?)?;
        let now = OffsetDateTime::now_utc();
        let crl = ca.issue_crl(&[], now, Some(now + Duration::hours(1)))?;
        certcheck::check_and_verify_crl(&ca.cert_pem()?, &crl)?;
    }
    Ok(())
}
