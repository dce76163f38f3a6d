#![allow(dead_code)]

use certcheck::cert::params::{CertSignRequest, Validity};
use certcheck::issuer::{CertificateAuthority, Issuer};
use certcheck::key::KeyAlgorithm;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn generate_ca() -> CertificateAuthority {
    CertificateAuthority::new_root("myca.local", KeyAlgorithm::EcdsaP256).unwrap()
}

pub fn server_request() -> CertSignRequest {
    CertSignRequest::builder()
        .common_name("test.example.com".to_string())
        .domain_name("example.com".to_string())
        .org_list(vec!["VMware".to_string(), "Lightwave".to_string()])
        .org_unit_list(vec!["Engineering".to_string()])
        .country_list(vec!["US".to_string()])
        .state_list(vec!["California".to_string()])
        .locality_list(vec!["Palo Alto".to_string()])
        .dns_list(vec![
            "test.example.com".to_string(),
            "www.example.com".to_string(),
        ])
        .ip_addresses(vec!["192.168.1.10".to_string(), "::1".to_string()])
        .email_addresses(vec!["admin@example.com".to_string()])
        .key_usage(1 | 4)
        .is_ca(false)
        .key_algorithm(KeyAlgorithm::EcdsaP256)
        .build()
}

/// Requests and issues a certificate for `request`, valid for a year.
pub fn issue(ca: &CertificateAuthority, request: &CertSignRequest) -> String {
    let csr_pem = certcheck::create_cert_sign_request(request).unwrap();
    ca.issue(&csr_pem, &Validity::for_days(365)).unwrap()
}
