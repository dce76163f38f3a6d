//! # CertCheck - Certificate Assertions for Certificate-Authority Tests
//!
//! CertCheck is a helper library for integration tests that drive a
//! certificate authority. It builds PKCS#10 signing requests to submit to the
//! authority, and it decodes and checks what comes back: issued
//! certificates, trust chains and certificate revocation lists. Everything
//! is built on the RustCrypto libraries.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048-bit keys signing with SHA-256
//! - **ECDSA**: P-256 and P-384 curves; certificates and CRLs signed with
//!   P-521 keys, or with any SHA-2 digest, are verified too
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! ## Quick Start
//!
//! ### Requesting and Checking a Certificate
//!
//! ```rust,no_run
//! use certcheck::{
//!     cert::params::{CertData, CertSignRequest, Validity},
//!     issuer::{CertificateAuthority, Issuer},
//!     key::KeyAlgorithm,
//! };
//!
//! # fn main() -> Result<(), certcheck::error::CertCheckError> {
//! let request = CertSignRequest::builder()
//!     .common_name("test.example.com".to_string())
//!     .domain_name("example.com".to_string())
//!     .key_usage(32)
//!     .build();
//!
//! let csr_pem = certcheck::create_cert_sign_request(&request)?;
//!
//! // Any authority will do; the bundled one signs in-process.
//! let ca = CertificateAuthority::new_root("Example Root", KeyAlgorithm::EcdsaP256)?;
//! let cert_pem = ca.issue(&csr_pem, &Validity::for_days(30))?;
//!
//! certcheck::check_cert_details(&cert_pem, &CertData::from(&request))?;
//! certcheck::verify_cert(&cert_pem, &ca.cert_pem()?)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Checking a Revocation List
//!
//! ```rust,no_run
//! use certcheck::{issuer::{CertificateAuthority, Issuer}, key::KeyAlgorithm};
//! use time::{Duration, OffsetDateTime};
//!
//! # fn main() -> Result<(), certcheck::error::CertCheckError> {
//! let ca = CertificateAuthority::new_root("Example Root", KeyAlgorithm::Ed25519)?;
//! let now = OffsetDateTime::now_utc();
//! let crl_pem = ca.issue_crl(&[], now, Some(now + Duration::days(1)))?;
//!
//! let ca_pem = ca.cert_pem()?;
//! certcheck::check_and_verify_crl(&ca_pem, &crl_pem)?;
//! assert!(!certcheck::check_if_signed_cert_is_revoked(&ca_pem, &crl_pem)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`error::Result`]. Validators fail on the first
//! mismatch, with a detail naming it:
//!
//! ```rust
//! use certcheck::{cert::params::CertData, error::CertCheckError};
//!
//! match certcheck::check_cert_details("not a certificate", &CertData::default()) {
//!     Err(CertCheckError::InvalidCertificate(detail)) => println!("{detail}"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`csr`]: Signing request generation
//! - [`cert`]: Certificate decoding, extensions and parameter types
//! - [`crl`]: Revocation list decoding
//! - [`validate`]: Certificate and CRL assertions
//! - [`oid`]: Distinguished name attribute identifiers and rendering
//! - [`key`]: Key generation, signing and verification
//! - [`issuer`]: A minimal certificate authority for tests
//! - [`error`]: Error types

pub mod cert;
pub mod crl;
pub mod csr;
pub mod error;
pub mod issuer;
pub mod key;
pub mod oid;
pub mod pem_utils;
pub mod tbs_certificate;
pub mod validate;

pub use csr::{create_cert_sign_request, create_cert_sign_request_with_key};
pub use validate::{
    check_and_verify_crl, check_cert_details, check_cert_validity, check_if_signed_cert_is_revoked,
    get_cert_org, verify_cert,
};
